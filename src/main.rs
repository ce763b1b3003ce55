use anyhow::{Context, Result};
use file_service::{
    config::AppConfig,
    services::{bucket_bootstrap::BucketBootstrapper, url_issuer::UrlIssuer},
    state::AppState,
};
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + init-bucket-only flag ---
    let (cfg, init_bucket_only) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting file-service with config: {:?}", cfg);

    // --- Ensure the bucket exists before taking traffic ---
    let bootstrapper = BucketBootstrapper::new(&cfg.storage);
    let status = bootstrapper
        .ensure_bucket()
        .await
        .inspect_err(|err| tracing::error!(detail = %err.reason, "{}", err))
        .context("object storage initialization failed")?;
    tracing::info!(
        "Bucket `{}` ready ({:?}) via {}",
        cfg.storage.bucket,
        status,
        cfg.storage.internal_endpoint
    );

    // --- Handle init-only mode ---
    if init_bucket_only {
        tracing::info!("Bucket initialization complete.");
        return Ok(()); // exit after bootstrap
    }

    // --- Initialize core service ---
    let issuer = UrlIssuer::new(&cfg.storage, cfg.presign_expiry, cfg.sign_timeout);
    tracing::info!(
        "Signing URLs for bucket `{}` on {} with expiry {:?}",
        issuer.bucket(),
        cfg.storage.public_endpoint,
        issuer.expiry()
    );

    let app = file_service::app(AppState {
        issuer,
        bootstrapper,
    });

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
