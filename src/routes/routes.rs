//! Defines routes for the file service.
//!
//! ## Structure
//! - **Remote calls** (JSON in, JSON out)
//!   - `POST /rpc/GenerateUploadUrl`   — fresh file id + signed PUT URL
//!   - `POST /rpc/GenerateDownloadUrl` — signed GET URL for a file id
//!
//! - **Probes**
//!   - `GET /healthz` — liveness
//!   - `GET /readyz`  — bucket reachability

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        url_handlers::{generate_download_url, generate_upload_url},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the router for all file service routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // remote calls
        .route("/rpc/GenerateUploadUrl", post(generate_upload_url))
        .route("/rpc/GenerateDownloadUrl", post(generate_download_url))
        .layer(TraceLayer::new_for_http())
}
