//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the bucket on the internal endpoint

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that sends a HEAD for the configured bucket through the
/// internal endpoint. HTTP 200 when the bucket is reachable, HTTP 503 when it
/// is missing or the object store cannot be reached.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let bucket = state.bootstrapper.bucket();
    let bucket_check = match state.bootstrapper.bucket_exists().await {
        Ok(true) => (true, None::<String>),
        Ok(false) => (false, Some(format!("bucket `{}` does not exist", bucket))),
        Err(e) => {
            tracing::warn!(detail = %e.reason, "readiness check failed: {}", e);
            (false, Some(format!("error: {}", e)))
        }
    };

    let overall_ok = bucket_check.0;

    let mut checks = HashMap::new();
    checks.insert(
        "bucket",
        CheckStatus {
            ok: bucket_check.0,
            error: bucket_check.1,
        },
    );

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
