//! File service: issues pre-signed upload and download URLs against an
//! S3-compatible object store so file bytes never pass through this process.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;

/// Build the complete application with its state attached.
pub fn app(state: state::AppState) -> Router {
    routes::routes::routes().with_state(state)
}
