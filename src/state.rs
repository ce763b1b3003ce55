//! Shared state handed to every request handler.

use crate::services::{bucket_bootstrap::BucketBootstrapper, url_issuer::UrlIssuer};

/// Both members are read-only after startup and cheap to clone.
#[derive(Clone, Debug)]
pub struct AppState {
    pub issuer: UrlIssuer,
    pub bootstrapper: BucketBootstrapper,
}
