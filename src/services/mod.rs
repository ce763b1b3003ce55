//! Object-store facing services: bucket bootstrap at startup and URL signing
//! per request.

pub mod bucket_bootstrap;
pub mod s3_client;
pub mod url_issuer;
