//! Construction of S3 clients for the internal and public endpoints.
//!
//! Both clients share credentials and region; only the endpoint differs. The
//! host a URL is signed for must match the host the client connects to, so
//! signing always goes through the public client.

use crate::config::StorageConfig;
use aws_sdk_s3::{
    Client,
    config::{
        BehaviorVersion, Credentials, Region, RequestChecksumCalculation, retry::RetryConfig,
        timeout::TimeoutConfig,
    },
};
use std::time::Duration;

/// Boxed error used as the `source` of service errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Build a path-style S3 client against `endpoint`.
///
/// Retries are disabled: a failed call is reported, never repeated.
/// `operation_timeout` bounds every network operation issued by the client.
pub fn build_client(storage: &StorageConfig, endpoint: &str, operation_timeout: Duration) -> Client {
    let credentials = Credentials::new(
        &storage.access_key,
        &storage.secret_key,
        None,
        None,
        "file-service",
    );

    let timeouts = TimeoutConfig::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(operation_timeout))
        .operation_timeout(operation_timeout)
        .build();

    let config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .endpoint_url(endpoint)
        .region(Region::new(storage.region.clone()))
        .credentials_provider(credentials)
        // MinIO and most self-hosted stores only serve path-style requests.
        .force_path_style(true)
        .retry_config(RetryConfig::disabled())
        .timeout_config(timeouts)
        // Keep checksum query parameters out of pre-signed URLs.
        .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
        .build();

    Client::from_conf(config)
}
