//! BucketBootstrapper — makes sure the configured bucket exists before the
//! service accepts traffic.
//!
//! Talks to the internal endpoint only. Bucket creation is the one mutating
//! call this service ever makes against the object store, and it happens at
//! startup, outside request handling.

use crate::{
    config::StorageConfig,
    services::s3_client::{BoxError, build_client},
};
use aws_sdk_s3::{
    Client,
    error::{DisplayErrorContext, SdkError},
    operation::head_bucket::HeadBucketError,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Region in which S3 rejects an explicit location constraint.
const DEFAULT_S3_REGION: &str = "us-east-1";

const ADMIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Bucket existence check or creation failed. Fatal at startup.
#[derive(Debug, Error)]
#[error("failed to initialize bucket `{bucket}`")]
pub struct StorageInitializationError {
    pub bucket: String,
    /// Full cause chain, for logs only.
    pub reason: String,
    #[source]
    pub source: BoxError,
}

/// Outcome of [`BucketBootstrapper::ensure_bucket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketStatus {
    Created,
    AlreadyExists,
}

#[derive(Clone, Debug)]
pub struct BucketBootstrapper {
    client: Client,
    bucket: String,
    region: String,
}

impl BucketBootstrapper {
    /// Create a bootstrapper bound to the internal endpoint of `storage`.
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            client: build_client(storage, &storage.internal_endpoint, ADMIN_TIMEOUT),
            bucket: storage.bucket.clone(),
            region: storage.region.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Create the bucket unless it already exists.
    ///
    /// Idempotent: against an existing bucket this only performs the
    /// existence check. A concurrent creator winning the race is also
    /// reported as `AlreadyExists`.
    pub async fn ensure_bucket(&self) -> Result<BucketStatus, StorageInitializationError> {
        if self.bucket_exists().await? {
            info!(bucket = %self.bucket, "bucket already exists");
            return Ok(BucketStatus::AlreadyExists);
        }

        let mut request = self.client.create_bucket().bucket(&self.bucket);
        if self.region != DEFAULT_S3_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                info!(bucket = %self.bucket, region = %self.region, "bucket created");
                Ok(BucketStatus::Created)
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_bucket_already_owned_by_you()) =>
            {
                debug!(bucket = %self.bucket, "bucket created concurrently");
                Ok(BucketStatus::AlreadyExists)
            }
            Err(err) => Err(self.init_error(err)),
        }
    }

    /// Ask the object store whether the bucket exists.
    ///
    /// A not-found answer is `Ok(false)`; anything else that is not a success
    /// (unreachable endpoint, bad credentials, missing permission) is an error.
    pub async fn bucket_exists(&self) -> Result<bool, StorageInitializationError> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(self.init_error(err)),
        }
    }

    fn init_error<E>(&self, err: SdkError<E>) -> StorageInitializationError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StorageInitializationError {
            bucket: self.bucket.clone(),
            reason: DisplayErrorContext(&err).to_string(),
            source: Box::new(err),
        }
    }
}

/// HEAD responses carry no body, so fall back to the raw status code when the
/// SDK could not classify the error.
fn is_not_found(err: &SdkError<HeadBucketError>) -> bool {
    err.as_service_error()
        .is_some_and(HeadBucketError::is_not_found)
        || err
            .raw_response()
            .is_some_and(|response| response.status().as_u16() == 404)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, method, path_regex},
    };

    // The SDK may or may not append a trailing slash to bucket-level requests.
    const BUCKET_PATH: &str = r"^/study-files/?$";

    fn storage_for(endpoint: &str) -> StorageConfig {
        StorageConfig {
            internal_endpoint: endpoint.to_string(),
            public_endpoint: "https://files.example.test".to_string(),
            region: DEFAULT_S3_REGION.to_string(),
            access_key: "minio".to_string(),
            secret_key: "minio-secret".to_string(),
            bucket: "study-files".to_string(),
        }
    }

    #[tokio::test]
    async fn creates_missing_bucket_then_becomes_noop() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path_regex(BUCKET_PATH))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path_regex(BUCKET_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(BUCKET_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let bootstrapper = BucketBootstrapper::new(&storage_for(&server.uri()));

        assert_eq!(
            bootstrapper.ensure_bucket().await.unwrap(),
            BucketStatus::Created
        );
        assert_eq!(
            bootstrapper.ensure_bucket().await.unwrap(),
            BucketStatus::AlreadyExists
        );
    }

    #[tokio::test]
    async fn non_default_region_sends_location_constraint() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path_regex(BUCKET_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(BUCKET_PATH))
            .and(body_string_contains(
                "<LocationConstraint>eu-central-1</LocationConstraint>",
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut storage = storage_for(&server.uri());
        storage.region = "eu-central-1".to_string();
        let bootstrapper = BucketBootstrapper::new(&storage);

        assert_eq!(
            bootstrapper.ensure_bucket().await.unwrap(),
            BucketStatus::Created
        );
    }

    #[tokio::test]
    async fn losing_creation_race_counts_as_existing() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path_regex(BUCKET_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(BUCKET_PATH))
            .respond_with(
                ResponseTemplate::new(409)
                    .insert_header("content-type", "application/xml")
                    .set_body_string(concat!(
                        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                        "<Error><Code>BucketAlreadyOwnedByYou</Code>",
                        "<Message>Your previous request to create the named bucket succeeded and you already own it.</Message>",
                        "<BucketName>study-files</BucketName></Error>"
                    )),
            )
            .expect(1)
            .mount(&server)
            .await;

        let bootstrapper = BucketBootstrapper::new(&storage_for(&server.uri()));

        assert_eq!(
            bootstrapper.ensure_bucket().await.unwrap(),
            BucketStatus::AlreadyExists
        );
    }

    #[tokio::test]
    async fn existing_bucket_is_left_alone() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path_regex(BUCKET_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let bootstrapper = BucketBootstrapper::new(&storage_for(&server.uri()));

        for _ in 0..2 {
            assert_eq!(
                bootstrapper.ensure_bucket().await.unwrap(),
                BucketStatus::AlreadyExists
            );
        }
    }

    #[tokio::test]
    async fn forbidden_head_is_fatal_and_skips_creation() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path_regex(BUCKET_PATH))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let bootstrapper = BucketBootstrapper::new(&storage_for(&server.uri()));
        let err = bootstrapper.ensure_bucket().await.unwrap_err();

        assert_eq!(err.bucket, "study-files");
    }

    #[tokio::test]
    async fn failed_creation_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path_regex(BUCKET_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(BUCKET_PATH))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let bootstrapper = BucketBootstrapper::new(&storage_for(&server.uri()));

        assert!(bootstrapper.ensure_bucket().await.is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_initialization_error() {
        // Nothing listens on port 1.
        let bootstrapper = BucketBootstrapper::new(&storage_for("http://127.0.0.1:1"));

        let err = bootstrapper.ensure_bucket().await.unwrap_err();

        assert_eq!(err.bucket, "study-files");
        assert!(err.to_string().starts_with("failed to initialize bucket `study-files`"));
    }
}
