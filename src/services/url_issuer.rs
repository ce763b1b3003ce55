//! UrlIssuer — hands out short-lived pre-signed URLs for one object and one
//! HTTP method each.
//!
//! Signing is a local HMAC computation against the configured credentials;
//! no request reaches the object store. Every call is still bounded by
//! `sign_timeout` so a misbehaving client cannot stall a request handler.

use crate::{
    config::StorageConfig,
    models::intent::{DownloadIntent, DownloadUrl, SignedUrl, UploadIntent},
    services::s3_client::{BoxError, build_client},
};
use aws_sdk_s3::{Client, error::DisplayErrorContext, presigning::PresigningConfig};
use std::{fmt, time::Duration};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// HTTP method a URL is signed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedMethod {
    Put,
    Get,
}

impl fmt::Display for SignedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignedMethod::Put => f.write_str("PUT"),
            SignedMethod::Get => f.write_str("GET"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("failed to presign {method} url for object `{key}`")]
    Presign {
        method: SignedMethod,
        key: String,
        reason: String,
        #[source]
        source: BoxError,
    },
    #[error("presigning {method} url for object `{key}` timed out after {timeout:?}")]
    Timeout {
        method: SignedMethod,
        key: String,
        timeout: Duration,
    },
}

impl SigningError {
    /// Full cause chain, for logs only. Callers get the short `Display` form.
    pub fn detail(&self) -> String {
        match self {
            SigningError::Presign { reason, .. } => reason.clone(),
            SigningError::Timeout { .. } => self.to_string(),
        }
    }

    fn presign<E>(method: SignedMethod, key: &str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SigningError::Presign {
            method,
            key: key.to_string(),
            reason: DisplayErrorContext(&err).to_string(),
            source: Box::new(err),
        }
    }
}

/// Stateless issuer of pre-signed URLs. Cheap to clone; clones share the
/// underlying client.
#[derive(Clone, Debug)]
pub struct UrlIssuer {
    client: Client,
    bucket: String,
    expiry: Duration,
    sign_timeout: Duration,
}

impl UrlIssuer {
    /// Create an issuer signing against the public endpoint of `storage`.
    pub fn new(storage: &StorageConfig, expiry: Duration, sign_timeout: Duration) -> Self {
        Self {
            client: build_client(storage, &storage.public_endpoint, sign_timeout),
            bucket: storage.bucket.clone(),
            expiry,
            sign_timeout,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Issue a PUT URL under a freshly generated file id.
    ///
    /// The intent is never rejected and does not influence the key.
    pub async fn issue_upload_url(&self, intent: &UploadIntent) -> Result<SignedUrl, SigningError> {
        let file_id = Uuid::new_v4();
        debug!(
            filename = %intent.filename,
            content_type = ?intent.content_type,
            %file_id,
            "issuing upload url"
        );

        let presigned_url = self.presign(SignedMethod::Put, &file_id.to_string()).await?;

        Ok(SignedUrl {
            file_id,
            presigned_url,
        })
    }

    /// Issue a GET URL for `intent.file_id`, used verbatim as the object key.
    ///
    /// Neither existence nor ownership of the object is checked.
    pub async fn issue_download_url(
        &self,
        intent: &DownloadIntent,
    ) -> Result<DownloadUrl, SigningError> {
        debug!(file_id = %intent.file_id, "issuing download url");

        let presigned_url = self.presign(SignedMethod::Get, &intent.file_id).await?;

        Ok(DownloadUrl { presigned_url })
    }

    async fn presign(&self, method: SignedMethod, key: &str) -> Result<String, SigningError> {
        let config = PresigningConfig::expires_in(self.expiry)
            .map_err(|err| SigningError::presign(method, key, err))?;

        let signing = async {
            let request = match method {
                SignedMethod::Put => self
                    .client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .presigned(config)
                    .await
                    .map_err(|err| SigningError::presign(method, key, err))?,
                SignedMethod::Get => self
                    .client
                    .get_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .presigned(config)
                    .await
                    .map_err(|err| SigningError::presign(method, key, err))?,
            };
            Ok::<_, SigningError>(request.uri().to_string())
        };

        tokio::time::timeout(self.sign_timeout, signing)
            .await
            .map_err(|_| SigningError::Timeout {
                method,
                key: key.to_string(),
                timeout: self.sign_timeout,
            })?
    }
}
