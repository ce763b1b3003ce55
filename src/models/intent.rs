//! Inputs and outputs of the two URL-issuing calls.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A caller's intent to upload a file.
///
/// Neither field takes part in key derivation: the object key is always a
/// freshly generated UUID. Both are accepted so clients can send what they
/// know about the file without the call being rejected.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UploadIntent {
    /// Name of the file on the client side. Not validated.
    #[serde(default)]
    pub filename: String,

    /// MIME type announced by the client, if any. Not validated.
    #[serde(default)]
    pub content_type: Option<String>,
}

/// A caller's intent to download a previously uploaded file.
///
/// `file_id` is used verbatim as the object key. There is no ownership or
/// existence check.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct DownloadIntent {
    /// Missing ids decode as empty and fail at signing time.
    #[serde(default)]
    pub file_id: String,
}

/// Result of an upload issuance.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrl {
    /// Object key the client must upload to.
    pub file_id: Uuid,

    /// Pre-signed PUT URL for `file_id`.
    pub presigned_url: String,
}

/// Result of a download issuance.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrl {
    pub presigned_url: String,
}
