use crate::services::url_issuer::SigningError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for request errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

/// Callers only ever see a generic internal error carrying the message.
impl From<SigningError> for AppError {
    fn from(err: SigningError) -> Self {
        AppError::internal(format!("Server error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::url_issuer::SignedMethod;
    use std::time::Duration;

    #[tokio::test]
    async fn signing_error_becomes_internal_json_error() {
        let err = SigningError::Timeout {
            method: SignedMethod::Put,
            key: "f00".to_string(),
            timeout: Duration::from_secs(5),
        };

        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], 500);
        assert_eq!(
            body["error"],
            "Server error: presigning PUT url for object `f00` timed out after 5s"
        );
    }
}
