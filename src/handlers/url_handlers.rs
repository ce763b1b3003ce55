//! Handlers for the two remote calls of the file service.
//!
//! Each handler is a thin adapter: decode the intent, hand it to the
//! `UrlIssuer`, encode the result. Every failure, including an undecodable
//! body, is logged here and returned as a generic internal error.

use crate::{
    errors::AppError,
    models::intent::{DownloadIntent, DownloadUrl, SignedUrl, UploadIntent},
    state::AppState,
};
use axum::{Json, extract::State, extract::rejection::JsonRejection};
use tracing::{error, info};

/// `POST /rpc/GenerateUploadUrl`
pub async fn generate_upload_url(
    State(state): State<AppState>,
    payload: Result<Json<UploadIntent>, JsonRejection>,
) -> Result<Json<SignedUrl>, AppError> {
    let Json(intent) = payload.map_err(|rejection| body_error("upload", rejection))?;
    info!("Received upload request for: {}", intent.filename);

    let signed = state
        .issuer
        .issue_upload_url(&intent)
        .await
        .map_err(|err| {
            error!(error = %err, detail = %err.detail(), "Error generating upload URL");
            AppError::from(err)
        })?;

    Ok(Json(signed))
}

/// `POST /rpc/GenerateDownloadUrl`
pub async fn generate_download_url(
    State(state): State<AppState>,
    payload: Result<Json<DownloadIntent>, JsonRejection>,
) -> Result<Json<DownloadUrl>, AppError> {
    let Json(intent) = payload.map_err(|rejection| body_error("download", rejection))?;

    let url = state
        .issuer
        .issue_download_url(&intent)
        .await
        .map_err(|err| {
            error!(
                error = %err,
                detail = %err.detail(),
                file_id = %intent.file_id,
                "Error generating download URL"
            );
            AppError::from(err)
        })?;

    Ok(Json(url))
}

fn body_error(call: &str, rejection: JsonRejection) -> AppError {
    error!(error = %rejection.body_text(), "Invalid {} request body", call);
    AppError::internal(format!("Server error: {}", rejection.body_text()))
}
