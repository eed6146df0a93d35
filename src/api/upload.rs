//! Upload operation backed by the ElecMate HTTP API.
//!
//! POST /uploads with multipart form data: a `file` part carrying the raw
//! bytes and an `options` part carrying `PhotoUploadOptions` as JSON.

use std::sync::Arc;

use reqwest::{multipart, StatusCode};

use super::client::ApiClient;
use super::types::{PhotoUploadOptions, UploadedFile};
use crate::queue::{UploadError, UploadFile, UploadOperation};

/// Relative path of the upload endpoint.
pub const UPLOAD_PATH: &str = "/uploads";

/// Replays queued files against the backend.
///
/// A 4xx refusal of the upload itself is a soft rejection. Anything else
/// that is not an upload record (transport errors, 5xx, 401, 408, 429, a 2xx body
/// that does not parse) is a hard failure and leaves the retry count alone.
pub struct HttpUploader {
    api: Arc<ApiClient>,
}

impl HttpUploader {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

impl UploadOperation<PhotoUploadOptions> for HttpUploader {
    type Record = UploadedFile;

    async fn upload(
        &self,
        file: &UploadFile,
        options: &PhotoUploadOptions,
    ) -> Result<Option<UploadedFile>, UploadError> {
        let options_json = serde_json::to_string(options)
            .map_err(|e| UploadError::Unexpected(format!("Failed to encode options: {}", e)))?;

        let form = multipart::Form::new()
            .part("file", file_part(file))
            .part("options", options_part(options_json));

        let resp = self
            .api
            .authenticated_multipart_post(UPLOAD_PATH, form)
            .await
            .map_err(|e| UploadError::Transport(format!("Upload request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if is_business_rejection(status) {
                log::warn!("Upload of {} rejected ({}): {}", file.name, status, body);
                return Ok(None);
            }
            return Err(UploadError::Unexpected(format!(
                "Upload of {} failed ({}): {}",
                file.name, status, body
            )));
        }

        match resp.json::<UploadedFile>().await {
            Ok(record) => {
                log::debug!("Uploaded {} as {}", file.name, record.id);
                Ok(Some(record))
            }
            Err(e) => Err(UploadError::Unexpected(format!(
                "Failed to parse upload response for {}: {}",
                file.name, e
            ))),
        }
    }
}

/// Whether the backend refused this upload on its merits.
///
/// Expired credentials, timeouts, rate limiting and server errors say
/// nothing about the upload itself and must not use up its retries.
fn is_business_rejection(status: StatusCode) -> bool {
    status.is_client_error()
        && status != StatusCode::UNAUTHORIZED
        && status != StatusCode::REQUEST_TIMEOUT
        && status != StatusCode::TOO_MANY_REQUESTS
}

fn file_part(file: &UploadFile) -> multipart::Part {
    let part = || multipart::Part::bytes(file.bytes.clone()).file_name(file.name.clone());
    part()
        .mime_str(&file.mime_type)
        .or_else(|_| {
            log::debug!(
                "Unrecognised MIME type {:?} for {}, sending as octet-stream",
                file.mime_type,
                file.name
            );
            part().mime_str("application/octet-stream")
        })
        .unwrap_or_else(|_| part())
}

fn options_part(json: String) -> multipart::Part {
    multipart::Part::text(json.clone())
        .mime_str("application/json")
        .unwrap_or_else(|_| multipart::Part::text(json))
}
