//! Artifact upload over plain HTTP.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tracing::{debug, warn};
use uplink_core::ids::SessionId;

/// Where and how to submit uploads.
#[derive(Clone, Debug)]
pub struct UploadConfig {
    /// Full URL of the upload endpoint.
    pub url: String,
    /// Optional deadline for the whole request. `None` waits as long as
    /// the transport does.
    pub timeout: Option<Duration>,
}

impl UploadConfig {
    /// Config for `url` with no deadline.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
        }
    }
}

/// Why an upload failed.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The server answered with a non-success status. The body is kept
    /// verbatim as the diagnostic.
    #[error("server rejected upload with status {status}: {diagnostic}")]
    Status {
        /// HTTP status code of the response.
        status: u16,
        /// Response body, verbatim.
        diagnostic: String,
    },
    /// The request never completed: connect failure, timeout, broken
    /// transfer.
    #[error("upload transport error: {0}")]
    Network(#[from] reqwest::Error),
    /// Nothing was selected to upload.
    #[error("no artifact selected")]
    NoArtifact,
}

impl UploadError {
    /// Human-readable failure reason for status lines.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Status { diagnostic, .. } => diagnostic.clone(),
            Self::Network(e) => e.to_string(),
            Self::NoArtifact => "no artifact selected".to_string(),
        }
    }
}

/// Proof of a completed upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadReceipt {
    /// HTTP status code, always in the success range.
    pub status: u16,
    /// Informational response body.
    pub info: String,
}

/// One artifact submission, correlated to a session by identifier only.
///
/// Submission is a single multipart POST carrying the `client_uuid` and
/// `upload_file` parts. It shares nothing with the notification channel
/// and is never retried; the caller decides what a failure means.
#[derive(Debug)]
pub struct UploadRequest {
    id: SessionId,
    filename: String,
    bytes: Vec<u8>,
}

impl UploadRequest {
    /// Build a request for `bytes` to be stored under `filename`.
    #[must_use]
    pub fn new(id: SessionId, filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id,
            filename: filename.into(),
            bytes,
        }
    }

    /// Submit the artifact once.
    pub async fn submit(
        self,
        client: &reqwest::Client,
        config: &UploadConfig,
    ) -> Result<UploadReceipt, UploadError> {
        let Self { id, filename, bytes } = self;
        debug!(session_id = %id, filename = %filename, size = bytes.len(), "submitting upload");

        let part = Part::bytes(bytes).file_name(filename);
        let form = Form::new()
            .text("client_uuid", id.into_inner())
            .part("upload_file", part);

        let mut request = client.post(&config.url).multipart(form);
        if let Some(timeout) = config.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            debug!(status = status.as_u16(), "upload accepted");
            Ok(UploadReceipt {
                status: status.as_u16(),
                info: body,
            })
        } else {
            warn!(status = status.as_u16(), diagnostic = %body, "upload rejected");
            Err(UploadError::Status {
                status: status.as_u16(),
                diagnostic: body,
            })
        }
    }
}
