//! Explicit per-session state.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;
use uplink_core::ids::SessionId;
use uplink_core::protocol;

use crate::channel::NotificationChannel;
use crate::driver::{ChannelDriver, DriveOutcome};
use crate::status::StatusHandle;
use crate::upload::{UploadConfig, UploadError, UploadReceipt, UploadRequest};

/// Client-side endpoint configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// HTTP base URL of the server, scheme and authority only.
    pub base_url: String,
    /// Optional deadline applied to each upload request.
    pub upload_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Config for `base_url` with no upload deadline.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            upload_timeout: None,
        }
    }

    /// Notification channel URL, with the scheme switched to WebSocket.
    #[must_use]
    pub fn channel_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws_base}{}", protocol::CHANNEL_PATH)
    }

    /// Upload endpoint URL.
    #[must_use]
    pub fn upload_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), protocol::UPLOAD_PATH)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://127.0.0.1:8771")
    }
}

/// An artifact staged for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// Name the server stores the artifact under.
    pub filename: String,
    /// Raw content.
    pub bytes: Vec<u8>,
}

/// Everything one client session owns.
///
/// The context carries the session identifier, the shared status handle,
/// the staged artifact slot, and the HTTP client. All session operations
/// hang off it; nothing lives in process-wide globals, so two contexts in
/// one process are fully independent sessions.
#[derive(Debug)]
pub struct SessionContext {
    id: SessionId,
    config: ClientConfig,
    http: reqwest::Client,
    status: StatusHandle,
    artifact: Mutex<Option<Artifact>>,
}

impl SessionContext {
    /// Create a session with a freshly generated identifier.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let id = SessionId::generate();
        info!(session_id = %id, base_url = %config.base_url, "session created");
        Self {
            id,
            config,
            http: reqwest::Client::new(),
            status: StatusHandle::new(),
            artifact: Mutex::new(None),
        }
    }

    /// The session identifier.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Shared status view for this session.
    #[must_use]
    pub fn status(&self) -> &StatusHandle {
        &self.status
    }

    /// Endpoint configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Stage an artifact, replacing any previous selection.
    pub fn select_artifact(&self, filename: impl Into<String>, bytes: Vec<u8>) {
        let artifact = Artifact {
            filename: filename.into(),
            bytes,
        };
        *self.artifact.lock() = Some(artifact);
    }

    /// Whether an artifact is currently staged.
    #[must_use]
    pub fn has_artifact(&self) -> bool {
        self.artifact.lock().is_some()
    }

    /// Drop the staged artifact, if any.
    pub fn clear_artifact(&self) {
        *self.artifact.lock() = None;
    }

    /// Build a notification channel for this session.
    #[must_use]
    pub fn open_channel(&self) -> NotificationChannel {
        NotificationChannel::new(self.config.channel_url(), self.id.clone())
    }

    /// Open a channel and drive its whole life into the status handle.
    ///
    /// The returned future owns everything it needs and resolves when the
    /// connection has closed.
    pub fn drive_channel(&self) -> impl Future<Output = DriveOutcome> + Send + 'static {
        let stream = self.open_channel().open();
        let driver = ChannelDriver::new(self.status.clone());
        driver.run(stream)
    }

    /// Submit the staged artifact once and record the outcome as a status
    /// line.
    ///
    /// Success records `Upload completed without errors`; failure records
    /// `Upload failed: ` followed by the server's diagnostic. The upload
    /// shares no state with the notification channel and works with the
    /// channel closed or absent.
    pub async fn submit_selected(&self) -> Result<UploadReceipt, UploadError> {
        let artifact = self
            .artifact
            .lock()
            .clone()
            .ok_or(UploadError::NoArtifact)?;
        let request = UploadRequest::new(self.id.clone(), artifact.filename, artifact.bytes);
        let upload_config = UploadConfig {
            url: self.config.upload_url(),
            timeout: self.config.upload_timeout,
        };

        match request.submit(&self.http, &upload_config).await {
            Ok(receipt) => {
                self.status.record_status("Upload completed without errors");
                Ok(receipt)
            }
            Err(err) => {
                self.status
                    .record_status(format!("Upload failed: {}", err.diagnostic()));
                Err(err)
            }
        }
    }
}
