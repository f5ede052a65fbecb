//! Wire-level constants and frame helpers shared by client and server.

use thiserror::Error;

use crate::ids::{IdParseError, SessionId};

/// Prefix of the announcement frame, trailing space included.
pub const ANNOUNCE_PREFIX: &str = "CLIENT_ID: ";

/// Liveness probe text. Filtered out of observable channel output.
pub const KEEPALIVE_SENTINEL: &str = "WS_KEEPALIVE";

/// HTTP path of the notification channel endpoint.
pub const CHANNEL_PATH: &str = "/websockreg";

/// HTTP path of the artifact upload endpoint.
pub const UPLOAD_PATH: &str = "/upload";

/// Rejection reasons for a frame that is not a valid announcement.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AnnounceError {
    /// The frame does not start with [`ANNOUNCE_PREFIX`].
    #[error("frame is not an announcement")]
    NotAnnouncement,
    /// The frame carries something that is not a session identifier.
    #[error("announcement carries a bad identifier: {0}")]
    BadId(#[from] IdParseError),
}

/// Render the announcement frame a client sends as its first message.
#[must_use]
pub fn announcement(id: &SessionId) -> String {
    format!("{ANNOUNCE_PREFIX}{id}")
}

/// Extract and validate the session identifier from an announcement frame.
pub fn parse_announcement(frame: &str) -> Result<SessionId, AnnounceError> {
    let rest = frame
        .strip_prefix(ANNOUNCE_PREFIX)
        .ok_or(AnnounceError::NotAnnouncement)?;
    Ok(SessionId::parse(rest.trim())?)
}

/// Whether a frame is the keepalive sentinel.
#[must_use]
pub fn is_keepalive(frame: &str) -> bool {
    frame == KEEPALIVE_SENTINEL
}
