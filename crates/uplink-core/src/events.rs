//! Notification channel lifecycle types.
//!
//! A channel's life is reported as a sequence of [`ChannelEvent`]s consumed
//! by exactly one driver. A successful connection yields `Opened`, then zero
//! or more `Message`s, then `Closed`; a failed connect yields `Errored`
//! followed by `Closed`. `Closed` is always the final event of a sequence,
//! and an `Errored` mid-stream does not by itself end it.

use std::fmt;

/// One observable happening on a notification channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The channel connected and announced itself.
    Opened,
    /// A text notification arrived. Keepalive frames are filtered out
    /// before this point and never appear here.
    Message(String),
    /// Something went wrong, with a human-readable reason.
    Errored(String),
    /// The channel will emit nothing further.
    Closed,
}

/// Coarse lifecycle state of a notification channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelState {
    /// Connection attempt in progress.
    #[default]
    Connecting,
    /// Announced and receiving.
    Open,
    /// Finished. A closed channel never reopens.
    Closed,
}

impl ChannelState {
    /// Whether this state admits no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}
