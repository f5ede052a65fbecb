//! Shared view of channel status.

use std::sync::Arc;

use parking_lot::RwLock;
use uplink_core::{ChannelState, StatusHistory};

#[derive(Debug, Default)]
struct StatusInner {
    state: ChannelState,
    latest: Option<String>,
    history: StatusHistory,
}

/// Cloneable handle onto one session's status.
///
/// The driver writes through one clone while the application reads through
/// others. `latest` tracks the most recent status line of any kind; the
/// bounded history records channel notifications only, so lifecycle notes
/// and upload outcomes never displace received messages.
#[derive(Clone, Debug, Default)]
pub struct StatusHandle {
    inner: Arc<RwLock<StatusInner>>,
}

impl StatusHandle {
    /// Create a handle with no recorded activity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.inner.read().state
    }

    /// Most recent status line, if any.
    #[must_use]
    pub fn latest(&self) -> Option<String> {
        self.inner.read().latest.clone()
    }

    /// Snapshot of retained channel messages, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.inner.read().history.to_vec()
    }

    /// Number of retained channel messages.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.inner.read().history.len()
    }

    pub(crate) fn set_state(&self, state: ChannelState) {
        self.inner.write().state = state;
    }

    /// Record a received channel message: enters the history and becomes
    /// the latest status line.
    pub(crate) fn record_message(&self, message: impl Into<String>) {
        let message = message.into();
        let mut inner = self.inner.write();
        inner.history.push(message.clone());
        inner.latest = Some(message);
    }

    /// Record a status line that is not a channel message. Updates `latest`
    /// without touching the history.
    pub(crate) fn record_status(&self, message: impl Into<String>) {
        self.inner.write().latest = Some(message.into());
    }
}
