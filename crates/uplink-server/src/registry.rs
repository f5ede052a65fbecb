//! Live session bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uplink_core::ids::SessionId;

/// Outbound frames buffered per channel when no queue size is configured.
pub const DEFAULT_SEND_QUEUE: usize = 64;

/// Send side of one registered channel connection.
///
/// The `conn_id` distinguishes successive connections announcing the same
/// session identifier, so a stale connection tearing down cannot evict the
/// one that displaced it.
#[derive(Debug)]
pub struct ChannelHandle {
    conn_id: u64,
    session_id: SessionId,
    tx: mpsc::Sender<String>,
    dropped: AtomicU64,
}

impl ChannelHandle {
    /// Registry-unique connection number.
    #[must_use]
    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }

    /// Session this connection announced.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Queue a frame for delivery. Returns `false` when the queue is full
    /// or the connection is gone; a full queue drops the frame rather than
    /// blocking the caller.
    pub fn push(&self, message: impl Into<String>) -> bool {
        match self.tx.try_send(message.into()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    session_id = %self.session_id,
                    conn_id = self.conn_id,
                    "send queue full, dropping frame"
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Frames dropped because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Concurrent map from session identifier to its live channel.
///
/// Holds at most one entry per identifier. Registering an identifier that
/// is already present displaces the previous connection; the displaced
/// handle is returned so its session can be told to wind down.
#[derive(Debug)]
pub struct SessionRegistry {
    channels: DashMap<SessionId, Arc<ChannelHandle>>,
    next_conn_id: AtomicU64,
    max_send_queue: usize,
}

impl SessionRegistry {
    /// Registry whose channels buffer up to `max_send_queue` frames.
    #[must_use]
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            channels: DashMap::new(),
            next_conn_id: AtomicU64::new(0),
            max_send_queue: max_send_queue.max(1),
        }
    }

    /// Insert a connection for `id`, returning its handle, the receive end
    /// of its frame queue, and whatever connection it displaced.
    pub fn register(
        &self,
        id: SessionId,
    ) -> (Arc<ChannelHandle>, mpsc::Receiver<String>, Option<Arc<ChannelHandle>>) {
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let handle = Arc::new(ChannelHandle {
            conn_id,
            session_id: id.clone(),
            tx,
            dropped: AtomicU64::new(0),
        });
        let displaced = self.channels.insert(id, Arc::clone(&handle));
        debug!(
            session_id = %handle.session_id,
            conn_id,
            displaced = displaced.is_some(),
            "session registered"
        );
        (handle, rx, displaced)
    }

    /// Remove the entry for `id`, but only if it still belongs to
    /// `conn_id`. A stale connection's teardown leaves its successor
    /// registered.
    pub fn deregister(&self, id: &SessionId, conn_id: u64) -> bool {
        let removed = self
            .channels
            .remove_if(id, |_, handle| handle.conn_id() == conn_id)
            .is_some();
        if removed {
            debug!(session_id = %id, conn_id, "session deregistered");
        }
        removed
    }

    /// Queue a frame for the session's live connection, if any.
    pub fn push(&self, id: &SessionId, message: impl Into<String>) -> bool {
        match self.channels.get(id) {
            Some(handle) => handle.push(message),
            None => false,
        }
    }

    /// Whether `id` currently has a live connection.
    #[must_use]
    pub fn contains(&self, id: &SessionId) -> bool {
        self.channels.contains_key(id)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no sessions are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Snapshot of the currently registered identifiers.
    #[must_use]
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.channels.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Drop every entry. Connections learn of this through their own
    /// shutdown signal, not through the map.
    pub fn close_all(&self) {
        self.channels.clear();
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SEND_QUEUE)
    }
}
