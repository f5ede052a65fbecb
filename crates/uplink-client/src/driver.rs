//! Folds a channel's event stream into status state.

use futures::{Stream, StreamExt};
use uplink_core::{ChannelEvent, ChannelState};

use crate::status::StatusHandle;

/// What a single channel run amounted to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriveOutcome {
    /// The channel reached the open state at least once.
    pub opened: bool,
    /// The channel reported an error before closing.
    pub errored: bool,
}

/// Consumes one channel's events and writes the resulting status through a
/// [`StatusHandle`].
///
/// One driver per connection attempt. Creating it resets the handle to
/// `Connecting`; [`run`](Self::run) then applies events until the stream
/// yields `Closed` and reports the [`DriveOutcome`].
#[derive(Debug)]
pub struct ChannelDriver {
    status: StatusHandle,
    outcome: DriveOutcome,
}

impl ChannelDriver {
    /// Create a driver writing through `status`.
    #[must_use]
    pub fn new(status: StatusHandle) -> Self {
        status.set_state(ChannelState::Connecting);
        Self {
            status,
            outcome: DriveOutcome::default(),
        }
    }

    /// Apply one event to the status state.
    pub fn apply(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Opened => {
                self.outcome.opened = true;
                self.status.set_state(ChannelState::Open);
            }
            ChannelEvent::Message(text) => {
                self.status.record_message(text);
            }
            ChannelEvent::Errored(reason) => {
                self.outcome.errored = true;
                self.status
                    .record_status(format!("notification channel error: {reason}"));
            }
            ChannelEvent::Closed => {
                self.status.set_state(ChannelState::Closed);
                // Keep the error reason visible when the close follows a
                // failure.
                if !self.outcome.errored {
                    self.status.record_status("notification channel closed");
                }
            }
        }
    }

    /// Drain `events` until `Closed`, then report the outcome.
    ///
    /// The status state is terminal once this returns, even if the stream
    /// ended without a final `Closed`.
    pub async fn run(mut self, mut events: impl Stream<Item = ChannelEvent> + Unpin) -> DriveOutcome {
        while let Some(event) = events.next().await {
            let finished = matches!(event, ChannelEvent::Closed);
            self.apply(event);
            if finished {
                break;
            }
        }
        if !self.status.state().is_terminal() {
            self.status.set_state(ChannelState::Closed);
        }
        self.outcome
    }
}
