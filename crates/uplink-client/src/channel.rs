//! WebSocket notification channel.

use std::pin::Pin;

use futures::{SinkExt, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};
use uplink_core::ids::SessionId;
use uplink_core::protocol;
use uplink_core::ChannelEvent;

/// Single-consumer stream of channel events.
pub type ChannelEventStream = Pin<Box<dyn Stream<Item = ChannelEvent> + Send>>;

/// One server-push connection for a session.
///
/// Opening the channel connects to the server's notification endpoint,
/// announces the session identifier as the first and only outbound frame,
/// and then surfaces inbound text frames as events. Keepalive probes are
/// consumed silently. The resulting stream always ends with
/// [`ChannelEvent::Closed`] and never reconnects on its own; reconnection
/// belongs to the supervisor under a caller-owned policy.
#[derive(Debug)]
pub struct NotificationChannel {
    url: String,
    id: SessionId,
}

impl NotificationChannel {
    /// Create a channel for `id` targeting a `ws://` or `wss://` URL.
    #[must_use]
    pub fn new(url: impl Into<String>, id: SessionId) -> Self {
        Self { url: url.into(), id }
    }

    /// The session this channel announces.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.id
    }

    /// Connect and turn the connection into its event stream.
    ///
    /// A failed connect or announcement yields `Errored` followed by
    /// `Closed` rather than returning an error, so every open attempt
    /// produces exactly one event sequence.
    #[must_use]
    pub fn open(self) -> ChannelEventStream {
        let Self { url, id } = self;
        Box::pin(async_stream::stream! {
            let mut ws = match connect_async(url.as_str()).await {
                Ok((ws, _response)) => ws,
                Err(e) => {
                    warn!(error = %e, url = %url, "notification channel connect failed");
                    yield ChannelEvent::Errored(format!("connect failed: {e}"));
                    yield ChannelEvent::Closed;
                    return;
                }
            };

            if let Err(e) = ws.send(Message::Text(protocol::announcement(&id).into())).await {
                warn!(error = %e, "announcement send failed");
                yield ChannelEvent::Errored(format!("announce failed: {e}"));
                yield ChannelEvent::Closed;
                return;
            }
            debug!(session_id = %id, "notification channel open");
            yield ChannelEvent::Opened;

            while let Some(frame) = ws.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if protocol::is_keepalive(&text) {
                            trace!("keepalive received");
                            continue;
                        }
                        yield ChannelEvent::Message(text.to_string());
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "notification channel transport error");
                        yield ChannelEvent::Errored(format!("transport error: {e}"));
                        break;
                    }
                }
            }
            yield ChannelEvent::Closed;
        })
    }
}
