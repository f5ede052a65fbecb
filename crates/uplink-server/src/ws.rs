//! Notification channel endpoint.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, instrument, warn};
use uplink_core::protocol;

use crate::server::AppState;

/// `GET /websockreg`, upgrades to the notification channel.
pub async fn channel_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_channel_session(socket, state))
}

/// Drive one channel connection from announcement to teardown.
///
/// The first frame must be an announcement naming a valid session
/// identifier; anything else, or silence past the announce window, ends
/// the connection before it is registered. Once registered, a writer task
/// forwards queued frames and keepalive probes while a reader task watches
/// for the peer going away. Whichever stops first tears the session down,
/// and the registry entry is removed only if it still belongs to this
/// connection.
#[instrument(skip_all)]
async fn run_channel_session(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let announce_window = state.config.announce_timeout();
    let id = match tokio::time::timeout(announce_window, ws_rx.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => match protocol::parse_announcement(text.as_str()) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "rejecting channel with invalid announcement");
                let _ = ws_tx.send(Message::Close(None)).await;
                return;
            }
        },
        Ok(_) => {
            debug!("channel ended before announcing");
            return;
        }
        Err(_) => {
            warn!(
                timeout_secs = announce_window.as_secs(),
                "no announcement within the window"
            );
            let _ = ws_tx.send(Message::Close(None)).await;
            return;
        }
    };

    let (handle, mut rx, displaced) = state.registry.register(id.clone());
    let conn_id = handle.conn_id();
    // Only the registry map may keep the send side alive; holding the
    // handle here would stop a displaced queue from draining to None.
    drop(handle);
    if let Some(previous) = displaced {
        info!(
            session_id = %id,
            displaced_conn = previous.conn_id(),
            conn_id,
            "previous connection displaced"
        );
    }
    info!(session_id = %id, conn_id, "notification channel established");

    let cancel = state.shutdown.token();
    let keepalive = state.config.keepalive_interval();

    let mut writer = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(keepalive);
        // An interval fires immediately; the first probe should wait a
        // full period.
        let _ = ticker.tick().await;
        loop {
            tokio::select! {
                frame = rx.recv() => match frame {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    // Queue dropped, this connection was displaced.
                    None => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if ws_tx.send(Message::Text(protocol::KEEPALIVE_SENTINEL.into())).await.is_err() {
                        break;
                    }
                }
                () = cancel.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    let mut reader = tokio::spawn(async move {
        while let Some(frame) = ws_rx.next().await {
            match frame {
                Ok(Message::Close(_)) | Err(_) => break,
                // Inbound traffic after the announcement carries nothing.
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer => {}
        _ = &mut reader => {}
    }
    writer.abort();
    reader.abort();

    if state.registry.deregister(&id, conn_id) {
        info!(session_id = %id, conn_id, "notification channel closed");
    }
}
