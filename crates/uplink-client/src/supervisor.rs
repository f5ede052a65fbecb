//! Reconnection supervisor.
//!
//! Channels are single-shot; this loop owns the policy decision of when to
//! open the next one. Each pass drives one channel to completion through
//! the session's status handle, then either reconnects after a backoff
//! delay, stops because the caller cancelled, or stops because the policy's
//! failure budget ran out.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uplink_core::{ChannelState, ReconnectPolicy};

use crate::context::SessionContext;

/// Why the supervisor stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupervisorStop {
    /// The caller cancelled the session.
    Cancelled,
    /// Consecutive failed attempts exhausted the policy.
    PolicyExhausted,
}

/// Final accounting of a supervisor run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SupervisorReport {
    /// Why the loop ended.
    pub stop: SupervisorStop,
    /// Connection attempts made, successful or not.
    pub attempts: u32,
}

/// Keep the session's notification channel alive until cancelled or the
/// policy gives up.
///
/// A run that reached the open state resets the failure streak; only
/// consecutive failures count against `policy.max_attempts`. Whatever the
/// reason for stopping, the status handle is left in the `Closed` state.
pub async fn run_channel(
    ctx: &SessionContext,
    policy: &ReconnectPolicy,
    cancel: CancellationToken,
) -> SupervisorReport {
    let mut attempts = 0u32;
    let mut failures = 0u32;

    let stop = loop {
        if cancel.is_cancelled() {
            break SupervisorStop::Cancelled;
        }
        if policy.is_exhausted(failures) {
            info!(session_id = %ctx.id(), failures, "reconnect policy exhausted");
            break SupervisorStop::PolicyExhausted;
        }

        attempts += 1;
        debug!(session_id = %ctx.id(), attempt = attempts, "opening notification channel");
        let outcome = tokio::select! {
            outcome = ctx.drive_channel() => outcome,
            () = cancel.cancelled() => {
                // The dropped in-flight connection never emits Closed, so
                // leave the status terminal here.
                ctx.status().set_state(ChannelState::Closed);
                ctx.status().record_status("notification channel closed");
                break SupervisorStop::Cancelled;
            }
        };

        if outcome.opened {
            failures = 0;
        } else {
            failures += 1;
        }

        if policy.is_exhausted(failures) {
            continue;
        }

        let delay = policy.delay(failures.saturating_sub(1));
        debug!(session_id = %ctx.id(), failures, ?delay, "reconnect backoff");
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = cancel.cancelled() => break SupervisorStop::Cancelled,
        }
    };

    SupervisorReport { stop, attempts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::net::TcpListener;

    use crate::context::ClientConfig;

    fn fast_policy(max_attempts: u32) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts,
            base_delay_ms: 5,
            max_delay_ms: 20,
            jitter_factor: 0.0,
        }
    }

    #[tokio::test]
    async fn cancelled_token_makes_no_attempts() {
        let ctx = SessionContext::new(ClientConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = run_channel(&ctx, &fast_policy(5), cancel).await;
        assert_eq!(report.stop, SupervisorStop::Cancelled);
        assert_eq!(report.attempts, 0);
    }

    #[tokio::test]
    async fn zero_budget_policy_never_connects() {
        let ctx = SessionContext::new(ClientConfig::default());
        let report = run_channel(&ctx, &fast_policy(0), CancellationToken::new()).await;
        assert_eq!(report.stop, SupervisorStop::PolicyExhausted);
        assert_eq!(report.attempts, 0);
    }

    #[tokio::test]
    async fn unreachable_server_exhausts_the_policy() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let ctx = SessionContext::new(ClientConfig::new(format!("http://{addr}")));
        let report = run_channel(&ctx, &fast_policy(3), CancellationToken::new()).await;

        assert_eq!(report.stop, SupervisorStop::PolicyExhausted);
        assert_eq!(report.attempts, 3);
        assert_eq!(ctx.status().state(), ChannelState::Closed);
        let latest = ctx.status().latest().unwrap();
        assert!(
            latest.starts_with("notification channel error:"),
            "unexpected status line: {latest}"
        );
    }

    #[tokio::test]
    async fn cancel_while_open_closes_and_stops() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let _ = ws.next().await;
            let _ = ws.next().await;
        });

        let ctx = Arc::new(SessionContext::new(ClientConfig::new(format!("http://{addr}"))));
        let cancel = CancellationToken::new();

        let sup = {
            let ctx = Arc::clone(&ctx);
            let cancel = cancel.clone();
            tokio::spawn(async move { run_channel(&ctx, &ReconnectPolicy::default(), cancel).await })
        };

        for _ in 0..200 {
            if ctx.status().state() == ChannelState::Open {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(ctx.status().state(), ChannelState::Open);

        cancel.cancel();
        let report = sup.await.unwrap();
        server.await.unwrap();

        assert_eq!(report.stop, SupervisorStop::Cancelled);
        assert_eq!(report.attempts, 1);
        assert_eq!(ctx.status().state(), ChannelState::Closed);
        assert_eq!(ctx.status().latest(), Some("notification channel closed".into()));
    }

    #[tokio::test]
    async fn successful_run_resets_the_failure_streak() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Serve two connections cleanly, then vanish so the policy can
        // run out.
        let server = tokio::spawn(async move {
            for _ in 0..2 {
                let (stream, _) = listener.accept().await.unwrap();
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                let _ = ws.next().await;
                ws.close(None).await.unwrap();
                while let Some(Ok(_)) = ws.next().await {}
            }
        });

        let ctx = SessionContext::new(ClientConfig::new(format!("http://{addr}")));
        let report = run_channel(&ctx, &fast_policy(2), CancellationToken::new()).await;
        server.await.unwrap();

        assert_eq!(report.stop, SupervisorStop::PolicyExhausted);
        // Two clean runs, then two refused connects.
        assert_eq!(report.attempts, 4);
    }
}

