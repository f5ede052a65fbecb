//! Coordinated shutdown.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Fans a single shutdown signal out to every task that took a token.
///
/// Channel sessions and the accept loop each hold a clone of the token;
/// cancelling it tells them to wind down, after which
/// [`graceful_shutdown`](Self::graceful_shutdown) bounds how long they get.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a coordinator that has not been triggered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that observes this coordinator's shutdown.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Trigger shutdown. Idempotent.
    pub fn shutdown(&self) {
        info!("shutdown requested");
        self.token.cancel();
    }

    /// Whether shutdown has been triggered.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Trigger shutdown and wait up to `grace` for `handles` to finish.
    ///
    /// Tasks still running when the grace period elapses are aborted.
    pub async fn graceful_shutdown(&self, handles: Vec<JoinHandle<()>>, grace: Duration) {
        self.token.cancel();
        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();

        match tokio::time::timeout(grace, futures::future::join_all(handles)).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        if !e.is_cancelled() {
                            warn!(error = %e, "task ended abnormally during shutdown");
                        }
                    }
                }
                info!("all tasks drained");
            }
            Err(_) => {
                warn!(grace_secs = grace.as_secs(), "grace period elapsed, aborting remaining tasks");
                for abort in aborts {
                    abort.abort();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn tokens_observe_the_trigger() {
        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        assert!(!coordinator.is_shutting_down());
        assert!(!token.is_cancelled());

        coordinator.shutdown();
        assert!(coordinator.is_shutting_down());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn trigger_is_idempotent() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.shutdown();
        coordinator.shutdown();
        assert!(coordinator.is_shutting_down());
    }

    #[tokio::test]
    async fn waits_for_cooperative_tasks() {
        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        let handle = tokio::spawn(async move {
            token.cancelled().await;
        });

        coordinator
            .graceful_shutdown(vec![handle], Duration::from_secs(5))
            .await;
        assert!(coordinator.is_shutting_down());
    }

    #[tokio::test]
    async fn gives_up_on_stuck_tasks_after_grace() {
        let coordinator = ShutdownCoordinator::new();
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let started = Instant::now();
        coordinator
            .graceful_shutdown(vec![handle], Duration::from_millis(50))
            .await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
