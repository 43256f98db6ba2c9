//! Graceful shutdown coordination via `CancellationToken`.
//!
//! The token stops the HTTP listener. Upgraded WebSocket sessions outlive the
//! HTTP request that created them, so they are tracked separately and awaited
//! after the hub has closed their mailboxes.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tokio_util::task::task_tracker::TrackedFuture;
use tracing::{info, warn};

/// Coordinates graceful shutdown of the listener and live sessions.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    sessions: TaskTracker,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            sessions: TaskTracker::new(),
        }
    }

    /// Get a clone of the cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Initiate shutdown.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether a shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wrap a session future so shutdown can wait for it.
    pub fn track<F: Future>(&self, session: F) -> TrackedFuture<F> {
        self.sessions.track_future(session)
    }

    /// Sessions still running.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Wait up to `timeout` for tracked sessions to finish.
    ///
    /// Returns `false` if some sessions were still running at the deadline.
    pub async fn wait_for_sessions(&self, timeout: Duration) -> bool {
        let _ = self.sessions.close();
        info!(
            session_count = self.sessions.len(),
            timeout_secs = timeout.as_secs(),
            "waiting for sessions to close"
        );
        if tokio::time::timeout(timeout, self.sessions.wait()).await.is_err() {
            warn!(
                remaining = self.sessions.len(),
                "shutdown timed out after {timeout:?}, some sessions may still be open"
            );
            return false;
        }
        true
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_not_shutting_down() {
        let coord = ShutdownCoordinator::new();
        assert!(!coord.is_shutting_down());
        assert_eq!(coord.active_sessions(), 0);
    }

    #[test]
    fn token_propagation() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        coord.shutdown();
        coord.shutdown();
        assert!(token.is_cancelled());
        assert!(coord.is_shutting_down());
    }

    #[tokio::test]
    async fn tracked_sessions_are_counted() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        let handle = tokio::spawn(coord.track(async move { token.cancelled().await }));
        assert_eq!(coord.active_sessions(), 1);

        coord.shutdown();
        handle.await.unwrap();
        assert_eq!(coord.active_sessions(), 0);
    }

    #[tokio::test]
    async fn wait_returns_when_sessions_finish() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        let _handle = tokio::spawn(coord.track(async move { token.cancelled().await }));

        coord.shutdown();
        assert!(coord.wait_for_sessions(Duration::from_secs(5)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out() {
        let coord = ShutdownCoordinator::new();
        let _handle = tokio::spawn(coord.track(tokio::time::sleep(Duration::from_secs(300))));

        assert!(!coord.wait_for_sessions(Duration::from_millis(100)).await);
        assert_eq!(coord.active_sessions(), 1);
    }

    #[tokio::test]
    async fn wait_with_no_sessions_is_immediate() {
        let coord = ShutdownCoordinator::new();
        assert!(coord.wait_for_sessions(Duration::from_millis(10)).await);
    }
}
