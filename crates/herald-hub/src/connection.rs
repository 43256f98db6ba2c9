//! State for one admitted client connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use herald_core::{ConnectionId, UserId};
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::mailbox::{EnqueueResult, Mailbox, MailboxReceiver, Payload};

/// One live client connection.
///
/// Shared as `Arc<Connection>` between the registry, the writer task, the
/// reader task, and any in-flight deliveries. Two handles refer to the same
/// connection only if [`Connection::same`] says so; the user id alone never
/// identifies a connection.
pub struct Connection {
    id: ConnectionId,
    user_id: UserId,
    mailbox: Mailbox,
    /// Cancelled when the transport must close now, without draining.
    transport: CancellationToken,
    connected_at: Instant,
    last_activity: Mutex<Instant>,
    frames_written: AtomicU64,
}

impl Connection {
    /// Create a connection for `user_id` with a mailbox of `mailbox_capacity`.
    pub fn new(user_id: UserId, mailbox_capacity: usize) -> (Arc<Self>, MailboxReceiver) {
        let (mailbox, rx) = Mailbox::bounded(mailbox_capacity);
        let now = Instant::now();
        let conn = Arc::new(Self {
            id: ConnectionId::new(),
            user_id,
            mailbox,
            transport: CancellationToken::new(),
            connected_at: now,
            last_activity: Mutex::new(now),
            frames_written: AtomicU64::new(0),
        });
        (conn, rx)
    }

    /// Unique id of this connection instance.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// The user this connection belongs to.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Whether `a` and `b` are the same connection instance.
    pub fn same(a: &Arc<Self>, b: &Arc<Self>) -> bool {
        Arc::ptr_eq(a, b)
    }

    /// Queue a payload for the writer without waiting.
    pub fn enqueue(&self, payload: Payload) -> EnqueueResult {
        self.mailbox.try_enqueue(payload)
    }

    /// Close the mailbox so the writer drains and exits.
    pub fn close_mailbox(&self) -> bool {
        self.mailbox.close()
    }

    /// Whether the mailbox has been closed.
    pub fn is_retired(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Ask both tasks to stop and close the transport immediately.
    pub fn close_transport(&self) {
        self.transport.cancel();
    }

    /// Close the mailbox and the transport.
    pub fn teardown(&self) {
        let _ = self.close_mailbox();
        self.close_transport();
    }

    /// Whether the transport has been asked to close.
    pub fn is_transport_closed(&self) -> bool {
        self.transport.is_cancelled()
    }

    /// Resolves once [`close_transport`](Self::close_transport) is called.
    pub fn transport_closed(&self) -> WaitForCancellationFuture<'_> {
        self.transport.cancelled()
    }

    /// Record inbound activity from the peer.
    pub fn mark_activity(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// When the peer was last heard from.
    pub fn last_activity(&self) -> Instant {
        *self.last_activity.lock()
    }

    /// Time since the peer was last heard from.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Payloads waiting in the mailbox.
    pub fn pending(&self) -> usize {
        self.mailbox.pending()
    }

    /// Mailbox capacity.
    pub fn capacity(&self) -> usize {
        self.mailbox.capacity()
    }

    pub(crate) fn record_write(&self) {
        let _ = self.frames_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Frames the writer has handed to the transport.
    pub fn frames_written(&self) -> u64 {
        self.frames_written.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("retired", &self.is_retired())
            .field("transport_closed", &self.is_transport_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_connection() {
        let (conn, _rx) = Connection::new(UserId::from("u1"), 8);
        assert_eq!(conn.user_id().as_str(), "u1");
        assert!(conn.id().as_str().starts_with("conn_"));
        assert_eq!(conn.capacity(), 8);
        assert!(!conn.is_retired());
        assert!(!conn.is_transport_closed());
    }

    #[test]
    fn identity_is_per_instance() {
        let (a, _rx_a) = Connection::new(UserId::from("u1"), 8);
        let (b, _rx_b) = Connection::new(UserId::from("u1"), 8);
        assert!(Connection::same(&a, &Arc::clone(&a)));
        assert!(!Connection::same(&a, &b));
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn enqueue_reaches_receiver() {
        let (conn, mut rx) = Connection::new(UserId::from("u1"), 8);
        assert_eq!(conn.enqueue("frame".into()), EnqueueResult::Accepted);
        assert_eq!(conn.pending(), 1);
        assert_eq!(rx.recv().await.unwrap().as_str(), "frame");
    }

    #[test]
    fn teardown_is_idempotent() {
        let (conn, _rx) = Connection::new(UserId::from("u1"), 8);
        conn.teardown();
        conn.teardown();
        assert!(conn.is_retired());
        assert!(conn.is_transport_closed());
        assert_eq!(conn.enqueue("late".into()), EnqueueResult::RejectedClosed);
    }

    #[test]
    fn closing_mailbox_leaves_transport_open() {
        let (conn, _rx) = Connection::new(UserId::from("u1"), 8);
        assert!(conn.close_mailbox());
        assert!(!conn.close_mailbox());
        assert!(!conn.is_transport_closed());
    }

    #[tokio::test]
    async fn transport_closed_resolves_after_close() {
        let (conn, _rx) = Connection::new(UserId::from("u1"), 8);
        conn.close_transport();
        conn.transport_closed().await;
    }

    #[tokio::test(start_paused = true)]
    async fn activity_resets_idle_clock() {
        let (conn, _rx) = Connection::new(UserId::from("u1"), 8);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(conn.idle_for() >= Duration::from_secs(5));
        conn.mark_activity();
        assert!(conn.idle_for() < Duration::from_secs(1));
        assert!(conn.age() >= Duration::from_secs(5));
    }

    #[test]
    fn debug_shows_identity() {
        let (conn, _rx) = Connection::new(UserId::from("u1"), 8);
        let text = format!("{conn:?}");
        assert!(text.contains("u1"));
        assert!(text.contains("conn_"));
    }
}
