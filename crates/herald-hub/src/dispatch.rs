//! Delivery entry point used by producers.

use std::sync::Arc;
use std::time::Duration;

use herald_core::{PushEnvelope, UserId};
use metrics::counter;
use serde::Serialize;
use tracing::{debug, warn};

use crate::mailbox::{EnqueueResult, Payload};
use crate::metrics::{DELIVERIES_TOTAL, MAILBOX_FULL_TOTAL};
use crate::registry::Registry;

/// Why an attempted delivery failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// The receiver's mailbox was full; the connection has been torn down.
    MailboxFull,
    /// The connection closed between lookup and enqueue.
    ConnectionClosed,
}

impl FailureReason {
    /// Stable name used in responses and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MailboxFull => "mailbox_full",
            Self::ConnectionClosed => "connection_closed",
        }
    }
}

/// Result of [`Hub::deliver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Queued on the receiver's current connection.
    Delivered,
    /// The receiver has no current connection. Nothing was queued.
    Offline,
    /// A connection existed but did not accept the payload.
    Failed(FailureReason),
}

impl DeliveryOutcome {
    /// Stable name used in responses and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Offline => "offline",
            Self::Failed(_) => "failed",
        }
    }

    /// Whether the payload was queued.
    pub fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Per-connection task settings applied by the hub.
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// Mailbox capacity for every new connection.
    pub mailbox_capacity: usize,
    /// Writer ping period (`None` disables pings).
    pub ping_interval: Option<Duration>,
    /// Reader idle cutoff (`None` disables it).
    pub idle_timeout: Option<Duration>,
    /// Queue a `connection.established` frame ahead of any delivery.
    pub send_greeting: bool,
    /// How long a writer waits for the close frame before dropping the transport.
    pub close_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 256,
            ping_interval: Some(Duration::from_secs(30)),
            idle_timeout: Some(Duration::from_secs(90)),
            send_greeting: true,
            close_timeout: Duration::from_secs(5),
        }
    }
}

/// The push hub: registry plus delivery and session entry points.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Hub {
    pub(crate) registry: Arc<Registry>,
    pub(crate) config: HubConfig,
}

impl Hub {
    /// Create a hub with an empty registry.
    pub fn new(config: HubConfig) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            config,
        }
    }

    /// The registry backing this hub.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Active settings.
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Number of users currently online.
    pub fn connection_count(&self) -> usize {
        self.registry.connection_count()
    }

    /// Queue `payload` for `user_id`'s current connection without waiting.
    ///
    /// A full mailbox tears the connection down: it is unregistered and its
    /// transport closed, so the client reconnects and resynchronizes instead
    /// of silently missing messages.
    pub fn deliver(&self, user_id: &UserId, payload: Payload) -> DeliveryOutcome {
        let outcome = match self.registry.lookup(user_id) {
            None => DeliveryOutcome::Offline,
            Some(conn) => match conn.enqueue(payload) {
                EnqueueResult::Accepted => DeliveryOutcome::Delivered,
                EnqueueResult::RejectedFull => {
                    warn!(
                        user_id = %user_id,
                        connection_id = %conn.id(),
                        capacity = conn.capacity(),
                        "mailbox full, disconnecting slow client"
                    );
                    counter!(MAILBOX_FULL_TOTAL).increment(1);
                    let _ = self.registry.unregister(&conn);
                    conn.teardown();
                    DeliveryOutcome::Failed(FailureReason::MailboxFull)
                }
                EnqueueResult::RejectedClosed => {
                    // Already retired; an evicted writer may still be draining.
                    let _ = self.registry.unregister(&conn);
                    DeliveryOutcome::Failed(FailureReason::ConnectionClosed)
                }
            },
        };
        debug!(user_id = %user_id, outcome = outcome.as_str(), "delivery attempted");
        counter!(DELIVERIES_TOTAL, "outcome" => outcome.as_str()).increment(1);
        outcome
    }

    /// Serialize `value` and deliver it.
    pub fn deliver_json<T: Serialize + ?Sized>(
        &self,
        user_id: &UserId,
        value: &T,
    ) -> Result<DeliveryOutcome, serde_json::Error> {
        Ok(self.deliver(user_id, Payload::from_json(value)?))
    }

    /// Deliver an envelope to its receiver.
    pub fn deliver_envelope(
        &self,
        envelope: &PushEnvelope,
    ) -> Result<DeliveryOutcome, serde_json::Error> {
        let frame = envelope.to_frame()?;
        Ok(self.deliver(&envelope.receiver_id, Payload::from(frame)))
    }

    /// Close every connection's mailbox so writers drain and disconnect.
    ///
    /// Connections admitted afterwards are refused. Returns how many
    /// connections were drained.
    pub fn shutdown(&self) -> usize {
        self.registry.drain_all().len()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::connection::Connection;

    fn hub(capacity: usize) -> Hub {
        Hub::new(HubConfig {
            mailbox_capacity: capacity,
            ..HubConfig::default()
        })
    }

    fn online(hub: &Hub, user: &str) -> (Arc<Connection>, crate::mailbox::MailboxReceiver) {
        let (conn, rx) = Connection::new(UserId::from(user), hub.config().mailbox_capacity);
        let _ = hub.registry().register(Arc::clone(&conn)).unwrap();
        (conn, rx)
    }

    #[test]
    fn offline_user_has_no_side_effects() {
        let hub = hub(4);
        let (bob, _rx) = online(&hub, "bob");

        let outcome = hub.deliver(&UserId::from("alice"), "hi".into());
        assert_eq!(outcome, DeliveryOutcome::Offline);
        assert_eq!(hub.connection_count(), 1);
        assert_eq!(bob.pending(), 0);
    }

    #[tokio::test]
    async fn delivered_payload_reaches_mailbox() {
        let hub = hub(4);
        let (_conn, mut rx) = online(&hub, "alice");

        assert_eq!(
            hub.deliver(&UserId::from("alice"), "hello".into()),
            DeliveryOutcome::Delivered
        );
        assert_eq!(rx.recv().await.unwrap().as_str(), "hello");
    }

    #[test]
    fn saturated_mailbox_tears_connection_down() {
        let hub = hub(2);
        let (conn, _rx) = online(&hub, "alice");
        let alice = UserId::from("alice");

        assert!(hub.deliver(&alice, "1".into()).is_delivered());
        assert!(hub.deliver(&alice, "2".into()).is_delivered());
        assert_eq!(
            hub.deliver(&alice, "3".into()),
            DeliveryOutcome::Failed(FailureReason::MailboxFull)
        );
        assert!(hub.registry().lookup("alice").is_none());
        assert!(conn.is_retired());
        assert!(conn.is_transport_closed());

        assert_eq!(hub.deliver(&alice, "4".into()), DeliveryOutcome::Offline);
    }

    #[test]
    fn writer_gone_reports_connection_closed() {
        let hub = hub(4);
        let (conn, rx) = online(&hub, "alice");
        drop(rx);

        assert_eq!(
            hub.deliver(&UserId::from("alice"), "x".into()),
            DeliveryOutcome::Failed(FailureReason::ConnectionClosed)
        );
        assert!(hub.registry().lookup("alice").is_none());
        assert!(conn.is_retired());
    }

    #[test]
    fn full_mailbox_of_stale_handle_spares_successor() {
        let hub = hub(1);
        let (c1, _rx1) = online(&hub, "alice");
        let _ = c1.enqueue("fill".into());
        let (c2, _rx2) = online(&hub, "alice");

        // A stale handle's cleanup must not touch the current connection.
        assert!(!hub.registry().unregister(&c1));
        assert!(hub.deliver(&UserId::from("alice"), "new".into()).is_delivered());
        assert!(Connection::same(&hub.registry().lookup("alice").unwrap(), &c2));
    }

    #[tokio::test]
    async fn deliver_envelope_routes_to_receiver() {
        let hub = hub(4);
        let (_conn, mut rx) = online(&hub, "bob");
        let envelope = PushEnvelope::chat_message(UserId::from("bob"), json!({"text": "hey"}));

        let outcome = hub.deliver_envelope(&envelope).unwrap();
        assert_eq!(outcome, DeliveryOutcome::Delivered);

        let frame: serde_json::Value =
            serde_json::from_str(rx.recv().await.unwrap().as_str()).unwrap();
        assert_eq!(frame["type"], "chat.message");
        assert_eq!(frame["receiverId"], "bob");
        assert_eq!(frame["data"]["text"], "hey");
    }

    #[test]
    fn deliver_json_serializes() {
        let hub = hub(4);
        let (conn, _rx) = online(&hub, "alice");
        let outcome = hub
            .deliver_json(&UserId::from("alice"), &json!({"type": "notification"}))
            .unwrap();
        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(conn.pending(), 1);
    }

    #[test]
    fn shutdown_drains_registry() {
        let hub = hub(4);
        let (a, _rx_a) = online(&hub, "alice");
        let (_b, _rx_b) = online(&hub, "bob");

        assert_eq!(hub.shutdown(), 2);
        assert_eq!(hub.connection_count(), 0);
        assert!(a.is_retired());
        assert_eq!(
            hub.deliver(&UserId::from("alice"), "late".into()),
            DeliveryOutcome::Offline
        );
    }

    #[test]
    fn mailbox_full_is_logged() {
        let (logs, _guard) = herald_core::logging::capture_logs();
        let hub = hub(1);
        let (conn, _rx) = online(&hub, "alice");
        let alice = UserId::from("alice");
        let _ = hub.deliver(&alice, "1".into());
        let _ = hub.deliver(&alice, "2".into());

        assert!(logs.has_event(tracing::Level::WARN, "mailbox full"));
        let event = &logs.find("mailbox full")[0];
        assert_eq!(event.field("user_id"), Some("alice"));
        assert_eq!(event.field("connection_id"), Some(conn.id().as_str()));
    }

    #[test]
    fn outcome_names() {
        assert_eq!(DeliveryOutcome::Delivered.as_str(), "delivered");
        assert_eq!(DeliveryOutcome::Offline.as_str(), "offline");
        assert_eq!(
            DeliveryOutcome::Failed(FailureReason::MailboxFull).as_str(),
            "failed"
        );
        assert_eq!(FailureReason::MailboxFull.as_str(), "mailbox_full");
        assert_eq!(FailureReason::ConnectionClosed.as_str(), "connection_closed");
    }
}
