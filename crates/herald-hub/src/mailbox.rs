//! Bounded per-connection outbound queue.
//!
//! Producers only ever call [`Mailbox::try_enqueue`], which never waits. The
//! connection's writer task owns the [`MailboxReceiver`]. Closing the mailbox
//! drops the sending half, so the writer drains what is already queued and
//! then observes the end of the stream.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// One already-serialized frame. Cheap to clone.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Payload(Arc<str>);

impl Payload {
    /// Wrap serialized text.
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    /// Serialize a value to JSON text.
    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_string(value).map(Self::from)
    }

    /// Frame contents.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Frame length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the frame is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<Arc<str>> for Payload {
    fn from(s: Arc<str>) -> Self {
        Self(s)
    }
}

/// Result of a non-blocking enqueue attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueResult {
    /// The payload is queued for the writer.
    Accepted,
    /// The queue is at capacity.
    RejectedFull,
    /// The mailbox was closed, or its writer is gone.
    RejectedClosed,
}

/// Sending side of a connection's outbound queue.
pub struct Mailbox {
    tx: Mutex<Option<mpsc::Sender<Payload>>>,
    capacity: usize,
}

/// Receiving side, owned by the writer task.
pub struct MailboxReceiver {
    rx: mpsc::Receiver<Payload>,
}

impl Mailbox {
    /// Create a mailbox holding at most `capacity` payloads (minimum 1).
    pub fn bounded(capacity: usize) -> (Self, MailboxReceiver) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx: Mutex::new(Some(tx)),
                capacity,
            },
            MailboxReceiver { rx },
        )
    }

    /// Try to queue `payload` without waiting.
    pub fn try_enqueue(&self, payload: Payload) -> EnqueueResult {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            return EnqueueResult::RejectedClosed;
        };
        match tx.try_send(payload) {
            Ok(()) => EnqueueResult::Accepted,
            Err(TrySendError::Full(_)) => EnqueueResult::RejectedFull,
            Err(TrySendError::Closed(_)) => EnqueueResult::RejectedClosed,
        }
    }

    /// Close the mailbox. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        self.tx.lock().take().is_some()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }

    /// Maximum number of queued payloads.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Payloads currently queued (0 once closed).
    pub fn pending(&self) -> usize {
        self.tx
            .lock()
            .as_ref()
            .map_or(0, |tx| tx.max_capacity() - tx.capacity())
    }
}

impl MailboxReceiver {
    /// Next queued payload; `None` once the mailbox is closed and drained.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }
}
