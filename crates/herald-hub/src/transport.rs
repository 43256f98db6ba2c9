//! Transport halves the per-connection tasks drive.
//!
//! The accept layer splits a socket into a [`FrameSink`] (owned by the writer
//! task) and a [`FrameSource`] (owned by the reader task). Nothing else ever
//! touches either half.

use async_trait::async_trait;
use herald_core::TransportError;

use crate::mailbox::Payload;

/// Write half of a client transport.
#[async_trait]
pub trait FrameSink: Send + 'static {
    /// Write one frame.
    async fn send_frame(&mut self, payload: &Payload) -> Result<(), TransportError>;

    /// Write a liveness probe.
    async fn send_ping(&mut self) -> Result<(), TransportError>;

    /// Send a close frame and shut the write half. Called at most once.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Something received from the peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// Application data. The hub does not interpret it.
    Data,
    /// Ping or pong.
    Heartbeat,
    /// The peer started an orderly close.
    Close,
}

/// Read half of a client transport.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Next inbound event, or `None` once the stream has ended.
    async fn next_inbound(&mut self) -> Option<Result<Inbound, TransportError>>;
}
