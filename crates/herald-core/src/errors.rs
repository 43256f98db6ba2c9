//! Transport error type shared by the hub and the accept layer.

use thiserror::Error;

/// Failure reported by a transport half.
///
/// These never escape a session: they end the connection's writer or reader
/// task and are logged, nothing more.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer or the local side already closed the transport.
    #[error("transport closed")]
    Closed,
    /// Underlying I/O or protocol failure.
    #[error("transport I/O failure: {0}")]
    Io(String),
}

impl TransportError {
    /// Wrap any displayable error as an I/O failure.
    pub fn io(err: impl std::fmt::Display) -> Self {
        Self::Io(err.to_string())
    }

    /// Whether this error only signals an orderly close.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
