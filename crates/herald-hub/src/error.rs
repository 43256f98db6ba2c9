//! Hub error types.

use herald_core::ConnectionId;
use thiserror::Error;

/// Errors returned by registry operations.
///
/// Delivery never fails with an error: [`crate::Hub::deliver`] reports every
/// outcome through [`crate::DeliveryOutcome`].
#[derive(Debug, Error)]
pub enum HubError {
    /// The connection's mailbox was already closed, so it can never be current again.
    #[error("connection {0} is retired and cannot be registered")]
    ConnectionRetired(ConnectionId),
    /// The hub has been drained for shutdown and admits no new connections.
    #[error("hub is shutting down")]
    ShuttingDown,
}
