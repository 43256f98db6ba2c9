//! Reader task: watches the read half for liveness and termination.
//!
//! Inbound content is not interpreted. Whatever ends the read loop, the task
//! unregisters its own connection (never a successor) and closes the
//! transport.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::connection::Connection;
use crate::registry::Registry;
use crate::transport::{FrameSource, Inbound};

/// Why a reader task stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReaderExit {
    /// The peer sent a close frame.
    PeerClosed,
    /// The inbound stream ended.
    StreamEnded,
    /// Reading failed.
    ReadFailed,
    /// Nothing was received within the idle timeout.
    IdleTimeout,
    /// The transport was closed locally.
    TransportClosed,
}

/// Read from `source` until the connection ends, then clean up.
pub async fn run_reader<R: FrameSource>(
    conn: Arc<Connection>,
    mut source: R,
    registry: Arc<Registry>,
    idle_timeout: Option<Duration>,
) -> ReaderExit {
    let exit = loop {
        let next = tokio::select! {
            biased;
            () = conn.transport_closed() => break ReaderExit::TransportClosed,
            () = idle_deadline(&conn, idle_timeout) => break ReaderExit::IdleTimeout,
            next = source.next_inbound() => next,
        };
        match next {
            Some(Ok(Inbound::Close)) => break ReaderExit::PeerClosed,
            Some(Ok(Inbound::Data | Inbound::Heartbeat)) => conn.mark_activity(),
            Some(Err(err)) => {
                debug!(connection_id = %conn.id(), error = %err, "read failed");
                break ReaderExit::ReadFailed;
            }
            None => break ReaderExit::StreamEnded,
        }
    };

    let removed = registry.unregister(&conn);
    conn.close_transport();
    debug!(connection_id = %conn.id(), ?exit, removed, "reader stopped");
    exit
}

async fn idle_deadline(conn: &Connection, idle_timeout: Option<Duration>) {
    match idle_timeout {
        Some(timeout) => tokio::time::sleep_until(conn.last_activity() + timeout).await,
        None => std::future::pending().await,
    }
}
