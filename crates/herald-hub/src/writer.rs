//! Writer task: the only code that writes to a connection's transport.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::debug;

use crate::connection::Connection;
use crate::mailbox::MailboxReceiver;
use crate::transport::FrameSink;

/// Why a writer task stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterExit {
    /// The mailbox was closed and everything queued was written.
    Drained,
    /// The transport was closed before the mailbox drained.
    TransportClosed,
    /// A frame or ping write failed.
    WriteFailed,
}

/// Drain `mailbox` into `sink` in FIFO order until the connection ends.
///
/// When `ping_interval` is set, a ping goes out once the writer has been idle
/// for that long; queued frames take priority over pings. On exit the
/// transport is marked closed (waking the reader) and the sink gets a
/// best-effort close bounded by `close_timeout`. The sink is dropped before
/// returning either way.
pub async fn run_writer<S: FrameSink>(
    conn: Arc<Connection>,
    mut mailbox: MailboxReceiver,
    mut sink: S,
    ping_interval: Option<Duration>,
    close_timeout: Duration,
) -> WriterExit {
    let mut ping = ping_interval.map(|period| {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    let exit = loop {
        tokio::select! {
            biased;
            () = conn.transport_closed() => break WriterExit::TransportClosed,
            next = mailbox.recv() => {
                let Some(payload) = next else {
                    break WriterExit::Drained;
                };
                let written = tokio::select! {
                    biased;
                    () = conn.transport_closed() => None,
                    result = sink.send_frame(&payload) => Some(result),
                };
                match written {
                    None => break WriterExit::TransportClosed,
                    Some(Err(err)) => {
                        debug!(connection_id = %conn.id(), error = %err, "frame write failed");
                        break WriterExit::WriteFailed;
                    }
                    Some(Ok(())) => conn.record_write(),
                }
            }
            () = next_tick(&mut ping) => {
                if let Err(err) = sink.send_ping().await {
                    debug!(connection_id = %conn.id(), error = %err, "ping write failed");
                    break WriterExit::WriteFailed;
                }
            }
        }
    };

    conn.close_transport();
    match time::timeout(close_timeout, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => debug!(connection_id = %conn.id(), error = %err, "close frame not sent"),
        Err(_) => debug!(connection_id = %conn.id(), "close frame timed out"),
    }
    drop(sink);
    debug!(connection_id = %conn.id(), ?exit, "writer stopped");
    exit
}

async fn next_tick(ping: &mut Option<Interval>) {
    match ping {
        Some(interval) => {
            let _ = interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
