//! Connection admission: from an accepted transport to running tasks.

use std::sync::Arc;
use std::time::Duration;

use herald_core::UserId;
use metrics::{counter, gauge, histogram};
use tokio::task::JoinHandle;
use tracing::{Instrument, info, info_span, instrument, warn};

use crate::connection::Connection;
use crate::dispatch::Hub;
use crate::error::HubError;
use crate::mailbox::Payload;
use crate::metrics::{CONNECTIONS_ACTIVE, CONNECTIONS_TOTAL, CONNECTION_DURATION_SECONDS};
use crate::reader::{ReaderExit, run_reader};
use crate::transport::{FrameSink, FrameSource};
use crate::writer::{WriterExit, run_writer};

/// How a finished session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    /// Writer task exit reason (`None` if the task panicked).
    pub writer: Option<WriterExit>,
    /// Reader task exit reason (`None` if the task panicked).
    pub reader: Option<ReaderExit>,
    /// How long the connection was open.
    pub duration: Duration,
}

/// Handle to a running session.
pub struct SessionHandle {
    connection: Arc<Connection>,
    supervisor: JoinHandle<SessionSummary>,
}

impl SessionHandle {
    /// The admitted connection.
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Wait for both tasks to finish.
    pub async fn join(self) -> SessionSummary {
        let age = self.connection.age();
        self.supervisor.await.unwrap_or(SessionSummary {
            writer: None,
            reader: None,
            duration: age,
        })
    }
}

impl Hub {
    /// Admit a freshly accepted, authenticated transport for `user_id`.
    ///
    /// Registers a new connection (superseding any previous one for the same
    /// user) and spawns its writer and reader tasks. From this point on,
    /// deliveries to `user_id` reach this connection.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub fn on_connection_established<S, R>(
        &self,
        user_id: UserId,
        sink: S,
        source: R,
    ) -> Result<SessionHandle, HubError>
    where
        S: FrameSink,
        R: FrameSource,
    {
        let (conn, mailbox) = Connection::new(user_id, self.config.mailbox_capacity);
        if self.config.send_greeting {
            queue_greeting(&conn);
        }
        let evicted = self.registry.register(Arc::clone(&conn))?;

        info!(
            user_id = %conn.user_id(),
            connection_id = %conn.id(),
            superseded = evicted.is_some(),
            "client connected"
        );
        counter!(CONNECTIONS_TOTAL).increment(1);
        gauge!(CONNECTIONS_ACTIVE).increment(1.0);

        let span = info_span!("session", user_id = %conn.user_id(), connection_id = %conn.id());
        let writer = tokio::spawn(
            run_writer(
                Arc::clone(&conn),
                mailbox,
                sink,
                self.config.ping_interval,
                self.config.close_timeout,
            )
            .instrument(span.clone()),
        );
        let reader = tokio::spawn(
            run_reader(
                Arc::clone(&conn),
                source,
                Arc::clone(&self.registry),
                self.config.idle_timeout,
            )
            .instrument(span.clone()),
        );

        let supervised = Arc::clone(&conn);
        let supervisor = tokio::spawn(
            async move {
                let writer = writer.await.ok();
                let reader = reader.await.ok();
                if writer.is_none() || reader.is_none() {
                    warn!("session task panicked");
                    supervised.teardown();
                }
                let duration = supervised.age();
                info!(
                    ?writer,
                    ?reader,
                    duration_secs = duration.as_secs_f64(),
                    "client disconnected"
                );
                gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
                histogram!(CONNECTION_DURATION_SECONDS).record(duration.as_secs_f64());
                SessionSummary {
                    writer,
                    reader,
                    duration,
                }
            }
            .instrument(span),
        );

        Ok(SessionHandle {
            connection: conn,
            supervisor,
        })
    }
}

fn queue_greeting(conn: &Connection) {
    let greeting = serde_json::json!({
        "type": "connection.established",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "data": {
            "connectionId": conn.id(),
            "userId": conn.user_id(),
        },
    });
    if let Ok(payload) = Payload::from_json(&greeting) {
        let _ = conn.enqueue(payload);
    }
}
