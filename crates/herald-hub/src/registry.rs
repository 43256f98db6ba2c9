//! User-to-connection registry.
//!
//! Holds at most one current connection per user. Registering a newer
//! connection atomically replaces and retires the older one; unregistering is
//! keyed on connection identity, so a stale connection's cleanup can never
//! remove its successor. Once drained for shutdown the registry admits
//! nothing further.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use herald_core::UserId;
use metrics::counter;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::HubError;
use crate::metrics::EVICTIONS_TOTAL;

/// Map from user to their current connection.
#[derive(Default)]
pub struct Registry {
    by_user: RwLock<HashMap<UserId, Arc<Connection>>>,
    /// Written only while holding the `by_user` write lock.
    closed: AtomicBool,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `conn` the current connection for its user.
    ///
    /// A previous connection for the same user is removed and its mailbox
    /// closed before `conn` becomes visible, and is returned. Registering the
    /// connection that is already current is a no-op. A connection whose
    /// mailbox is closed is refused, as is anything after [`Self::drain_all`].
    pub fn register(&self, conn: Arc<Connection>) -> Result<Option<Arc<Connection>>, HubError> {
        let evicted = {
            let mut map = self.by_user.write();
            // Checked under the lock so a concurrent eviction or drain cannot interleave.
            if self.closed.load(Ordering::Acquire) {
                let _ = conn.close_mailbox();
                return Err(HubError::ShuttingDown);
            }
            if conn.is_retired() {
                return Err(HubError::ConnectionRetired(conn.id().clone()));
            }
            if map
                .get(conn.user_id())
                .is_some_and(|current| Connection::same(current, &conn))
            {
                return Ok(None);
            }
            let previous = map.insert(conn.user_id().clone(), Arc::clone(&conn));
            if let Some(prev) = &previous {
                let _ = prev.close_mailbox();
            }
            previous
        };

        if let Some(prev) = &evicted {
            counter!(EVICTIONS_TOTAL).increment(1);
            info!(
                user_id = %conn.user_id(),
                connection_id = %conn.id(),
                evicted_connection_id = %prev.id(),
                "connection superseded"
            );
        } else {
            debug!(user_id = %conn.user_id(), connection_id = %conn.id(), "connection registered");
        }
        Ok(evicted)
    }

    /// Remove `conn` if it is still its user's current connection.
    ///
    /// On removal `conn`'s mailbox is closed and `true` returned. A stale or
    /// repeated call is a no-op.
    pub fn unregister(&self, conn: &Arc<Connection>) -> bool {
        let removed = {
            let mut map = self.by_user.write();
            match map.get(conn.user_id()) {
                Some(current) if Connection::same(current, conn) => {
                    let _ = map.remove(conn.user_id());
                    true
                }
                _ => false,
            }
        };
        if removed {
            let _ = conn.close_mailbox();
            debug!(
                user_id = %conn.user_id(),
                connection_id = %conn.id(),
                "connection unregistered"
            );
        }
        removed
    }

    /// Current connection for `user_id`, if any.
    pub fn lookup(&self, user_id: &str) -> Option<Arc<Connection>> {
        self.by_user.read().get(user_id).cloned()
    }

    /// Whether `user_id` has a current connection.
    pub fn is_online(&self, user_id: &str) -> bool {
        self.by_user.read().contains_key(user_id)
    }

    /// Whether [`Self::drain_all`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of users with a current connection.
    pub fn connection_count(&self) -> usize {
        self.by_user.read().len()
    }

    /// Users with a current connection, in no particular order.
    pub fn online_users(&self) -> Vec<UserId> {
        self.by_user.read().keys().cloned().collect()
    }

    /// Remove every connection, close its mailbox, and stop admitting new ones.
    ///
    /// Writers drain what is already queued and then close their transports.
    pub fn drain_all(&self) -> Vec<Arc<Connection>> {
        let drained: Vec<_> = {
            let mut map = self.by_user.write();
            self.closed.store(true, Ordering::Release);
            map.drain().map(|(_, conn)| conn).collect()
        };
        for conn in &drained {
            let _ = conn.close_mailbox();
        }
        if !drained.is_empty() {
            info!(count = drained.len(), "registry drained");
        }
        drained
    }
}
