//! Metric names recorded by the hub.
//!
//! Recording goes through the `metrics` facade; without an installed recorder
//! every call is a no-op.

/// Connections admitted (counter).
pub const CONNECTIONS_TOTAL: &str = "herald_connections_total";
/// Connections currently running their tasks (gauge).
pub const CONNECTIONS_ACTIVE: &str = "herald_connections_active";
/// Connections superseded by a newer one for the same user (counter).
pub const EVICTIONS_TOTAL: &str = "herald_evictions_total";
/// Delivery attempts (counter, labels: outcome).
pub const DELIVERIES_TOTAL: &str = "herald_deliveries_total";
/// Connections torn down because their mailbox was full (counter).
pub const MAILBOX_FULL_TOTAL: &str = "herald_mailbox_full_total";
/// Connection lifetime in seconds (histogram).
pub const CONNECTION_DURATION_SECONDS: &str = "herald_connection_duration_seconds";
