//! WebSocket accept layer: identity extraction, upgrade, and the transport
//! adapter the hub's connection tasks drive.

pub mod identity;
pub mod transport;
pub mod upgrade;
