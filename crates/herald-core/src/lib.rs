//! # herald-core
//!
//! Foundation types shared by every Herald crate:
//!
//! - **Branded IDs**: `UserId`, `ConnectionId` as newtypes for type safety
//! - **Push envelope**: `PushEnvelope` with a `PushKind` discriminator and receiver identity
//! - **Errors**: `TransportError` via `thiserror`
//! - **Logging**: `tracing` subscriber bootstrap and in-memory log capture for tests

#![deny(unsafe_code)]

pub mod envelope;
pub mod errors;
pub mod ids;
pub mod logging;

pub use envelope::{PushEnvelope, PushKind};
pub use errors::TransportError;
pub use ids::{ConnectionId, UserId};
