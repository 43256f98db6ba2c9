//! # herald-server
//!
//! Axum HTTP + WebSocket accept layer for the Herald push hub.
//!
//! - `GET /ws`: upgrade an authenticated client and admit it to the hub
//! - `POST /deliver`: deliver a push envelope to one user
//! - `GET /health`, `GET /metrics`: liveness and Prometheus metrics
//!
//! Shutdown stops the listener first, then drains the hub so every writer
//! flushes its mailbox and closes its socket.

#![deny(unsafe_code)]

pub mod config;
pub mod deliver;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use server::HeraldServer;
