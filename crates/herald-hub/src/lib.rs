//! # herald-hub
//!
//! Real-time push delivery to connected users.
//!
//! - **Registry**: at most one current [`Connection`] per user; a newer
//!   connection supersedes and retires the older one
//! - **Mailbox**: bounded per-connection queue, enqueue never waits
//! - **Writer / reader tasks**: one of each per connection; the writer is the
//!   only code that writes to the transport
//! - **Dispatch**: [`Hub::deliver`] reports `Delivered`, `Offline`, or
//!   `Failed`, and disconnects clients whose mailbox is full
//!
//! The hub is transport-agnostic. The accept layer supplies the two halves of
//! an authenticated socket through [`FrameSink`] and [`FrameSource`] and calls
//! [`Hub::on_connection_established`].

#![deny(unsafe_code)]

pub mod connection;
pub mod dispatch;
pub mod error;
pub mod mailbox;
pub mod metrics;
pub mod reader;
pub mod registry;
pub mod session;
pub mod transport;
pub mod writer;

pub use connection::Connection;
pub use dispatch::{DeliveryOutcome, FailureReason, Hub, HubConfig};
pub use error::HubError;
pub use mailbox::{EnqueueResult, Mailbox, MailboxReceiver, Payload};
pub use reader::ReaderExit;
pub use registry::Registry;
pub use session::{SessionHandle, SessionSummary};
pub use transport::{FrameSink, FrameSource, Inbound};
pub use writer::WriterExit;
