//! Push envelope built by producers before handing a frame to the hub.
//!
//! The hub forwards serialized envelopes without looking inside them. The
//! envelope only fixes the fields every client relies on: a `type`
//! discriminator, the receiver, and a timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Discriminator for what a pushed frame carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PushKind {
    /// A new chat message addressed to the receiver.
    #[serde(rename = "chat.message")]
    ChatMessage,
    /// A notification event (new comment, favorite, and so on).
    #[serde(rename = "notification")]
    Notification,
}

impl PushKind {
    /// Wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChatMessage => "chat.message",
            Self::Notification => "notification",
        }
    }
}

/// A message or notification addressed to a single user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushEnvelope {
    /// What the frame carries.
    #[serde(rename = "type")]
    pub kind: PushKind,
    /// The user this frame is addressed to.
    pub receiver_id: UserId,
    /// When the producer created the envelope.
    pub timestamp: DateTime<Utc>,
    /// Producer-defined body.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl PushEnvelope {
    /// Build an envelope stamped with the current time.
    pub fn new(kind: PushKind, receiver_id: UserId, data: serde_json::Value) -> Self {
        Self {
            kind,
            receiver_id,
            timestamp: Utc::now(),
            data,
        }
    }

    /// Shorthand for a chat message envelope.
    pub fn chat_message(receiver_id: UserId, data: serde_json::Value) -> Self {
        Self::new(PushKind::ChatMessage, receiver_id, data)
    }

    /// Shorthand for a notification envelope.
    pub fn notification(receiver_id: UserId, data: serde_json::Value) -> Self {
        Self::new(PushKind::Notification, receiver_id, data)
    }

    /// Serialize to the JSON text sent as one frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
