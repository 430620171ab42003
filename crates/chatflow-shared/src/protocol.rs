use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Identity;

/// Events sent from a client session to the relay.
///
/// Wire framing is one JSON object per text frame, internally tagged with
/// `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// First frame on a new connection: presents the bearer credential.
    Handshake { token: String },

    /// A new outgoing message. `content` must be non-empty after trimming.
    Submit { content: String },
}

/// Events sent from the relay to client sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// The verified identity, emitted exactly once after a successful
    /// handshake.
    Identity(Identity),

    /// The recent-message batch, oldest first. Emitted once, right after
    /// the identity event. May be absent entirely if the history fetch
    /// failed.
    History { messages: Vec<MessageView> },

    /// One fanned-out message. `isOwn` is always false on this path; the
    /// recipient compares `senderUsername` against its own identity.
    Delivered(MessageView),

    /// A submit was rejected; only the submitter sees this. The connection
    /// stays usable.
    SubmitError { message: String },

    /// Connection-level failure during the handshake. The relay closes the
    /// socket right after sending it.
    Error { message: String },
}

/// The per-recipient projection of a stored message. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: Uuid,
    pub content: String,
    pub sender_username: String,
    pub created_at: DateTime<Utc>,
    pub is_own: bool,
}
