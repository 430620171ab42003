//! Domain model structs persisted in the relay database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account. `username` and `email` are unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Unique display name.
    pub username: String,
    /// Unique email address, used for login.
    pub email: String,
    /// Argon2 PHC string. Never leaves the store layer in responses.
    pub password_hash: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message. Append-only; immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique message identifier.
    pub id: Uuid,
    /// Plain message text.
    pub content: String,
    /// The sending user. Always resolved to a real account at creation time.
    pub sender_id: Uuid,
    /// When the relay persisted the message.
    pub created_at: DateTime<Utc>,
}

/// A message row joined with its sender's username, as returned by the
/// recent-history query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageWithSender {
    pub id: Uuid,
    pub content: String,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub created_at: DateTime<Utc>,
}
