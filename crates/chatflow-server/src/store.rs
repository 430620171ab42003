//! The message persistence seam.
//!
//! The relay core depends on the [`MessageStore`] trait rather than a
//! concrete database so tests can inject fakes (including failing ones).
//! The production implementation wraps the shared [`Database`] handle.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use chatflow_shared::Identity;
use chatflow_store::{Database, Message, MessageWithSender, StoreError};

/// Durable append-only message persistence, as seen by the relay core.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// The most recent `limit` messages, newest first.
    async fn find_recent(&self, limit: u32) -> Result<Vec<MessageWithSender>, StoreError>;

    /// Persist a new message for `sender` and return the stored row.
    async fn create(
        &self,
        sender: &Identity,
        content: &str,
    ) -> Result<MessageWithSender, StoreError>;
}

/// [`MessageStore`] backed by the SQLite database.
pub struct SqliteMessageStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteMessageStore {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn find_recent(&self, limit: u32) -> Result<Vec<MessageWithSender>, StoreError> {
        let db = self.db.lock().await;
        db.recent_messages(limit)
    }

    async fn create(
        &self,
        sender: &Identity,
        content: &str,
    ) -> Result<MessageWithSender, StoreError> {
        let message = Message {
            id: Uuid::new_v4(),
            content: content.to_string(),
            sender_id: sender.id,
            created_at: Utc::now(),
        };

        let db = self.db.lock().await;
        db.insert_message(&message)?;

        Ok(MessageWithSender {
            id: message.id,
            content: message.content,
            sender_id: message.sender_id,
            sender_username: sender.username.clone(),
            created_at: message.created_at,
        })
    }
}
