use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::{Message, MessageWithSender};

impl Database {
    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.conn().execute(
            "INSERT INTO messages (id, content, sender_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                message.id.to_string(),
                message.content,
                message.sender_id.to_string(),
                message.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The most recent messages joined with their sender's username,
    /// newest first. Callers that need chronological display order
    /// reverse the batch.
    pub fn recent_messages(&self, limit: u32) -> Result<Vec<MessageWithSender>> {
        let mut stmt = self.conn().prepare(
            "SELECT m.id, m.content, m.sender_id, u.username, m.created_at
             FROM messages m
             JOIN users u ON u.id = m.sender_id
             ORDER BY m.created_at DESC, m.rowid DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], row_to_message_with_sender)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }
}

fn row_to_message_with_sender(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageWithSender> {
    let id_str: String = row.get(0)?;
    let content: String = row.get(1)?;
    let sender_id_str: String = row.get(2)?;
    let sender_username: String = row.get(3)?;
    let ts_str: String = row.get(4)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let sender_id = Uuid::parse_str(&sender_id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&ts_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(MessageWithSender {
        id,
        content,
        sender_id,
        sender_username,
        created_at,
    })
}
