use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::User;

impl Database {
    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, username, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id.to_string(),
                user.username,
                user.email,
                user.password_hash,
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                "SELECT id, username, email, password_hash, created_at
                 FROM users WHERE email = ?1",
                params![email],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                "SELECT id, username, email, password_hash, created_at
                 FROM users WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let username: String = row.get(1)?;
    let email: String = row.get(2)?;
    let password_hash: String = row.get(3)?;
    let ts_str: String = row.get(4)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&ts_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(User {
        id,
        username,
        email,
        password_hash,
        created_at,
    })
}
