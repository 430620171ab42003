//! # chatflow-store
//!
//! Durable persistence for the ChatFlow relay, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for the two
//! domain models: registered users and the append-only message log.

pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod users;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
