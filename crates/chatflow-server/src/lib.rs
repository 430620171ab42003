//! # chatflow-server
//!
//! The ChatFlow relay process. This crate provides:
//! - **Credential issuance** (axum REST API): account registration and
//!   login, returning a signed bearer token plus the user profile
//! - **The relay core**: a WebSocket endpoint that gates every connection
//!   on that token, replays recent history to a newly joined client,
//!   persists each submitted message, and fans the result out to all
//!   live connections
//! - **The connection registry**: the identity-to-connection map used for
//!   direct addressing

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod registry;
pub mod relay;
pub mod store;
