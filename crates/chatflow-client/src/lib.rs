//! # chatflow-client
//!
//! The UI-facing counterpart of the relay: establishes an authenticated
//! connection, surfaces incoming events, and submits outgoing messages.
//! Rendering is someone else's job; this crate is protocol shape only.
//!
//! The [`typing`] module generates the local typing/stop-typing advisory
//! signals consumed by other local UI. Nothing typing-related crosses the
//! wire.

pub mod session;
pub mod typing;

mod error;

pub use error::ClientError;
pub use session::{ClientSession, SessionEvent};
pub use typing::{TypingNotifier, TypingSignal};
