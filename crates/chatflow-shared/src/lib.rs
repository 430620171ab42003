//! # chatflow-shared
//!
//! Types shared between the ChatFlow relay server and client sessions:
//! the wire protocol events, the verified `Identity` claim, the credential
//! token codec, and a handful of protocol-wide constants.

pub mod constants;
pub mod protocol;
pub mod token;
pub mod types;

pub use protocol::{ClientEvent, MessageView, ServerEvent};
pub use types::Identity;
