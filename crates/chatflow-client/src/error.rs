use thiserror::Error;

/// Errors produced by a client session.
#[derive(Error, Debug)]
pub enum ClientError {
    /// WebSocket transport failure.
    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// The relay refused the handshake.
    #[error("Connection refused: {0}")]
    Rejected(String),

    /// The connection closed before the handshake completed.
    #[error("Connection closed during handshake")]
    ConnectionClosed,

    /// The relay sent something that is not part of the protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Event encoding/decoding failure.
    #[error("Event encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
