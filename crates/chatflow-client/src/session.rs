//! An authenticated relay session over a WebSocket.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use chatflow_shared::{ClientEvent, Identity, MessageView, ServerEvent};

use crate::error::ClientError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Events a session surfaces to the UI after the handshake.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The recent-message batch, oldest first.
    History(Vec<MessageView>),
    /// One live message. `is_own` has already been reconciled against the
    /// session's own identity.
    Delivered(MessageView),
    /// The relay rejected one of our submissions; the session stays usable.
    SubmitError { message: String },
}

/// A live, authenticated connection to the relay.
#[derive(Debug)]
pub struct ClientSession {
    ws: WsStream,
    identity: Identity,
}

impl ClientSession {
    /// Connect to the relay, present the stored credential, and wait for
    /// the relay's verdict.
    ///
    /// Resolves once the identity event arrives. Any handshake failure
    /// mode surfaces as [`ClientError::Rejected`] or
    /// [`ClientError::ConnectionClosed`]; no session exists afterwards and
    /// the caller must re-authenticate to try again.
    pub async fn connect(url: &str, token: &str) -> Result<Self, ClientError> {
        let (mut ws, _response) = connect_async(url).await?;

        let handshake = serde_json::to_string(&ClientEvent::Handshake {
            token: token.to_string(),
        })?;
        ws.send(WsMessage::Text(handshake)).await?;

        // The first server event decides: identity -> Active,
        // error -> Rejected.
        loop {
            let frame = match ws.next().await {
                Some(frame) => frame?,
                None => return Err(ClientError::ConnectionClosed),
            };
            match frame {
                WsMessage::Text(raw) => {
                    return match serde_json::from_str::<ServerEvent>(&raw)? {
                        ServerEvent::Identity(identity) => Ok(Self { ws, identity }),
                        ServerEvent::Error { message } => Err(ClientError::Rejected(message)),
                        other => Err(ClientError::Protocol(format!(
                            "unexpected event before identity: {other:?}"
                        ))),
                    };
                }
                WsMessage::Close(_) => return Err(ClientError::ConnectionClosed),
                // tungstenite answers pings internally.
                _ => {}
            }
        }
    }

    /// The identity the relay verified for this session.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The next event from the relay, or `None` once the connection is
    /// closed.
    ///
    /// Live `delivered` events arrive identity-agnostic from the relay;
    /// own-ness is recovered here by comparing the sender's username
    /// against the session identity.
    pub async fn next_event(&mut self) -> Result<Option<SessionEvent>, ClientError> {
        while let Some(frame) = self.ws.next().await {
            match frame? {
                WsMessage::Text(raw) => match serde_json::from_str::<ServerEvent>(&raw)? {
                    ServerEvent::History { messages } => {
                        return Ok(Some(SessionEvent::History(messages)));
                    }
                    ServerEvent::Delivered(mut view) => {
                        view.is_own = view.sender_username == self.identity.username;
                        return Ok(Some(SessionEvent::Delivered(view)));
                    }
                    ServerEvent::SubmitError { message } => {
                        return Ok(Some(SessionEvent::SubmitError { message }));
                    }
                    ServerEvent::Identity(_) => {
                        debug!("duplicate identity event ignored");
                    }
                    ServerEvent::Error { message } => {
                        return Err(ClientError::Rejected(message));
                    }
                },
                WsMessage::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    /// Submit a new message. Delivery (or a submit error) comes back
    /// through [`Self::next_event`].
    pub async fn submit(&mut self, content: &str) -> Result<(), ClientError> {
        let frame = serde_json::to_string(&ClientEvent::Submit {
            content: content.to_string(),
        })?;
        self.ws.send(WsMessage::Text(frame)).await?;
        Ok(())
    }

    /// Close the connection. The relay drops this session from the
    /// fan-out set on receipt.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.ws.close(None).await?;
        Ok(())
    }
}
