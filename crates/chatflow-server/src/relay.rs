//! The relay core: WebSocket upgrade, handshake gate, history seed, and
//! the submit/persist/fan-out loop.
//!
//! Each connection runs as one task that multiplexes the global fan-out
//! subscription, the per-connection direct-address queue, and the socket
//! itself. The only durable side effect is message persistence; registry
//! entries and emitted events are transient and rebuilt on reconnect.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use chatflow_shared::constants::{AUTH_ERROR_MESSAGE, HISTORY_LIMIT};
use chatflow_shared::{token, ClientEvent, Identity, MessageView, ServerEvent};
use chatflow_store::MessageWithSender;

use crate::api::AppState;
use crate::registry::ConnectionHandle;
use crate::store::MessageStore;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one connection through Connecting -> Active -> Closed.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    // -- Connecting: the first frame must carry a valid bearer token.
    //    Missing, malformed, expired, and signature-invalid tokens all
    //    collapse into the same rejection.
    let identity = match authenticate(&mut socket, &state.config.jwt_secret).await {
        Some(identity) => identity,
        None => {
            reject(&mut socket).await;
            return;
        }
    };

    info!(user = %identity.username, "user connected");

    // -- Active: register, emit the identity, then seed history.
    let conn_id = state.registry.next_conn_id();
    let (direct_tx, mut direct_rx) = mpsc::unbounded_channel();
    state
        .registry
        .register(identity.id, ConnectionHandle { conn_id, tx: direct_tx })
        .await;
    let mut delivered_rx = state.delivered_tx.subscribe();

    let mut active = send_event(&mut socket, &ServerEvent::Identity(identity.clone())).await;

    if active {
        // A store failure here is non-fatal: the client simply starts
        // with an empty thread.
        match state.store.find_recent(HISTORY_LIMIT).await {
            Ok(rows) => {
                let event = ServerEvent::History {
                    messages: history_views(rows, &identity),
                };
                active = send_event(&mut socket, &event).await;
            }
            Err(error) => {
                error!(user = %identity.username, %error, "history fetch failed");
            }
        }
    }

    while active {
        tokio::select! {
            delivered = delivered_rx.recv() => match delivered {
                Ok(view) => {
                    active = send_event(&mut socket, &ServerEvent::Delivered(view)).await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(user = %identity.username, skipped, "connection lagged behind fan-out");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },

            direct = direct_rx.recv() => match direct {
                Some(event) => {
                    active = send_event(&mut socket, &event).await;
                }
                None => break,
            },

            frame = socket.recv() => match frame {
                Some(Ok(WsMessage::Text(raw))) => match serde_json::from_str::<ClientEvent>(&raw) {
                    Ok(ClientEvent::Submit { content }) => {
                        if let Err(rejection) =
                            process_submit(state.store.as_ref(), &state.delivered_tx, &identity, &content).await
                        {
                            active = send_event(&mut socket, &rejection).await;
                        }
                    }
                    Ok(ClientEvent::Handshake { .. }) => {
                        debug!(user = %identity.username, "duplicate handshake ignored");
                    }
                    Err(error) => {
                        debug!(user = %identity.username, %error, "unparseable client frame ignored");
                    }
                },
                Some(Ok(WsMessage::Ping(payload))) => {
                    let _ = socket.send(WsMessage::Pong(payload)).await;
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }

    // -- Closed: drop out of the fan-out set. The conn_id guard keeps a
    //    stale teardown from evicting a newer connection for the same
    //    identity.
    state.registry.unregister(&identity.id, conn_id).await;
    info!(user = %identity.username, "user disconnected");
}

/// Wait for the handshake frame and verify its token.
async fn authenticate(socket: &mut WebSocket, secret: &str) -> Option<Identity> {
    while let Some(frame) = socket.recv().await {
        match frame {
            Ok(WsMessage::Text(raw)) => {
                return match serde_json::from_str::<ClientEvent>(&raw) {
                    Ok(ClientEvent::Handshake { token }) => token::verify(&token, secret).ok(),
                    _ => None,
                };
            }
            Ok(WsMessage::Ping(payload)) => {
                let _ = socket.send(WsMessage::Pong(payload)).await;
            }
            Ok(WsMessage::Pong(_)) => {}
            _ => return None,
        }
    }
    None
}

/// Refuse the connection with a single authentication error, then close.
async fn reject(socket: &mut WebSocket) {
    let event = ServerEvent::Error {
        message: AUTH_ERROR_MESSAGE.to_string(),
    };
    send_event(socket, &event).await;
    let _ = socket.send(WsMessage::Close(None)).await;
}

/// Send one event as a JSON text frame. Returns whether the connection is
/// still usable.
async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(error) => {
            error!(%error, "failed to encode server event");
            return true;
        }
    };
    socket.send(WsMessage::Text(json)).await.is_ok()
}

/// Project stored rows into per-recipient views, oldest first.
///
/// The store returns newest-first; the history batch is chronological so
/// the client can render it top to bottom.
fn history_views(rows: Vec<MessageWithSender>, viewer: &Identity) -> Vec<MessageView> {
    rows.into_iter()
        .rev()
        .map(|row| {
            let is_own = row.sender_id == viewer.id;
            MessageView {
                id: row.id,
                content: row.content,
                sender_username: row.sender_username,
                created_at: row.created_at,
                is_own,
            }
        })
        .collect()
}

/// Validate, persist, and fan out one submission.
///
/// On success the delivered view reaches every live connection through
/// the broadcast channel, in persistence-completion order. The broadcast
/// is identity-agnostic: `is_own` is false for everyone and recipients
/// reconcile against their own username. On failure the returned event
/// goes to the submitter only.
async fn process_submit(
    store: &dyn MessageStore,
    delivered_tx: &broadcast::Sender<MessageView>,
    sender: &Identity,
    content: &str,
) -> Result<(), ServerEvent> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ServerEvent::SubmitError {
            message: "Message content is required".to_string(),
        });
    }

    match store.create(sender, content).await {
        Ok(row) => {
            let view = MessageView {
                id: row.id,
                content: row.content,
                sender_username: row.sender_username,
                created_at: row.created_at,
                is_own: false,
            };
            // Send only fails when no connection is subscribed, which
            // cannot happen for the submitter's own task.
            let _ = delivered_tx.send(view);
            Ok(())
        }
        Err(error) => {
            error!(user = %sender.username, %error, "failed to persist message");
            Err(ServerEvent::SubmitError {
                message: "Failed to send message".to_string(),
            })
        }
    }
}
