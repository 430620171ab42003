//! End-to-end relay tests: a real server on loopback, driven through real
//! client sessions.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tokio::time::timeout;
use uuid::Uuid;

use chatflow_client::{ClientError, ClientSession, SessionEvent};
use chatflow_server::api::{build_router, AppState};
use chatflow_server::auth;
use chatflow_server::config::ServerConfig;
use chatflow_server::registry::ConnectionRegistry;
use chatflow_server::store::SqliteMessageStore;
use chatflow_shared::constants::EVENT_BUFFER;
use chatflow_shared::{token, Identity};
use chatflow_store::{Database, User};

const SECRET: &str = "test-secret";
const EVENT_WAIT: Duration = Duration::from_secs(5);

struct TestRelay {
    addr: SocketAddr,
    state: AppState,
    _dir: tempfile::TempDir,
}

impl TestRelay {
    async fn spawn() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        let db = Arc::new(Mutex::new(db));

        let state = AppState {
            db: Arc::clone(&db),
            store: Arc::new(SqliteMessageStore::new(db)),
            registry: Arc::new(ConnectionRegistry::new()),
            delivered_tx: broadcast::channel(EVENT_BUFFER).0,
            config: Arc::new(ServerConfig {
                jwt_secret: SECRET.to_string(),
                ..ServerConfig::default()
            }),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            addr,
            state,
            _dir: dir,
        }
    }

    fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Register an account directly in the store and mint its token.
    async fn seed_account(&self, username: &str) -> (Identity, String) {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@x.com"),
            password_hash: auth::hash_password("secret1").unwrap(),
            created_at: Utc::now(),
        };
        let db = self.state.db.lock().await;
        db.insert_user(&user).unwrap();
        drop(db);

        let identity = Identity {
            id: user.id,
            username: user.username,
            email: user.email,
        };
        let token = token::issue(&identity, SECRET).unwrap();
        (identity, token)
    }
}

async fn next_event(session: &mut ClientSession) -> SessionEvent {
    timeout(EVENT_WAIT, session.next_event())
        .await
        .expect("timed out waiting for an event")
        .expect("session error")
        .expect("connection closed unexpectedly")
}

#[tokio::test]
async fn handshake_yields_identity_then_history() {
    let relay = TestRelay::spawn().await;
    let (identity, token) = relay.seed_account("alice").await;

    let mut session = ClientSession::connect(&relay.ws_url(), &token).await.unwrap();
    assert_eq!(session.identity(), &identity);

    match next_event(&mut session).await {
        SessionEvent::History(messages) => assert!(messages.is_empty()),
        other => panic!("expected history, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_token_is_refused() {
    let relay = TestRelay::spawn().await;

    let result = ClientSession::connect(&relay.ws_url(), "not-a-token").await;
    match result {
        Err(ClientError::Rejected(message)) => assert_eq!(message, "Authentication error"),
        other => panic!("expected rejection, got {other:?}"),
    }

    // A rejected connection never enters the registry.
    assert!(relay.state.registry.is_empty().await);
}

#[tokio::test]
async fn token_signed_with_other_secret_is_refused() {
    let relay = TestRelay::spawn().await;
    let identity = Identity {
        id: Uuid::new_v4(),
        username: "mallory".to_string(),
        email: "m@x.com".to_string(),
    };
    let forged = token::issue(&identity, "other-secret").unwrap();

    assert!(matches!(
        ClientSession::connect(&relay.ws_url(), &forged).await,
        Err(ClientError::Rejected(_))
    ));
}

#[tokio::test]
async fn submit_fans_out_to_all_connections() {
    let relay = TestRelay::spawn().await;
    let (_, alice_token) = relay.seed_account("alice").await;
    let (_, bob_token) = relay.seed_account("bob").await;

    let mut alice = ClientSession::connect(&relay.ws_url(), &alice_token).await.unwrap();
    let mut bob = ClientSession::connect(&relay.ws_url(), &bob_token).await.unwrap();

    // Drain the (empty) history batches first.
    assert!(matches!(next_event(&mut alice).await, SessionEvent::History(_)));
    assert!(matches!(next_event(&mut bob).await, SessionEvent::History(_)));

    alice.submit("hi").await.unwrap();

    // Every connection, including the submitter, sees exactly one
    // delivered event. Own-ness differs per recipient.
    match next_event(&mut alice).await {
        SessionEvent::Delivered(view) => {
            assert_eq!(view.content, "hi");
            assert_eq!(view.sender_username, "alice");
            assert!(view.is_own);
        }
        other => panic!("expected delivered, got {other:?}"),
    }
    match next_event(&mut bob).await {
        SessionEvent::Delivered(view) => {
            assert_eq!(view.content, "hi");
            assert_eq!(view.sender_username, "alice");
            assert!(!view.is_own);
        }
        other => panic!("expected delivered, got {other:?}"),
    }
}

#[tokio::test]
async fn history_replays_persisted_messages_per_viewer() {
    let relay = TestRelay::spawn().await;
    let (_, alice_token) = relay.seed_account("alice").await;
    let (_, bob_token) = relay.seed_account("bob").await;

    let mut alice = ClientSession::connect(&relay.ws_url(), &alice_token).await.unwrap();
    assert!(matches!(next_event(&mut alice).await, SessionEvent::History(_)));
    alice.submit("hello bob").await.unwrap();
    assert!(matches!(next_event(&mut alice).await, SessionEvent::Delivered(_)));

    // A later joiner gets the message replayed, flagged as not-own.
    let mut bob = ClientSession::connect(&relay.ws_url(), &bob_token).await.unwrap();
    match next_event(&mut bob).await {
        SessionEvent::History(messages) => {
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].content, "hello bob");
            assert_eq!(messages[0].sender_username, "alice");
            assert!(!messages[0].is_own);
        }
        other => panic!("expected history, got {other:?}"),
    }

    // The author reconnecting sees the same row flagged as their own.
    let mut alice_again = ClientSession::connect(&relay.ws_url(), &alice_token).await.unwrap();
    match next_event(&mut alice_again).await {
        SessionEvent::History(messages) => {
            assert_eq!(messages.len(), 1);
            assert!(messages[0].is_own);
        }
        other => panic!("expected history, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_submit_is_rejected_and_not_delivered() {
    let relay = TestRelay::spawn().await;
    let (_, alice_token) = relay.seed_account("alice").await;
    let (_, bob_token) = relay.seed_account("bob").await;

    let mut alice = ClientSession::connect(&relay.ws_url(), &alice_token).await.unwrap();
    let mut bob = ClientSession::connect(&relay.ws_url(), &bob_token).await.unwrap();
    assert!(matches!(next_event(&mut alice).await, SessionEvent::History(_)));
    assert!(matches!(next_event(&mut bob).await, SessionEvent::History(_)));

    alice.submit("   ").await.unwrap();
    match next_event(&mut alice).await {
        SessionEvent::SubmitError { message } => {
            assert_eq!(message, "Message content is required");
        }
        other => panic!("expected submit error, got {other:?}"),
    }

    // Bob never sees the empty submission: the next thing he receives is
    // the follow-up message.
    alice.submit("real one").await.unwrap();
    match next_event(&mut bob).await {
        SessionEvent::Delivered(view) => assert_eq!(view.content, "real one"),
        other => panic!("expected delivered, got {other:?}"),
    }
}

#[tokio::test]
async fn disconnect_removes_connection_from_fan_out() {
    let relay = TestRelay::spawn().await;
    let (_, alice_token) = relay.seed_account("alice").await;
    let (bob_identity, bob_token) = relay.seed_account("bob").await;

    let mut alice = ClientSession::connect(&relay.ws_url(), &alice_token).await.unwrap();
    let bob = ClientSession::connect(&relay.ws_url(), &bob_token).await.unwrap();
    assert!(matches!(next_event(&mut alice).await, SessionEvent::History(_)));
    assert_eq!(relay.state.registry.len().await, 2);

    bob.close().await.unwrap();

    // The relay notices the teardown and drops bob's registry entry.
    timeout(EVENT_WAIT, async {
        while relay.state.registry.lookup(&bob_identity.id).await.is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("disconnect should unregister the connection");

    // Fan-out keeps working for everyone still connected.
    alice.submit("anyone there?").await.unwrap();
    match next_event(&mut alice).await {
        SessionEvent::Delivered(view) => assert_eq!(view.content, "anyone there?"),
        other => panic!("expected delivered, got {other:?}"),
    }
    assert_eq!(relay.state.registry.len().await, 1);
}

#[tokio::test]
async fn reconnect_replaces_the_previous_registration() {
    let relay = TestRelay::spawn().await;
    let (identity, token) = relay.seed_account("alice").await;

    let mut first = ClientSession::connect(&relay.ws_url(), &token).await.unwrap();
    assert!(matches!(next_event(&mut first).await, SessionEvent::History(_)));

    let mut second = ClientSession::connect(&relay.ws_url(), &token).await.unwrap();
    assert!(matches!(next_event(&mut second).await, SessionEvent::History(_)));

    // One registry entry per identity, and the earlier socket still
    // receives broadcasts (it was replaced, not closed).
    assert_eq!(relay.state.registry.len().await, 1);
    assert!(relay.state.registry.lookup(&identity.id).await.is_some());

    second.submit("still here").await.unwrap();
    match next_event(&mut first).await {
        SessionEvent::Delivered(view) => assert_eq!(view.content, "still here"),
        other => panic!("expected delivered, got {other:?}"),
    }
}

#[tokio::test]
async fn per_connection_submit_order_is_preserved() {
    let relay = TestRelay::spawn().await;
    let (_, alice_token) = relay.seed_account("alice").await;
    let (_, bob_token) = relay.seed_account("bob").await;

    let mut alice = ClientSession::connect(&relay.ws_url(), &alice_token).await.unwrap();
    let mut bob = ClientSession::connect(&relay.ws_url(), &bob_token).await.unwrap();
    assert!(matches!(next_event(&mut alice).await, SessionEvent::History(_)));
    assert!(matches!(next_event(&mut bob).await, SessionEvent::History(_)));

    for i in 0..5 {
        alice.submit(&format!("msg-{i}")).await.unwrap();
    }

    for i in 0..5 {
        match next_event(&mut bob).await {
            SessionEvent::Delivered(view) => assert_eq!(view.content, format!("msg-{i}")),
            other => panic!("expected delivered, got {other:?}"),
        }
    }
}
