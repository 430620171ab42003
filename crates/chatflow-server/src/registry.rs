//! The connection registry: a mapping from authenticated identity to the
//! live connection handle.
//!
//! At most one entry per identity. A new connection from the same identity
//! overwrites the previous entry (last-connect-wins) without closing the
//! previous connection. The registry is not on the broadcast path; it
//! exists for direct addressing of a single identity.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use chatflow_shared::ServerEvent;

/// Handle to one live connection's outbound event queue.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Process-unique id distinguishing connections from the same identity.
    pub conn_id: u64,
    pub tx: mpsc::UnboundedSender<ServerEvent>,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<Uuid, ConnectionHandle>>,
    next_conn_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a process-unique connection id.
    pub fn next_conn_id(&self) -> u64 {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Upsert the entry for `user_id`, replacing any previous handle.
    pub async fn register(&self, user_id: Uuid, handle: ConnectionHandle) {
        self.connections.lock().await.insert(user_id, handle);
    }

    /// Remove the entry for `user_id`, but only while it still belongs to
    /// the connection identified by `conn_id`. A stale connection's
    /// teardown must not evict the newer connection that replaced it.
    ///
    /// Returns whether an entry was removed.
    pub async fn unregister(&self, user_id: &Uuid, conn_id: u64) -> bool {
        let mut connections = self.connections.lock().await;
        match connections.get(user_id) {
            Some(handle) if handle.conn_id == conn_id => {
                connections.remove(user_id);
                true
            }
            _ => false,
        }
    }

    /// The outbound queue of the identity's current connection, if any.
    pub async fn lookup(&self, user_id: &Uuid) -> Option<mpsc::UnboundedSender<ServerEvent>> {
        self.connections
            .lock()
            .await
            .get(user_id)
            .map(|handle| handle.tx.clone())
    }

    /// Number of registered identities.
    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.lock().await.is_empty()
    }
}
