//! Process-wide table of live connections, keyed by user id.

use std::{
    collections::HashMap,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, PoisonError, RwLock,
    },
};

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Write half of a duplex connection.
pub type Outbound = Pin<Box<dyn Sink<Message, Error = axum::Error> + Send>>;

/// One live connection. Writes are serialized by the connection's own lock,
/// so a session's replies and other sessions' fanout never interleave frames.
pub struct Peer {
    user_id: Uuid,
    conn_id: u64,
    outbound: Mutex<Outbound>,
}

impl Peer {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }

    pub async fn send(&self, frame: Message) -> Result<(), axum::Error> {
        self.outbound.lock().await.send(frame).await
    }

    pub async fn close(&self) {
        if let Err(err) = self.outbound.lock().await.close().await {
            tracing::debug!(user_id = %self.user_id, conn_id = self.conn_id, error = %err, "close failed");
        }
    }
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("user_id", &self.user_id)
            .field("conn_id", &self.conn_id)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    peers: RwLock<HashMap<Uuid, Arc<Peer>>>,
    next_conn_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `outbound` as the live connection of `user_id`, replacing any
    /// earlier one. The entry lives until the returned guard is dropped.
    pub fn register(self: &Arc<Self>, user_id: Uuid, outbound: Outbound) -> Registration {
        let peer = Arc::new(Peer {
            user_id,
            conn_id: self.next_conn_id.fetch_add(1, Ordering::Relaxed),
            outbound: Mutex::new(outbound),
        });

        let replaced = self
            .peers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, peer.clone());

        match replaced {
            Some(old) => tracing::info!(%user_id, conn_id = peer.conn_id, replaced = old.conn_id, "connection replaced"),
            None => tracing::debug!(%user_id, conn_id = peer.conn_id, "connection registered"),
        }

        Registration {
            registry: self.clone(),
            peer,
        }
    }

    /// Removes whatever connection `user_id` has. No-op when absent.
    pub fn unregister(&self, user_id: Uuid) -> Option<Arc<Peer>> {
        self.peers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user_id)
    }

    pub fn lookup(&self, user_id: Uuid) -> Option<Arc<Peer>> {
        self.peers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.peers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes `peer` only if it is still the registered connection for its user.
    fn release(&self, peer: &Peer) -> bool {
        let mut peers = self.peers.write().unwrap_or_else(PoisonError::into_inner);
        match peers.get(&peer.user_id) {
            Some(current) if current.conn_id == peer.conn_id => {
                peers.remove(&peer.user_id);
                true
            }
            _ => false,
        }
    }
}

/// Keeps a connection registered; dropping it releases the entry exactly once.
pub struct Registration {
    registry: Arc<ConnectionRegistry>,
    peer: Arc<Peer>,
}

impl Registration {
    pub fn peer(&self) -> &Arc<Peer> {
        &self.peer
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if self.registry.release(&self.peer) {
            tracing::debug!(user_id = %self.peer.user_id, conn_id = self.peer.conn_id, "connection unregistered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn lookup_finds_registered_peers() {
        let registry = Arc::new(ConnectionRegistry::new());
        let user = Uuid::now_v7();
        let (outbound, mut rx) = testing::channel();

        let registration = registry.register(user, outbound);
        let peer = registry.lookup(user).unwrap();
        assert_eq!(peer.conn_id(), registration.peer().conn_id());

        peer.send(Message::Text("ping".into())).await.unwrap();
        assert_eq!(testing::text(rx.recv().await.unwrap()), "ping");

        assert!(registry.lookup(Uuid::now_v7()).is_none());
    }

    #[tokio::test]
    async fn second_registration_replaces_the_first() {
        let registry = Arc::new(ConnectionRegistry::new());
        let user = Uuid::now_v7();
        let (first_out, _first_rx) = testing::channel();
        let (second_out, _second_rx) = testing::channel();

        let first = registry.register(user, first_out);
        let second = registry.register(user, second_out);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(user).unwrap().conn_id(), second.peer().conn_id());

        // the replaced connection's teardown must not evict its replacement
        drop(first);
        assert_eq!(registry.lookup(user).unwrap().conn_id(), second.peer().conn_id());

        drop(second);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let registry = Arc::new(ConnectionRegistry::new());
        let user = Uuid::now_v7();
        let (outbound, _rx) = testing::channel();

        let registration = registry.register(user, outbound);
        assert!(registry.unregister(user).is_some());
        assert!(registry.unregister(user).is_none());

        drop(registration);
        assert!(registry.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_connects_and_lookups() {
        let registry = Arc::new(ConnectionRegistry::new());
        let users: Vec<Uuid> = (0..64).map(|_| Uuid::now_v7()).collect();

        let handles: Vec<_> = users
            .iter()
            .map(|&user| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let (outbound, _rx) = testing::channel();
                    let registration = registry.register(user, outbound);
                    assert!(registry.lookup(user).is_some());
                    registration
                })
            })
            .collect();

        let mut registrations = Vec::new();
        for handle in handles {
            registrations.push(handle.await.unwrap());
        }
        assert_eq!(registry.len(), users.len());

        registrations.truncate(16);
        assert_eq!(registry.len(), 16);
        drop(registrations);
        assert!(registry.is_empty());
    }
}
