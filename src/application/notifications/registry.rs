//! Connection registry - owns every live client connection.
//!
//! The map lock is held only to insert, remove, or clone `Arc<Connection>`
//! handles. Sends happen on the handles with no registry lock held; each
//! connection serializes its own writers behind a per-connection mutex.
//!
//! A connection is removed from the map *before* it is marked closed, and
//! the closed flag is flipped under the transport mutex, so a send either
//! completes before the close or observes `TransportError::Closed`.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::domain::foundation::{ConnectionId, Timestamp, UserId};
use crate::ports::{ConnectionTransport, TransportError};

/// One registered client connection.
pub struct Connection {
    id: ConnectionId,
    created_at: Timestamp,
    open: AtomicBool,
    user: RwLock<Option<UserId>>,
    transport: Mutex<Box<dyn ConnectionTransport>>,
}

impl Connection {
    fn new(transport: Box<dyn ConnectionTransport>) -> Self {
        Self {
            id: ConnectionId::new(),
            created_at: Timestamp::now(),
            open: AtomicBool::new(true),
            user: RwLock::new(None),
            transport: Mutex::new(transport),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub async fn user(&self) -> Option<UserId> {
        self.user.read().await.clone()
    }

    /// Sends one text frame. Fails with `Closed` once the connection has
    /// been unregistered.
    pub async fn send(&self, text: String) -> Result<(), TransportError> {
        let mut transport = self.transport.lock().await;
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        transport.send_text(text).await
    }

    async fn ping(&self) -> Result<(), TransportError> {
        let mut transport = self.transport.lock().await;
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        transport.send_ping().await
    }

    async fn close(&self) {
        let mut transport = self.transport.lock().await;
        if self.open.swap(false, Ordering::SeqCst) {
            if let Err(e) = transport.close().await {
                tracing::debug!(connection_id = %self.id, error = %e, "Transport close failed");
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

/// Point-in-time registry counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub active_connections: usize,
    pub total_connections: u64,
    pub identified_users: usize,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<Connection>>>,
    users: RwLock<HashMap<UserId, Vec<ConnectionId>>>,
    total_registered: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register<T: ConnectionTransport>(&self, transport: T) -> ConnectionId {
        let connection = Arc::new(Connection::new(Box::new(transport)));
        let id = connection.id();

        let active = {
            let mut connections = self.connections.write().await;
            connections.insert(id, connection);
            connections.len()
        };
        self.total_registered.fetch_add(1, Ordering::Relaxed);

        tracing::info!(connection_id = %id, active, "Connection registered");
        id
    }

    /// Removes and closes a connection. Returns `false` if it was already gone.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let Some(connection) = self.connections.write().await.remove(&id) else {
            return false;
        };

        connection.close().await;

        if let Some(user) = connection.user().await {
            self.forget_user_connection(&user, id).await;
        }

        let active = self.connections.read().await.len();
        tracing::info!(connection_id = %id, active, "Connection unregistered");
        true
    }

    /// Binds a user to a connection (last write wins). Returns `false` if
    /// the connection is not registered.
    pub async fn bind_user(&self, id: ConnectionId, user: UserId) -> bool {
        let Some(connection) = self.get(id).await else {
            return false;
        };

        let previous = connection.user.write().await.replace(user.clone());
        if let Some(previous) = previous.filter(|p| *p != user) {
            self.forget_user_connection(&previous, id).await;
        }

        {
            let mut users = self.users.write().await;
            let ids = users.entry(user.clone()).or_default();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        // Lost a race with unregister: don't leave a stale index entry.
        if !connection.is_open() {
            self.forget_user_connection(&user, id).await;
            return false;
        }

        tracing::info!(connection_id = %id, user_id = %user, "User bound to connection");
        true
    }

    async fn forget_user_connection(&self, user: &UserId, id: ConnectionId) {
        let mut users = self.users.write().await;
        if let Some(ids) = users.get_mut(user) {
            ids.retain(|existing| *existing != id);
            if ids.is_empty() {
                users.remove(user);
            }
        }
    }

    pub async fn get(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.read().await.get(&id).cloned()
    }

    pub async fn is_open(&self, id: ConnectionId) -> bool {
        self.get(id).await.map(|c| c.is_open()).unwrap_or(false)
    }

    /// Ids registered at this instant.
    pub async fn snapshot(&self) -> Vec<ConnectionId> {
        self.connections.read().await.keys().copied().collect()
    }

    /// Handles registered at this instant. The lock is released on return.
    pub async fn handles(&self) -> Vec<Arc<Connection>> {
        self.connections.read().await.values().cloned().collect()
    }

    /// Sends to one connection, unregistering it if the send fails.
    pub async fn send_to(&self, id: ConnectionId, text: String) -> bool {
        let Some(connection) = self.get(id).await else {
            return false;
        };
        self.send_or_evict(&connection, text).await
    }

    pub(crate) async fn send_or_evict(&self, connection: &Connection, text: String) -> bool {
        match connection.send(text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(connection_id = %connection.id(), error = %e, "Send failed, dropping connection");
                self.unregister(connection.id()).await;
                false
            }
        }
    }

    /// First open connection bound to `user`, in binding order.
    pub async fn first_open_for_user(&self, user: &UserId) -> Option<ConnectionId> {
        let candidates = self.users.read().await.get(user).cloned()?;
        for id in candidates {
            if self.is_open(id).await {
                return Some(id);
            }
        }
        None
    }

    pub async fn stats(&self) -> RegistryStats {
        RegistryStats {
            active_connections: self.connections.read().await.len(),
            total_connections: self.total_registered.load(Ordering::Relaxed),
            identified_users: self.users.read().await.len(),
        }
    }

    /// Pings every connection; those that fail are unregistered.
    /// Returns how many were dropped.
    pub async fn ping_all(&self) -> usize {
        let pings = self.handles().await.into_iter().map(|connection| async move {
            match connection.ping().await {
                Ok(()) => false,
                Err(e) => {
                    tracing::debug!(connection_id = %connection.id(), error = %e, "Heartbeat failed");
                    self.unregister(connection.id()).await
                }
            }
        });
        futures::future::join_all(pings)
            .await
            .into_iter()
            .filter(|dropped| *dropped)
            .count()
    }

    /// Unregisters every connection. Used on shutdown.
    pub async fn close_all(&self) -> usize {
        let mut closed = 0;
        for id in self.snapshot().await {
            if self.unregister(id).await {
                closed += 1;
            }
        }
        closed
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    /// Transport double that records frames and can be told to fail.
    #[derive(Clone, Default)]
    pub struct RecordingTransport {
        pub sent: Arc<StdMutex<Vec<String>>>,
        pub fail: Arc<AtomicBool>,
        pub closed: Arc<AtomicBool>,
        pub pings: Arc<AtomicU64>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            let transport = Self::default();
            transport.fail.store(true, Ordering::SeqCst);
            transport
        }

        pub fn frames(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ConnectionTransport for RecordingTransport {
        async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(TransportError::Send("broken pipe".to_string()));
            }
            self.sent.lock().unwrap().push(text);
            Ok(())
        }

        async fn send_ping(&mut self) -> Result<(), TransportError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(TransportError::Send("broken pipe".to_string()));
            }
            self.pings.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }
}
