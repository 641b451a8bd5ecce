//! Connection registry
//!
//! Tracks every live connection and the send capability for reaching it. The
//! registry is shared by all connection tasks; the map sits behind a single
//! `RwLock` and iteration always happens on a snapshot taken under the lock,
//! never on the live map.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::error::{RelayError, Result};

/// Opaque identifier for one connection, unique per accept
pub type ConnectionId = Uuid;

/// Send capability for one connected client
///
/// Cloneable and comparable by id. The sender feeds the connection's writer
/// task; it does not own the connection, so a handle may outlive its peer —
/// sends to a gone peer fail and are handled as per-recipient delivery
/// failures by the caller.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: ConnectionId,
    addr: SocketAddr,
    outbound: mpsc::UnboundedSender<String>,
}

impl ClientHandle {
    /// Create a handle with a fresh connection id
    pub fn new(addr: SocketAddr, outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            addr,
            outbound,
        }
    }

    /// Connection id
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote address of the connection
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Queue one line for delivery to this client
    ///
    /// Fails only when the connection's writer task is gone, i.e. the peer
    /// has disconnected.
    pub fn send<T: Into<String>>(&self, line: T) -> Result<()> {
        self.outbound
            .send(line.into())
            .map_err(|_| RelayError::connection(format!("client {} is gone", self.addr)))
    }
}

impl PartialEq for ClientHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClientHandle {}

/// Process-wide mapping from connection id to its handle
#[derive(Debug, Default)]
pub struct Registry {
    connections: RwLock<HashMap<ConnectionId, ClientHandle>>,
}

impl Registry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connections: RwLock::new(HashMap::new()),
        })
    }

    /// Register a handle
    ///
    /// Ids are unique per accept, so a duplicate indicates a bug in the
    /// caller; it is reported rather than silently overwritten.
    pub async fn add(&self, handle: ClientHandle) -> Result<()> {
        let mut connections = self.connections.write().await;
        if connections.contains_key(&handle.id()) {
            return Err(RelayError::duplicate_connection(handle.id().to_string()));
        }
        connections.insert(handle.id(), handle);
        Ok(())
    }

    /// Remove a connection; idempotent
    pub async fn remove(&self, id: ConnectionId) -> Option<ClientHandle> {
        let mut connections = self.connections.write().await;
        connections.remove(&id)
    }

    /// Get the handle for a connection id
    pub async fn get(&self, id: ConnectionId) -> Option<ClientHandle> {
        let connections = self.connections.read().await;
        connections.get(&id).cloned()
    }

    /// Find the first connection registered at the given remote address
    pub async fn lookup_by_address(&self, addr: SocketAddr) -> Option<ClientHandle> {
        let connections = self.connections.read().await;
        connections.values().find(|h| h.addr() == addr).cloned()
    }

    /// Point-in-time copy of all handles
    ///
    /// Callers iterate the snapshot with no lock held, so concurrent
    /// removals never corrupt the iteration.
    pub async fn snapshot(&self) -> Vec<ClientHandle> {
        let connections = self.connections.read().await;
        connections.values().cloned().collect()
    }

    /// Number of registered connections
    pub async fn len(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
