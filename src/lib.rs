//! Line-oriented TCP chat relay
//!
//! A server accepts concurrent TCP connections, tracks each connection's
//! identity and group membership, and routes plain-text messages to one
//! recipient (`/dm`), a group (`/join` + plain text), or everyone (`/all`).
//! Shared membership state stays correct under concurrent mutation from all
//! connections: each table sits behind one lock, and delivery iterates
//! snapshots outside the locks.

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::{ClientConfig, RelayClient};
pub use error::{RelayError, Result};
pub use server::{RelayServer, ServerStats};

/// Relay server configuration
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Address the server listens on
    pub bind_addr: std::net::SocketAddr,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".parse().unwrap(),
        }
    }
}
