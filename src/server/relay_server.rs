//! TCP chat relay server
//!
//! Binds the listening socket and accepts connections forever, spawning one
//! [`ConnectionHandler`] task per client. The registry, group table, and
//! router are shared across all connection tasks.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::{RelayError, Result};
use crate::server::connection::ConnectionHandler;
use crate::server::groups::GroupTable;
use crate::server::registry::Registry;
use crate::server::router::Router;
use crate::RelayConfig;

/// The chat relay server
pub struct RelayServer {
    config: RelayConfig,
    registry: Arc<Registry>,
    groups: Arc<GroupTable>,
    router: Arc<Router>,
}

impl RelayServer {
    /// Create a new server
    pub fn new(config: RelayConfig) -> Self {
        let registry = Registry::new();
        let groups = GroupTable::new();
        let router = Router::new(Arc::clone(&registry), Arc::clone(&groups));

        Self {
            config,
            registry,
            groups,
            router,
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(RelayConfig::default())
    }

    /// Shared connection registry
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Shared group table
    pub fn groups(&self) -> Arc<GroupTable> {
        Arc::clone(&self.groups)
    }

    /// Bind the configured address and serve until the process exits
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await.map_err(|e| {
            RelayError::network(format!("failed to bind {}: {}", self.config.bind_addr, e))
        })?;
        info!("listening on {}", listener.local_addr()?);
        self.serve(listener).await
    }

    /// Accept connections on an already-bound listener
    ///
    /// No connection limit and no backpressure: every accepted connection
    /// gets its own task. A failed accept is logged and the loop continues;
    /// a single connection's failure never reaches the other tasks.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let handler = ConnectionHandler::new(
                        stream,
                        addr,
                        Arc::clone(&self.registry),
                        Arc::clone(&self.groups),
                        Arc::clone(&self.router),
                    );
                    tokio::spawn(async move {
                        if let Err(e) = handler.run().await {
                            debug!(%addr, "connection ended: {}", e);
                        }
                    });
                }
                Err(e) => {
                    warn!("accept failed: {}", e);
                }
            }
        }
    }

    /// Current server statistics
    pub async fn stats(&self) -> ServerStats {
        ServerStats {
            connections: self.registry.len().await,
            groups: self.groups.group_count().await,
            bind_addr: self.config.bind_addr,
        }
    }
}

/// Server statistics snapshot
#[derive(Debug, Clone)]
pub struct ServerStats {
    pub connections: usize,
    pub groups: usize,
    pub bind_addr: SocketAddr,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpStream;
    use tokio::time::timeout;

    struct TestClient {
        reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
        writer: tokio::net::tcp::OwnedWriteHalf,
        addr: SocketAddr,
    }

    impl TestClient {
        async fn connect(server: SocketAddr) -> Self {
            let stream = TcpStream::connect(server).await.unwrap();
            let addr = stream.local_addr().unwrap();
            let (read_half, writer) = stream.into_split();
            let mut client = Self {
                reader: BufReader::new(read_half),
                writer,
                addr,
            };
            // Every connection is greeted first
            let welcome = client.recv().await;
            assert!(welcome.starts_with("Welcome!"));
            client
        }

        async fn send(&mut self, line: &str) {
            self.writer
                .write_all(format!("{}\n", line).as_bytes())
                .await
                .unwrap();
        }

        async fn recv(&mut self) -> String {
            let mut line = String::new();
            timeout(Duration::from_secs(5), self.reader.read_line(&mut line))
                .await
                .expect("timed out waiting for a line")
                .unwrap();
            line.trim_end().to_string()
        }
    }

    async fn start_server() -> (SocketAddr, Arc<Registry>, Arc<GroupTable>) {
        let server = RelayServer::with_defaults();
        let registry = server.registry();
        let groups = server.groups();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { server.serve(listener).await });
        (addr, registry, groups)
    }

    #[tokio::test]
    async fn test_stats_default() {
        let server = RelayServer::with_defaults();
        let stats = server.stats().await;
        assert_eq!(stats.connections, 0);
        assert_eq!(stats.groups, 0);
        assert_eq!(stats.bind_addr, RelayConfig::default().bind_addr);
    }

    #[tokio::test]
    async fn test_group_chat_round_trip() {
        let (server_addr, _registry, _groups) = start_server().await;

        let mut alice = TestClient::connect(server_addr).await;
        let mut bob = TestClient::connect(server_addr).await;

        alice.send("/join g").await;
        assert_eq!(alice.recv().await, "Joined group: g");
        bob.send("/join g").await;
        assert_eq!(bob.recv().await, "Joined group: g");

        alice.send("hello bob").await;
        assert_eq!(bob.recv().await, "127.0.0.1: hello bob");
    }

    #[tokio::test]
    async fn test_broadcast_and_dm_over_the_wire() {
        let (server_addr, _registry, _groups) = start_server().await;

        let mut alice = TestClient::connect(server_addr).await;
        let mut bob = TestClient::connect(server_addr).await;

        alice.send("/all hi everyone").await;
        assert_eq!(bob.recv().await, "Broadcast from 127.0.0.1: hi everyone");

        alice.send(&format!("/dm {} psst", bob.addr)).await;
        assert_eq!(
            bob.recv().await,
            format!("DM from {}: psst", alice.addr)
        );
    }

    #[tokio::test]
    async fn test_post_without_group_over_the_wire() {
        let (server_addr, _registry, _groups) = start_server().await;

        let mut alice = TestClient::connect(server_addr).await;
        alice.send("just talking").await;
        assert_eq!(
            alice.recv().await,
            "You must join a group or use /dm or /all."
        );
    }

    #[tokio::test]
    async fn test_disconnect_cleans_registry_and_group() {
        let (server_addr, registry, groups) = start_server().await;

        let mut alice = TestClient::connect(server_addr).await;
        alice.send("/join g").await;
        assert_eq!(alice.recv().await, "Joined group: g");
        assert_eq!(registry.len().await, 1);

        drop(alice);

        // Teardown runs in the connection's own task; give it a moment
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while registry.len().await != 0 {
            assert!(tokio::time::Instant::now() < deadline, "registry never drained");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(groups.members("g").await.is_empty());
    }

    #[tokio::test]
    async fn test_survivor_posts_after_peer_disconnects() {
        let (server_addr, registry, _groups) = start_server().await;

        let mut alice = TestClient::connect(server_addr).await;
        let mut bob = TestClient::connect(server_addr).await;
        let mut carol = TestClient::connect(server_addr).await;

        for client in [&mut alice, &mut bob, &mut carol] {
            client.send("/join g").await;
            assert_eq!(client.recv().await, "Joined group: g");
        }

        drop(bob);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while registry.len().await != 2 {
            assert!(tokio::time::Instant::now() < deadline, "registry never drained");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        alice.send("anyone there").await;
        assert_eq!(carol.recv().await, "127.0.0.1: anyone there");
    }
}
