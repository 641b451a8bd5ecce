//! Per-connection handling
//!
//! One `ConnectionHandler` runs per accepted connection. It owns the
//! connection's membership state (`current_group`), reads framed lines and
//! drives the router, and keeps a writer task draining the connection's
//! outbound channel into the socket. Registry and group cleanup happens on
//! every exit path.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info};

use crate::error::{RelayError, Result};
use crate::protocol::codec::LineCodec;
use crate::server::groups::GroupTable;
use crate::server::registry::{ClientHandle, Registry};
use crate::server::router::Router;

/// Greeting sent to every client on connect
const WELCOME: &str = "Welcome! Use /join <group_name>, /dm <IP:PORT> <message>, or /all <message>.";

/// Drives one client connection from accept to teardown
pub struct ConnectionHandler {
    stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<Registry>,
    groups: Arc<GroupTable>,
    router: Arc<Router>,
    created_at: Instant,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        registry: Arc<Registry>,
        groups: Arc<GroupTable>,
        router: Arc<Router>,
    ) -> Self {
        Self {
            stream,
            addr,
            registry,
            groups,
            router,
            created_at: Instant::now(),
        }
    }

    /// Run the connection to completion
    ///
    /// Returns `Ok` on orderly peer close; any read failure, oversized line,
    /// or failure to reach this connection's own writer ends the loop with an
    /// error. Either way the registry and group entries are gone by the time
    /// this returns, and nothing here is fatal to the rest of the server.
    pub async fn run(self) -> Result<()> {
        let Self {
            stream,
            addr,
            registry,
            groups,
            router,
            created_at,
        } = self;

        let (read_half, write_half) = stream.into_split();
        let mut reader = FramedRead::new(read_half, LineCodec::new());
        let mut writer = FramedWrite::new(write_half, LineCodec::new());

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let handle = ClientHandle::new(addr, outbound_tx);

        registry.add(handle.clone()).await?;
        info!(%addr, "client connected");

        // All sends to this client funnel through the channel; only this
        // task touches the socket's write half.
        let mut writer_task = tokio::spawn(async move {
            while let Some(line) = outbound_rx.recv().await {
                if writer.send(line).await.is_err() {
                    break;
                }
            }
        });

        let mut current_group: Option<String> = None;

        let result = match handle.send(WELCOME) {
            Err(e) => Err(e),
            Ok(()) => loop {
                tokio::select! {
                    maybe_line = reader.next() => match maybe_line {
                        Some(Ok(line)) => {
                            if let Err(e) =
                                router.dispatch(&handle, &mut current_group, &line).await
                            {
                                break Err(e);
                            }
                        }
                        Some(Err(e)) => break Err(RelayError::from(e)),
                        None => break Ok(()),
                    },
                    // Writer gone means the socket write failed under it
                    _ = &mut writer_task => {
                        break Err(RelayError::connection("writer task ended"));
                    }
                }
            },
        };

        if let Some(group) = current_group.take() {
            groups.leave(&group, handle.id()).await;
        }
        registry.remove(handle.id()).await;

        match &result {
            Ok(()) => info!(%addr, uptime = ?created_at.elapsed(), "client disconnected"),
            Err(e) => debug!(%addr, error = %e, "client connection failed"),
        }
        result
    }
}
