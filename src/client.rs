//! Line-oriented interactive chat client
//!
//! Thin terminal frontend for the relay: one task prints everything the
//! server sends, the main loop forwards stdin lines. Typing `exit` quits.
//! The client keeps no shared state; all chat semantics live on the server.

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::debug;

use crate::error::{RelayError, Result};
use crate::protocol::codec::LineCodec;

/// Chat client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Server address to connect to
    pub server_addr: SocketAddr,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:5000".parse().unwrap(),
        }
    }
}

/// Interactive relay client
pub struct RelayClient {
    config: ClientConfig,
}

impl RelayClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ClientConfig::default())
    }

    /// Connect and run the interactive session until `exit` or disconnect
    pub async fn run(&self) -> Result<()> {
        let stream = TcpStream::connect(self.config.server_addr)
            .await
            .map_err(|e| {
                RelayError::connection(format!(
                    "failed to connect to {}: {}",
                    self.config.server_addr, e
                ))
            })?;
        let local_addr = stream.local_addr()?;
        println!("Connected to the server as {}.", local_addr);

        let (read_half, write_half) = stream.into_split();
        let mut incoming = FramedRead::new(read_half, LineCodec::new());
        let mut outgoing = FramedWrite::new(write_half, LineCodec::new());

        let mut printer = tokio::spawn(async move {
            while let Some(line) = incoming.next().await {
                match line {
                    Ok(line) => println!("{}", line),
                    Err(e) => {
                        debug!("receive error: {}", e);
                        break;
                    }
                }
            }
            println!("Disconnected from server.");
        });

        let mut stdin = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                maybe_line = stdin.next_line() => match maybe_line {
                    Ok(Some(line)) => {
                        if line.trim().eq_ignore_ascii_case("exit") {
                            println!("Exiting chat...");
                            break;
                        }
                        outgoing.send(line).await?;
                    }
                    Ok(None) => break,
                    Err(e) => return Err(e.into()),
                },
                _ = &mut printer => break,
            }
        }

        Ok(())
    }
}
