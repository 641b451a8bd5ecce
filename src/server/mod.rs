//! Server side of the chat relay
//!
//! The acceptor ([`RelayServer`]) spawns one [`ConnectionHandler`] per
//! accepted connection. Handlers share the [`Registry`] and [`GroupTable`]
//! and drive the [`Router`] for every inbound line.

pub mod connection;
pub mod groups;
pub mod registry;
pub mod relay_server;
pub mod router;

pub use connection::ConnectionHandler;
pub use groups::GroupTable;
pub use registry::{ClientHandle, ConnectionId, Registry};
pub use relay_server::{RelayServer, ServerStats};
pub use router::Router;
