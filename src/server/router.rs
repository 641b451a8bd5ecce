//! Message routing
//!
//! Interprets each inbound line as a [`Command`] against the registry and
//! group table, then dispatches the outbound sends. Membership is always read
//! as a snapshot under the table lock and delivered outside it, so a slow or
//! dead peer never stalls other connections.
//!
//! Delivery failures are per-recipient: a send that fails because the target
//! disconnected evicts that one entry from the structure being iterated and
//! delivery to the remaining recipients continues. Only a failure to reach
//! the *sender's own* connection is fatal, and then only to that connection's
//! loop.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::protocol::command::Command;
use crate::server::groups::GroupTable;
use crate::server::registry::{ClientHandle, Registry};

/// Routes inbound lines to their recipients
pub struct Router {
    registry: Arc<Registry>,
    groups: Arc<GroupTable>,
}

impl Router {
    pub fn new(registry: Arc<Registry>, groups: Arc<GroupTable>) -> Arc<Self> {
        Arc::new(Self { registry, groups })
    }

    /// Interpret one inbound line from `sender`
    ///
    /// `current_group` is the sender's connection-loop state; it is mutated
    /// here (under no lock — only the owning loop ever calls this) and kept
    /// in step with the group table. Errors mean the sender itself is
    /// unreachable and its loop should terminate.
    pub async fn dispatch(
        &self,
        sender: &ClientHandle,
        current_group: &mut Option<String>,
        line: &str,
    ) -> Result<()> {
        match Command::parse(line) {
            Err(e) => sender.send(e.reply()),
            Ok(Command::Join(name)) => self.handle_join(sender, current_group, name).await,
            Ok(Command::Leave) => self.handle_leave(sender, current_group).await,
            Ok(Command::DirectMessage { target, text }) => {
                self.handle_direct_message(sender, target, &text).await
            }
            Ok(Command::Broadcast(text)) => self.handle_broadcast(sender, &text).await,
            Ok(Command::Post(text)) => {
                self.handle_group_post(sender, current_group.as_deref(), &text)
                    .await
            }
        }
    }

    /// `/join <name>`: switch groups, leaving the old one first
    async fn handle_join(
        &self,
        sender: &ClientHandle,
        current_group: &mut Option<String>,
        name: String,
    ) -> Result<()> {
        if let Some(old) = current_group.take() {
            self.groups.leave(&old, sender.id()).await;
        }
        self.groups.join(&name, sender.id()).await;
        debug!(addr = %sender.addr(), group = %name, "joined group");

        let reply = format!("Joined group: {}", name);
        *current_group = Some(name);
        sender.send(reply)
    }

    /// `/leave`: drop the current group membership, if any
    async fn handle_leave(
        &self,
        sender: &ClientHandle,
        current_group: &mut Option<String>,
    ) -> Result<()> {
        match current_group.take() {
            Some(name) => {
                self.groups.leave(&name, sender.id()).await;
                debug!(addr = %sender.addr(), group = %name, "left group");
                sender.send(format!("Left group: {}", name))
            }
            None => sender.send("You are not in any group."),
        }
    }

    /// `/dm <ip:port> <text>`: deliver to exactly one client
    async fn handle_direct_message(
        &self,
        sender: &ClientHandle,
        target: SocketAddr,
        text: &str,
    ) -> Result<()> {
        match self.registry.lookup_by_address(target).await {
            Some(peer) => {
                let line = format!("DM from {}: {}", sender.addr(), text);
                if peer.send(line).is_err() {
                    self.registry.remove(peer.id()).await;
                    warn!(target = %target, "dm target disconnected, evicted from registry");
                }
                Ok(())
            }
            None => sender.send(format!("No client with address {} found.", target)),
        }
    }

    /// `/all <text>`: deliver to every registered connection except the sender
    async fn handle_broadcast(&self, sender: &ClientHandle, text: &str) -> Result<()> {
        let line = format!("Broadcast from {}: {}", sender.addr().ip(), text);

        for peer in self.registry.snapshot().await {
            if peer == *sender {
                continue;
            }
            if peer.send(line.clone()).is_err() {
                // Delivery failure for this one recipient only
                self.registry.remove(peer.id()).await;
                debug!(addr = %peer.addr(), "broadcast recipient gone, evicted from registry");
            }
        }
        Ok(())
    }

    /// Plain text: deliver to the sender's current group, or nag
    async fn handle_group_post(
        &self,
        sender: &ClientHandle,
        current_group: Option<&str>,
        text: &str,
    ) -> Result<()> {
        let group = match current_group {
            Some(group) => group,
            None => return sender.send("You must join a group or use /dm or /all."),
        };

        let line = format!("{}: {}", sender.addr().ip(), text);

        for id in self.groups.members(group).await {
            if id == sender.id() {
                continue;
            }
            let delivered = match self.registry.get(id).await {
                Some(peer) => peer.send(line.clone()).is_ok(),
                // Already out of the registry; membership entry is stale
                None => false,
            };
            if !delivered {
                self.groups.remove_member(group, id).await;
                debug!(group = %group, "group member gone, evicted from group");
            }
        }
        Ok(())
    }
}
