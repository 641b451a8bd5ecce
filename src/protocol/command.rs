//! Inbound command grammar
//!
//! Each inbound line is trimmed and dispatched by prefix: a small command set
//! layered over a default "post to current group" behavior. Anything that
//! does not match a known command — including unknown `/`-prefixed text — is
//! a plain post.

use std::net::SocketAddr;

/// A parsed inbound line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/join <name>` — switch to the named group
    Join(String),
    /// `/leave` — leave the current group
    Leave,
    /// `/dm <ip:port> <text>` — message one client by address
    DirectMessage { target: SocketAddr, text: String },
    /// `/all <text>` — message every connected client
    Broadcast(String),
    /// Plain text for the sender's current group
    Post(String),
}

/// A line that looked like a command but cannot be executed
///
/// These are recovered locally: the reply goes back to the sender and the
/// connection stays open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// `/join` with no group name
    MissingGroupName,
    /// `/dm` with fewer than two arguments
    DmUsage,
    /// `/dm` target that does not parse as `ip:port`
    InvalidAddress,
}

impl CommandError {
    /// The usage string sent back to the offending client
    pub fn reply(&self) -> &'static str {
        match self {
            CommandError::MissingGroupName => "Usage: /join <group_name>",
            CommandError::DmUsage => "Usage: /dm <IP:PORT> <message>",
            CommandError::InvalidAddress => "Invalid address format. Use IP:PORT.",
        }
    }
}

impl Command {
    /// Parse one trimmed inbound line
    pub fn parse(line: &str) -> Result<Command, CommandError> {
        let line = line.trim();

        if let Some(rest) = strip_command(line, "/join") {
            let name = rest.trim();
            if name.is_empty() {
                return Err(CommandError::MissingGroupName);
            }
            return Ok(Command::Join(name.to_string()));
        }

        if strip_command(line, "/leave").is_some() {
            return Ok(Command::Leave);
        }

        if let Some(rest) = strip_command(line, "/dm") {
            let rest = rest.trim_start();
            let (target, text) = match rest.split_once(' ') {
                Some((target, text)) => (target, text),
                None => return Err(CommandError::DmUsage),
            };
            if target.is_empty() {
                return Err(CommandError::DmUsage);
            }
            let target: SocketAddr = target
                .trim()
                .parse()
                .map_err(|_| CommandError::InvalidAddress)?;
            return Ok(Command::DirectMessage {
                target,
                text: text.to_string(),
            });
        }

        if let Some(rest) = strip_command(line, "/all") {
            // Missing text is an empty broadcast, not an error
            return Ok(Command::Broadcast(rest.trim_start().to_string()));
        }

        Ok(Command::Post(line.to_string()))
    }
}

/// Match a command word at the start of the line, followed by a space or
/// end-of-line, and return the remainder. `/joined` is not `/join`.
fn strip_command<'a>(line: &'a str, word: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(word)?;
    if rest.is_empty() {
        Some("")
    } else if rest.starts_with(' ') {
        Some(&rest[1..])
    } else {
        None
    }
}
