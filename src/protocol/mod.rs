//! Wire protocol for the chat relay
//!
//! The wire format is newline-delimited UTF-8 text: one logical message per
//! line. [`codec`] provides the framing, [`command`] the inbound grammar.

pub mod codec;
pub mod command;

pub use codec::LineCodec;
pub use command::{Command, CommandError};
