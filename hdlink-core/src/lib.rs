//! Board-agnostic link engine for the hdlink serial protocol
//!
//! This crate turns the framing from `hdlink-protocol` into an acknowledged
//! channel between two peers:
//!
//! - Connection state machine (down, awaiting accept, up)
//! - Stop-and-wait acknowledgment with cumulative acks
//! - Timer-driven handshake retry and retransmission
//! - Lock-guarded wrapper for multi-context use
//! - Command dispatch table and payload helpers for applications
//!
//! The engine depends on its environment only through the traits in
//! `hdlink-hal`: a byte sink and a single-shot timer service.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod command;
pub mod config;
pub mod link;
pub mod shared;

pub use command::{CommandDispatcher, CommandHandler, PacketBuilder, PayloadReader};
pub use config::{LinkConfig, Role};
pub use link::{Link, LinkError, LinkState, LinkStats, Outbox, PacketListener};
pub use shared::SharedLink;
