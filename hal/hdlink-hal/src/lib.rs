//! hdlink Hardware Abstraction Layer
//!
//! This crate defines the collaborator traits the link engine needs from its
//! environment. The engine never opens devices or spawns timers itself; a
//! board or host integration implements these traits and hands them in.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Integration (hdlink-host, firmware)    │
//! └─────────────────────────────────────────┘
//!           │ implements            │ drives
//!           ▼                       ▼
//! ┌───────────────────┐   ┌───────────────────┐
//! │ hdlink-hal traits │◄──│    hdlink-core    │
//! └───────────────────┘   └───────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::UartTx`], [`uart::UartRx`] - Serial byte stream
//! - [`timer::TimerService`] - Single-shot, cancellable timers

#![no_std]
#![deny(unsafe_code)]

pub mod timer;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use timer::{TimerHandle, TimerService};
pub use uart::{UartRx, UartTx};
