//! Configuration types
//!
//! Link timing and role. Hosts load these from TOML; firmware builds them
//! in code.

pub mod types;

pub use types::*;
