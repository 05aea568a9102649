//! Host configuration
//!
//! Loaded from a TOML file. Every field is optional:
//!
//! ```toml
//! device = "/dev/ttyUSB0"
//!
//! [link]
//! role = "secondary"
//! link_timeout_ms = 1000
//! retransmit_timeout_ms = 500
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hdlink_core::LinkConfig;
use serde::Deserialize;

/// Top-level host configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Device file to open; stdin/stdout when absent
    pub device: Option<PathBuf>,
    /// Link timing and role
    pub link: LinkConfig,
}

impl HostConfig {
    /// Parse configuration text
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }
}
