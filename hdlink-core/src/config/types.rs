//! Configuration type definitions

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Delay before an unanswered handshake request is repeated
pub const DEFAULT_LINK_TIMEOUT_MS: u32 = 1000;

/// Delay before an unacknowledged information frame is repeated
pub const DEFAULT_RETRANSMIT_TIMEOUT_MS: u32 = 500;

/// Which side of the link this endpoint plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Role {
    /// Initiates the link with SNRM and answers unexpected frames with DM
    #[default]
    Primary,
    /// Accepts SNRM with UA and treats DM as a plain disconnect
    Secondary,
}

/// Link configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinkConfig {
    /// Handshake retry interval (ms)
    pub link_timeout_ms: u32,
    /// Retransmission interval (ms)
    pub retransmit_timeout_ms: u32,
    /// Endpoint role
    pub role: Role,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            link_timeout_ms: DEFAULT_LINK_TIMEOUT_MS,
            retransmit_timeout_ms: DEFAULT_RETRANSMIT_TIMEOUT_MS,
            role: Role::Primary,
        }
    }
}

impl LinkConfig {
    /// Default timing with the given role
    pub fn with_role(role: Role) -> Self {
        Self {
            role,
            ..Self::default()
        }
    }
}
