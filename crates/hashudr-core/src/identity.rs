//! # Connection Identity
//!
//! A connection is identified by the attachment id the host reports for it.
//! The id is stable for the lifetime of the connection and unique among the
//! connections currently open in the process; it is not unique across
//! process restarts.

use serde::{Deserialize, Serialize};

/// Opaque identifier of one host connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw attachment id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw attachment id.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for ConnectionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "att:{}", self.0)
    }
}
