//! Shared identifiers used across the membership table and failure detector.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// A node's identity is its network endpoint. Equality of nodes is equality
/// of endpoints (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node(pub SocketAddr);

impl Node {
    pub fn new(addr: SocketAddr) -> Self {
        Self(addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.0
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SocketAddr> for Node {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

/// A monotonically non-decreasing per-node counter (spec §3).
pub type Incarnation = u64;
