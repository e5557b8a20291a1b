use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a simulated system: the address-like key of the
/// skeleton root node that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SystemKey(pub u64);

impl SystemKey {
    /// Create a key from a raw root-node identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw root-node identifier.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for SystemKey {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SystemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{:x}", self.0)
    }
}
