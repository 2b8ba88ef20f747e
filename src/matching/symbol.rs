//! Trading symbol identification

use serde::{Deserialize, Serialize};
use std::fmt;

/// A trading symbol registered with the market manager.
///
/// Symbols are identified by a small integer id and carry a fixed
/// 8-byte ASCII name, matching the wire representation used by common
/// market data feeds. Names shorter than 8 bytes are zero padded;
/// longer names are truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    /// Symbol id, unique within one market manager
    pub id: u32,
    /// Fixed-size ASCII name, zero padded
    pub name: [u8; 8],
}

impl Symbol {
    /// Create a new symbol from an id and a name.
    ///
    /// The name is copied into the fixed 8-byte buffer; anything past
    /// the eighth byte is dropped.
    pub fn new(id: u32, name: &str) -> Self {
        let mut buf = [0u8; 8];
        for (dst, src) in buf.iter_mut().zip(name.bytes()) {
            *dst = src;
        }
        Self { id, name: buf }
    }

    /// The symbol name with trailing padding stripped.
    pub fn name(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(8);
        std::str::from_utf8(&self.name[..end]).unwrap_or("")
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.name())
    }
}
