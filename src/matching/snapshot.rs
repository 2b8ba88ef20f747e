//! Order book snapshots for market data export.

use super::book::OrderBook;
use super::level::Level;
use super::order::Side;
use super::symbol::Symbol;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Format version of checksum-carrying snapshot packages.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Errors of the snapshot export/import path.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The snapshot could not be serialized or deserialized
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The package was produced by an unsupported format version
    #[error("unsupported snapshot version: {version} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the package
        version: u32,
        /// Version this build understands
        expected: u32,
    },

    /// The package contents do not match their checksum
    #[error("snapshot checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum recorded in the package
        expected: String,
        /// Checksum computed from the payload
        actual: String,
    },
}

/// A point-in-time dump of the visible sides of one order book,
/// best price first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Symbol of the book
    pub symbol: Symbol,
    /// Bid levels, best (highest) first
    pub bids: Vec<Level>,
    /// Ask levels, best (lowest) first
    pub asks: Vec<Level>,
}

impl OrderBookSnapshot {
    /// Best bid price and visible quantity.
    pub fn best_bid(&self) -> Option<(u64, u64)> {
        self.bids
            .first()
            .map(|level| (level.price, level.visible_volume))
    }

    /// Best ask price and visible quantity.
    pub fn best_ask(&self) -> Option<(u64, u64)> {
        self.asks
            .first()
            .map(|level| (level.price, level.visible_volume))
    }

    /// Mid price between the best bid and ask.
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some((bid as f64 + ask as f64) / 2.0),
            _ => None,
        }
    }

    /// Spread between the best ask and bid.
    pub fn spread(&self) -> Option<u64> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(ask.saturating_sub(bid)),
            _ => None,
        }
    }

    /// Total resting volume on the bid side.
    pub fn total_bid_volume(&self) -> u64 {
        self.bids.iter().map(|level| level.total_volume).sum()
    }

    /// Total resting volume on the ask side.
    pub fn total_ask_volume(&self) -> u64 {
        self.asks.iter().map(|level| level.total_volume).sum()
    }
}

impl OrderBook {
    /// Take a snapshot of the visible book, keeping at most `depth`
    /// levels per side (`usize::MAX` for the whole book).
    pub fn snapshot(&self, depth: usize) -> OrderBookSnapshot {
        OrderBookSnapshot {
            symbol: *self.symbol(),
            bids: self.levels(Side::Buy).take(depth).collect(),
            asks: self.levels(Side::Sell).take(depth).collect(),
        }
    }
}

/// A snapshot wrapped with a format version and a SHA-256 checksum of
/// its serialized contents, for transfer between systems that need
/// integrity validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPackage {
    /// Snapshot schema version
    pub version: u32,
    /// Snapshot payload
    pub snapshot: OrderBookSnapshot,
    /// Hex-encoded SHA-256 of the serialized snapshot
    pub checksum: String,
}

impl SnapshotPackage {
    /// Wrap a snapshot, computing the checksum of its contents.
    ///
    /// # Errors
    /// [`SnapshotError::Serialization`] when the payload cannot be
    /// serialized for hashing.
    pub fn new(snapshot: OrderBookSnapshot) -> Result<Self, SnapshotError> {
        let checksum = Self::compute_checksum(&snapshot)?;
        Ok(Self {
            version: SNAPSHOT_FORMAT_VERSION,
            snapshot,
            checksum,
        })
    }

    /// Serialize the package to JSON.
    ///
    /// # Errors
    /// [`SnapshotError::Serialization`] on serializer failures.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize a package from JSON.
    ///
    /// # Errors
    /// [`SnapshotError::Serialization`] on malformed input.
    pub fn from_json(data: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Check the format version and recompute the checksum.
    ///
    /// # Errors
    /// [`SnapshotError::UnsupportedVersion`] or
    /// [`SnapshotError::ChecksumMismatch`] when the package cannot be
    /// trusted.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                version: self.version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }

        let computed = Self::compute_checksum(&self.snapshot)?;
        if computed != self.checksum {
            return Err(SnapshotError::ChecksumMismatch {
                expected: self.checksum.clone(),
                actual: computed,
            });
        }

        Ok(())
    }

    fn compute_checksum(snapshot: &OrderBookSnapshot) -> Result<String, SnapshotError> {
        let serialized = serde_json::to_vec(snapshot)?;
        let mut hasher = Sha256::new();
        hasher.update(&serialized);
        let digest = hasher.finalize();
        Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }
}
