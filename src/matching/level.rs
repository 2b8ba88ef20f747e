//! Price levels and the level update notifications emitted by order
//! book mutations.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Which market side a price level tracks.
///
/// Bid and ask ladders use the obvious orientation. Stop ladders are
/// typed by the side of the market they watch: buy-stop levels trigger
/// off the ask market and are therefore `Ask`-typed, sell-stop levels
/// are `Bid`-typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelKind {
    /// Level on (or watching) the bid side
    Bid,
    /// Level on (or watching) the ask side
    Ask,
}

impl fmt::Display for LevelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelKind::Bid => write!(f, "bid"),
            LevelKind::Ask => write!(f, "ask"),
        }
    }
}

/// A live price level inside an order book ladder.
///
/// A level aggregates the orders resting at one price: total, hidden
/// and visible volume counters plus the FIFO queue of order ids that
/// preserves time priority. The order records themselves live in the
/// market manager's order index; the level only tracks membership.
#[derive(Debug)]
pub struct PriceLevel {
    kind: LevelKind,
    price: u64,
    total_volume: AtomicU64,
    hidden_volume: AtomicU64,
    visible_volume: AtomicU64,
    orders: RwLock<VecDeque<u64>>,
}

impl PriceLevel {
    /// Create an empty price level.
    pub fn new(kind: LevelKind, price: u64) -> Self {
        Self {
            kind,
            price,
            total_volume: AtomicU64::new(0),
            hidden_volume: AtomicU64::new(0),
            visible_volume: AtomicU64::new(0),
            orders: RwLock::new(VecDeque::new()),
        }
    }

    /// The side this level tracks.
    #[inline]
    pub fn kind(&self) -> LevelKind {
        self.kind
    }

    /// Is this a bid-side level?
    #[inline]
    pub fn is_bid(&self) -> bool {
        self.kind == LevelKind::Bid
    }

    /// Is this an ask-side level?
    #[inline]
    pub fn is_ask(&self) -> bool {
        self.kind == LevelKind::Ask
    }

    /// The level price.
    #[inline]
    pub fn price(&self) -> u64 {
        self.price
    }

    /// Total resting volume at this price.
    #[inline]
    pub fn total_volume(&self) -> u64 {
        self.total_volume.load(Ordering::Relaxed)
    }

    /// Hidden part of the resting volume.
    #[inline]
    pub fn hidden_volume(&self) -> u64 {
        self.hidden_volume.load(Ordering::Relaxed)
    }

    /// Visible part of the resting volume.
    #[inline]
    pub fn visible_volume(&self) -> u64 {
        self.visible_volume.load(Ordering::Relaxed)
    }

    /// Number of orders resting at this price.
    pub fn order_count(&self) -> u64 {
        self.read_orders().len() as u64
    }

    /// The order ids at this level in FIFO (time-priority) order.
    pub fn order_ids(&self) -> Vec<u64> {
        self.read_orders().iter().copied().collect()
    }

    /// The id of the first (oldest) order at this level.
    pub fn front_order(&self) -> Option<u64> {
        self.read_orders().front().copied()
    }

    /// Append an order id to the back of the FIFO queue.
    pub fn push_order(&self, id: u64) {
        self.write_orders().push_back(id);
    }

    /// Unlink an order id from the FIFO queue.
    pub fn remove_order(&self, id: u64) {
        let mut orders = self.write_orders();
        if let Some(position) = orders.iter().position(|&other| other == id) {
            let _ = orders.remove(position);
        }
    }

    /// Add volume for an order joining the level.
    pub fn add_volume(&self, total: u64, hidden: u64, visible: u64) {
        self.total_volume.fetch_add(total, Ordering::Relaxed);
        self.hidden_volume.fetch_add(hidden, Ordering::Relaxed);
        self.visible_volume.fetch_add(visible, Ordering::Relaxed);
    }

    /// Subtract volume for an order shrinking or leaving the level.
    /// Saturates at zero.
    pub fn sub_volume(&self, total: u64, hidden: u64, visible: u64) {
        let _ = self
            .total_volume
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |volume| {
                Some(volume.saturating_sub(total))
            });
        let _ = self
            .hidden_volume
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |volume| {
                Some(volume.saturating_sub(hidden))
            });
        let _ = self
            .visible_volume
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |volume| {
                Some(volume.saturating_sub(visible))
            });
    }

    /// Take an immutable snapshot of the level aggregates.
    pub fn snapshot(&self) -> Level {
        Level {
            kind: self.kind,
            price: self.price,
            total_volume: self.total_volume(),
            hidden_volume: self.hidden_volume(),
            visible_volume: self.visible_volume(),
            orders: self.order_count(),
        }
    }

    fn read_orders(&self) -> std::sync::RwLockReadGuard<'_, VecDeque<u64>> {
        self.orders.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_orders(&self) -> std::sync::RwLockWriteGuard<'_, VecDeque<u64>> {
        self.orders.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An immutable snapshot of a price level.
///
/// Snapshots are handed to the market handler with every level change
/// and used in order book snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    /// The side this level tracks
    pub kind: LevelKind,
    /// Level price
    pub price: u64,
    /// Total resting volume
    pub total_volume: u64,
    /// Hidden part of the resting volume
    pub hidden_volume: u64,
    /// Visible part of the resting volume
    pub visible_volume: u64,
    /// Number of resting orders
    pub orders: u64,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} level {} volume={} visible={} orders={}",
            self.kind, self.price, self.total_volume, self.visible_volume, self.orders
        )
    }
}

/// Kind of mutation a level update describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    /// The level was created by this mutation
    Add,
    /// The level changed volume or order count
    Update,
    /// The level was emptied and removed by this mutation
    Delete,
}

/// Notification describing one price level mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelUpdate {
    /// What happened to the level
    pub kind: UpdateKind,
    /// Snapshot of the level after the mutation (before removal for
    /// deletes)
    pub level: Level,
    /// Whether the touched level is the best of its side
    pub top: bool,
}
