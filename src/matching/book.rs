//! Per-symbol order book: bid/ask price ladders, stop and trailing
//! stop ladders, and the market reference prices used for stop
//! activation and trailing recalculation.

use super::level::{Level, LevelKind, LevelUpdate, PriceLevel, UpdateKind};
use super::order::{Order, Side};
use super::symbol::Symbol;
use crossbeam::atomic::AtomicCell;
use crossbeam_skiplist::SkipMap;
use either::Either;
use std::ops::Bound;
use std::sync::Arc;

/// A price-time-priority order book for a single symbol.
///
/// The book keeps six price ladders: the visible bid and ask sides plus
/// four internal stop ladders (buy/sell stop and buy/sell trailing
/// stop). Ladders are ordered skip maps keyed by price, so the best
/// level is always the first (asks, buy stops) or last (bids, sell
/// stops) entry and neighbor lookups are O(log n).
///
/// The book also tracks the market reference prices:
///
/// * `last_bid` / `last_ask` — the prices of the most recent sell-side
///   and buy-side executions, used for stop activation,
/// * `matching_bid` / `matching_ask` — the same, but scoped to the
///   currently running matching pass and reset at each command tail,
/// * `trailing_bid` / `trailing_ask` — the references the trailing
///   ladders were last recalculated against.
///
/// Mutation happens exclusively through the market manager; hosts see
/// the book through its read accessors and through level updates.
pub struct OrderBook {
    symbol: Symbol,

    bids: SkipMap<u64, Arc<PriceLevel>>,
    asks: SkipMap<u64, Arc<PriceLevel>>,

    buy_stop: SkipMap<u64, Arc<PriceLevel>>,
    sell_stop: SkipMap<u64, Arc<PriceLevel>>,

    trailing_buy_stop: SkipMap<u64, Arc<PriceLevel>>,
    trailing_sell_stop: SkipMap<u64, Arc<PriceLevel>>,

    last_bid_price: AtomicCell<u64>,
    last_ask_price: AtomicCell<u64>,
    matching_bid_price: AtomicCell<u64>,
    matching_ask_price: AtomicCell<u64>,
    trailing_bid_price: AtomicCell<u64>,
    trailing_ask_price: AtomicCell<u64>,
}

impl OrderBook {
    pub(super) fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: SkipMap::new(),
            asks: SkipMap::new(),
            buy_stop: SkipMap::new(),
            sell_stop: SkipMap::new(),
            trailing_buy_stop: SkipMap::new(),
            trailing_sell_stop: SkipMap::new(),
            last_bid_price: AtomicCell::new(0),
            last_ask_price: AtomicCell::new(u64::MAX),
            matching_bid_price: AtomicCell::new(u64::MAX),
            matching_ask_price: AtomicCell::new(0),
            trailing_bid_price: AtomicCell::new(0),
            trailing_ask_price: AtomicCell::new(u64::MAX),
        }
    }

    /// The symbol this book trades.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Is the book (including the stop ladders) empty?
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Total number of price levels across all six ladders.
    pub fn size(&self) -> usize {
        self.bids.len()
            + self.asks.len()
            + self.buy_stop.len()
            + self.sell_stop.len()
            + self.trailing_buy_stop.len()
            + self.trailing_sell_stop.len()
    }

    /// Best bid price, if any bid is resting.
    pub fn best_bid(&self) -> Option<u64> {
        self.bids.back().map(|entry| *entry.key())
    }

    /// Best ask price, if any ask is resting.
    pub fn best_ask(&self) -> Option<u64> {
        self.asks.front().map(|entry| *entry.key())
    }

    /// Snapshot of the bid level at `price`.
    pub fn bid_level(&self, price: u64) -> Option<Level> {
        self.bids.get(&price).map(|entry| entry.value().snapshot())
    }

    /// Snapshot of the ask level at `price`.
    pub fn ask_level(&self, price: u64) -> Option<Level> {
        self.asks.get(&price).map(|entry| entry.value().snapshot())
    }

    /// Level snapshots of one side, best price first.
    pub fn levels(&self, side: Side) -> impl Iterator<Item = Level> + '_ {
        match side {
            Side::Buy => Either::Left(self.bids.iter().rev().map(|entry| entry.value().snapshot())),
            Side::Sell => Either::Right(self.asks.iter().map(|entry| entry.value().snapshot())),
        }
    }

    /// Stop level snapshots of one side, first-to-trigger first.
    pub fn stop_levels(&self, side: Side) -> impl Iterator<Item = Level> + '_ {
        match side {
            Side::Buy => {
                Either::Left(self.buy_stop.iter().map(|entry| entry.value().snapshot()))
            }
            Side::Sell => Either::Right(
                self.sell_stop
                    .iter()
                    .rev()
                    .map(|entry| entry.value().snapshot()),
            ),
        }
    }

    /// Trailing stop level snapshots of one side, first-to-trigger
    /// first.
    pub fn trailing_stop_levels(&self, side: Side) -> impl Iterator<Item = Level> + '_ {
        match side {
            Side::Buy => Either::Left(
                self.trailing_buy_stop
                    .iter()
                    .map(|entry| entry.value().snapshot()),
            ),
            Side::Sell => Either::Right(
                self.trailing_sell_stop
                    .iter()
                    .rev()
                    .map(|entry| entry.value().snapshot()),
            ),
        }
    }

    // Live level access for the matching engine.

    pub(super) fn best_bid_level(&self) -> Option<Arc<PriceLevel>> {
        self.bids.back().map(|entry| entry.value().clone())
    }

    pub(super) fn best_ask_level(&self) -> Option<Arc<PriceLevel>> {
        self.asks.front().map(|entry| entry.value().clone())
    }

    pub(super) fn best_buy_stop_level(&self) -> Option<Arc<PriceLevel>> {
        self.buy_stop.front().map(|entry| entry.value().clone())
    }

    pub(super) fn best_sell_stop_level(&self) -> Option<Arc<PriceLevel>> {
        self.sell_stop.back().map(|entry| entry.value().clone())
    }

    pub(super) fn best_trailing_buy_stop_level(&self) -> Option<Arc<PriceLevel>> {
        self.trailing_buy_stop
            .front()
            .map(|entry| entry.value().clone())
    }

    pub(super) fn best_trailing_sell_stop_level(&self) -> Option<Arc<PriceLevel>> {
        self.trailing_sell_stop
            .back()
            .map(|entry| entry.value().clone())
    }

    /// The next level inward from `level` on its own side of the
    /// visible book: the next lower bid or the next higher ask.
    pub(super) fn next_crossing_level(&self, level: &PriceLevel) -> Option<Arc<PriceLevel>> {
        match level.kind() {
            LevelKind::Bid => self
                .bids
                .upper_bound(Bound::Excluded(&level.price()))
                .map(|entry| entry.value().clone()),
            LevelKind::Ask => self
                .asks
                .lower_bound(Bound::Excluded(&level.price()))
                .map(|entry| entry.value().clone()),
        }
    }

    /// The next trailing stop level after `level` in trigger order.
    pub(super) fn next_trailing_level(&self, level: &PriceLevel) -> Option<Arc<PriceLevel>> {
        match level.kind() {
            // Buy stops watch the ask market and trigger lowest first
            LevelKind::Ask => self
                .trailing_buy_stop
                .lower_bound(Bound::Excluded(&level.price()))
                .map(|entry| entry.value().clone()),
            LevelKind::Bid => self
                .trailing_sell_stop
                .upper_bound(Bound::Excluded(&level.price()))
                .map(|entry| entry.value().clone()),
        }
    }

    // Limit order primitives. Each returns the level update to report.

    pub(super) fn add_limit_order(&self, order: &Order) -> LevelUpdate {
        let (ladder, kind) = match order.side {
            Side::Buy => (&self.bids, LevelKind::Bid),
            Side::Sell => (&self.asks, LevelKind::Ask),
        };

        let (level, update_kind) = Self::add_to_ladder(ladder, kind, order.price, order);

        LevelUpdate {
            kind: update_kind,
            level: level.snapshot(),
            top: self.is_top_of_book(order.side, Some(order.price)),
        }
    }

    pub(super) fn reduce_limit_order(
        &self,
        order: &Order,
        quantity: u64,
        hidden: u64,
        visible: u64,
    ) -> LevelUpdate {
        let ladder = match order.side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };

        let (snapshot, update_kind) =
            Self::reduce_in_ladder(ladder, order, order.price, quantity, hidden, visible);
        let location = (update_kind != UpdateKind::Delete).then_some(order.price);

        LevelUpdate {
            kind: update_kind,
            level: snapshot,
            top: self.is_top_of_book(order.side, location),
        }
    }

    pub(super) fn delete_limit_order(&self, order: &Order) -> LevelUpdate {
        let ladder = match order.side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };

        let (snapshot, update_kind) = Self::delete_in_ladder(ladder, order, order.price);
        let location = (update_kind != UpdateKind::Delete).then_some(order.price);

        LevelUpdate {
            kind: update_kind,
            level: snapshot,
            top: self.is_top_of_book(order.side, location),
        }
    }

    // Stop order primitives. Stop ladders are internal, so no level
    // updates are reported.

    pub(super) fn add_stop_order(&self, order: &Order) {
        let (ladder, kind) = match order.side {
            Side::Buy => (&self.buy_stop, LevelKind::Ask),
            Side::Sell => (&self.sell_stop, LevelKind::Bid),
        };
        Self::add_to_ladder(ladder, kind, order.stop_price, order);
    }

    pub(super) fn reduce_stop_order(
        &self,
        order: &Order,
        quantity: u64,
        hidden: u64,
        visible: u64,
    ) {
        let ladder = match order.side {
            Side::Buy => &self.buy_stop,
            Side::Sell => &self.sell_stop,
        };
        Self::reduce_in_ladder(ladder, order, order.stop_price, quantity, hidden, visible);
    }

    pub(super) fn delete_stop_order(&self, order: &Order) {
        let ladder = match order.side {
            Side::Buy => &self.buy_stop,
            Side::Sell => &self.sell_stop,
        };
        Self::delete_in_ladder(ladder, order, order.stop_price);
    }

    pub(super) fn add_trailing_stop_order(&self, order: &Order) {
        let (ladder, kind) = match order.side {
            Side::Buy => (&self.trailing_buy_stop, LevelKind::Ask),
            Side::Sell => (&self.trailing_sell_stop, LevelKind::Bid),
        };
        Self::add_to_ladder(ladder, kind, order.stop_price, order);
    }

    pub(super) fn reduce_trailing_stop_order(
        &self,
        order: &Order,
        quantity: u64,
        hidden: u64,
        visible: u64,
    ) {
        let ladder = match order.side {
            Side::Buy => &self.trailing_buy_stop,
            Side::Sell => &self.trailing_sell_stop,
        };
        Self::reduce_in_ladder(ladder, order, order.stop_price, quantity, hidden, visible);
    }

    pub(super) fn delete_trailing_stop_order(&self, order: &Order) {
        let ladder = match order.side {
            Side::Buy => &self.trailing_buy_stop,
            Side::Sell => &self.trailing_sell_stop,
        };
        Self::delete_in_ladder(ladder, order, order.stop_price);
    }

    fn add_to_ladder(
        ladder: &SkipMap<u64, Arc<PriceLevel>>,
        kind: LevelKind,
        price: u64,
        order: &Order,
    ) -> (Arc<PriceLevel>, UpdateKind) {
        let (level, update_kind) = match ladder.get(&price) {
            Some(entry) => (entry.value().clone(), UpdateKind::Update),
            None => {
                let level = Arc::new(PriceLevel::new(kind, price));
                ladder.insert(price, level.clone());
                (level, UpdateKind::Add)
            }
        };

        level.add_volume(
            order.leaves_quantity,
            order.hidden_quantity(),
            order.visible_quantity(),
        );
        level.push_order(order.id);

        (level, update_kind)
    }

    fn reduce_in_ladder(
        ladder: &SkipMap<u64, Arc<PriceLevel>>,
        order: &Order,
        price: u64,
        quantity: u64,
        hidden: u64,
        visible: u64,
    ) -> (Level, UpdateKind) {
        let level = ladder
            .get(&price)
            .map(|entry| entry.value().clone())
            .expect("resting order must be linked to a price level");

        level.sub_volume(quantity, hidden, visible);

        // The caller reduced the order first; an emptied order leaves
        // the FIFO queue immediately.
        if order.leaves_quantity == 0 {
            level.remove_order(order.id);
        }

        let snapshot = level.snapshot();
        if level.total_volume() == 0 {
            ladder.remove(&price);
            (snapshot, UpdateKind::Delete)
        } else {
            (snapshot, UpdateKind::Update)
        }
    }

    fn delete_in_ladder(
        ladder: &SkipMap<u64, Arc<PriceLevel>>,
        order: &Order,
        price: u64,
    ) -> (Level, UpdateKind) {
        let level = ladder
            .get(&price)
            .map(|entry| entry.value().clone())
            .expect("resting order must be linked to a price level");

        level.sub_volume(
            order.leaves_quantity,
            order.hidden_quantity(),
            order.visible_quantity(),
        );
        level.remove_order(order.id);

        let snapshot = level.snapshot();
        if level.total_volume() == 0 {
            ladder.remove(&price);
            (snapshot, UpdateKind::Delete)
        } else {
            (snapshot, UpdateKind::Update)
        }
    }

    /// Whether the level at `price` is the best of `side` after the
    /// mutation. A removed level (`price` = `None`) counts as top only
    /// when its side emptied.
    fn is_top_of_book(&self, side: Side, price: Option<u64>) -> bool {
        let best = match side {
            Side::Buy => self.best_bid(),
            Side::Sell => self.best_ask(),
        };
        best == price
    }

    // Market reference prices.

    /// The bid-side market price used for stop activation: the price of
    /// the most recent sell-side execution (0 before any trade).
    pub fn market_price_bid(&self) -> u64 {
        self.last_bid_price.load()
    }

    /// The ask-side market price used for stop activation: the price of
    /// the most recent buy-side execution (`u64::MAX` before any
    /// trade).
    pub fn market_price_ask(&self) -> u64 {
        self.last_ask_price.load()
    }

    /// The bid-side reference for trailing sell stops: the lower of the
    /// in-pass matching bid price and the last bid price.
    pub fn market_trailing_stop_price_bid(&self) -> u64 {
        self.matching_bid_price.load().min(self.last_bid_price.load())
    }

    /// The ask-side reference for trailing buy stops: the higher of the
    /// in-pass matching ask price and the last ask price.
    pub fn market_trailing_stop_price_ask(&self) -> u64 {
        self.matching_ask_price.load().max(self.last_ask_price.load())
    }

    /// Record an execution in the last prices. Executions update the
    /// counterparty side: a sell execution prints on the bid, a buy
    /// execution on the ask.
    pub(super) fn update_last_price(&self, order: &Order, price: u64) {
        if order.is_sell() {
            self.last_bid_price.store(price);
        } else {
            self.last_ask_price.store(price);
        }
    }

    /// Record an execution in the matching-pass prices, with the same
    /// counterparty rule as [`Self::update_last_price`].
    pub(super) fn update_matching_price(&self, order: &Order, price: u64) {
        if order.is_sell() {
            self.matching_bid_price.store(price);
        } else {
            self.matching_ask_price.store(price);
        }
    }

    /// Restore the matching-pass price sentinels. Runs at the tail of
    /// every command so the trailing references degrade to the last
    /// prices between passes.
    pub(super) fn reset_matching_price(&self) {
        self.matching_bid_price.store(u64::MAX);
        self.matching_ask_price.store(0);
    }

    pub(super) fn trailing_bid_price(&self) -> u64 {
        self.trailing_bid_price.load()
    }

    pub(super) fn trailing_ask_price(&self) -> u64 {
        self.trailing_ask_price.load()
    }

    pub(super) fn set_trailing_bid_price(&self, price: u64) {
        self.trailing_bid_price.store(price);
    }

    pub(super) fn set_trailing_ask_price(&self, price: u64) {
        self.trailing_ask_price.store(price);
    }

    /// Compute the stop price a trailing stop order should currently
    /// carry.
    ///
    /// The reference is the trailing market price of the side the stop
    /// watches (ask for buy stops, bid for sell stops). Negative
    /// trailing distance and step are basis points of the reference
    /// price; positive values are absolute ticks. The candidate price
    /// sits `distance` away from the reference (saturating at the tick
    /// range bounds) and replaces the current stop price only when it
    /// moves in the favorable direction by more than the step.
    pub(super) fn calculate_trailing_stop_price(&self, order: &Order) -> u64 {
        let market_price = if order.is_buy() {
            self.market_trailing_stop_price_ask()
        } else {
            self.market_trailing_stop_price_bid()
        };

        let distance = Self::trailing_offset(order.trailing_distance, market_price);
        let step = Self::trailing_offset(order.trailing_step, market_price);

        let old_price = order.stop_price;
        if order.is_buy() {
            let new_price = market_price.saturating_add(distance);
            if new_price < old_price && old_price - new_price > step {
                return new_price;
            }
        } else {
            let new_price = market_price.saturating_sub(distance);
            if new_price > old_price && new_price - old_price > step {
                return new_price;
            }
        }

        old_price
    }

    /// Resolve the signed trailing encoding into absolute ticks:
    /// positive values pass through, negative values are basis points
    /// of `market_price` (-1 = 0.01%).
    fn trailing_offset(value: i64, market_price: u64) -> u64 {
        if value >= 0 {
            value as u64
        } else {
            ((market_price as u128 * value.unsigned_abs() as u128) / 10_000) as u64
        }
    }
}
