//! # Matchbook: a price-time-priority matching engine
//!
//! An in-memory limit order book matching engine for a single trading
//! venue. The engine ingests book-management commands (add symbol,
//! add/modify/replace/execute/delete order) and maintains, per symbol,
//! a price-time-priority order book with automatic crossing, stop order
//! activation, trailing stop recalculation and iceberg/all-or-none
//! semantics. Every state change is reported through a synchronous
//! [`MarketHandler`] that downstream consumers use to drive market data
//! feeds, risk and settlement.
//!
//! ## Key features
//!
//! - **Six order kinds**: market, limit, stop, stop-limit, trailing
//!   stop and trailing stop-limit, with GTC/IOC/FOK/AON time-in-force
//!   policies, iceberg/hidden quantities and market order slippage
//!   bounds.
//! - **Full matching semantics**: price-time priority, FOK/AON chain
//!   matching across price levels, iceberg visible-quantity refresh,
//!   stop activation cascades and trailing stop re-anchoring with
//!   absolute-tick or basis-point distances.
//! - **Deterministic event stream**: one synchronous callback sequence
//!   per command — order added, updated, deleted, executed, plus price
//!   level and book updates with top-of-book flags.
//! - **Per-symbol books**: ordered skip-list ladders with O(log n)
//!   level lookup and O(1) best access; five auxiliary stop ladders per
//!   book.
//! - **Snapshots**: depth-limited level dumps with JSON serialization
//!   and SHA-256 checksummed packages.
//!
//! ## Design
//!
//! The engine is single-threaded and cooperative within one command:
//! commands are atomic transactions, callbacks fire in emission order
//! and no other command interleaves. Scale out by partitioning symbols
//! across independent [`MarketManager`] instances; nothing is shared
//! between them.
//!
//! Automatic matching is off until [`MarketManager::enable_matching`]
//! is called, which immediately runs a full matching pass. With
//! matching disabled, commands still maintain the books and a manual
//! [`MarketManager::match_all`] crosses them on demand.
//!
//! ## Example
//!
//! ```
//! use matchbook_rs::prelude::*;
//!
//! let mut market = MarketManager::with_handler(EventCollector::new());
//!
//! let symbol = Symbol::new(0, "TEST");
//! market.add_symbol(symbol).unwrap();
//! market.add_order_book(0).unwrap();
//! market.enable_matching();
//!
//! market.add_order(Order::buy_limit(1, 0, 100, 10)).unwrap();
//! market.add_order(Order::sell_limit(2, 0, 100, 5)).unwrap();
//!
//! let book = market.order_book(0).unwrap();
//! assert_eq!(book.best_bid(), Some(100));
//! assert_eq!(
//!     market.handler().executions(),
//!     vec![(1, 100, 5), (2, 100, 5)]
//! );
//! ```

pub mod matching;
pub mod prelude;

pub use matching::{
    ErrorKind, EventCollector, Level, LevelKind, LevelUpdate, MarketEvent, MarketHandler,
    MarketManager, NullMarketHandler, Order, OrderBook, OrderBookSnapshot, OrderKind,
    SNAPSHOT_FORMAT_VERSION, Side, SnapshotError, SnapshotPackage, StdEventSender, Symbol,
    TimeInForce, TokioEventSender, UpdateKind,
};
