//! Convenient re-exports of the types most programs need.
//!
//! ```
//! use matchbook_rs::prelude::*;
//!
//! let mut market = MarketManager::new();
//! let symbol = Symbol::new(0, "DEMO");
//! market.add_symbol(symbol).unwrap();
//! market.add_order_book(0).unwrap();
//! market.add_order(Order::buy_limit(1, 0, 100, 10)).unwrap();
//! ```

pub use crate::matching::{
    ErrorKind, EventCollector, Level, LevelKind, MarketEvent, MarketHandler, MarketManager,
    NullMarketHandler, Order, OrderBook, OrderBookSnapshot, OrderKind, Side, SnapshotPackage,
    StdEventSender, Symbol, TimeInForce, TokioEventSender, UpdateKind,
};
