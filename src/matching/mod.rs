//! Price-time-priority matching engine: symbols, per-symbol order
//! books, order management commands and market event reporting.

mod book;
mod engine;
mod error;
mod events;
mod handler;
mod level;
mod manager;
mod modifications;
mod order;
mod snapshot;
mod symbol;


pub use book::OrderBook;
pub use error::ErrorKind;
pub use events::{EventCollector, MarketEvent, StdEventSender, TokioEventSender};
pub use handler::{MarketHandler, NullMarketHandler};
pub use level::{Level, LevelKind, LevelUpdate, UpdateKind};
pub use manager::MarketManager;
pub use order::{Order, OrderKind, Side, TimeInForce};
pub use snapshot::{OrderBookSnapshot, SNAPSHOT_FORMAT_VERSION, SnapshotError, SnapshotPackage};
pub use symbol::Symbol;
