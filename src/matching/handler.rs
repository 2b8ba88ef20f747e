//! Market event handler interface.
//!
//! The market manager reports every state change through a
//! [`MarketHandler`] implemented by the host: symbol and order book
//! lifecycle, order lifecycle, price level changes and executions.
//! Callbacks are invoked synchronously, in emission order, while the
//! triggering command runs.
//!
//! Handlers must not re-enter the market manager from a callback. A
//! host that needs to issue follow-up commands should queue the events
//! and act on them after the command returns; see
//! [`StdEventSender`](crate::matching::StdEventSender) and
//! [`TokioEventSender`](crate::matching::TokioEventSender) for
//! ready-made queueing handlers.

use super::book::OrderBook;
use super::level::Level;
use super::order::Order;
use super::symbol::Symbol;

/// Receiver of market events emitted by the market manager.
///
/// All methods default to no-ops so implementations only override what
/// they consume.
pub trait MarketHandler {
    /// A symbol was registered.
    fn on_add_symbol(&mut self, _symbol: &Symbol) {}

    /// A symbol was unregistered.
    fn on_delete_symbol(&mut self, _symbol: &Symbol) {}

    /// An order book was created.
    fn on_add_order_book(&mut self, _order_book: &OrderBook) {}

    /// A price level of the order book changed; `top` is set when the
    /// change touched the best level of its side.
    fn on_update_order_book(&mut self, _order_book: &OrderBook, _top: bool) {}

    /// An order book was torn down.
    fn on_delete_order_book(&mut self, _order_book: &OrderBook) {}

    /// A price level was created.
    fn on_add_level(&mut self, _order_book: &OrderBook, _level: &Level, _top: bool) {}

    /// A price level changed volume or order count.
    fn on_update_level(&mut self, _order_book: &OrderBook, _level: &Level, _top: bool) {}

    /// A price level was emptied and removed.
    fn on_delete_level(&mut self, _order_book: &OrderBook, _level: &Level, _top: bool) {}

    /// An order entered the market (every add command reports this,
    /// including orders that execute or cancel immediately).
    fn on_add_order(&mut self, _order: &Order) {}

    /// An order changed (partial fill, reduce, modify, stop
    /// activation).
    fn on_update_order(&mut self, _order: &Order) {}

    /// An order left the market (filled, cancelled or killed).
    fn on_delete_order(&mut self, _order: &Order) {}

    /// An order executed `quantity` at `price`.
    fn on_execute_order(&mut self, _order: &Order, _price: u64, _quantity: u64) {}
}

/// A market handler that discards every event.
///
/// Default handler of [`MarketManager::new`](crate::matching::MarketManager::new).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMarketHandler;

impl MarketHandler for NullMarketHandler {}
