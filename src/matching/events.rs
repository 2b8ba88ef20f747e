//! Owned market events and channel-backed handler implementations.
//!
//! [`MarketEvent`] mirrors every [`MarketHandler`] callback as an owned,
//! serializable value. [`EventCollector`] buffers events in memory
//! (useful in tests and debugging tools), while [`StdEventSender`] and
//! [`TokioEventSender`] forward them into `std::sync::mpsc` and
//! `tokio::sync::mpsc` channels respectively, decoupling event
//! consumers from the synchronous command path.

use super::book::OrderBook;
use super::handler::MarketHandler;
use super::level::Level;
use super::order::Order;
use super::symbol::Symbol;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// An owned market event.
///
/// Order book callbacks carry the book's symbol rather than a borrow of
/// the book itself so events can outlive the manager that emitted them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MarketEvent {
    /// A symbol was registered
    AddSymbol(Symbol),
    /// A symbol was unregistered
    DeleteSymbol(Symbol),
    /// An order book was created
    AddOrderBook(Symbol),
    /// An order book changed; `top` marks best-level changes
    UpdateOrderBook {
        /// Symbol of the changed book
        symbol: Symbol,
        /// Whether the change touched the top of the book
        top: bool,
    },
    /// An order book was torn down
    DeleteOrderBook(Symbol),
    /// A price level was created
    AddLevel {
        /// Symbol of the book the level belongs to
        symbol: Symbol,
        /// Snapshot of the level after the change
        level: Level,
        /// Whether the level is the best of its side
        top: bool,
    },
    /// A price level changed
    UpdateLevel {
        /// Symbol of the book the level belongs to
        symbol: Symbol,
        /// Snapshot of the level after the change
        level: Level,
        /// Whether the level is the best of its side
        top: bool,
    },
    /// A price level was removed
    DeleteLevel {
        /// Symbol of the book the level belonged to
        symbol: Symbol,
        /// Snapshot of the level before removal
        level: Level,
        /// Whether the removal emptied the side
        top: bool,
    },
    /// An order entered the market
    AddOrder(Order),
    /// An order changed
    UpdateOrder(Order),
    /// An order left the market
    DeleteOrder(Order),
    /// An order executed
    ExecuteOrder {
        /// The order as it was at execution time
        order: Order,
        /// Execution price
        price: u64,
        /// Executed quantity
        quantity: u64,
    },
}

/// A handler that appends every event to an in-memory buffer.
#[derive(Debug, Default)]
pub struct EventCollector {
    /// Collected events in emission order
    pub events: Vec<MarketEvent>,
}

impl EventCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all collected events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Collected order executions as `(order_id, price, quantity)`.
    pub fn executions(&self) -> Vec<(u64, u64, u64)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                MarketEvent::ExecuteOrder {
                    order,
                    price,
                    quantity,
                } => Some((order.id, *price, *quantity)),
                _ => None,
            })
            .collect()
    }
}

impl MarketHandler for EventCollector {
    fn on_add_symbol(&mut self, symbol: &Symbol) {
        self.events.push(MarketEvent::AddSymbol(*symbol));
    }

    fn on_delete_symbol(&mut self, symbol: &Symbol) {
        self.events.push(MarketEvent::DeleteSymbol(*symbol));
    }

    fn on_add_order_book(&mut self, order_book: &OrderBook) {
        self.events.push(MarketEvent::AddOrderBook(*order_book.symbol()));
    }

    fn on_update_order_book(&mut self, order_book: &OrderBook, top: bool) {
        self.events.push(MarketEvent::UpdateOrderBook {
            symbol: *order_book.symbol(),
            top,
        });
    }

    fn on_delete_order_book(&mut self, order_book: &OrderBook) {
        self.events
            .push(MarketEvent::DeleteOrderBook(*order_book.symbol()));
    }

    fn on_add_level(&mut self, order_book: &OrderBook, level: &Level, top: bool) {
        self.events.push(MarketEvent::AddLevel {
            symbol: *order_book.symbol(),
            level: *level,
            top,
        });
    }

    fn on_update_level(&mut self, order_book: &OrderBook, level: &Level, top: bool) {
        self.events.push(MarketEvent::UpdateLevel {
            symbol: *order_book.symbol(),
            level: *level,
            top,
        });
    }

    fn on_delete_level(&mut self, order_book: &OrderBook, level: &Level, top: bool) {
        self.events.push(MarketEvent::DeleteLevel {
            symbol: *order_book.symbol(),
            level: *level,
            top,
        });
    }

    fn on_add_order(&mut self, order: &Order) {
        self.events.push(MarketEvent::AddOrder(*order));
    }

    fn on_update_order(&mut self, order: &Order) {
        self.events.push(MarketEvent::UpdateOrder(*order));
    }

    fn on_delete_order(&mut self, order: &Order) {
        self.events.push(MarketEvent::DeleteOrder(*order));
    }

    fn on_execute_order(&mut self, order: &Order, price: u64, quantity: u64) {
        self.events.push(MarketEvent::ExecuteOrder {
            order: *order,
            price,
            quantity,
        });
    }
}

/// A handler that forwards events into a `std::sync::mpsc` channel.
///
/// Send failures (receiver dropped) are logged and otherwise ignored so
/// a detached consumer never disturbs the matching path.
#[derive(Debug)]
pub struct StdEventSender {
    sender: std::sync::mpsc::Sender<MarketEvent>,
}

impl StdEventSender {
    /// Create a handler together with the receiving end of its channel.
    pub fn new() -> (Self, std::sync::mpsc::Receiver<MarketEvent>) {
        let (sender, receiver) = std::sync::mpsc::channel();
        (Self { sender }, receiver)
    }

    fn forward(&self, event: MarketEvent) {
        if self.sender.send(event).is_err() {
            trace!("market event receiver disconnected");
        }
    }
}

impl MarketHandler for StdEventSender {
    fn on_add_symbol(&mut self, symbol: &Symbol) {
        self.forward(MarketEvent::AddSymbol(*symbol));
    }

    fn on_delete_symbol(&mut self, symbol: &Symbol) {
        self.forward(MarketEvent::DeleteSymbol(*symbol));
    }

    fn on_add_order_book(&mut self, order_book: &OrderBook) {
        self.forward(MarketEvent::AddOrderBook(*order_book.symbol()));
    }

    fn on_update_order_book(&mut self, order_book: &OrderBook, top: bool) {
        self.forward(MarketEvent::UpdateOrderBook {
            symbol: *order_book.symbol(),
            top,
        });
    }

    fn on_delete_order_book(&mut self, order_book: &OrderBook) {
        self.forward(MarketEvent::DeleteOrderBook(*order_book.symbol()));
    }

    fn on_add_level(&mut self, order_book: &OrderBook, level: &Level, top: bool) {
        self.forward(MarketEvent::AddLevel {
            symbol: *order_book.symbol(),
            level: *level,
            top,
        });
    }

    fn on_update_level(&mut self, order_book: &OrderBook, level: &Level, top: bool) {
        self.forward(MarketEvent::UpdateLevel {
            symbol: *order_book.symbol(),
            level: *level,
            top,
        });
    }

    fn on_delete_level(&mut self, order_book: &OrderBook, level: &Level, top: bool) {
        self.forward(MarketEvent::DeleteLevel {
            symbol: *order_book.symbol(),
            level: *level,
            top,
        });
    }

    fn on_add_order(&mut self, order: &Order) {
        self.forward(MarketEvent::AddOrder(*order));
    }

    fn on_update_order(&mut self, order: &Order) {
        self.forward(MarketEvent::UpdateOrder(*order));
    }

    fn on_delete_order(&mut self, order: &Order) {
        self.forward(MarketEvent::DeleteOrder(*order));
    }

    fn on_execute_order(&mut self, order: &Order, price: u64, quantity: u64) {
        self.forward(MarketEvent::ExecuteOrder {
            order: *order,
            price,
            quantity,
        });
    }
}

/// A handler that forwards events into a Tokio unbounded channel.
///
/// The unbounded flavor keeps the matching path free of back-pressure;
/// consumers that need bounding should drain into their own bounded
/// queue.
#[derive(Debug)]
pub struct TokioEventSender {
    sender: tokio::sync::mpsc::UnboundedSender<MarketEvent>,
}

impl TokioEventSender {
    /// Create a handler together with the receiving end of its channel.
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<MarketEvent>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn forward(&self, event: MarketEvent) {
        if self.sender.send(event).is_err() {
            trace!("market event receiver disconnected");
        }
    }
}

impl MarketHandler for TokioEventSender {
    fn on_add_symbol(&mut self, symbol: &Symbol) {
        self.forward(MarketEvent::AddSymbol(*symbol));
    }

    fn on_delete_symbol(&mut self, symbol: &Symbol) {
        self.forward(MarketEvent::DeleteSymbol(*symbol));
    }

    fn on_add_order_book(&mut self, order_book: &OrderBook) {
        self.forward(MarketEvent::AddOrderBook(*order_book.symbol()));
    }

    fn on_update_order_book(&mut self, order_book: &OrderBook, top: bool) {
        self.forward(MarketEvent::UpdateOrderBook {
            symbol: *order_book.symbol(),
            top,
        });
    }

    fn on_delete_order_book(&mut self, order_book: &OrderBook) {
        self.forward(MarketEvent::DeleteOrderBook(*order_book.symbol()));
    }

    fn on_add_level(&mut self, order_book: &OrderBook, level: &Level, top: bool) {
        self.forward(MarketEvent::AddLevel {
            symbol: *order_book.symbol(),
            level: *level,
            top,
        });
    }

    fn on_update_level(&mut self, order_book: &OrderBook, level: &Level, top: bool) {
        self.forward(MarketEvent::UpdateLevel {
            symbol: *order_book.symbol(),
            level: *level,
            top,
        });
    }

    fn on_delete_level(&mut self, order_book: &OrderBook, level: &Level, top: bool) {
        self.forward(MarketEvent::DeleteLevel {
            symbol: *order_book.symbol(),
            level: *level,
            top,
        });
    }

    fn on_add_order(&mut self, order: &Order) {
        self.forward(MarketEvent::AddOrder(*order));
    }

    fn on_update_order(&mut self, order: &Order) {
        self.forward(MarketEvent::UpdateOrder(*order));
    }

    fn on_delete_order(&mut self, order: &Order) {
        self.forward(MarketEvent::DeleteOrder(*order));
    }

    fn on_execute_order(&mut self, order: &Order, price: u64, quantity: u64) {
        self.forward(MarketEvent::ExecuteOrder {
            order: *order,
            price,
            quantity,
        });
    }
}
