//! Market manager: the symbol registry, order book registry, live
//! order index and the command surface of the matching engine.

use super::book::OrderBook;
use super::error::ErrorKind;
use super::handler::{MarketHandler, NullMarketHandler};
use super::level::{LevelUpdate, UpdateKind};
use super::order::{Order, OrderKind, TimeInForce};
use super::symbol::Symbol;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

/// The matching engine.
///
/// A market manager owns the symbols, the per-symbol order books and
/// the index of live orders, applies book-management commands one at a
/// time and reports every state change to its [`MarketHandler`].
///
/// Commands are atomic: callbacks fire synchronously in emission order
/// while a command runs, and a failed command leaves the market
/// unchanged. Automatic matching is off until [`Self::enable_matching`]
/// is called; [`Self::match_all`] runs a manual pass in either state.
///
/// The manager is single-threaded by design. Run one manager per
/// symbol partition to scale out; nothing is shared between instances.
pub struct MarketManager<H: MarketHandler = NullMarketHandler> {
    pub(super) handler: H,
    pub(super) symbols: DashMap<u32, Symbol>,
    pub(super) books: DashMap<u32, Arc<OrderBook>>,
    pub(super) orders: DashMap<u64, Order>,
    pub(super) matching: bool,
}

impl MarketManager<NullMarketHandler> {
    /// Create a market manager that discards all events.
    pub fn new() -> Self {
        Self::with_handler(NullMarketHandler)
    }
}

impl Default for MarketManager<NullMarketHandler> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: MarketHandler> MarketManager<H> {
    /// Create a market manager reporting to `handler`.
    pub fn with_handler(handler: H) -> Self {
        Self {
            handler,
            symbols: DashMap::new(),
            books: DashMap::new(),
            orders: DashMap::new(),
            matching: false,
        }
    }

    /// The market handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Mutable access to the market handler.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Consume the manager and return its handler.
    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Look up a registered symbol.
    pub fn symbol(&self, id: u32) -> Option<Symbol> {
        self.symbols.get(&id).map(|entry| *entry.value())
    }

    /// Look up the order book of a symbol.
    pub fn order_book(&self, symbol_id: u32) -> Option<Arc<OrderBook>> {
        self.books.get(&symbol_id).map(|entry| entry.value().clone())
    }

    /// Look up a live order.
    pub fn order(&self, id: u64) -> Option<Order> {
        self.orders.get(&id).map(|entry| *entry.value())
    }

    /// Number of live orders across all books.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Is automatic matching enabled?
    pub fn is_matching_enabled(&self) -> bool {
        self.matching
    }

    /// Enable automatic matching and immediately run a full matching
    /// pass over every book.
    pub fn enable_matching(&mut self) {
        self.matching = true;
        self.match_all();
    }

    /// Disable automatic matching. Books are left as they are; only
    /// future commands stop triggering matching.
    pub fn disable_matching(&mut self) {
        self.matching = false;
    }

    /// Match crossed orders in every order book.
    ///
    /// Matching starts from the top of each book and proceeds in
    /// price-time priority, activating stop orders as trades print,
    /// until no crossing remains. After the pass every book satisfies
    /// best bid < best ask (or has an empty side).
    pub fn match_all(&mut self) {
        let books: Vec<Arc<OrderBook>> = self.books.iter().map(|entry| entry.value().clone()).collect();
        for book in books {
            self.match_book(&book);
        }
    }

    /// Register a new symbol.
    ///
    /// # Errors
    /// [`ErrorKind::SymbolDuplicate`] when the id is already taken.
    pub fn add_symbol(&mut self, symbol: Symbol) -> Result<(), ErrorKind> {
        trace!("add symbol: {symbol}");
        if self.symbols.contains_key(&symbol.id) {
            return Err(ErrorKind::SymbolDuplicate);
        }
        self.symbols.insert(symbol.id, symbol);

        self.handler.on_add_symbol(&symbol);
        Ok(())
    }

    /// Unregister a symbol.
    ///
    /// A symbol with a live order book cannot be deleted; delete the
    /// book first.
    ///
    /// # Errors
    /// [`ErrorKind::SymbolNotFound`] when the id is unknown or the
    /// symbol still has an order book registered.
    pub fn delete_symbol(&mut self, id: u32) -> Result<(), ErrorKind> {
        trace!("delete symbol: {id}");
        let symbol = self.symbol(id).ok_or(ErrorKind::SymbolNotFound)?;
        if self.books.contains_key(&id) {
            return Err(ErrorKind::SymbolNotFound);
        }

        self.handler.on_delete_symbol(&symbol);
        self.symbols.remove(&id);
        Ok(())
    }

    /// Create an empty order book for a registered symbol.
    ///
    /// # Errors
    /// [`ErrorKind::SymbolNotFound`] when the symbol is unknown,
    /// [`ErrorKind::OrderBookDuplicate`] when the book already exists.
    pub fn add_order_book(&mut self, symbol_id: u32) -> Result<(), ErrorKind> {
        trace!("add order book: {symbol_id}");
        let symbol = self.symbol(symbol_id).ok_or(ErrorKind::SymbolNotFound)?;
        if self.books.contains_key(&symbol_id) {
            return Err(ErrorKind::OrderBookDuplicate);
        }

        let book = Arc::new(OrderBook::new(symbol));
        self.books.insert(symbol_id, book.clone());

        self.handler.on_add_order_book(&book);
        Ok(())
    }

    /// Tear down the order book of a symbol.
    ///
    /// Orders still resting in the book are released from the order
    /// index without per-order events; the single
    /// `on_delete_order_book` callback covers the teardown.
    ///
    /// # Errors
    /// [`ErrorKind::OrderBookNotFound`] when no book exists.
    pub fn delete_order_book(&mut self, symbol_id: u32) -> Result<(), ErrorKind> {
        trace!("delete order book: {symbol_id}");
        let book = self.order_book(symbol_id).ok_or(ErrorKind::OrderBookNotFound)?;

        self.handler.on_delete_order_book(&book);
        self.books.remove(&symbol_id);
        self.orders.retain(|_, order| order.symbol_id != symbol_id);
        Ok(())
    }

    /// Submit an order.
    ///
    /// The order is validated, announced via `on_add_order` and then
    /// handled by kind: market orders execute and never rest, limit
    /// orders match and rest their remainder (unless IOC/FOK), stop
    /// kinds either activate immediately when already in the money or
    /// rest on their stop ladder. With matching enabled, every add ends
    /// with a full matching pass over the book.
    ///
    /// # Errors
    /// Validation failures ([`ErrorKind::OrderIdInvalid`],
    /// [`ErrorKind::OrderQuantityInvalid`],
    /// [`ErrorKind::OrderParameterInvalid`]),
    /// [`ErrorKind::OrderBookNotFound`] when the symbol has no book, or
    /// [`ErrorKind::OrderDuplicate`] when an order with the same id is
    /// live.
    pub fn add_order(&mut self, order: Order) -> Result<(), ErrorKind> {
        order.validate()?;
        trace!("add order: {order}");

        match order.kind {
            OrderKind::Market => self.add_market_order(order),
            OrderKind::Limit => self.add_limit_order(order),
            OrderKind::Stop | OrderKind::TrailingStop => self.add_stop_order(order),
            OrderKind::StopLimit | OrderKind::TrailingStopLimit => self.add_stop_limit_order(order),
        }
    }

    fn add_market_order(&mut self, order: Order) -> Result<(), ErrorKind> {
        let book = self
            .order_book(order.symbol_id)
            .ok_or(ErrorKind::OrderBookNotFound)?;
        let mut order = order;

        self.handler.on_add_order(&order);

        if self.matching {
            self.match_market(&book, &mut order);
        }

        // Market orders never rest, whatever is left is dropped
        self.handler.on_delete_order(&order);

        if self.matching {
            self.match_book(&book);
        }
        book.reset_matching_price();
        Ok(())
    }

    fn add_limit_order(&mut self, mut order: Order) -> Result<(), ErrorKind> {
        let book = self
            .order_book(order.symbol_id)
            .ok_or(ErrorKind::OrderBookNotFound)?;

        self.handler.on_add_order(&order);

        if self.matching {
            self.match_limit(&book, &mut order);
        }

        if order.leaves_quantity > 0 && !order.is_ioc() && !order.is_fok() {
            if self.orders.contains_key(&order.id) {
                self.handler.on_delete_order(&order);
                return Err(ErrorKind::OrderDuplicate);
            }
            self.orders.insert(order.id, order);

            let update = book.add_limit_order(&order);
            self.update_level(&book, update);
        } else {
            self.handler.on_delete_order(&order);
        }

        if self.matching {
            self.match_book(&book);
        }
        book.reset_matching_price();
        Ok(())
    }

    fn add_stop_order(&mut self, mut order: Order) -> Result<(), ErrorKind> {
        let book = self
            .order_book(order.symbol_id)
            .ok_or(ErrorKind::OrderBookNotFound)?;

        if order.is_trailing() {
            order.stop_price = book.calculate_trailing_stop_price(&order);
        }

        self.handler.on_add_order(&order);

        if self.matching {
            let reference = if order.is_buy() {
                book.market_price_ask()
            } else {
                book.market_price_bid()
            };

            let in_the_money = if order.is_buy() {
                order.stop_price <= reference
            } else {
                order.stop_price >= reference
            };
            if in_the_money {
                // Convert into a market order and execute right away
                order.kind = OrderKind::Market;
                order.price = 0;
                order.stop_price = 0;
                order.time_in_force = if order.is_fok() {
                    TimeInForce::Fok
                } else {
                    TimeInForce::Ioc
                };

                self.handler.on_update_order(&order);
                self.match_market(&book, &mut order);
                self.handler.on_delete_order(&order);

                if self.matching {
                    self.match_book(&book);
                }
                book.reset_matching_price();
                return Ok(());
            }
        }

        if order.leaves_quantity > 0 {
            if self.orders.contains_key(&order.id) {
                self.handler.on_delete_order(&order);
                return Err(ErrorKind::OrderDuplicate);
            }
            self.orders.insert(order.id, order);

            if order.is_trailing() {
                book.add_trailing_stop_order(&order);
            } else {
                book.add_stop_order(&order);
            }
        } else {
            self.handler.on_delete_order(&order);
        }

        if self.matching {
            self.match_book(&book);
        }
        book.reset_matching_price();
        Ok(())
    }

    fn add_stop_limit_order(&mut self, mut order: Order) -> Result<(), ErrorKind> {
        let book = self
            .order_book(order.symbol_id)
            .ok_or(ErrorKind::OrderBookNotFound)?;

        if order.is_trailing() {
            // Trailing recalculation preserves the limit offset
            let diff = order.price as i128 - order.stop_price as i128;
            order.stop_price = book.calculate_trailing_stop_price(&order);
            order.price = saturate_price(order.stop_price as i128 + diff);
        }

        self.handler.on_add_order(&order);

        if self.matching {
            let reference = if order.is_buy() {
                book.market_price_ask()
            } else {
                book.market_price_bid()
            };

            let in_the_money = if order.is_buy() {
                order.stop_price <= reference
            } else {
                order.stop_price >= reference
            };
            if in_the_money {
                // Convert into a limit order at the configured price
                order.kind = OrderKind::Limit;
                order.stop_price = 0;

                self.handler.on_update_order(&order);
                self.match_limit(&book, &mut order);

                if order.leaves_quantity > 0 && !order.is_ioc() && !order.is_fok() {
                    if self.orders.contains_key(&order.id) {
                        self.handler.on_delete_order(&order);
                        return Err(ErrorKind::OrderDuplicate);
                    }
                    self.orders.insert(order.id, order);

                    let update = book.add_limit_order(&order);
                    self.update_level(&book, update);
                } else {
                    self.handler.on_delete_order(&order);
                }

                if self.matching {
                    self.match_book(&book);
                }
                book.reset_matching_price();
                return Ok(());
            }
        }

        if order.leaves_quantity > 0 {
            if self.orders.contains_key(&order.id) {
                self.handler.on_delete_order(&order);
                return Err(ErrorKind::OrderDuplicate);
            }
            self.orders.insert(order.id, order);

            if order.is_trailing() {
                book.add_trailing_stop_order(&order);
            } else {
                book.add_stop_order(&order);
            }
        } else {
            self.handler.on_delete_order(&order);
        }

        if self.matching {
            self.match_book(&book);
        }
        book.reset_matching_price();
        Ok(())
    }

    /// Dispatch a level update to the handler: the matching level
    /// callback followed by `on_update_order_book` with the same top
    /// flag.
    pub(super) fn update_level(&mut self, book: &OrderBook, update: LevelUpdate) {
        match update.kind {
            UpdateKind::Add => self.handler.on_add_level(book, &update.level, update.top),
            UpdateKind::Update => self.handler.on_update_level(book, &update.level, update.top),
            UpdateKind::Delete => self.handler.on_delete_level(book, &update.level, update.top),
        }

        self.handler.on_update_order_book(book, update.top);
    }
}

/// Clamp a signed price computation back into the tick range.
pub(super) fn saturate_price(value: i128) -> u64 {
    value.clamp(0, u64::MAX as i128) as u64
}
