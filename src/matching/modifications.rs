//! Order maintenance commands: reduce, modify, mitigate, replace,
//! delete and (externally reported) execute.
//!
//! All of these share one skeleton: look the order up, apply the
//! kind-appropriate order book primitive, keep the order index in sync,
//! emit the update/delete events, and finish with a matching pass.
//! The matching engine re-enters reduce and delete with
//! `recursive = true`, which suppresses only that tail pass; the
//! matching price reset always runs at the command tail.

use super::error::ErrorKind;
use super::handler::MarketHandler;
use super::manager::MarketManager;
use super::order::{Order, OrderKind};
use tracing::trace;

impl<H: MarketHandler> MarketManager<H> {
    /// Reduce a live order by `quantity` (a cancel of part of its
    /// leaves). The quantity is clamped to the order's leaves; reducing
    /// to zero deletes the order.
    ///
    /// # Errors
    /// [`ErrorKind::OrderIdInvalid`], [`ErrorKind::OrderQuantityInvalid`],
    /// [`ErrorKind::OrderNotFound`] or [`ErrorKind::OrderBookNotFound`].
    pub fn reduce_order(&mut self, id: u64, quantity: u64) -> Result<(), ErrorKind> {
        trace!("reduce order: #{id} by {quantity}");
        self.reduce_order_inner(id, quantity, false)
    }

    pub(super) fn reduce_order_inner(
        &mut self,
        id: u64,
        quantity: u64,
        recursive: bool,
    ) -> Result<(), ErrorKind> {
        if id == 0 {
            return Err(ErrorKind::OrderIdInvalid);
        }
        if quantity == 0 {
            return Err(ErrorKind::OrderQuantityInvalid);
        }

        let mut order = self.order(id).ok_or(ErrorKind::OrderNotFound)?;
        let book = self
            .order_book(order.symbol_id)
            .ok_or(ErrorKind::OrderBookNotFound)?;

        let quantity = quantity.min(order.leaves_quantity);

        let hidden = order.hidden_quantity();
        let visible = order.visible_quantity();

        order.leaves_quantity -= quantity;

        let hidden = hidden - order.hidden_quantity();
        let visible = visible - order.visible_quantity();

        if order.leaves_quantity > 0 {
            if let Some(mut entry) = self.orders.get_mut(&id) {
                *entry = order;
            }
            self.handler.on_update_order(&order);

            match order.kind {
                OrderKind::Limit => {
                    let update = book.reduce_limit_order(&order, quantity, hidden, visible);
                    self.update_level(&book, update);
                }
                OrderKind::Stop | OrderKind::StopLimit => {
                    book.reduce_stop_order(&order, quantity, hidden, visible);
                }
                OrderKind::TrailingStop | OrderKind::TrailingStopLimit => {
                    book.reduce_trailing_stop_order(&order, quantity, hidden, visible);
                }
                OrderKind::Market => {}
            }
        } else {
            self.handler.on_delete_order(&order);

            match order.kind {
                OrderKind::Limit => {
                    let update = book.reduce_limit_order(&order, quantity, hidden, visible);
                    self.update_level(&book, update);
                }
                OrderKind::Stop | OrderKind::StopLimit => {
                    book.reduce_stop_order(&order, quantity, hidden, visible);
                }
                OrderKind::TrailingStop | OrderKind::TrailingStopLimit => {
                    book.reduce_trailing_stop_order(&order, quantity, hidden, visible);
                }
                OrderKind::Market => {}
            }

            self.orders.remove(&id);
        }

        if self.matching && !recursive {
            self.match_book(&book);
        }
        book.reset_matching_price();
        Ok(())
    }

    /// Modify a live order: replace its price and quantity, re-match it
    /// against the book and re-insert the remainder.
    ///
    /// # Errors
    /// [`ErrorKind::OrderIdInvalid`], [`ErrorKind::OrderQuantityInvalid`],
    /// [`ErrorKind::OrderNotFound`] or [`ErrorKind::OrderBookNotFound`].
    pub fn modify_order(
        &mut self,
        id: u64,
        new_price: u64,
        new_quantity: u64,
    ) -> Result<(), ErrorKind> {
        trace!("modify order: #{id} price={new_price} qty={new_quantity}");
        self.modify_order_inner(id, new_price, new_quantity, false, false)
    }

    /// Modify a live order with in-flight mitigation: the new leaves
    /// quantity is reduced by what already executed, so a fill racing
    /// the modification can never overfill the order.
    ///
    /// # Errors
    /// As [`Self::modify_order`].
    pub fn mitigate_order(
        &mut self,
        id: u64,
        new_price: u64,
        new_quantity: u64,
    ) -> Result<(), ErrorKind> {
        trace!("mitigate order: #{id} price={new_price} qty={new_quantity}");
        self.modify_order_inner(id, new_price, new_quantity, true, false)
    }

    fn modify_order_inner(
        &mut self,
        id: u64,
        new_price: u64,
        new_quantity: u64,
        mitigate: bool,
        recursive: bool,
    ) -> Result<(), ErrorKind> {
        if id == 0 {
            return Err(ErrorKind::OrderIdInvalid);
        }
        if new_quantity == 0 {
            return Err(ErrorKind::OrderQuantityInvalid);
        }

        let mut order = self.order(id).ok_or(ErrorKind::OrderNotFound)?;
        let book = self
            .order_book(order.symbol_id)
            .ok_or(ErrorKind::OrderBookNotFound)?;

        // Pull the order out of the book before touching it
        match order.kind {
            OrderKind::Limit => {
                let update = book.delete_limit_order(&order);
                self.update_level(&book, update);
            }
            OrderKind::Stop | OrderKind::StopLimit => book.delete_stop_order(&order),
            OrderKind::TrailingStop | OrderKind::TrailingStopLimit => {
                book.delete_trailing_stop_order(&order);
            }
            OrderKind::Market => {}
        }

        order.price = new_price;
        order.quantity = new_quantity;
        order.leaves_quantity = if mitigate {
            new_quantity.saturating_sub(order.executed_quantity)
        } else {
            new_quantity
        };

        if order.leaves_quantity > 0 {
            if let Some(mut entry) = self.orders.get_mut(&id) {
                *entry = order;
            }
            self.handler.on_update_order(&order);

            if self.matching && !recursive {
                self.match_limit(&book, &mut order);
                if let Some(mut entry) = self.orders.get_mut(&id) {
                    *entry = order;
                }
            }

            if order.leaves_quantity > 0 {
                match order.kind {
                    OrderKind::Limit => {
                        let update = book.add_limit_order(&order);
                        self.update_level(&book, update);
                    }
                    OrderKind::Stop | OrderKind::StopLimit => book.add_stop_order(&order),
                    OrderKind::TrailingStop | OrderKind::TrailingStopLimit => {
                        book.add_trailing_stop_order(&order);
                    }
                    OrderKind::Market => {}
                }
            }
        }

        if order.leaves_quantity == 0 {
            self.handler.on_delete_order(&order);
            self.orders.remove(&id);
        }

        if self.matching && !recursive {
            self.match_book(&book);
        }
        book.reset_matching_price();
        Ok(())
    }

    /// Replace a live limit order with a new id, price and quantity.
    ///
    /// The old order is deleted (with its delete event), the record is
    /// re-armed with the new id and full quantity, announced with
    /// `on_add_order`, matched, and the remainder re-inserted.
    ///
    /// # Errors
    /// [`ErrorKind::OrderIdInvalid`], [`ErrorKind::OrderQuantityInvalid`],
    /// [`ErrorKind::OrderNotFound`], [`ErrorKind::OrderTypeInvalid`]
    /// (replace is limit-only), [`ErrorKind::OrderBookNotFound`] or
    /// [`ErrorKind::OrderDuplicate`] when the new id is already live.
    pub fn replace_order(
        &mut self,
        id: u64,
        new_id: u64,
        new_price: u64,
        new_quantity: u64,
    ) -> Result<(), ErrorKind> {
        trace!("replace order: #{id} -> #{new_id} price={new_price} qty={new_quantity}");
        self.replace_order_inner(id, new_id, new_price, new_quantity, false)
    }

    fn replace_order_inner(
        &mut self,
        id: u64,
        new_id: u64,
        new_price: u64,
        new_quantity: u64,
        recursive: bool,
    ) -> Result<(), ErrorKind> {
        if id == 0 || new_id == 0 {
            return Err(ErrorKind::OrderIdInvalid);
        }
        if new_quantity == 0 {
            return Err(ErrorKind::OrderQuantityInvalid);
        }

        let mut order = self.order(id).ok_or(ErrorKind::OrderNotFound)?;
        if !order.is_limit() {
            return Err(ErrorKind::OrderTypeInvalid);
        }
        let book = self
            .order_book(order.symbol_id)
            .ok_or(ErrorKind::OrderBookNotFound)?;

        let update = book.delete_limit_order(&order);
        self.update_level(&book, update);

        self.handler.on_delete_order(&order);
        self.orders.remove(&id);

        order.id = new_id;
        order.price = new_price;
        order.quantity = new_quantity;
        order.executed_quantity = 0;
        order.leaves_quantity = new_quantity;

        self.handler.on_add_order(&order);

        if self.matching && !recursive {
            self.match_limit(&book, &mut order);
        }

        if order.leaves_quantity > 0 {
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

        if self.matching && !recursive {
            self.match_book(&book);
        }
        book.reset_matching_price();
        Ok(())
    }

    /// Replace a live order with an entirely new order: a delete
    /// followed by an add.
    ///
    /// # Errors
    /// Any error of [`Self::delete_order`] or
    /// [`MarketManager::add_order`](Self::add_order); when the delete
    /// succeeds and the add fails, the old order stays deleted.
    pub fn replace_order_with(&mut self, id: u64, new_order: Order) -> Result<(), ErrorKind> {
        trace!("replace order: #{id} -> {new_order}");
        self.delete_order(id)?;
        self.add_order(new_order)
    }

    /// Delete a live order.
    ///
    /// # Errors
    /// [`ErrorKind::OrderIdInvalid`], [`ErrorKind::OrderNotFound`] or
    /// [`ErrorKind::OrderBookNotFound`].
    pub fn delete_order(&mut self, id: u64) -> Result<(), ErrorKind> {
        trace!("delete order: #{id}");
        self.delete_order_inner(id, false)
    }

    pub(super) fn delete_order_inner(&mut self, id: u64, recursive: bool) -> Result<(), ErrorKind> {
        if id == 0 {
            return Err(ErrorKind::OrderIdInvalid);
        }

        let order = self.order(id).ok_or(ErrorKind::OrderNotFound)?;
        let book = self
            .order_book(order.symbol_id)
            .ok_or(ErrorKind::OrderBookNotFound)?;

        match order.kind {
            OrderKind::Limit => {
                let update = book.delete_limit_order(&order);
                self.update_level(&book, update);
            }
            OrderKind::Stop | OrderKind::StopLimit => book.delete_stop_order(&order),
            OrderKind::TrailingStop | OrderKind::TrailingStopLimit => {
                book.delete_trailing_stop_order(&order);
            }
            OrderKind::Market => {}
        }

        self.handler.on_delete_order(&order);
        self.orders.remove(&id);

        if self.matching && !recursive {
            self.match_book(&book);
        }
        book.reset_matching_price();
        Ok(())
    }

    /// Report an execution of a live order at its own price, as a
    /// trade feed or upstream venue would.
    ///
    /// # Errors
    /// [`ErrorKind::OrderIdInvalid`], [`ErrorKind::OrderQuantityInvalid`],
    /// [`ErrorKind::OrderNotFound`] or [`ErrorKind::OrderBookNotFound`].
    pub fn execute_order(&mut self, id: u64, quantity: u64) -> Result<(), ErrorKind> {
        let price = self.order(id).map(|order| order.price);
        match price {
            Some(price) => self.execute_order_at(id, price, quantity),
            None if id == 0 => Err(ErrorKind::OrderIdInvalid),
            None if quantity == 0 => Err(ErrorKind::OrderQuantityInvalid),
            None => Err(ErrorKind::OrderNotFound),
        }
    }

    /// Report an execution of a live order at an externally supplied
    /// price.
    ///
    /// The quantity is clamped to the order's leaves. The last and
    /// matching market prices are updated with the supplied price even
    /// when it differs from the order's own price.
    ///
    /// # Errors
    /// As [`Self::execute_order`].
    pub fn execute_order_at(&mut self, id: u64, price: u64, quantity: u64) -> Result<(), ErrorKind> {
        if id == 0 {
            return Err(ErrorKind::OrderIdInvalid);
        }
        if quantity == 0 {
            return Err(ErrorKind::OrderQuantityInvalid);
        }
        trace!("execute order: #{id} {quantity} @ {price}");

        let mut order = self.order(id).ok_or(ErrorKind::OrderNotFound)?;
        let book = self
            .order_book(order.symbol_id)
            .ok_or(ErrorKind::OrderBookNotFound)?;

        let quantity = quantity.min(order.leaves_quantity);

        self.handler.on_execute_order(&order, price, quantity);

        book.update_last_price(&order, price);
        book.update_matching_price(&order, price);

        let hidden = order.hidden_quantity();
        let visible = order.visible_quantity();

        order.executed_quantity += quantity;
        order.leaves_quantity -= quantity;

        let hidden = hidden - order.hidden_quantity();
        let visible = visible - order.visible_quantity();

        match order.kind {
            OrderKind::Limit => {
                let update = book.reduce_limit_order(&order, quantity, hidden, visible);
                self.update_level(&book, update);
            }
            OrderKind::Stop | OrderKind::StopLimit => {
                book.reduce_stop_order(&order, quantity, hidden, visible);
            }
            OrderKind::TrailingStop | OrderKind::TrailingStopLimit => {
                book.reduce_trailing_stop_order(&order, quantity, hidden, visible);
            }
            OrderKind::Market => {}
        }

        if order.leaves_quantity > 0 {
            if let Some(mut entry) = self.orders.get_mut(&id) {
                *entry = order;
            }
            self.handler.on_update_order(&order);
        } else {
            self.handler.on_delete_order(&order);
            self.orders.remove(&id);
        }

        if self.matching {
            self.match_book(&book);
        }
        book.reset_matching_price();
        Ok(())
    }
}
