//! Core matching algorithms: order crossing, AON/FOK chain matching,
//! stop order activation and trailing stop recalculation.
//!
//! Matching always walks the opposite side best price first and, inside
//! one price level, in FIFO order. FIFO queues are snapshotted before a
//! walk; recursive reduce/delete calls made while walking remove orders
//! from the index, and stale ids are skipped on lookup, so the
//! traversal order matches the snapshot.

use super::book::OrderBook;
use super::handler::MarketHandler;
use super::level::PriceLevel;
use super::manager::{MarketManager, saturate_price};
use super::order::{Order, OrderKind, TimeInForce};
use std::sync::Arc;
use tracing::error;

/// Walks the FIFO order ids of one price level during chain
/// calculation.
struct ChainCursor {
    ids: Vec<u64>,
    index: usize,
}

impl ChainCursor {
    fn from_level(level: Option<&Arc<PriceLevel>>) -> Self {
        Self {
            ids: level.map(|level| level.order_ids()).unwrap_or_default(),
            index: 0,
        }
    }

    fn current(&self) -> Option<u64> {
        self.ids.get(self.index).copied()
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn advanced(&self) -> Self {
        Self {
            ids: self.ids.clone(),
            index: self.index + 1,
        }
    }
}

impl<H: MarketHandler> MarketManager<H> {
    /// Price a market order off the opposite best (widened by the
    /// slippage bound) and match it. An empty opposite side leaves the
    /// order untouched.
    pub(super) fn match_market(&mut self, book: &Arc<OrderBook>, order: &mut Order) {
        if order.is_buy() {
            let Some(best_ask) = book.best_ask() else {
                return;
            };
            order.price = best_ask.saturating_add(order.slippage);
        } else {
            let Some(best_bid) = book.best_bid() else {
                return;
            };
            order.price = best_bid.saturating_sub(order.slippage);
        }

        self.match_order(book, order);
    }

    /// Match a limit order against the opposite side of the book.
    pub(super) fn match_limit(&mut self, book: &Arc<OrderBook>, order: &mut Order) {
        self.match_order(book, order);
    }

    fn match_order(&mut self, book: &Arc<OrderBook>, order: &mut Order) {
        loop {
            let level = if order.is_buy() {
                book.best_ask_level()
            } else {
                book.best_bid_level()
            };
            let Some(level) = level else {
                return;
            };

            let crossing = if order.is_buy() {
                order.price >= level.price()
            } else {
                order.price <= level.price()
            };
            if !crossing {
                return;
            }

            // Fill-or-kill and all-or-none orders fill through a
            // matching chain or not at all
            if order.is_fok() || order.is_aon() {
                let chain =
                    self.calculate_matching_chain(book, &level, order.price, order.leaves_quantity);
                if chain == 0 {
                    return;
                }

                self.execute_matching_chain(book, level, order.price, chain);

                self.handler
                    .on_execute_order(order, order.price, order.leaves_quantity);
                book.update_last_price(order, order.price);
                book.update_matching_price(order, order.price);
                order.executed_quantity += order.leaves_quantity;
                order.leaves_quantity = 0;
                return;
            }

            for id in level.order_ids() {
                let Some(executing) = self.order(id) else {
                    continue;
                };

                let quantity = executing.leaves_quantity.min(order.leaves_quantity);

                // A resting all-or-none order larger than the incoming
                // remainder cannot be split and blocks the walk
                if executing.is_aon() && executing.leaves_quantity > order.leaves_quantity {
                    return;
                }

                let price = executing.price;

                self.handler.on_execute_order(&executing, price, quantity);
                book.update_last_price(&executing, price);
                book.update_matching_price(&executing, price);
                self.charge_execution(id, quantity);
                if let Err(kind) = self.reduce_order_inner(id, quantity, true) {
                    error!("recursive reduce of order #{id} failed: {kind}");
                }

                self.handler.on_execute_order(order, price, quantity);
                book.update_last_price(order, price);
                book.update_matching_price(order, price);
                order.executed_quantity += quantity;
                order.leaves_quantity -= quantity;
                if order.leaves_quantity == 0 {
                    return;
                }
            }
        }
    }

    /// Run the crossing loop on one book until no best bid/ask cross
    /// remains and no stop order is left to activate.
    pub(super) fn match_book(&mut self, book: &Arc<OrderBook>) {
        loop {
            while let (Some(bid_level), Some(ask_level)) =
                (book.best_bid_level(), book.best_ask_level())
            {
                if bid_level.price() < ask_level.price() {
                    break;
                }

                let bid_ids = bid_level.order_ids();
                let ask_ids = ask_level.order_ids();
                let mut bid_index = 0;
                let mut ask_index = 0;

                while bid_index < bid_ids.len() && ask_index < ask_ids.len() {
                    let Some(bid_order) = self.order(bid_ids[bid_index]) else {
                        bid_index += 1;
                        continue;
                    };
                    let Some(ask_order) = self.order(ask_ids[ask_index]) else {
                        ask_index += 1;
                        continue;
                    };

                    if bid_order.is_aon() || ask_order.is_aon() {
                        let chain =
                            self.calculate_matching_chain_crossed(book, &bid_level, &ask_level);
                        if chain == 0 {
                            return;
                        }

                        // The all-or-none side dictates the price
                        if bid_order.is_aon() {
                            let price = bid_order.price;
                            self.execute_matching_chain(book, bid_level.clone(), price, chain);
                            self.execute_matching_chain(book, ask_level.clone(), price, chain);
                        } else {
                            let price = ask_order.price;
                            self.execute_matching_chain(book, ask_level.clone(), price, chain);
                            self.execute_matching_chain(book, bid_level.clone(), price, chain);
                        }

                        break;
                    }

                    // The smaller order executes in full and leaves the
                    // book, the larger is reduced
                    let (executing, reducing) =
                        if bid_order.leaves_quantity > ask_order.leaves_quantity {
                            (ask_order, bid_order)
                        } else {
                            (bid_order, ask_order)
                        };
                    let quantity = executing.leaves_quantity;
                    let price = executing.price;

                    self.handler.on_execute_order(&executing, price, quantity);
                    book.update_last_price(&executing, price);
                    book.update_matching_price(&executing, price);
                    self.charge_execution(executing.id, quantity);
                    if let Err(kind) = self.delete_order_inner(executing.id, true) {
                        error!("recursive delete of order #{} failed: {kind}", executing.id);
                    }

                    self.handler.on_execute_order(&reducing, price, quantity);
                    book.update_last_price(&reducing, price);
                    book.update_matching_price(&reducing, price);
                    self.charge_execution(reducing.id, quantity);
                    if let Err(kind) = self.reduce_order_inner(reducing.id, quantity, true) {
                        error!("recursive reduce of order #{} failed: {kind}", reducing.id);
                    }

                    bid_index += 1;
                    ask_index += 1;
                }

                // Trades may have armed resting stop orders
                self.activate_stops_at(book, book.best_buy_stop_level(), book.market_price_ask());
                self.activate_stops_at(book, book.best_sell_stop_level(), book.market_price_bid());
            }

            if !self.activate_stop_orders(book) {
                break;
            }
        }
    }

    /// One round of stop activation over all four stop ladders,
    /// repeated until a round activates nothing. Returns whether any
    /// order was activated.
    fn activate_stop_orders(&mut self, book: &Arc<OrderBook>) -> bool {
        let mut result = false;

        let mut stop = false;
        while !stop {
            stop = true;

            // Buy stops trigger against the ask market
            if self.activate_stops_at(book, book.best_buy_stop_level(), book.market_price_ask())
                || self.activate_stops_at(
                    book,
                    book.best_trailing_buy_stop_level(),
                    book.market_price_ask(),
                )
            {
                result = true;
                stop = false;
            }
            self.recalculate_trailing_stops(book, book.best_ask_level());

            // Sell stops trigger against the bid market
            if self.activate_stops_at(book, book.best_sell_stop_level(), book.market_price_bid())
                || self.activate_stops_at(
                    book,
                    book.best_trailing_sell_stop_level(),
                    book.market_price_bid(),
                )
            {
                result = true;
                stop = false;
            }
            self.recalculate_trailing_stops(book, book.best_bid_level());
        }

        result
    }

    /// Activate every stop order at the best stop level when the
    /// market reference reached its price.
    fn activate_stops_at(
        &mut self,
        book: &Arc<OrderBook>,
        level: Option<Arc<PriceLevel>>,
        stop_price: u64,
    ) -> bool {
        let mut result = false;

        if let Some(level) = level {
            let triggered = if level.is_bid() {
                stop_price <= level.price()
            } else {
                stop_price >= level.price()
            };
            if !triggered {
                return result;
            }

            for id in level.order_ids() {
                let Some(order) = self.order(id) else {
                    continue;
                };

                result = match order.kind {
                    OrderKind::Stop | OrderKind::TrailingStop => {
                        self.activate_stop_order(book, order)
                    }
                    OrderKind::StopLimit | OrderKind::TrailingStopLimit => {
                        self.activate_stop_limit_order(book, order)
                    }
                    _ => {
                        error!("order #{} rests on a stop ladder but is {}", order.id, order.kind);
                        false
                    }
                };
            }
        }

        result
    }

    /// Convert a triggered stop order into a market order and execute
    /// it. The order leaves the market whatever remains unfilled.
    fn activate_stop_order(&mut self, book: &Arc<OrderBook>, mut order: Order) -> bool {
        if order.is_trailing() {
            book.delete_trailing_stop_order(&order);
        } else {
            book.delete_stop_order(&order);
        }

        order.kind = OrderKind::Market;
        order.price = 0;
        order.stop_price = 0;
        order.time_in_force = if order.is_fok() {
            TimeInForce::Fok
        } else {
            TimeInForce::Ioc
        };
        if let Some(mut entry) = self.orders.get_mut(&order.id) {
            *entry = order;
        }

        self.handler.on_update_order(&order);
        self.match_market(book, &mut order);
        self.handler.on_delete_order(&order);
        self.orders.remove(&order.id);

        true
    }

    /// Convert a triggered stop-limit order into a limit order, match
    /// it and rest the remainder (unless IOC/FOK).
    fn activate_stop_limit_order(&mut self, book: &Arc<OrderBook>, mut order: Order) -> bool {
        if order.is_trailing() {
            book.delete_trailing_stop_order(&order);
        } else {
            book.delete_stop_order(&order);
        }

        order.kind = OrderKind::Limit;
        order.stop_price = 0;
        if let Some(mut entry) = self.orders.get_mut(&order.id) {
            *entry = order;
        }

        self.handler.on_update_order(&order);
        self.match_limit(book, &mut order);

        if order.leaves_quantity > 0 && !order.is_ioc() && !order.is_fok() {
            if let Some(mut entry) = self.orders.get_mut(&order.id) {
                *entry = order;
            }
            let update = book.add_limit_order(&order);
            self.update_level(book, update);
        } else {
            self.handler.on_delete_order(&order);
            self.orders.remove(&order.id);
        }

        true
    }

    /// Volume available against `price` walking inward from `level`,
    /// for an incoming order that needs exactly `volume`. Returns
    /// `volume` when the chain fits exactly, 0 otherwise. Resting
    /// all-or-none orders are charged at their full leaves.
    fn calculate_matching_chain(
        &self,
        book: &Arc<OrderBook>,
        level: &Arc<PriceLevel>,
        price: u64,
        volume: u64,
    ) -> u64 {
        let mut current = Some(level.clone());
        let mut available: u64 = 0;

        while let Some(level) = current {
            let crossing = if level.is_bid() {
                price <= level.price()
            } else {
                price >= level.price()
            };
            if !crossing {
                return 0;
            }

            for id in level.order_ids() {
                let Some(order) = self.order(id) else {
                    continue;
                };

                let need = volume - available;
                let quantity = if order.is_aon() {
                    order.leaves_quantity
                } else {
                    order.leaves_quantity.min(need)
                };
                available += quantity;

                if volume == available {
                    return available;
                }
                if volume < available {
                    return 0;
                }
            }

            current = book.next_crossing_level(&level);
        }

        0
    }

    /// Volume of the chain that lets two crossed levels with
    /// all-or-none participants fill each other exactly, or 0 when no
    /// such chain exists.
    ///
    /// The calculation keeps one cursor per side and always charges the
    /// currently shorter side; when that side overshoots, the cursors
    /// swap roles and the walk continues against the other side.
    fn calculate_matching_chain_crossed(
        &self,
        book: &Arc<OrderBook>,
        bid_level: &Arc<PriceLevel>,
        ask_level: &Arc<PriceLevel>,
    ) -> u64 {
        let mut longest_level = Some(bid_level.clone());
        let mut shortest_level = Some(ask_level.clone());
        let mut longest = ChainCursor::from_level(longest_level.as_ref());
        let mut shortest = ChainCursor::from_level(shortest_level.as_ref());

        let longest_front = longest.current().and_then(|id| self.order(id));
        let shortest_front = shortest.current().and_then(|id| self.order(id));
        let (Some(longest_front), Some(shortest_front)) = (longest_front, shortest_front) else {
            return 0;
        };

        let mut required = longest_front.leaves_quantity;
        let mut available: u64 = 0;

        // Target the longer of two facing all-or-none orders
        let swap_sides = if longest_front.is_aon() && shortest_front.is_aon() {
            shortest_front.leaves_quantity > longest_front.leaves_quantity
        } else {
            shortest_front.is_aon()
        };
        if swap_sides {
            required = shortest_front.leaves_quantity;
            std::mem::swap(&mut longest_level, &mut shortest_level);
            std::mem::swap(&mut longest, &mut shortest);
        }

        while longest_level.is_some() && shortest_level.is_some() {
            while let (Some(_), Some(shortest_id)) = (longest.current(), shortest.current()) {
                let Some(order) = self.order(shortest_id) else {
                    shortest.advance();
                    continue;
                };

                let need = required - available;
                let quantity = if order.is_aon() {
                    order.leaves_quantity
                } else {
                    order.leaves_quantity.min(need)
                };
                available += quantity;

                if required == available {
                    return required;
                }

                // Overshoot: the sides change roles and the walk
                // continues against the other one
                if required < available {
                    let next = longest.advanced();
                    longest = std::mem::replace(&mut shortest, next);
                    std::mem::swap(&mut required, &mut available);
                    continue;
                }

                shortest.advance();
            }

            if longest.current().is_none() {
                longest_level = longest_level
                    .as_ref()
                    .and_then(|level| book.next_crossing_level(level));
                longest = ChainCursor::from_level(longest_level.as_ref());
            }
            if shortest.current().is_none() {
                shortest_level = shortest_level
                    .as_ref()
                    .and_then(|level| book.next_crossing_level(level));
                shortest = ChainCursor::from_level(shortest_level.as_ref());
            }
        }

        0
    }

    /// Spend `volume` across successive levels starting at `level`,
    /// executing every touched order at `price`. All-or-none orders
    /// execute their full leaves and are deleted; other orders are
    /// reduced by what they contribute.
    fn execute_matching_chain(
        &mut self,
        book: &Arc<OrderBook>,
        level: Arc<PriceLevel>,
        price: u64,
        volume: u64,
    ) {
        let mut volume = volume;
        let mut current = Some(level);

        while volume > 0 {
            let Some(level) = current else {
                break;
            };
            // The level may empty and disappear while executing
            let next_level = book.next_crossing_level(&level);

            for id in level.order_ids() {
                if volume == 0 {
                    break;
                }
                let Some(order) = self.order(id) else {
                    continue;
                };

                let quantity = if order.is_aon() {
                    order.leaves_quantity
                } else {
                    order.leaves_quantity.min(volume)
                };

                self.handler.on_execute_order(&order, price, quantity);
                book.update_last_price(&order, price);
                book.update_matching_price(&order, price);
                self.charge_execution(id, quantity);

                if order.is_aon() {
                    if let Err(kind) = self.delete_order_inner(id, true) {
                        error!("recursive delete of order #{id} failed: {kind}");
                    }
                } else if let Err(kind) = self.reduce_order_inner(id, quantity, true) {
                    error!("recursive reduce of order #{id} failed: {kind}");
                }

                volume = volume.saturating_sub(quantity);
            }

            current = next_level;
        }
    }

    /// Re-anchor the trailing stop ladder watching `level`'s side when
    /// its market reference moved in the trailing direction.
    fn recalculate_trailing_stops(&mut self, book: &Arc<OrderBook>, level: Option<Arc<PriceLevel>>) {
        let Some(level) = level else {
            return;
        };
        let watching_ask = level.is_ask();

        // Skip recalculation while the reference moves away from the
        // stops
        if watching_ask {
            let old_price = book.trailing_ask_price();
            let new_price = book.market_trailing_stop_price_ask();
            book.set_trailing_ask_price(new_price);
            if new_price >= old_price {
                return;
            }
        } else {
            let old_price = book.trailing_bid_price();
            let new_price = book.market_trailing_stop_price_bid();
            book.set_trailing_bid_price(new_price);
            if new_price <= old_price {
                return;
            }
        }

        let mut previous: Option<Arc<PriceLevel>> = None;
        let mut current = if watching_ask {
            book.best_trailing_buy_stop_level()
        } else {
            book.best_trailing_sell_stop_level()
        };

        while let Some(level) = current {
            let mut recalculated = false;

            for id in level.order_ids() {
                let Some(mut order) = self.order(id) else {
                    continue;
                };

                let old_stop_price = order.stop_price;
                let new_stop_price = book.calculate_trailing_stop_price(&order);

                if new_stop_price != old_stop_price {
                    book.delete_trailing_stop_order(&order);

                    match order.kind {
                        OrderKind::TrailingStop => order.stop_price = new_stop_price,
                        OrderKind::TrailingStopLimit => {
                            // Keep the limit offset from the stop price
                            let diff = order.price as i128 - order.stop_price as i128;
                            order.stop_price = new_stop_price;
                            order.price = saturate_price(new_stop_price as i128 + diff);
                        }
                        _ => {}
                    }
                    if let Some(mut entry) = self.orders.get_mut(&id) {
                        *entry = order;
                    }

                    self.handler.on_update_order(&order);
                    book.add_trailing_stop_order(&order);

                    recalculated = true;
                }
            }

            if recalculated {
                // Moved orders may have landed on an earlier level
                current = previous.clone().or_else(|| {
                    if watching_ask {
                        book.best_trailing_buy_stop_level()
                    } else {
                        book.best_trailing_sell_stop_level()
                    }
                });
            } else {
                previous = Some(level.clone());
                current = book.next_trailing_level(&level);
            }
        }
    }

    fn charge_execution(&mut self, id: u64, quantity: u64) {
        if let Some(mut entry) = self.orders.get_mut(&id) {
            entry.executed_quantity += quantity;
        }
    }
}
