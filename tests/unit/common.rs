//! Shared fixtures and book inspection helpers.

use matchbook_rs::prelude::*;

pub const SYMBOL_ID: u32 = 0;

/// A market with one symbol and one (still non-matching) order book.
pub fn market() -> MarketManager<EventCollector> {
    let mut market = MarketManager::with_handler(EventCollector::new());
    market
        .add_symbol(Symbol::new(SYMBOL_ID, "TEST"))
        .expect("add symbol");
    market.add_order_book(SYMBOL_ID).expect("add order book");
    market
}

/// A market with automatic matching already enabled.
pub fn matching_market() -> MarketManager<EventCollector> {
    let mut market = market();
    market.enable_matching();
    market
}

/// (bid orders, ask orders) resting in the visible book.
pub fn book_orders<H: MarketHandler>(market: &MarketManager<H>) -> (u64, u64) {
    let book = market.order_book(SYMBOL_ID).expect("order book");
    (
        book.levels(Side::Buy).map(|level| level.orders).sum(),
        book.levels(Side::Sell).map(|level| level.orders).sum(),
    )
}

/// (bid volume, ask volume) resting in the visible book.
pub fn book_volume<H: MarketHandler>(market: &MarketManager<H>) -> (u64, u64) {
    let book = market.order_book(SYMBOL_ID).expect("order book");
    (
        book.levels(Side::Buy).map(|level| level.total_volume).sum(),
        book.levels(Side::Sell).map(|level| level.total_volume).sum(),
    )
}

/// (bid visible volume, ask visible volume) of the visible book.
pub fn book_visible_volume<H: MarketHandler>(market: &MarketManager<H>) -> (u64, u64) {
    let book = market.order_book(SYMBOL_ID).expect("order book");
    (
        book.levels(Side::Buy)
            .map(|level| level.visible_volume)
            .sum(),
        book.levels(Side::Sell)
            .map(|level| level.visible_volume)
            .sum(),
    )
}

/// (buy stop orders, sell stop orders) across both stop ladders.
pub fn stop_orders<H: MarketHandler>(market: &MarketManager<H>) -> (u64, u64) {
    let book = market.order_book(SYMBOL_ID).expect("order book");
    (
        book.stop_levels(Side::Buy)
            .chain(book.trailing_stop_levels(Side::Buy))
            .map(|level| level.orders)
            .sum(),
        book.stop_levels(Side::Sell)
            .chain(book.trailing_stop_levels(Side::Sell))
            .map(|level| level.orders)
            .sum(),
    )
}

/// (buy stop volume, sell stop volume) across both stop ladders.
pub fn stop_volume<H: MarketHandler>(market: &MarketManager<H>) -> (u64, u64) {
    let book = market.order_book(SYMBOL_ID).expect("order book");
    (
        book.stop_levels(Side::Buy)
            .chain(book.trailing_stop_levels(Side::Buy))
            .map(|level| level.total_volume)
            .sum(),
        book.stop_levels(Side::Sell)
            .chain(book.trailing_stop_levels(Side::Sell))
            .map(|level| level.total_volume)
            .sum(),
    )
}
