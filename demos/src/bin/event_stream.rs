//! Example streaming market events through a channel-backed handler.
//!
//! A consumer thread drains the event channel and prints each event as
//! JSON, the way a market data publisher would, while the main thread
//! keeps submitting commands. The channel decouples the consumer from
//! the synchronous command path, which is also the supported way to
//! issue follow-up commands from event processing.

use matchbook_rs::prelude::*;
use std::thread;
use tracing::{info, warn};

const SYMBOL_ID: u32 = 1;

/// Rest a few levels of liquidity on both sides.
fn add_liquidity(market: &mut MarketManager<StdEventSender>) {
    info!("adding liquidity");

    for i in 1u64..=5 {
        let price = 50_000 + i * 10;
        if let Err(kind) = market.add_order(Order::sell_limit(1_000 + i, SYMBOL_ID, price, 100)) {
            warn!("failed to add ask at {price}: {kind}");
        }
    }

    for i in 1u64..=5 {
        let price = 49_990 - i * 10;
        if let Err(kind) = market.add_order(Order::buy_limit(2_000 + i, SYMBOL_ID, price, 100)) {
            warn!("failed to add bid at {price}: {kind}");
        }
    }
}

/// Cross the book a few times to produce executions.
fn execute_trades(market: &mut MarketManager<StdEventSender>) {
    info!("executing trades");

    if let Err(kind) = market.add_order(Order::buy_limit(3_001, SYMBOL_ID, 50_020, 150)) {
        warn!("aggressive buy rejected: {kind}");
    }
    if let Err(kind) = market.add_order(Order::sell_market(3_002, SYMBOL_ID, 120)) {
        warn!("market sell rejected: {kind}");
    }
    if let Err(kind) = market.reduce_order(2_003, 40) {
        warn!("reduce rejected: {kind}");
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let (handler, receiver) = StdEventSender::new();

    let consumer = thread::spawn(move || {
        let mut count = 0usize;
        while let Ok(event) = receiver.recv() {
            match serde_json::to_string(&event) {
                Ok(json) => println!("{json}"),
                Err(error) => warn!("event serialization failed: {error}"),
            }
            count += 1;
        }
        info!("event stream closed after {count} events");
    });

    let mut market = MarketManager::with_handler(handler);
    market
        .add_symbol(Symbol::new(SYMBOL_ID, "BTCUSD"))
        .expect("add symbol");
    market.add_order_book(SYMBOL_ID).expect("add order book");
    market.enable_matching();

    add_liquidity(&mut market);
    execute_trades(&mut market);

    let book = market.order_book(SYMBOL_ID).expect("order book");
    info!(
        "final book: best bid {:?}, best ask {:?}",
        book.best_bid(),
        book.best_ask()
    );

    // Dropping the market closes the channel and stops the consumer
    drop(book);
    drop(market);
    if consumer.join().is_err() {
        warn!("event consumer panicked");
    }
}
