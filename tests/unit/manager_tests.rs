//! Symbol and order book lifecycle, order maintenance commands and
//! their failure codes.

use crate::common::*;
use matchbook_rs::prelude::*;

#[test]
fn test_symbol_lifecycle() {
    let mut market = MarketManager::with_handler(EventCollector::new());
    let symbol = Symbol::new(1, "EURUSD");

    assert_eq!(market.add_symbol(symbol), Ok(()));
    assert_eq!(market.add_symbol(symbol), Err(ErrorKind::SymbolDuplicate));
    assert_eq!(market.symbol(1), Some(symbol));

    assert_eq!(market.delete_symbol(1), Ok(()));
    assert_eq!(market.delete_symbol(1), Err(ErrorKind::SymbolNotFound));
    assert!(market.symbol(1).is_none());

    assert_eq!(
        market.handler().events,
        vec![
            MarketEvent::AddSymbol(symbol),
            MarketEvent::DeleteSymbol(symbol),
        ]
    );
}

#[test]
fn test_order_book_lifecycle() {
    let mut market = MarketManager::with_handler(EventCollector::new());
    let symbol = Symbol::new(1, "EURUSD");

    assert_eq!(market.add_order_book(1), Err(ErrorKind::SymbolNotFound));

    market.add_symbol(symbol).unwrap();
    assert_eq!(market.add_order_book(1), Ok(()));
    assert_eq!(market.add_order_book(1), Err(ErrorKind::OrderBookDuplicate));
    assert!(market.order_book(1).is_some());

    // A symbol with a live book cannot be deleted
    assert_eq!(market.delete_symbol(1), Err(ErrorKind::SymbolNotFound));

    assert_eq!(market.delete_order_book(1), Ok(()));
    assert_eq!(market.delete_order_book(1), Err(ErrorKind::OrderBookNotFound));
    assert_eq!(market.delete_symbol(1), Ok(()));
}

#[test]
fn test_delete_order_book_releases_orders() {
    let mut market = market();
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 10, 10)).unwrap();
    market.add_order(Order::buy_stop(2, SYMBOL_ID, 50, 10)).unwrap();
    assert_eq!(market.order_count(), 2);

    let events_before = market.handler().events.len();
    market.delete_order_book(SYMBOL_ID).unwrap();

    // Orders vanish from the index without per-order delete events
    assert_eq!(market.order_count(), 0);
    assert!(market.order(1).is_none());
    let new_events = &market.handler().events[events_before..];
    assert!(matches!(new_events, [MarketEvent::DeleteOrderBook(_)]));
}

#[test]
fn test_add_order_requires_book() {
    let mut market = MarketManager::with_handler(EventCollector::new());
    market.add_symbol(Symbol::new(0, "TEST")).unwrap();

    assert_eq!(
        market.add_order(Order::buy_limit(1, 0, 10, 10)),
        Err(ErrorKind::OrderBookNotFound)
    );
    assert!(market.handler().events.is_empty());
}

#[test]
fn test_duplicate_order_rejected() {
    let mut market = matching_market();
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 10, 10)).unwrap();

    assert_eq!(
        market.add_order(Order::buy_limit(1, SYMBOL_ID, 20, 10)),
        Err(ErrorKind::OrderDuplicate)
    );

    // The live order is untouched by the rejected insert
    let order = market.order(1).expect("original order");
    assert_eq!(order.price, 10);
    assert_eq!(book_orders(&market), (1, 0));
}

#[test]
fn test_reduce_order() {
    let mut market = matching_market();
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 10, 100)).unwrap();

    assert_eq!(market.reduce_order(1, 0), Err(ErrorKind::OrderQuantityInvalid));
    assert_eq!(market.reduce_order(0, 10), Err(ErrorKind::OrderIdInvalid));
    assert_eq!(market.reduce_order(2, 10), Err(ErrorKind::OrderNotFound));

    market.reduce_order(1, 30).unwrap();
    assert_eq!(market.order(1).map(|order| order.leaves_quantity), Some(70));
    assert_eq!(book_volume(&market), (70, 0));

    // Reducing past the leaves clamps and deletes the order
    market.reduce_order(1, 1000).unwrap();
    assert!(market.order(1).is_none());
    assert_eq!(book_orders(&market), (0, 0));
}

#[test]
fn test_modify_order_moves_price_and_quantity() {
    let mut market = matching_market();
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 10, 100)).unwrap();

    market.modify_order(1, 20, 50).unwrap();
    let order = market.order(1).expect("live order");
    assert_eq!(order.price, 20);
    assert_eq!(order.quantity, 50);
    assert_eq!(order.leaves_quantity, 50);

    let book = market.order_book(SYMBOL_ID).unwrap();
    assert_eq!(book.best_bid(), Some(20));
    assert!(book.bid_level(10).is_none());
}

#[test]
fn test_modify_order_to_same_values_is_stable() {
    let mut market = matching_market();
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 10, 100)).unwrap();

    market.modify_order(1, 10, 100).unwrap();
    assert_eq!(market.order(1).map(|order| order.leaves_quantity), Some(100));
    assert_eq!(book_orders(&market), (1, 0));
    assert_eq!(book_volume(&market), (100, 0));
}

#[test]
fn test_in_flight_mitigation() {
    let mut market = matching_market();
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 10, 100)).unwrap();
    market.add_order(Order::sell_limit(2, SYMBOL_ID, 20, 100)).unwrap();

    // Partially fill both resting orders
    market.add_order(Order::sell_limit(3, SYMBOL_ID, 10, 20)).unwrap();
    market.add_order(Order::buy_limit(4, SYMBOL_ID, 20, 20)).unwrap();
    assert_eq!(book_orders(&market), (1, 1));
    assert_eq!(book_volume(&market), (80, 80));

    // Mitigation discounts what already executed
    market.mitigate_order(1, 10, 150).unwrap();
    market.mitigate_order(2, 20, 50).unwrap();
    assert_eq!(book_volume(&market), (130, 30));

    // A mitigated quantity at or below the executed amount cancels
    market.mitigate_order(1, 10, 20).unwrap();
    market.mitigate_order(2, 20, 10).unwrap();
    assert_eq!(book_orders(&market), (0, 0));
    assert_eq!(book_volume(&market), (0, 0));
}

#[test]
fn test_replace_order_is_limit_only() {
    // Matching stays disabled so the stop order rests instead of
    // activating against the empty market
    let mut market = market();
    market.add_order(Order::buy_stop(1, SYMBOL_ID, 100, 10)).unwrap();

    assert_eq!(
        market.replace_order(1, 2, 50, 10),
        Err(ErrorKind::OrderTypeInvalid)
    );
    assert_eq!(market.replace_order(9, 10, 50, 10), Err(ErrorKind::OrderNotFound));
}

#[test]
fn test_delete_order() {
    let mut market = matching_market();
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 10, 100)).unwrap();

    assert_eq!(market.delete_order(0), Err(ErrorKind::OrderIdInvalid));
    assert_eq!(market.delete_order(2), Err(ErrorKind::OrderNotFound));

    market.delete_order(1).unwrap();
    assert!(market.order(1).is_none());
    assert_eq!(book_orders(&market), (0, 0));
    assert_eq!(market.delete_order(1), Err(ErrorKind::OrderNotFound));
}

#[test]
fn test_add_then_delete_restores_book() {
    let mut market = matching_market();
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 10, 10)).unwrap();
    let before_orders = book_orders(&market);
    let before_volume = book_volume(&market);

    market.add_order(Order::buy_limit(2, SYMBOL_ID, 15, 25)).unwrap();
    market.delete_order(2).unwrap();

    assert_eq!(book_orders(&market), before_orders);
    assert_eq!(book_volume(&market), before_volume);
    let book = market.order_book(SYMBOL_ID).unwrap();
    assert_eq!(book.best_bid(), Some(10));
    assert!(book.bid_level(15).is_none());
}

#[test]
fn test_execute_order_at_own_price() {
    let mut market = matching_market();
    market
        .add_order(Order::buy_limit(1, SYMBOL_ID, 10, 100).with_max_visible(30))
        .unwrap();

    market.execute_order(1, 40).unwrap();
    let order = market.order(1).expect("live order");
    assert_eq!(order.executed_quantity, 40);
    assert_eq!(order.leaves_quantity, 60);

    // The iceberg window refreshes as the hidden reserve drains
    let book = market.order_book(SYMBOL_ID).unwrap();
    let level = book.bid_level(10).expect("level");
    assert_eq!(level.total_volume, 60);
    assert_eq!(level.visible_volume, 30);

    // Executing the rest (clamped) removes the order and the level
    market.execute_order(1, 1000).unwrap();
    assert!(market.order(1).is_none());
    assert_eq!(book_orders(&market), (0, 0));
}

#[test]
fn test_execute_order_at_external_price_updates_references() {
    let mut market = matching_market();
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 100, 20)).unwrap();
    market.add_order(Order::sell_limit(2, SYMBOL_ID, 200, 20)).unwrap();

    // A sell execution prints on the bid, a buy execution on the ask,
    // at the externally supplied price
    market.execute_order_at(2, 100, 5).unwrap();
    market.execute_order_at(1, 200, 5).unwrap();

    let book = market.order_book(SYMBOL_ID).unwrap();
    assert_eq!(book.market_price_bid(), 100);
    assert_eq!(book.market_price_ask(), 200);

    assert_eq!(
        market.handler().executions(),
        vec![(2, 100, 5), (1, 200, 5)]
    );
}

#[test]
fn test_snapshot_of_live_book() {
    let mut market = matching_market();
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 10, 10)).unwrap();
    market.add_order(Order::buy_limit(2, SYMBOL_ID, 20, 20)).unwrap();
    market.add_order(Order::sell_limit(3, SYMBOL_ID, 30, 30)).unwrap();

    let book = market.order_book(SYMBOL_ID).unwrap();
    let snapshot = book.snapshot(usize::MAX);
    assert_eq!(snapshot.best_bid(), Some((20, 20)));
    assert_eq!(snapshot.best_ask(), Some((30, 30)));
    assert_eq!(snapshot.total_bid_volume(), 30);
    assert_eq!(snapshot.spread(), Some(10));

    // Depth-limited snapshots keep the best levels
    let top = book.snapshot(1);
    assert_eq!(top.bids.len(), 1);
    assert_eq!(top.bids[0].price, 20);

    let package = SnapshotPackage::new(snapshot).expect("package");
    let json = package.to_json().expect("json");
    let restored = SnapshotPackage::from_json(&json).expect("parse");
    restored.validate().expect("checksum");
}
