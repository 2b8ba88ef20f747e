//! End-to-end scenarios covering the full command/event round trip,
//! including the exact order event sequences.

use crate::common::*;
use matchbook_rs::prelude::*;

/// Compact order-event shape for sequence assertions (level and book
/// updates are ignored).
#[derive(Debug, PartialEq, Eq)]
enum OrderEvent {
    Add(u64),
    Update(u64, u64),
    Delete(u64),
    Execute(u64, u64, u64),
}

fn order_events(events: &[MarketEvent]) -> Vec<OrderEvent> {
    events
        .iter()
        .filter_map(|event| match event {
            MarketEvent::AddOrder(order) => Some(OrderEvent::Add(order.id)),
            MarketEvent::UpdateOrder(order) => {
                Some(OrderEvent::Update(order.id, order.leaves_quantity))
            }
            MarketEvent::DeleteOrder(order) => Some(OrderEvent::Delete(order.id)),
            MarketEvent::ExecuteOrder {
                order,
                price,
                quantity,
            } => Some(OrderEvent::Execute(order.id, *price, *quantity)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_market_order_clears_one_level() {
    let mut market = matching_market();
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 10, 10)).unwrap();
    market.add_order(Order::buy_limit(2, SYMBOL_ID, 10, 20)).unwrap();
    market.add_order(Order::buy_limit(3, SYMBOL_ID, 10, 30)).unwrap();

    market.handler_mut().clear();
    market.add_order(Order::sell_market(4, SYMBOL_ID, 15)).unwrap();

    // Resting orders fill in FIFO order; each fill reports the resting
    // side first, then the incoming side
    assert_eq!(
        order_events(&market.handler().events),
        vec![
            OrderEvent::Add(4),
            OrderEvent::Execute(1, 10, 10),
            OrderEvent::Delete(1),
            OrderEvent::Execute(4, 10, 10),
            OrderEvent::Execute(2, 10, 5),
            OrderEvent::Update(2, 15),
            OrderEvent::Execute(4, 10, 5),
            OrderEvent::Delete(4),
        ]
    );

    let book = market.order_book(SYMBOL_ID).unwrap();
    let level = book.bid_level(10).expect("level survives");
    assert_eq!(level.total_volume, 45);
    assert_eq!(level.orders, 2);
    assert_eq!(book.best_bid(), Some(10));
}

#[test]
fn test_fill_or_kill_killed_without_fills() {
    let mut market = matching_market();
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 10, 10)).unwrap();
    market.add_order(Order::buy_limit(2, SYMBOL_ID, 20, 20)).unwrap();
    market.add_order(Order::buy_limit(3, SYMBOL_ID, 30, 30)).unwrap();

    market.handler_mut().clear();
    market
        .add_order(Order::sell_limit(4, SYMBOL_ID, 10, 100).with_time_in_force(TimeInForce::Fok))
        .unwrap();

    assert_eq!(
        order_events(&market.handler().events),
        vec![OrderEvent::Add(4), OrderEvent::Delete(4)]
    );
    assert_eq!(book_orders(&market), (3, 0));
    assert_eq!(book_volume(&market), (60, 0));
}

#[test]
fn test_all_or_none_exact_chain() {
    let mut market = matching_market();
    market
        .add_order(Order::buy_limit(1, SYMBOL_ID, 20, 30).with_time_in_force(TimeInForce::Aon))
        .unwrap();
    market.add_order(Order::buy_limit(2, SYMBOL_ID, 20, 10)).unwrap();
    market
        .add_order(Order::buy_limit(3, SYMBOL_ID, 30, 30).with_time_in_force(TimeInForce::Aon))
        .unwrap();
    market.add_order(Order::buy_limit(4, SYMBOL_ID, 30, 10)).unwrap();

    market
        .add_order(Order::sell_limit(5, SYMBOL_ID, 20, 80).with_time_in_force(TimeInForce::Aon))
        .unwrap();

    assert_eq!(book_orders(&market), (0, 0));
    assert_eq!(book_volume(&market), (0, 0));
    assert_eq!(market.order_count(), 0);

    // The incoming order executes its full quantity in one report
    let filled: u64 = market
        .handler()
        .executions()
        .iter()
        .filter(|(id, _, _)| *id == 5)
        .map(|(_, _, quantity)| quantity)
        .sum();
    assert_eq!(filled, 80);
}

#[test]
fn test_iceberg_refresh() {
    let mut market = matching_market();
    market
        .add_order(Order::buy_limit(1, SYMBOL_ID, 10, 100).with_max_visible(30))
        .unwrap();

    let book = market.order_book(SYMBOL_ID).unwrap();
    let level = book.bid_level(10).expect("iceberg level");
    assert_eq!(level.total_volume, 100);
    assert_eq!(level.visible_volume, 30);
    drop(book);

    market.add_order(Order::sell_market(2, SYMBOL_ID, 55)).unwrap();

    assert_eq!(market.handler().executions(), vec![(1, 10, 55), (2, 10, 55)]);
    let order = market.order(1).expect("iceberg order");
    assert_eq!(order.leaves_quantity, 45);

    // The visible window refreshed from the hidden reserve
    let book = market.order_book(SYMBOL_ID).unwrap();
    let level = book.bid_level(10).expect("iceberg level");
    assert_eq!(level.total_volume, 45);
    assert_eq!(level.visible_volume, 30);
    assert_eq!(level.hidden_volume, 15);
}

#[test]
fn test_trailing_stop_follows_executions() {
    let mut market = matching_market();

    // Rest one order per side and seed the tape by reporting
    // executions: a sell prints 100 on the bid, a buy prints 200 on
    // the ask
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 100, 20)).unwrap();
    market.add_order(Order::sell_limit(2, SYMBOL_ID, 200, 20)).unwrap();
    market.execute_order_at(2, 100, 5).unwrap();
    market.execute_order_at(1, 200, 5).unwrap();

    let book = market.order_book(SYMBOL_ID).unwrap();
    assert_eq!(book.market_price_bid(), 100);
    assert_eq!(book.market_price_ask(), 200);
    drop(book);

    // The stop snaps from its placeholder to ask reference + distance
    market
        .add_order(Order::trailing_buy_stop(5, SYMBOL_ID, 1000, 10, 10, 5))
        .unwrap();
    assert_eq!(market.order(5).map(|order| order.stop_price), Some(210));

    // Move the ask down and print a trade there
    market.modify_order(2, 180, 15).unwrap();
    assert_eq!(market.order(5).map(|order| order.stop_price), Some(210));
    market.add_order(Order::buy_market(6, SYMBOL_ID, 5)).unwrap();

    assert_eq!(market.order(5).map(|order| order.stop_price), Some(190));
}

#[test]
fn test_replace_triggers_cross() {
    let mut market = matching_market();
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 30, 30)).unwrap();
    market.add_order(Order::sell_limit(2, SYMBOL_ID, 40, 10)).unwrap();

    market.handler_mut().clear();
    market.replace_order(1, 9, 50, 20).unwrap();

    // The old order dies before the replacement appears, and the
    // replacement crosses the resting ask
    assert_eq!(
        order_events(&market.handler().events),
        vec![
            OrderEvent::Delete(1),
            OrderEvent::Add(9),
            OrderEvent::Execute(2, 40, 10),
            OrderEvent::Delete(2),
            OrderEvent::Execute(9, 40, 10),
        ]
    );

    let book = market.order_book(SYMBOL_ID).unwrap();
    assert_eq!(book.best_bid(), Some(50));
    let level = book.bid_level(50).expect("replacement rests");
    assert_eq!(level.total_volume, 10);
    assert_eq!(book.best_ask(), None);
}
