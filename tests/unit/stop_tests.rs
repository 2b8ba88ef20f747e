//! Stop, stop-limit and trailing stop behavior: immediate activation,
//! resting on the stop ladders, trade-driven activation and trailing
//! recalculation.
//!
//! Stop activation keys off the last traded prices: a buy stop arms
//! when a buy-side execution prints at or above its stop price, a sell
//! stop when a sell-side execution prints at or below it. Quote moves
//! alone never trigger or re-anchor a stop.

use crate::common::*;
use matchbook_rs::prelude::*;

#[test]
fn test_stop_order_activates_when_in_the_money() {
    let mut market = matching_market();
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 10, 10)).unwrap();
    market.add_order(Order::buy_limit(2, SYMBOL_ID, 20, 20)).unwrap();
    market.add_order(Order::buy_limit(3, SYMBOL_ID, 30, 30)).unwrap();
    assert_eq!(book_orders(&market), (3, 0));
    assert_eq!(stop_orders(&market), (0, 0));

    // No sell has printed yet, so the bid reference is still 0 and a
    // sell stop at 40 is already in the money: it executes as a market
    // order and sweeps the bids
    market.add_order(Order::sell_stop(4, SYMBOL_ID, 40, 60)).unwrap();
    assert_eq!(book_orders(&market), (0, 0));
    assert_eq!(book_volume(&market), (0, 0));
    assert_eq!(stop_orders(&market), (0, 0));
    assert!(market.order(4).is_none());
}

#[test]
fn test_stop_order_rests_and_activates_on_trade() {
    let mut market = matching_market();
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 10, 10)).unwrap();
    market.add_order(Order::buy_limit(2, SYMBOL_ID, 20, 20)).unwrap();
    market.add_order(Order::buy_limit(3, SYMBOL_ID, 30, 30)).unwrap();

    // The sweep prints trades down to 10, leaving last ask = 10
    market.add_order(Order::sell_stop(4, SYMBOL_ID, 40, 60)).unwrap();

    market.add_order(Order::sell_limit(5, SYMBOL_ID, 30, 30)).unwrap();
    // Ask reference is 10, so a buy stop at 40 is out of the money
    market.add_order(Order::buy_stop(6, SYMBOL_ID, 40, 40)).unwrap();
    market.add_order(Order::sell_limit(7, SYMBOL_ID, 60, 60)).unwrap();
    assert_eq!(book_orders(&market), (0, 2));
    assert_eq!(book_volume(&market), (0, 90));
    assert_eq!(stop_orders(&market), (1, 0));
    assert_eq!(stop_volume(&market), (40, 0));

    // A buy printing at 30 still does not reach the 40 stop
    market.add_order(Order::buy_limit(8, SYMBOL_ID, 40, 40)).unwrap();
    assert_eq!(book_orders(&market), (1, 1));
    assert_eq!(book_volume(&market), (10, 60));
    assert_eq!(stop_orders(&market), (1, 0));

    // A buy printing at 60 arms the stop, which then takes 40 out of
    // the resting ask level
    market.add_order(Order::buy_limit(9, SYMBOL_ID, 60, 10)).unwrap();
    assert_eq!(stop_orders(&market), (0, 0));
    assert!(market.order(6).is_none());
    assert_eq!(book_orders(&market), (1, 1));
    assert_eq!(book_volume(&market), (10, 10));
}

#[test]
fn test_stop_order_on_empty_market() {
    let mut market = matching_market();

    // Both stops are in the money against the initial references and
    // die as counterparty-less market orders
    market.add_order(Order::sell_stop(1, SYMBOL_ID, 10, 10)).unwrap();
    market.add_order(Order::buy_stop(2, SYMBOL_ID, 20, 20)).unwrap();
    assert_eq!(book_orders(&market), (0, 0));
    assert_eq!(stop_orders(&market), (0, 0));
    assert!(market.order(1).is_none());
    assert!(market.order(2).is_none());
}

#[test]
fn test_stop_limit_order_activation() {
    let mut market = matching_market();
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 10, 10)).unwrap();
    market.add_order(Order::buy_limit(2, SYMBOL_ID, 20, 20)).unwrap();
    market.add_order(Order::buy_limit(3, SYMBOL_ID, 30, 30)).unwrap();

    // In the money immediately: becomes a limit sell at 20 and fills 40
    market
        .add_order(Order::sell_stop_limit(4, SYMBOL_ID, 40, 20, 40))
        .unwrap();
    assert_eq!(book_orders(&market), (2, 0));
    assert_eq!(book_volume(&market), (20, 0));
    assert_eq!(stop_orders(&market), (0, 0));

    // In the money again: fills 20 and rests the remainder at ask 10
    market
        .add_order(Order::sell_stop_limit(5, SYMBOL_ID, 30, 10, 30))
        .unwrap();
    assert_eq!(book_orders(&market), (0, 1));
    assert_eq!(book_volume(&market), (0, 10));
    assert_eq!(stop_orders(&market), (0, 0));

    // Out of the money (ask reference is 10): rests on the stop ladder
    market
        .add_order(Order::buy_stop_limit(6, SYMBOL_ID, 20, 10, 10))
        .unwrap();
    market.add_order(Order::sell_limit(7, SYMBOL_ID, 20, 20)).unwrap();
    assert_eq!(book_orders(&market), (0, 2));
    assert_eq!(book_volume(&market), (0, 30));
    assert_eq!(stop_orders(&market), (1, 0));
    assert_eq!(stop_volume(&market), (10, 0));

    // Buys printing up to 20 activate the stop-limit, which rests as a
    // limit buy at 10
    market.add_order(Order::buy_limit(8, SYMBOL_ID, 20, 30)).unwrap();
    assert_eq!(book_orders(&market), (1, 0));
    assert_eq!(book_volume(&market), (10, 0));
    assert_eq!(stop_orders(&market), (0, 0));
    let order = market.order(6).expect("activated stop-limit");
    assert_eq!(order.price, 10);
    assert_eq!(order.stop_price, 0);
}

#[test]
fn test_stop_limit_order_rests_on_empty_market() {
    let mut market = matching_market();

    // Sell side: the bid reference starts at 0, stop 10 >= 0 activates
    // and the order converts to a resting limit ask at 30
    market
        .add_order(Order::sell_stop_limit(1, SYMBOL_ID, 10, 30, 30))
        .unwrap();
    assert_eq!(book_orders(&market), (0, 1));
    assert_eq!(book_volume(&market), (0, 30));
    assert_eq!(stop_orders(&market), (0, 0));
    market.delete_order(1).unwrap();

    // Buy side: the ask reference starts at the sentinel maximum, so
    // the stop activates and rests as a limit bid at 10
    market
        .add_order(Order::buy_stop_limit(2, SYMBOL_ID, 30, 10, 10))
        .unwrap();
    assert_eq!(book_orders(&market), (1, 0));
    assert_eq!(book_volume(&market), (10, 0));
    assert_eq!(stop_orders(&market), (0, 0));
    market.delete_order(2).unwrap();
}

/// Put trades at 100 (bid side) and 200 (ask side) on the tape, leaving
/// a 10@100 bid and a 10@200 ask resting.
fn seed_tape(market: &mut MarketManager<EventCollector>) {
    market.add_order(Order::buy_limit(1, SYMBOL_ID, 100, 20)).unwrap();
    market.add_order(Order::sell_limit(2, SYMBOL_ID, 200, 20)).unwrap();
    market.add_order(Order::sell_market(3, SYMBOL_ID, 10)).unwrap();
    market.add_order(Order::buy_market(4, SYMBOL_ID, 10)).unwrap();
    assert_eq!(book_orders(market), (1, 1));
    assert_eq!(book_volume(market), (10, 10));
}

#[test]
fn test_trailing_stop_recalculation() {
    let mut market = matching_market();
    seed_tape(&mut market);

    // Both references sit at the 200 print now
    let book = market.order_book(SYMBOL_ID).unwrap();
    assert_eq!(book.market_price_bid(), 200);
    assert_eq!(book.market_price_ask(), 200);
    drop(book);

    // Buy stop trails the ask by 10 ticks with a 5 tick step
    market
        .add_order(Order::trailing_buy_stop(5, SYMBOL_ID, 1000, 10, 10, 5))
        .unwrap();
    assert_eq!(market.order(5).map(|order| order.stop_price), Some(210));

    // Sell stop-limit trails the bid by 10% with a 5% step, keeping a
    // 10 tick limit offset
    market
        .add_order(Order::trailing_sell_stop_limit(6, SYMBOL_ID, 0, 10, 10, -1000, -500))
        .unwrap();
    let order = market.order(6).expect("trailing stop-limit");
    assert_eq!(order.stop_price, 180);
    assert_eq!(order.price, 190);
    assert_eq!(stop_orders(&market), (1, 1));

    // Moving the quote without a trade re-anchors nothing
    market.modify_order(2, 180, 10).unwrap();
    assert_eq!(market.order(5).map(|order| order.stop_price), Some(210));

    // A trade at 180 pulls the buy stop down to 190
    market.add_order(Order::buy_market(7, SYMBOL_ID, 5)).unwrap();
    assert_eq!(market.order(5).map(|order| order.stop_price), Some(190));
    // The bid reference moved down, so the sell stop stays put
    assert_eq!(market.order(6).map(|order| order.stop_price), Some(180));

    // A trade at 250 arms the buy stop (190 <= 250): it executes what
    // it can and leaves the market
    market.modify_order(2, 250, 5).unwrap();
    market.add_order(Order::buy_market(8, SYMBOL_ID, 2)).unwrap();
    assert!(market.order(5).is_none());
    assert_eq!(stop_orders(&market), (0, 1));

    // The same prints lift the bid reference to 250, so the sell stop
    // re-anchors upward: stop 250 - 10% = 225, limit 225 + 10 = 235
    let order = market.order(6).expect("trailing stop-limit");
    assert_eq!(order.stop_price, 225);
    assert_eq!(order.price, 235);
}

#[test]
fn test_trailing_step_filters_small_moves() {
    let mut market = matching_market();
    seed_tape(&mut market);

    market
        .add_order(Order::trailing_buy_stop(5, SYMBOL_ID, 1000, 10, 10, 5))
        .unwrap();
    assert_eq!(market.order(5).map(|order| order.stop_price), Some(210));

    // A 3 tick improvement is inside the 5 tick step: no re-anchor
    market.modify_order(2, 197, 10).unwrap();
    market.add_order(Order::buy_market(7, SYMBOL_ID, 2)).unwrap();
    assert_eq!(market.order(5).map(|order| order.stop_price), Some(210));

    // A 20 tick improvement clears the step
    market.modify_order(2, 180, 8).unwrap();
    market.add_order(Order::buy_market(8, SYMBOL_ID, 2)).unwrap();
    assert_eq!(market.order(5).map(|order| order.stop_price), Some(190));
}
