//! Order record, order kinds, sides, time-in-force policies and
//! parameter validation.

use super::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of an order or a price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buying side of the market
    Buy,
    /// Selling side of the market
    Sell,
}

impl Side {
    /// The opposite market side.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Supported order kinds.
///
/// Market and limit orders are matched immediately against the book.
/// Stop kinds rest on internal stop ladders until their stop price is
/// reached, then convert into a market (stop, trailing stop) or limit
/// (stop-limit, trailing stop-limit) order. Trailing kinds additionally
/// have their stop price follow the market at a configured distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// Execute at the best available price, never rests
    Market,
    /// Execute at the limit price or better, rests otherwise
    Limit,
    /// Becomes a market order once the stop price is reached
    Stop,
    /// Becomes a limit order once the stop price is reached
    StopLimit,
    /// Stop order whose stop price trails the market
    TrailingStop,
    /// Stop-limit order whose stop price trails the market
    TrailingStopLimit,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Market => write!(f, "market"),
            OrderKind::Limit => write!(f, "limit"),
            OrderKind::Stop => write!(f, "stop"),
            OrderKind::StopLimit => write!(f, "stop-limit"),
            OrderKind::TrailingStop => write!(f, "trailing-stop"),
            OrderKind::TrailingStopLimit => write!(f, "trailing-stop-limit"),
        }
    }
}

/// Time-in-force policy of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-Till-Cancelled: rests until executed or cancelled
    Gtc,
    /// Immediate-Or-Cancel: executes what it can, remainder cancelled
    Ioc,
    /// Fill-Or-Kill: executes in full immediately or cancels entirely
    Fok,
    /// All-Or-None: executes in full or not at all, may rest
    Aon,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInForce::Gtc => write!(f, "GTC"),
            TimeInForce::Ioc => write!(f, "IOC"),
            TimeInForce::Fok => write!(f, "FOK"),
            TimeInForce::Aon => write!(f, "AON"),
        }
    }
}

/// The canonical order record.
///
/// Orders are plain value records: the matching engine copies them into
/// its order index and mutates the executed/leaves quantities as fills
/// happen. Prices and quantities are unsigned 64-bit integer ticks.
///
/// Iceberg behavior is controlled by `max_visible_quantity`:
/// `u64::MAX` marks a regular order, `0` a fully hidden order, any
/// smaller value an iceberg whose visible portion refreshes as it
/// executes. Slippage (market and stop orders only) widens the price at
/// which a market order is allowed to execute; `u64::MAX` disables it.
///
/// Trailing distance and step use a signed encoding: positive values
/// are absolute ticks, negative values are basis points with 0.01%
/// precision (`-1` means 0.01%, `-10000` means 100%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order id, unique across all live orders
    pub id: u64,
    /// Id of the symbol the order trades
    pub symbol_id: u32,
    /// Order kind
    pub kind: OrderKind,
    /// Order side
    pub side: Side,
    /// Limit price (0 for market orders)
    pub price: u64,
    /// Stop price (0 for non-stop orders)
    pub stop_price: u64,
    /// Original order quantity
    pub quantity: u64,
    /// Quantity executed so far
    pub executed_quantity: u64,
    /// Quantity still open on the book
    pub leaves_quantity: u64,
    /// Time-in-force policy
    pub time_in_force: TimeInForce,
    /// Maximum visible quantity (`u64::MAX` = regular, 0 = hidden)
    pub max_visible_quantity: u64,
    /// Market order slippage (`u64::MAX` = unlimited)
    pub slippage: u64,
    /// Trailing distance to market (ticks if positive, bps if negative)
    pub trailing_distance: i64,
    /// Trailing step (ticks if positive, bps if negative)
    pub trailing_step: i64,
}

impl Order {
    /// The hidden part of the leaves quantity.
    #[inline]
    pub fn hidden_quantity(&self) -> u64 {
        self.leaves_quantity.saturating_sub(self.max_visible_quantity)
    }

    /// The visible part of the leaves quantity.
    #[inline]
    pub fn visible_quantity(&self) -> u64 {
        self.leaves_quantity.min(self.max_visible_quantity)
    }

    /// Is this a market order?
    #[inline]
    pub fn is_market(&self) -> bool {
        self.kind == OrderKind::Market
    }

    /// Is this a limit order?
    #[inline]
    pub fn is_limit(&self) -> bool {
        self.kind == OrderKind::Limit
    }

    /// Is this a stop order?
    #[inline]
    pub fn is_stop(&self) -> bool {
        self.kind == OrderKind::Stop
    }

    /// Is this a stop-limit order?
    #[inline]
    pub fn is_stop_limit(&self) -> bool {
        self.kind == OrderKind::StopLimit
    }

    /// Is this a trailing stop order?
    #[inline]
    pub fn is_trailing_stop(&self) -> bool {
        self.kind == OrderKind::TrailingStop
    }

    /// Is this a trailing stop-limit order?
    #[inline]
    pub fn is_trailing_stop_limit(&self) -> bool {
        self.kind == OrderKind::TrailingStopLimit
    }

    /// Does the stop price of this order trail the market?
    #[inline]
    pub fn is_trailing(&self) -> bool {
        self.is_trailing_stop() || self.is_trailing_stop_limit()
    }

    /// Is this order on the buy side?
    #[inline]
    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }

    /// Is this order on the sell side?
    #[inline]
    pub fn is_sell(&self) -> bool {
        self.side == Side::Sell
    }

    /// Is this a 'Good-Till-Cancelled' order?
    #[inline]
    pub fn is_gtc(&self) -> bool {
        self.time_in_force == TimeInForce::Gtc
    }

    /// Is this an 'Immediate-Or-Cancel' order?
    #[inline]
    pub fn is_ioc(&self) -> bool {
        self.time_in_force == TimeInForce::Ioc
    }

    /// Is this a 'Fill-Or-Kill' order?
    #[inline]
    pub fn is_fok(&self) -> bool {
        self.time_in_force == TimeInForce::Fok
    }

    /// Is this an 'All-Or-None' order?
    #[inline]
    pub fn is_aon(&self) -> bool {
        self.time_in_force == TimeInForce::Aon
    }

    /// Is this a fully hidden order?
    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.max_visible_quantity == 0
    }

    /// Does this order hide any part of its quantity?
    #[inline]
    pub fn is_iceberg(&self) -> bool {
        self.max_visible_quantity < u64::MAX
    }

    /// Does this order carry a slippage bound?
    #[inline]
    pub fn has_slippage(&self) -> bool {
        self.slippage < u64::MAX
    }

    /// Validate the order parameters.
    ///
    /// Checks the id, the quantity bookkeeping and the per-kind
    /// parameter constraints:
    ///
    /// * market orders must be IOC or FOK and cannot be iceberg,
    /// * limit orders cannot carry slippage,
    /// * stop and trailing stop orders cannot be AON or iceberg,
    /// * stop-limit kinds cannot carry slippage,
    /// * trailing kinds need a non-zero trailing distance; an absolute
    ///   step must be smaller than the distance, a percentage distance
    ///   must be within [-10000, -1] with the step inside (distance, 0].
    ///
    /// # Errors
    /// Returns the corresponding [`ErrorKind`] on the first violated
    /// constraint.
    pub fn validate(&self) -> Result<(), ErrorKind> {
        if self.id == 0 {
            return Err(ErrorKind::OrderIdInvalid);
        }

        if self.quantity < self.leaves_quantity || self.leaves_quantity == 0 {
            return Err(ErrorKind::OrderQuantityInvalid);
        }

        if self.is_market() {
            if !self.is_ioc() && !self.is_fok() {
                return Err(ErrorKind::OrderParameterInvalid);
            }
            if self.is_iceberg() {
                return Err(ErrorKind::OrderParameterInvalid);
            }
        }

        if self.is_limit() && self.has_slippage() {
            return Err(ErrorKind::OrderParameterInvalid);
        }

        if self.is_stop() || self.is_trailing_stop() {
            if self.is_aon() {
                return Err(ErrorKind::OrderParameterInvalid);
            }
            if self.is_iceberg() {
                return Err(ErrorKind::OrderParameterInvalid);
            }
        }

        if (self.is_stop_limit() || self.is_trailing_stop_limit()) && self.has_slippage() {
            return Err(ErrorKind::OrderParameterInvalid);
        }

        if self.is_trailing() {
            if self.trailing_distance == 0 {
                return Err(ErrorKind::OrderParameterInvalid);
            }
            if self.trailing_distance > 0 {
                if self.trailing_step < 0 || self.trailing_step >= self.trailing_distance {
                    return Err(ErrorKind::OrderParameterInvalid);
                }
            } else {
                if self.trailing_distance < -10_000 {
                    return Err(ErrorKind::OrderParameterInvalid);
                }
                if self.trailing_step > 0 || self.trailing_step <= self.trailing_distance {
                    return Err(ErrorKind::OrderParameterInvalid);
                }
            }
        }

        Ok(())
    }

    fn with_params(
        id: u64,
        symbol_id: u32,
        kind: OrderKind,
        side: Side,
        price: u64,
        stop_price: u64,
        quantity: u64,
        time_in_force: TimeInForce,
    ) -> Self {
        Self {
            id,
            symbol_id,
            kind,
            side,
            price,
            stop_price,
            quantity,
            executed_quantity: 0,
            leaves_quantity: quantity,
            time_in_force,
            max_visible_quantity: u64::MAX,
            slippage: u64::MAX,
            trailing_distance: 0,
            trailing_step: 0,
        }
    }

    /// Prepare a market order. Market orders default to IOC.
    pub fn market(id: u64, symbol_id: u32, side: Side, quantity: u64) -> Self {
        Self::with_params(
            id,
            symbol_id,
            OrderKind::Market,
            side,
            0,
            0,
            quantity,
            TimeInForce::Ioc,
        )
    }

    /// Prepare a buy market order.
    pub fn buy_market(id: u64, symbol_id: u32, quantity: u64) -> Self {
        Self::market(id, symbol_id, Side::Buy, quantity)
    }

    /// Prepare a sell market order.
    pub fn sell_market(id: u64, symbol_id: u32, quantity: u64) -> Self {
        Self::market(id, symbol_id, Side::Sell, quantity)
    }

    /// Set the slippage bound of a market or stop order.
    pub fn with_slippage(mut self, slippage: u64) -> Self {
        self.slippage = slippage;
        self
    }

    /// Set the maximum visible quantity, turning a limit or stop-limit
    /// order into an iceberg (or fully hidden) order.
    pub fn with_max_visible(mut self, max_visible_quantity: u64) -> Self {
        self.max_visible_quantity = max_visible_quantity;
        self
    }

    /// Set the time-in-force policy.
    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    /// Prepare a limit order.
    pub fn limit(id: u64, symbol_id: u32, side: Side, price: u64, quantity: u64) -> Self {
        Self::with_params(
            id,
            symbol_id,
            OrderKind::Limit,
            side,
            price,
            0,
            quantity,
            TimeInForce::Gtc,
        )
    }

    /// Prepare a buy limit order.
    pub fn buy_limit(id: u64, symbol_id: u32, price: u64, quantity: u64) -> Self {
        Self::limit(id, symbol_id, Side::Buy, price, quantity)
    }

    /// Prepare a sell limit order.
    pub fn sell_limit(id: u64, symbol_id: u32, price: u64, quantity: u64) -> Self {
        Self::limit(id, symbol_id, Side::Sell, price, quantity)
    }

    /// Prepare a stop order.
    pub fn stop(id: u64, symbol_id: u32, side: Side, stop_price: u64, quantity: u64) -> Self {
        Self::with_params(
            id,
            symbol_id,
            OrderKind::Stop,
            side,
            0,
            stop_price,
            quantity,
            TimeInForce::Gtc,
        )
    }

    /// Prepare a buy stop order.
    pub fn buy_stop(id: u64, symbol_id: u32, stop_price: u64, quantity: u64) -> Self {
        Self::stop(id, symbol_id, Side::Buy, stop_price, quantity)
    }

    /// Prepare a sell stop order.
    pub fn sell_stop(id: u64, symbol_id: u32, stop_price: u64, quantity: u64) -> Self {
        Self::stop(id, symbol_id, Side::Sell, stop_price, quantity)
    }

    /// Prepare a stop-limit order.
    pub fn stop_limit(
        id: u64,
        symbol_id: u32,
        side: Side,
        stop_price: u64,
        price: u64,
        quantity: u64,
    ) -> Self {
        Self::with_params(
            id,
            symbol_id,
            OrderKind::StopLimit,
            side,
            price,
            stop_price,
            quantity,
            TimeInForce::Gtc,
        )
    }

    /// Prepare a buy stop-limit order.
    pub fn buy_stop_limit(
        id: u64,
        symbol_id: u32,
        stop_price: u64,
        price: u64,
        quantity: u64,
    ) -> Self {
        Self::stop_limit(id, symbol_id, Side::Buy, stop_price, price, quantity)
    }

    /// Prepare a sell stop-limit order.
    pub fn sell_stop_limit(
        id: u64,
        symbol_id: u32,
        stop_price: u64,
        price: u64,
        quantity: u64,
    ) -> Self {
        Self::stop_limit(id, symbol_id, Side::Sell, stop_price, price, quantity)
    }

    /// Prepare a trailing stop order.
    pub fn trailing_stop(
        id: u64,
        symbol_id: u32,
        side: Side,
        stop_price: u64,
        quantity: u64,
        trailing_distance: i64,
        trailing_step: i64,
    ) -> Self {
        let mut order = Self::with_params(
            id,
            symbol_id,
            OrderKind::TrailingStop,
            side,
            0,
            stop_price,
            quantity,
            TimeInForce::Gtc,
        );
        order.trailing_distance = trailing_distance;
        order.trailing_step = trailing_step;
        order
    }

    /// Prepare a trailing buy stop order.
    pub fn trailing_buy_stop(
        id: u64,
        symbol_id: u32,
        stop_price: u64,
        quantity: u64,
        trailing_distance: i64,
        trailing_step: i64,
    ) -> Self {
        Self::trailing_stop(
            id,
            symbol_id,
            Side::Buy,
            stop_price,
            quantity,
            trailing_distance,
            trailing_step,
        )
    }

    /// Prepare a trailing sell stop order.
    pub fn trailing_sell_stop(
        id: u64,
        symbol_id: u32,
        stop_price: u64,
        quantity: u64,
        trailing_distance: i64,
        trailing_step: i64,
    ) -> Self {
        Self::trailing_stop(
            id,
            symbol_id,
            Side::Sell,
            stop_price,
            quantity,
            trailing_distance,
            trailing_step,
        )
    }

    /// Prepare a trailing stop-limit order.
    pub fn trailing_stop_limit(
        id: u64,
        symbol_id: u32,
        side: Side,
        stop_price: u64,
        price: u64,
        quantity: u64,
        trailing_distance: i64,
        trailing_step: i64,
    ) -> Self {
        let mut order = Self::with_params(
            id,
            symbol_id,
            OrderKind::TrailingStopLimit,
            side,
            price,
            stop_price,
            quantity,
            TimeInForce::Gtc,
        );
        order.trailing_distance = trailing_distance;
        order.trailing_step = trailing_step;
        order
    }

    /// Prepare a trailing buy stop-limit order.
    pub fn trailing_buy_stop_limit(
        id: u64,
        symbol_id: u32,
        stop_price: u64,
        price: u64,
        quantity: u64,
        trailing_distance: i64,
        trailing_step: i64,
    ) -> Self {
        Self::trailing_stop_limit(
            id,
            symbol_id,
            Side::Buy,
            stop_price,
            price,
            quantity,
            trailing_distance,
            trailing_step,
        )
    }

    /// Prepare a trailing sell stop-limit order.
    pub fn trailing_sell_stop_limit(
        id: u64,
        symbol_id: u32,
        stop_price: u64,
        price: u64,
        quantity: u64,
        trailing_distance: i64,
        trailing_step: i64,
    ) -> Self {
        Self::trailing_stop_limit(
            id,
            symbol_id,
            Side::Sell,
            stop_price,
            price,
            quantity,
            trailing_distance,
            trailing_step,
        )
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} #{} price={} stop={} qty={}/{} {}",
            self.kind,
            self.side,
            self.symbol_id,
            self.id,
            self.price,
            self.stop_price,
            self.leaves_quantity,
            self.quantity,
            self.time_in_force
        )
    }
}
