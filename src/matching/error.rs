//! Market command error codes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure codes returned by market manager commands.
///
/// Every command either succeeds (`Ok(())`, with its events emitted) or
/// fails with one of these codes and leaves the market unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A symbol with the same id is already registered
    SymbolDuplicate,

    /// The referenced symbol is not registered
    SymbolNotFound,

    /// An order book for the symbol already exists
    OrderBookDuplicate,

    /// No order book exists for the referenced symbol
    OrderBookNotFound,

    /// An order with the same id is already live
    OrderDuplicate,

    /// The referenced order is not live
    OrderNotFound,

    /// The order id is zero
    OrderIdInvalid,

    /// The operation does not support the order's kind
    OrderTypeInvalid,

    /// An order parameter violates the constraints of its kind
    OrderParameterInvalid,

    /// The order quantity is zero or inconsistent with its leaves
    OrderQuantityInvalid,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::SymbolDuplicate => write!(f, "duplicate symbol"),
            ErrorKind::SymbolNotFound => write!(f, "symbol not found"),
            ErrorKind::OrderBookDuplicate => write!(f, "duplicate order book"),
            ErrorKind::OrderBookNotFound => write!(f, "order book not found"),
            ErrorKind::OrderDuplicate => write!(f, "duplicate order"),
            ErrorKind::OrderNotFound => write!(f, "order not found"),
            ErrorKind::OrderIdInvalid => write!(f, "invalid order id"),
            ErrorKind::OrderTypeInvalid => write!(f, "invalid order type"),
            ErrorKind::OrderParameterInvalid => write!(f, "invalid order parameter"),
            ErrorKind::OrderQuantityInvalid => write!(f, "invalid order quantity"),
        }
    }
}

impl std::error::Error for ErrorKind {}
