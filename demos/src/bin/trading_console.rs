//! Interactive console for driving a market manager from text
//! commands.
//!
//! Reads whitespace-separated commands from stdin, one per line:
//!
//! ```text
//! add symbol {id} {name}
//! delete symbol {id}
//! add book {id}
//! delete book {id}
//! add market {side} {id} {symbol} {qty} {slippage}
//! add limit {side} {id} {symbol} {price} {qty}
//! reduce order {id} {qty}
//! modify order {id} {new_price} {new_qty}
//! replace order {id} {new_id} {new_price} {new_qty}
//! delete order {id}
//! help
//! exit | quit
//! ```
//!
//! Empty lines and lines starting with `#` are skipped. Every market
//! event is echoed to stdout as it is emitted.

use matchbook_rs::prelude::*;
use std::io::BufRead;

const HELP: &str = "\
Supported commands:
  add symbol {id} {name}
  delete symbol {id}
  add book {id}
  delete book {id}
  add market {side} {id} {symbol} {qty} {slippage}
  add limit {side} {id} {symbol} {price} {qty}
  reduce order {id} {qty}
  modify order {id} {new_price} {new_qty}
  replace order {id} {new_id} {new_price} {new_qty}
  delete order {id}
  help
  exit | quit
Lines starting with '#' and empty lines are skipped.";

/// Command parse failures, reported per input line.
#[derive(Debug, thiserror::Error)]
enum ParseError {
    #[error("unknown command (try 'help')")]
    UnknownCommand,

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("invalid {what}: '{value}'")]
    InvalidArgument {
        what: &'static str,
        value: String,
    },
}

/// One parsed console command.
#[derive(Debug)]
enum Command {
    AddSymbol { id: u32, name: String },
    DeleteSymbol { id: u32 },
    AddBook { id: u32 },
    DeleteBook { id: u32 },
    AddOrder(Order),
    ReduceOrder { id: u64, quantity: u64 },
    ModifyOrder { id: u64, price: u64, quantity: u64 },
    ReplaceOrder { id: u64, new_id: u64, price: u64, quantity: u64 },
    DeleteOrder { id: u64 },
    Help,
    Exit,
}

/// A handler that prints every market event to stdout.
struct ConsoleReporter;

impl MarketHandler for ConsoleReporter {
    fn on_add_symbol(&mut self, symbol: &Symbol) {
        println!("add symbol: {symbol}");
    }

    fn on_delete_symbol(&mut self, symbol: &Symbol) {
        println!("delete symbol: {symbol}");
    }

    fn on_add_order_book(&mut self, order_book: &OrderBook) {
        println!("add order book: {}", order_book.symbol());
    }

    fn on_delete_order_book(&mut self, order_book: &OrderBook) {
        println!("delete order book: {}", order_book.symbol());
    }

    fn on_add_level(&mut self, _order_book: &OrderBook, level: &Level, top: bool) {
        println!("add level: {level}{}", top_marker(top));
    }

    fn on_update_level(&mut self, _order_book: &OrderBook, level: &Level, top: bool) {
        println!("update level: {level}{}", top_marker(top));
    }

    fn on_delete_level(&mut self, _order_book: &OrderBook, level: &Level, top: bool) {
        println!("delete level: {level}{}", top_marker(top));
    }

    fn on_add_order(&mut self, order: &Order) {
        println!("add order: {order}");
    }

    fn on_update_order(&mut self, order: &Order) {
        println!("update order: {order}");
    }

    fn on_delete_order(&mut self, order: &Order) {
        println!("delete order: {order}");
    }

    fn on_execute_order(&mut self, order: &Order, price: u64, quantity: u64) {
        println!("execute order: #{} {} @ {}", order.id, quantity, price);
    }
}

fn top_marker(top: bool) -> &'static str {
    if top { " (top)" } else { "" }
}

fn parse_number<T: std::str::FromStr>(
    tokens: &[&str],
    index: usize,
    what: &'static str,
) -> Result<T, ParseError> {
    let token = tokens.get(index).ok_or(ParseError::MissingArgument(what))?;
    token.parse().map_err(|_| ParseError::InvalidArgument {
        what,
        value: (*token).to_string(),
    })
}

fn parse_side(tokens: &[&str], index: usize) -> Result<Side, ParseError> {
    let token = tokens.get(index).ok_or(ParseError::MissingArgument("side"))?;
    match *token {
        "buy" => Ok(Side::Buy),
        "sell" => Ok(Side::Sell),
        other => Err(ParseError::InvalidArgument {
            what: "side",
            value: other.to_string(),
        }),
    }
}

fn parse_command(line: &str) -> Result<Option<Command>, ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let command = match tokens.as_slice() {
        [] => return Ok(None),
        first if first[0].starts_with('#') => return Ok(None),

        ["help"] => Command::Help,
        ["exit"] | ["quit"] => Command::Exit,

        ["add", "symbol", ..] => Command::AddSymbol {
            id: parse_number(&tokens, 2, "symbol id")?,
            name: tokens
                .get(3)
                .ok_or(ParseError::MissingArgument("symbol name"))?
                .to_string(),
        },
        ["delete", "symbol", ..] => Command::DeleteSymbol {
            id: parse_number(&tokens, 2, "symbol id")?,
        },

        ["add", "book", ..] => Command::AddBook {
            id: parse_number(&tokens, 2, "symbol id")?,
        },
        ["delete", "book", ..] => Command::DeleteBook {
            id: parse_number(&tokens, 2, "symbol id")?,
        },

        ["add", "market", ..] => {
            let side = parse_side(&tokens, 2)?;
            let id = parse_number(&tokens, 3, "order id")?;
            let symbol = parse_number(&tokens, 4, "symbol id")?;
            let quantity = parse_number(&tokens, 5, "quantity")?;
            let slippage = parse_number(&tokens, 6, "slippage")?;
            Command::AddOrder(Order::market(id, symbol, side, quantity).with_slippage(slippage))
        }
        ["add", "limit", ..] => {
            let side = parse_side(&tokens, 2)?;
            let id = parse_number(&tokens, 3, "order id")?;
            let symbol = parse_number(&tokens, 4, "symbol id")?;
            let price = parse_number(&tokens, 5, "price")?;
            let quantity = parse_number(&tokens, 6, "quantity")?;
            Command::AddOrder(Order::limit(id, symbol, side, price, quantity))
        }

        ["reduce", "order", ..] => Command::ReduceOrder {
            id: parse_number(&tokens, 2, "order id")?,
            quantity: parse_number(&tokens, 3, "quantity")?,
        },
        ["modify", "order", ..] => Command::ModifyOrder {
            id: parse_number(&tokens, 2, "order id")?,
            price: parse_number(&tokens, 3, "price")?,
            quantity: parse_number(&tokens, 4, "quantity")?,
        },
        ["replace", "order", ..] => Command::ReplaceOrder {
            id: parse_number(&tokens, 2, "order id")?,
            new_id: parse_number(&tokens, 3, "new order id")?,
            price: parse_number(&tokens, 4, "price")?,
            quantity: parse_number(&tokens, 5, "quantity")?,
        },
        ["delete", "order", ..] => Command::DeleteOrder {
            id: parse_number(&tokens, 2, "order id")?,
        },

        _ => return Err(ParseError::UnknownCommand),
    };

    Ok(Some(command))
}

fn apply(market: &mut MarketManager<ConsoleReporter>, command: Command) -> bool {
    let result = match command {
        Command::Help => {
            println!("{HELP}");
            Ok(())
        }
        Command::Exit => return false,
        Command::AddSymbol { id, name } => market.add_symbol(Symbol::new(id, &name)),
        Command::DeleteSymbol { id } => market.delete_symbol(id),
        Command::AddBook { id } => market.add_order_book(id),
        Command::DeleteBook { id } => market.delete_order_book(id),
        Command::AddOrder(order) => market.add_order(order),
        Command::ReduceOrder { id, quantity } => market.reduce_order(id, quantity),
        Command::ModifyOrder { id, price, quantity } => market.modify_order(id, price, quantity),
        Command::ReplaceOrder {
            id,
            new_id,
            price,
            quantity,
        } => market.replace_order(id, new_id, price, quantity),
        Command::DeleteOrder { id } => market.delete_order(id),
    };

    if let Err(kind) = result {
        println!("rejected: {kind}");
    }
    true
}

fn main() {
    tracing_subscriber::fmt::init();

    let mut market = MarketManager::with_handler(ConsoleReporter);
    market.enable_matching();

    println!("matchbook trading console (matching enabled, 'help' for commands)");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };

        match parse_command(&line) {
            Ok(Some(command)) => {
                if !apply(&mut market, command) {
                    break;
                }
            }
            Ok(None) => {}
            Err(error) => println!("parse error: {error}"),
        }
    }
}
