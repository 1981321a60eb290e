//! Shared fixtures for unit and integration tests: book builders and
//! synthetic event sequences, kept out of `#[cfg(test)]` so both this crate
//! and downstream crates (`backsim-strategies`, `backsim-bins`) can build
//! scenarios against them.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::model::book::BookState;
use crate::model::event::Event;
use crate::model::symbol::Symbol;
use crate::model::tick::{MarketTick, Quote, TickKind};

/// Builds a `BookState` with a symmetric spread around `mid`.
pub fn book_around(mid: Decimal, half_spread: Decimal, size: i64) -> BookState {
    BookState {
        best_bid_px: Some(mid - half_spread),
        best_bid_sz: size,
        best_ask_px: Some(mid + half_spread),
        best_ask_sz: size,
        last_update_ns: 0,
    }
}

/// A flat random-walk-free quote stream: `count` quotes spaced `step_ns`
/// apart, alternating the mid price by `+/- jitter` around `start_mid`.
pub fn synthetic_quote_stream(symbol: &str, start_mid: Decimal, jitter: Decimal, step_ns: u64, count: u64) -> Vec<Event> {
    let symbol = Symbol::new(symbol);
    let mut events = Vec::with_capacity(count as usize);
    for i in 0..count {
        let drift = if i % 2 == 0 { jitter } else { -jitter };
        let mid = start_mid + drift;
        let half_spread = dec!(0.05);
        events.push(Event::Quote(Quote {
            ts_ns: i * step_ns,
            symbol,
            bid_px: Some(mid - half_spread),
            bid_sz: 1_000,
            ask_px: Some(mid + half_spread),
            ask_sz: 1_000,
        }));
    }
    events
}

/// A flat trade stream at a fixed price, useful for portfolio mark-to-market
/// tests that don't care about book microstructure.
pub fn synthetic_trade_stream(symbol: &str, price: Decimal, qty: i64, step_ns: u64, count: u64) -> Vec<Event> {
    let symbol = Symbol::new(symbol);
    (0..count)
        .map(|i| Event::MarketData(MarketTick::new(i * step_ns, symbol, price, qty, TickKind::Trade)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_around_is_symmetric() {
        let book = book_around(dec!(100.0), dec!(0.5), 1_000);
        assert_eq!(book.best_bid_px, Some(dec!(99.5)));
        assert_eq!(book.best_ask_px, Some(dec!(100.5)));
        assert_eq!(book.mid(), Some(dec!(100.0)));
    }

    #[test]
    fn synthetic_quote_stream_has_requested_length_and_spacing() {
        let events = synthetic_quote_stream("SPY", dec!(450.0), dec!(0.1), 1_000_000, 10);
        assert_eq!(events.len(), 10);
        assert_eq!(events[1].ts_ns() - events[0].ts_ns(), 1_000_000);
    }
}
