//! Raw market data: trade ticks and two-sided quote updates.

use rust_decimal::Decimal;

use crate::model::symbol::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TickKind {
    Trade,
    Bid,
    Ask,
    /// An unsided quote print: the producer observed a top-of-book price
    /// without attributing it to a specific side.
    Quote,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketTick {
    pub ts_ns: u64,
    pub symbol: Symbol,
    pub price: Decimal,
    pub qty: i64,
    pub kind: TickKind,
}

impl MarketTick {
    pub fn new(ts_ns: u64, symbol: Symbol, price: Decimal, qty: i64, kind: TickKind) -> Self {
        MarketTick {
            ts_ns,
            symbol,
            price,
            qty,
            kind,
        }
    }
}

/// A two-sided quote update. Either side may be absent (represented as
/// `None`) if the producer only observed a one-sided book change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub ts_ns: u64,
    pub symbol: Symbol,
    pub bid_px: Option<Decimal>,
    pub bid_sz: i64,
    pub ask_px: Option<Decimal>,
    pub ask_sz: i64,
}

impl Quote {
    pub fn new(
        ts_ns: u64,
        symbol: Symbol,
        bid_px: Option<Decimal>,
        bid_sz: i64,
        ask_px: Option<Decimal>,
        ask_sz: i64,
    ) -> Self {
        Quote {
            ts_ns,
            symbol,
            bid_px,
            bid_sz,
            ask_px,
            ask_sz,
        }
    }

    /// `true` if both sides are present and the book is not crossed.
    pub fn is_sane(&self) -> bool {
        match (self.bid_px, self.ask_px) {
            (Some(bid), Some(ask)) => bid <= ask,
            _ => true,
        }
    }

    pub fn mid(&self) -> Option<Decimal> {
        match (self.bid_px, self.ask_px) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn quote_mid_averages_both_sides() {
        let q = Quote::new(0, Symbol::new("SPY"), Some(dec!(99.50)), 1000, Some(dec!(100.50)), 1000);
        assert_eq!(q.mid(), Some(dec!(100.00)));
    }

    #[test]
    fn crossed_quote_is_not_sane() {
        let q = Quote::new(0, Symbol::new("SPY"), Some(dec!(101.0)), 100, Some(dec!(100.0)), 100);
        assert!(!q.is_sane());
    }

    #[test]
    fn one_sided_quote_is_sane() {
        let q = Quote::new(0, Symbol::new("SPY"), Some(dec!(100.0)), 100, None, 0);
        assert!(q.is_sane());
        assert_eq!(q.mid(), None);
    }
}
