//! Order book levels and the per-symbol top-of-book state the matching
//! layer reads from.

use rust_decimal::Decimal;

use crate::model::symbol::Symbol;
use crate::model::tick::TickKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: i64,
}

impl BookLevel {
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBookSnapshot {
    pub symbol: Symbol,
    pub ts_ns: u64,
    /// Sorted descending by price.
    pub bids: Vec<BookLevel>,
    /// Sorted ascending by price.
    pub asks: Vec<BookLevel>,
}

impl OrderBookSnapshot {
    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.first().filter(|l| !l.is_empty())
    }

    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first().filter(|l| !l.is_empty())
    }
}

/// The minimal top-of-book state the fill model needs: best bid/ask price
/// and size, kept current by the kernel as market data and quotes arrive.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BookState {
    pub best_bid_px: Option<Decimal>,
    pub best_bid_sz: i64,
    pub best_ask_px: Option<Decimal>,
    pub best_ask_sz: i64,
    pub last_update_ns: u64,
}

impl BookState {
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid_px, self.best_ask_px) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    pub fn mid(&self) -> Option<Decimal> {
        match (self.best_bid_px, self.best_ask_px) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            (Some(bid), None) => Some(bid),
            (None, Some(ask)) => Some(ask),
            (None, None) => None,
        }
    }

    /// Applies a single-sided market tick, storing it as a synthetic
    /// single-level book on the side the tick's `kind` indicates. A `Bid`
    /// tick replaces the bid level only; an `Ask` tick replaces the ask
    /// level only. `Trade` and unsided `Quote` ticks don't tell us which
    /// side of the book moved, so they just seed whichever side(s) are
    /// still empty, leaving an already-known side untouched.
    pub fn apply_tick(&mut self, kind: TickKind, price: Decimal, qty: i64, ts_ns: u64) {
        match kind {
            TickKind::Bid => {
                self.best_bid_px = Some(price);
                self.best_bid_sz = qty;
            }
            TickKind::Ask => {
                self.best_ask_px = Some(price);
                self.best_ask_sz = qty;
            }
            TickKind::Trade | TickKind::Quote => {
                if self.best_bid_px.is_none() {
                    self.best_bid_px = Some(price);
                    self.best_bid_sz = qty;
                }
                if self.best_ask_px.is_none() {
                    self.best_ask_px = Some(price);
                    self.best_ask_sz = qty;
                }
            }
        }
        self.last_update_ns = ts_ns;
    }

    pub fn apply_quote(
        &mut self,
        bid_px: Option<Decimal>,
        bid_sz: i64,
        ask_px: Option<Decimal>,
        ask_sz: i64,
        ts_ns: u64,
    ) {
        if let Some(bid) = bid_px {
            self.best_bid_px = Some(bid);
            self.best_bid_sz = bid_sz;
        }
        if let Some(ask) = ask_px {
            self.best_ask_px = Some(ask);
            self.best_ask_sz = ask_sz;
        }
        self.last_update_ns = ts_ns;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn quote_sets_both_sides_independently() {
        let mut book = BookState::default();
        book.apply_quote(Some(dec!(99.5)), 1000, Some(dec!(100.5)), 1000, 1);
        assert_eq!(book.best_bid_px, Some(dec!(99.5)));
        assert_eq!(book.best_ask_px, Some(dec!(100.5)));
        assert_eq!(book.spread(), Some(dec!(1.0)));
        assert_eq!(book.mid(), Some(dec!(100.0)));
    }

    #[test]
    fn trade_seeds_empty_book_on_both_sides() {
        let mut book = BookState::default();
        book.apply_tick(TickKind::Trade, dec!(50.0), 10, 1);
        assert_eq!(book.best_bid_px, Some(dec!(50.0)));
        assert_eq!(book.best_ask_px, Some(dec!(50.0)));
    }

    #[test]
    fn trade_does_not_override_existing_quote() {
        let mut book = BookState::default();
        book.apply_quote(Some(dec!(99.5)), 1000, Some(dec!(100.5)), 1000, 1);
        book.apply_tick(TickKind::Trade, dec!(50.0), 10, 2);
        assert_eq!(book.best_bid_px, Some(dec!(99.5)));
        assert_eq!(book.best_ask_px, Some(dec!(100.5)));
    }

    #[test]
    fn bid_tick_updates_bid_side_only() {
        let mut book = BookState::default();
        book.apply_tick(TickKind::Bid, dec!(99.0), 200, 1);
        assert_eq!(book.best_bid_px, Some(dec!(99.0)));
        assert_eq!(book.best_ask_px, None);
    }

    #[test]
    fn ask_tick_updates_ask_side_only() {
        let mut book = BookState::default();
        book.apply_tick(TickKind::Ask, dec!(101.0), 150, 1);
        assert_eq!(book.best_ask_px, Some(dec!(101.0)));
        assert_eq!(book.best_bid_px, None);
    }

    #[test]
    fn bid_tick_does_not_disturb_an_existing_ask() {
        let mut book = BookState::default();
        book.apply_tick(TickKind::Ask, dec!(101.0), 150, 1);
        book.apply_tick(TickKind::Bid, dec!(99.0), 200, 2);
        assert_eq!(book.best_bid_px, Some(dec!(99.0)));
        assert_eq!(book.best_ask_px, Some(dec!(101.0)));
    }

    #[test]
    fn quote_kind_tick_seeds_empty_book_on_both_sides() {
        let mut book = BookState::default();
        book.apply_tick(TickKind::Quote, dec!(75.0), 5, 1);
        assert_eq!(book.best_bid_px, Some(dec!(75.0)));
        assert_eq!(book.best_ask_px, Some(dec!(75.0)));
    }
}
