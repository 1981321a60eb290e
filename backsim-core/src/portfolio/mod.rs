//! Portfolio accounting: positions, cash, realised/unrealised P&L, and net
//! Greeks, kept current as fills and market data arrive.

pub mod position;
pub mod state;

pub use position::Position;
pub use state::PortfolioState;

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::model::fill::Fill;
use crate::model::symbol::Symbol;
use crate::model::tick::{MarketTick, Quote};
use crate::options::Greeks;

/// The live, mutable portfolio the kernel owns for the duration of a run.
#[derive(Debug, Clone)]
pub struct Portfolio {
    cash: Decimal,
    positions: HashMap<Symbol, Position>,
    realised_pnl: Decimal,
    last_ts_ns: u64,
}

impl Portfolio {
    pub fn new(initial_cash: Decimal) -> Self {
        Portfolio {
            cash: initial_cash,
            positions: HashMap::new(),
            realised_pnl: Decimal::ZERO,
            last_ts_ns: 0,
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn realised_pnl(&self) -> Decimal {
        self.realised_pnl
    }

    pub fn position(&self, symbol: &Symbol) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Apply a fill against the position inferred from `symbol` (see
    /// [`crate::model::order::OrderId::symbol_hint`] for how callers
    /// typically obtain it). Handles opening, adding-to, reducing, closing,
    /// and flip-through-zero in one pass per §4.2.
    pub fn apply_fill(&mut self, symbol: Symbol, fill: &Fill) {
        self.cash -= Decimal::from(fill.filled_qty) * fill.fill_px + fill.commission;

        let entry = self.positions.get(&symbol).copied();
        match entry {
            None => {
                self.positions.insert(
                    symbol,
                    Position {
                        symbol,
                        qty: fill.filled_qty,
                        avg_px: fill.fill_px,
                        mark_px: fill.fill_px,
                        greeks: Greeks::ZERO,
                    },
                );
            }
            Some(mut pos) => {
                let q0 = pos.qty;
                let a0 = pos.avg_px;
                let dq = fill.filled_qty;
                let p = fill.fill_px;
                let q1 = q0 + dq;

                if q0 == 0 || same_sign(q0, dq) {
                    // Opening or adding to the existing side.
                    pos.avg_px = if q1 != 0 {
                        (Decimal::from(q0) * a0 + Decimal::from(dq) * p) / Decimal::from(q1)
                    } else {
                        a0
                    };
                    pos.qty = q1;
                } else if dq.abs() <= q0.abs() {
                    // Reducing or exactly closing.
                    let closed = dq.abs();
                    self.realised_pnl += Decimal::from(closed) * (p - a0) * Decimal::from(q0.signum());
                    pos.qty = q1;
                    // avg_px unchanged on a partial close.
                } else {
                    // Flip through zero: close the old lot, open the new one.
                    let closed = q0.abs();
                    self.realised_pnl += Decimal::from(closed) * (p - a0) * Decimal::from(q0.signum());
                    pos.qty = q1;
                    pos.avg_px = p;
                }

                if pos.qty == 0 {
                    self.positions.remove(&symbol);
                } else {
                    pos.mark_px = p;
                    self.positions.insert(symbol, pos);
                }
            }
        }
        self.last_ts_ns = fill.ts_ns;
    }

    pub fn update_market_data(&mut self, tick: &MarketTick) {
        if let Some(pos) = self.positions.get_mut(&tick.symbol) {
            pos.mark_px = tick.price;
        }
        self.last_ts_ns = tick.ts_ns;
    }

    pub fn update_quote(&mut self, quote: &Quote) {
        if let Some(mid) = quote.mid() {
            if let Some(pos) = self.positions.get_mut(&quote.symbol) {
                pos.mark_px = mid;
            }
        }
        self.last_ts_ns = quote.ts_ns;
    }

    /// Update the cached Greeks for a position (typically computed by the
    /// caller from an options-quote/vol-surface lookup; the portfolio does
    /// not compute Greeks itself).
    pub fn set_position_greeks(&mut self, symbol: &Symbol, greeks: Greeks) {
        if let Some(pos) = self.positions.get_mut(symbol) {
            pos.greeks = greeks;
        }
    }

    pub fn snapshot(&self, ts_ns: u64) -> PortfolioState {
        let mut unrealised = Decimal::ZERO;
        let mut net_greeks = Greeks::ZERO;
        let mut positions = Vec::with_capacity(self.positions.len());
        for pos in self.positions.values() {
            unrealised += Decimal::from(pos.qty) * (pos.mark_px - pos.avg_px);
            net_greeks = net_greeks + pos.greeks * (pos.qty as f64);
            positions.push(*pos);
        }
        PortfolioState {
            ts_ns,
            cash: self.cash,
            positions,
            unrealised_pnl: unrealised,
            realised_pnl: self.realised_pnl,
            net_greeks,
        }
    }
}

fn same_sign(a: i64, b: i64) -> bool {
    (a >= 0) == (b >= 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::order::OrderId;
    use rust_decimal_macros::dec;

    fn fill(qty: i64, px: rust_decimal::Decimal, ts: u64) -> Fill {
        Fill::new(OrderId::new("ord_SPY_1"), 1, qty, px, 0, ts, dec!(0.65))
    }

    #[test]
    fn opening_a_position_sets_avg_px_to_fill_px() {
        let mut p = Portfolio::new(dec!(100_000));
        p.apply_fill(Symbol::new("SPY"), &fill(100, dec!(100.0), 1));
        let pos = p.position(&Symbol::new("SPY")).unwrap();
        assert_eq!(pos.qty, 100);
        assert_eq!(pos.avg_px, dec!(100.0));
        assert_eq!(p.cash(), dec!(100_000) - dec!(100.0) * dec!(100) - dec!(0.65));
    }

    #[test]
    fn adding_to_position_updates_weighted_average() {
        let mut p = Portfolio::new(dec!(100_000));
        p.apply_fill(Symbol::new("SPY"), &fill(100, dec!(100.0), 1));
        p.apply_fill(Symbol::new("SPY"), &fill(100, dec!(110.0), 2));
        let pos = p.position(&Symbol::new("SPY")).unwrap();
        assert_eq!(pos.qty, 200);
        assert_eq!(pos.avg_px, dec!(105.0));
    }

    #[test]
    fn closing_fully_realises_pnl_and_drops_position() {
        let mut p = Portfolio::new(dec!(100_000));
        p.apply_fill(Symbol::new("SPY"), &fill(100, dec!(100.0), 1));
        p.apply_fill(Symbol::new("SPY"), &fill(-100, dec!(110.0), 2));
        assert!(p.position(&Symbol::new("SPY")).is_none());
        assert_eq!(p.realised_pnl(), dec!(1000.0));
    }

    #[test]
    fn partial_close_realises_proportional_pnl() {
        let mut p = Portfolio::new(dec!(100_000));
        p.apply_fill(Symbol::new("SPY"), &fill(100, dec!(100.0), 1));
        p.apply_fill(Symbol::new("SPY"), &fill(-40, dec!(110.0), 2));
        let pos = p.position(&Symbol::new("SPY")).unwrap();
        assert_eq!(pos.qty, 60);
        assert_eq!(pos.avg_px, dec!(100.0));
        assert_eq!(p.realised_pnl(), dec!(400.0));
    }

    #[test]
    fn flip_through_zero_realises_old_lot_and_opens_new() {
        let mut p = Portfolio::new(dec!(100_000));
        p.apply_fill(Symbol::new("SPY"), &fill(100, dec!(100.0), 1));
        p.apply_fill(Symbol::new("SPY"), &fill(-150, dec!(110.0), 2));
        let pos = p.position(&Symbol::new("SPY")).unwrap();
        assert_eq!(pos.qty, -50);
        assert_eq!(pos.avg_px, dec!(110.0));
        assert_eq!(p.realised_pnl(), dec!(1000.0));
    }

    #[test]
    fn snapshot_computes_unrealised_and_net_greeks() {
        let mut p = Portfolio::new(dec!(100_000));
        p.apply_fill(Symbol::new("SPY"), &fill(100, dec!(100.0), 1));
        p.update_market_data(&MarketTick::new(2, Symbol::new("SPY"), dec!(105.0), 1, crate::model::tick::TickKind::Trade));
        p.set_position_greeks(&Symbol::new("SPY"), Greeks::new(0.5, 0.01, -0.02, 0.1, 0.05));
        let snap = p.snapshot(2);
        assert_eq!(snap.unrealised_pnl, dec!(500.0));
        assert_eq!(snap.net_greeks.delta, 50.0);
    }

    #[test]
    fn no_zero_qty_position_persists() {
        let mut p = Portfolio::new(dec!(100_000));
        p.apply_fill(Symbol::new("SPY"), &fill(100, dec!(100.0), 1));
        p.apply_fill(Symbol::new("SPY"), &fill(-100, dec!(100.0), 2));
        assert!(p.position(&Symbol::new("SPY")).is_none());
    }
}
