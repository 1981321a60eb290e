//! A point-in-time, immutable copy of the portfolio, handed to strategies
//! and included in the backtest result.

use rust_decimal::Decimal;

use crate::options::Greeks;
use crate::portfolio::position::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub ts_ns: u64,
    pub cash: Decimal,
    pub positions: Vec<Position>,
    pub unrealised_pnl: Decimal,
    pub realised_pnl: Decimal,
    pub net_greeks: Greeks,
}

impl PortfolioState {
    pub fn total_equity(&self) -> Decimal {
        self.cash + self.unrealised_pnl
    }

    pub fn position_for(&self, symbol: &crate::model::symbol::Symbol) -> Option<&Position> {
        self.positions.iter().find(|p| &p.symbol == symbol)
    }
}
