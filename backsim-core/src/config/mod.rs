//! Configuration surface.
//!
//! Every struct here is a plain, `serde`-derived value type with a hand
//! rolled `validate()`. There is deliberately no TOML/env/CLI loader:
//! reading configuration from a file or the command line is out of scope —
//! a host application constructs these directly (or via `serde_json`) and
//! calls `validate()` once before handing them to the kernel.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BacktestError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub initial_cash: Decimal,
    pub checkpoint_interval: u64,
    pub enable_checkpointing: bool,
    pub checkpoint_path: Option<String>,
    pub enable_progress_reporting: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_cash: Decimal::from(100_000),
            checkpoint_interval: 10_000,
            enable_checkpointing: false,
            checkpoint_path: None,
            enable_progress_reporting: false,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.initial_cash < Decimal::ZERO {
            return Err(BacktestError::input("initial_cash must be non-negative"));
        }
        if self.checkpoint_interval == 0 {
            return Err(BacktestError::input("checkpoint_interval must be positive"));
        }
        if self.enable_checkpointing && self.checkpoint_path.is_none() {
            return Err(BacktestError::input(
                "checkpoint_path is required when enable_checkpointing is set",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    pub max_order_notional: Decimal,
    pub max_position_notional: Decimal,
    pub max_portfolio_delta: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            max_order_notional: Decimal::from(50_000),
            max_position_notional: Decimal::from(250_000),
            max_portfolio_delta: 10_000.0,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.max_order_notional <= Decimal::ZERO {
            return Err(BacktestError::input("max_order_notional must be positive"));
        }
        if self.max_position_notional <= Decimal::ZERO {
            return Err(BacktestError::input("max_position_notional must be positive"));
        }
        if self.max_portfolio_delta <= 0.0 {
            return Err(BacktestError::input("max_portfolio_delta must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveredCallConfig {
    pub min_delta: f64,
    pub max_delta: f64,
    pub target_days_to_expiry: u32,
    pub roll_at_dte: u32,
    pub roll_at_pnl_percent: f64,
    pub lot_size: i64,
    pub max_positions: usize,
    pub symbols: Vec<String>,
}

impl Default for CoveredCallConfig {
    fn default() -> Self {
        CoveredCallConfig {
            min_delta: 0.2,
            max_delta: 0.4,
            target_days_to_expiry: 30,
            roll_at_dte: 7,
            roll_at_pnl_percent: 80.0,
            lot_size: 100,
            max_positions: 10,
            symbols: vec![],
        }
    }
}

impl CoveredCallConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if !(0.0..=1.0).contains(&self.min_delta) || !(0.0..=1.0).contains(&self.max_delta) {
            return Err(BacktestError::input("min_delta and max_delta must be in [0, 1]"));
        }
        if self.min_delta >= self.max_delta {
            return Err(BacktestError::input("min_delta must be strictly less than max_delta"));
        }
        if self.target_days_to_expiry == 0 {
            return Err(BacktestError::input("target_days_to_expiry must be positive"));
        }
        if self.roll_at_dte == 0 || self.roll_at_dte >= self.target_days_to_expiry {
            return Err(BacktestError::input(
                "roll_at_dte must be positive and strictly less than target_days_to_expiry",
            ));
        }
        if !(0.0..=100.0).contains(&self.roll_at_pnl_percent) {
            return Err(BacktestError::input("roll_at_pnl_percent must be in [0, 100]"));
        }
        if self.lot_size <= 0 {
            return Err(BacktestError::input("lot_size must be positive"));
        }
        if self.max_positions == 0 {
            return Err(BacktestError::input("max_positions must be positive"));
        }
        if self.symbols.is_empty() {
            return Err(BacktestError::input("symbols must not be empty"));
        }
        Ok(())
    }
}
