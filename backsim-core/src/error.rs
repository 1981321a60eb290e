//! Error taxonomy for the backtesting engine.
//!
//! Five closed categories, one per failure domain named in the design
//! document: bad input, numerical non-convergence, a misbehaving strategy,
//! an accounting invariant violation, or I/O. Numerical failures are
//! generally surfaced as `f64::NAN` rather than this type (callers check
//! `is_nan()`); `BacktestError::Numerical` exists for the few call sites
//! that need to report *why* a computation gave up.

use thiserror::Error;

/// Top-level error type returned by fallible `backsim-core` operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BacktestError {
    #[error("invalid input: {reason}")]
    Input { reason: String },

    #[error("numerical failure computing {what}: {reason}")]
    Numerical { what: String, reason: String },

    #[error("strategy fault on order {order_id}: {reason}")]
    StrategyFault { order_id: String, reason: String },

    #[error("bookkeeping violation on order {order_id}: {reason}")]
    Bookkeeping { order_id: String, reason: String },

    #[error("I/O error: {reason}")]
    Io { reason: String },
}

impl BacktestError {
    pub fn input(reason: impl Into<String>) -> Self {
        BacktestError::Input {
            reason: reason.into(),
        }
    }

    pub fn numerical(what: impl Into<String>, reason: impl Into<String>) -> Self {
        BacktestError::Numerical {
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub fn strategy_fault(order_id: impl Into<String>, reason: impl Into<String>) -> Self {
        BacktestError::StrategyFault {
            order_id: order_id.into(),
            reason: reason.into(),
        }
    }

    pub fn bookkeeping(order_id: impl Into<String>, reason: impl Into<String>) -> Self {
        BacktestError::Bookkeeping {
            order_id: order_id.into(),
            reason: reason.into(),
        }
    }

    pub fn io(reason: impl Into<String>) -> Self {
        BacktestError::Io {
            reason: reason.into(),
        }
    }

    /// Whether this category is fatal to the whole run by default (used by
    /// the kernel's strict-mode gate). Strategy faults are local-to-the-order
    /// and never fatal; everything else defaults to fatal unless the caller
    /// opts into lenient bookkeeping handling.
    pub fn is_run_fatal(&self) -> bool {
        !matches!(self, BacktestError::StrategyFault { .. })
    }
}

pub type Result<T> = std::result::Result<T, BacktestError>;
