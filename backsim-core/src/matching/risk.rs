//! Pre-trade risk predicate: notional, position, and delta caps. Shaped
//! after a validate-then-Allowed/Rejected(reason) pattern rather than a
//! boolean, so the kernel can hand the strategy a human-readable rejection.

use std::fmt;

use rust_decimal::Decimal;

use crate::config::RiskConfig;
use crate::model::order::{Order, Side};
use crate::portfolio::PortfolioState;

#[derive(Debug, Clone, PartialEq)]
pub enum RiskDecision {
    Allowed,
    Rejected(RiskRejection),
}

impl RiskDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RiskDecision::Allowed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RiskRejection {
    OrderNotionalExceeded { notional: Decimal, max: Decimal },
    PositionNotionalExceeded { projected_notional: Decimal, max: Decimal },
    PortfolioDeltaExceeded { projected_delta: f64, max: f64 },
}

impl fmt::Display for RiskRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskRejection::OrderNotionalExceeded { notional, max } => write!(
                f,
                "order notional {notional} exceeds max order notional {max}"
            ),
            RiskRejection::PositionNotionalExceeded { projected_notional, max } => write!(
                f,
                "projected position notional {projected_notional} exceeds max position notional {max}"
            ),
            RiskRejection::PortfolioDeltaExceeded { projected_delta, max } => write!(
                f,
                "projected portfolio delta {projected_delta} exceeds max portfolio delta {max}"
            ),
        }
    }
}

pub struct RiskValidator<'a> {
    config: &'a RiskConfig,
}

impl<'a> RiskValidator<'a> {
    pub fn new(config: &'a RiskConfig) -> Self {
        RiskValidator { config }
    }

    /// Evaluate `order` against `portfolio` at `reference_px` (used for
    /// market orders, which carry no limit price of their own).
    pub fn validate(&self, order: &Order, portfolio: &PortfolioState, reference_px: Decimal) -> RiskDecision {
        let notional = order.notional(reference_px);
        if notional > self.config.max_order_notional {
            return RiskDecision::Rejected(RiskRejection::OrderNotionalExceeded {
                notional,
                max: self.config.max_order_notional,
            });
        }

        let current_qty = portfolio
            .position_for(&order.symbol)
            .map(|p| p.qty)
            .unwrap_or(0);
        let projected_qty = current_qty + order.qty * order.side.sign();
        let projected_notional = Decimal::from(projected_qty.abs()) * reference_px;
        if projected_notional > self.config.max_position_notional {
            return RiskDecision::Rejected(RiskRejection::PositionNotionalExceeded {
                projected_notional,
                max: self.config.max_position_notional,
            });
        }

        let order_delta_estimate = match order.side {
            Side::Buy => order.qty as f64,
            Side::Sell => -(order.qty as f64),
        };
        let projected_delta = portfolio.net_greeks.delta + order_delta_estimate;
        if projected_delta.abs() > self.config.max_portfolio_delta {
            return RiskDecision::Rejected(RiskRejection::PortfolioDeltaExceeded {
                projected_delta,
                max: self.config.max_portfolio_delta,
            });
        }

        RiskDecision::Allowed
    }
}
