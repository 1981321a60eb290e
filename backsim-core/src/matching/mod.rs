//! Order matching (fill simulation) and pre-trade risk.

pub mod fill_model;
pub mod risk;

pub use fill_model::{simulate_fill, SimulatedFill, DEFAULT_COMMISSION};
pub use risk::{RiskDecision, RiskRejection, RiskValidator};
