//! The shape of a finished (or cancelled) backtest run.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BacktestError;
use crate::kernel::histogram::LatencyHistogram;
use crate::model::event::EventKind;
use crate::model::order::OrderStatus;
use crate::portfolio::PortfolioState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Ok,
    Cancelled,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: f64,
    pub min_us: u64,
    pub max_us: u64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
}

impl From<&LatencyHistogram> for LatencyStats {
    fn from(h: &LatencyHistogram) -> Self {
        LatencyStats {
            count: h.count(),
            mean_us: h.mean_us(),
            min_us: h.min_us(),
            max_us: h.max_us(),
            p50: h.percentile(0.50),
            p90: h.percentile(0.90),
            p99: h.percentile(0.99),
            p999: h.percentile(0.999),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub backtest_duration: Duration,
    pub events_per_second: f64,
    pub per_kind_latency: HashMap<String, LatencyStats>,
    pub order_latency: LatencyStats,
    pub fill_counts: HashMap<String, u64>,
    pub ack_counts: HashMap<String, u64>,
}

impl PerformanceSnapshot {
    pub fn per_kind(&self, kind: EventKind) -> Option<&LatencyStats> {
        self.per_kind_latency.get(&format!("{kind:?}"))
    }

    pub fn acks_for(&self, status: OrderStatus) -> u64 {
        self.ack_counts.get(&format!("{status:?}")).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub start_ts: u64,
    pub end_ts: u64,
    pub events_processed: u64,
    pub final_portfolio: PortfolioState,
    pub performance: PerformanceSnapshot,
    pub strategy_state: serde_json::Value,
    pub duration: Duration,
    pub status: RunStatus,
    pub errors: Vec<BacktestError>,
}
