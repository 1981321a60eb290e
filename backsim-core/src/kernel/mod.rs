//! The simulation kernel: event queue, order registry, latency instrumentation,
//! the strategy contract, and the `Kernel` loop that ties them together.

pub mod engine;
pub mod event_queue;
pub mod histogram;
pub mod order_registry;
pub mod result;
pub mod strategy;

pub use engine::Kernel;
pub use event_queue::EventQueue;
pub use histogram::LatencyHistogram;
pub use order_registry::OrderRegistry;
pub use result::{BacktestResult, LatencyStats, PerformanceSnapshot, RunStatus};
pub use strategy::Strategy;
