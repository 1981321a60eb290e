//! Runs the reference covered-call strategy against a synthetic underlying
//! tape and prints the resulting `BacktestResult` as JSON.
//!
//! There is deliberately no argument parsing here: wiring a real data feed
//! and a CLI is a host-application concern, out of scope for this crate.

use anyhow::Result;
use rust_decimal_macros::dec;

use backsim_core::config::{BacktestConfig, CoveredCallConfig, RiskConfig};
use backsim_core::kernel::Kernel;
use backsim_core::options::surface::VolSurfaceBuilder;
use backsim_core::testing::synthetic_quote_stream;
use backsim_strategies::CoveredCall;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!("=== backsim: covered-call demo ===");

    let covered_call_config = CoveredCallConfig {
        symbols: vec!["SPY".to_string()],
        ..CoveredCallConfig::default()
    };
    covered_call_config.validate()?;

    let mut surface_builder = VolSurfaceBuilder::new();
    for days in [7.0, 14.0, 30.0, 60.0, 90.0] {
        for strike in [400.0, 420.0, 440.0, 450.0, 460.0, 480.0, 500.0] {
            surface_builder.add_point(days / 365.25, strike, 0.18);
        }
    }
    let surface = surface_builder.build();

    let strategy = CoveredCall::new(covered_call_config, surface);

    let backtest_config = BacktestConfig {
        initial_cash: dec!(1_000_000),
        ..BacktestConfig::default()
    };
    let risk_config = RiskConfig::default();

    let mut kernel = Kernel::new(strategy, backtest_config, risk_config, false)?;

    // One quote every simulated hour for 90 trading days, drifting SPY
    // gently upward so the reference strategy's roll logic gets exercised.
    const STEP_NS: u64 = 3_600_000_000_000;
    const TICKS: u64 = 24 * 90;
    let events = synthetic_quote_stream("SPY", dec!(450.00), dec!(0.25), STEP_NS, TICKS);
    for event in events {
        kernel.enqueue(event);
    }

    tracing::info!(ticks = TICKS, "running backtest");
    let result = kernel.run();

    tracing::info!(
        status = ?result.status,
        events_processed = result.events_processed,
        events_per_second = result.performance.events_per_second,
        "backtest finished"
    );

    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
        "start_ts": result.start_ts,
        "end_ts": result.end_ts,
        "events_processed": result.events_processed,
        "status": format!("{:?}", result.status),
        "final_cash": result.final_portfolio.cash,
        "realised_pnl": result.final_portfolio.realised_pnl,
        "unrealised_pnl": result.final_portfolio.unrealised_pnl,
        "strategy_state": result.strategy_state,
        "errors": result.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
    }))?);

    Ok(())
}
