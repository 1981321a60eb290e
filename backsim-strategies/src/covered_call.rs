//! A reference covered-call strategy: buy the underlying in round lots, sell
//! a delta-targeted call against the position, and roll it forward as
//! expiry or profit targets are reached.
//!
//! Roll behaviour (unspecified by the upstream protocol description, see
//! crate-level design notes): the strategy buys back the existing short
//! call and sells a new one at a further-dated expiry in the same event
//! batch, so the kernel processes the closing fill before the new leg is
//! priced off the updated position.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info};

use backsim_core::config::CoveredCallConfig;
use backsim_core::model::event::{Event, OrderAck};
use backsim_core::model::fill::Fill;
use backsim_core::model::order::{Order, OrderId, Side};
use backsim_core::model::symbol::Symbol;
use backsim_core::options::black_scholes::{bs_greeks, bs_price};
use backsim_core::options::contract::{next_expiry_at_least, OptionContract, OptionType};
use backsim_core::options::surface::VolSurface;
use backsim_core::portfolio::PortfolioState;

const RISK_FREE_RATE: f64 = 0.04;
const DIVIDEND_YIELD: f64 = 0.0;

/// The strategy's bookkeeping for a single underlying's covered-call
/// position: the short call currently outstanding (if any) and the
/// per-share premium it was opened at.
#[derive(Debug, Clone, Default)]
struct LegState {
    contract: Option<OptionContract>,
    short_qty: i64,
    credit_received: f64,
}

pub struct CoveredCall {
    config: CoveredCallConfig,
    vol_surface: VolSurface,
    legs: HashMap<Symbol, LegState>,
}

impl CoveredCall {
    pub fn new(config: CoveredCallConfig, vol_surface: VolSurface) -> Self {
        CoveredCall {
            config,
            vol_surface,
            legs: HashMap::new(),
        }
    }

    fn configured_symbols(&self) -> impl Iterator<Item = &str> {
        self.config.symbols.iter().map(|s| s.as_str())
    }

    fn tick_date_and_price(&self, event: &Event) -> Option<(Symbol, NaiveDate, u64, Decimal)> {
        let (symbol, ts_ns, price) = match event {
            Event::MarketData(tick) => (tick.symbol, tick.ts_ns, tick.price),
            Event::Quote(quote) => (quote.symbol, quote.ts_ns, quote.mid()?),
            _ => return None,
        };
        if !self.configured_symbols().any(|s| s == symbol.as_str()) {
            return None;
        }
        let date = ns_to_date(ts_ns)?;
        Some((symbol, date, ts_ns, price))
    }

    fn select_call_contract(&self, underlying: &str, spot: f64, as_of: NaiveDate) -> OptionContract {
        let expiry = next_expiry_at_least(as_of, self.config.target_days_to_expiry as i64);
        let t = ((expiry - as_of).num_days().max(1) as f64) / 365.25;
        let strike = self.select_strike(spot, t);
        OptionContract::new(underlying, strike, expiry, OptionType::Call)
    }

    fn select_strike(&self, spot: f64, t: f64) -> f64 {
        let step = strike_step(spot);
        let target_mid = (self.config.min_delta + self.config.max_delta) / 2.0;

        let mut best_strike = round_to_step(spot, step);
        let mut best_diff = f64::MAX;
        let mut k = best_strike;

        for _ in 0..200 {
            let sigma = self.vol_surface.get_volatility(t, k);
            let delta = bs_greeks(spot, k, t, sigma, RISK_FREE_RATE, DIVIDEND_YIELD, OptionType::Call).delta;

            if delta <= self.config.max_delta && delta >= self.config.min_delta {
                return k;
            }
            let diff = (delta - target_mid).abs();
            if diff < best_diff {
                best_diff = diff;
                best_strike = k;
            }
            if delta < self.config.min_delta {
                break;
            }
            k += step;
        }
        best_strike
    }

    fn should_roll(&self, leg: &LegState, spot: f64, as_of: NaiveDate) -> bool {
        let Some(contract) = &leg.contract else {
            return false;
        };
        let dte = (contract.expiry - as_of).num_days();
        if dte <= self.config.roll_at_dte as i64 {
            return true;
        }
        if leg.credit_received <= 0.0 {
            return false;
        }
        let t = contract.time_to_expiry_years(as_of);
        let sigma = self.vol_surface.get_volatility(t, contract.strike);
        let current_price = bs_price(spot, contract.strike, t, sigma, RISK_FREE_RATE, DIVIDEND_YIELD, OptionType::Call);
        let pnl_percent = (leg.credit_received - current_price) / leg.credit_received * 100.0;
        pnl_percent >= self.config.roll_at_pnl_percent
    }

    fn contracts_per_lot(&self) -> i64 {
        (self.config.lot_size / 100).max(1)
    }
}

impl backsim_core::kernel::Strategy for CoveredCall {
    fn name(&self) -> &str {
        "covered_call"
    }

    fn on_event(&mut self, event: &Event, portfolio: &PortfolioState) -> Vec<Order> {
        let Some((symbol, as_of, ts_ns, price)) = self.tick_date_and_price(event) else {
            return Vec::new();
        };
        let spot = price.to_f64().unwrap_or(0.0);
        if spot <= 0.0 {
            return Vec::new();
        }

        let stock_qty = portfolio.position_for(&symbol).map(|p| p.qty).unwrap_or(0);
        if stock_qty < self.config.lot_size {
            debug!(%symbol, "entering covered-call underlying position");
            return vec![Order::market(
                OrderId::tagged("CCBUY", &symbol),
                symbol,
                Side::Buy,
                self.config.lot_size - stock_qty,
            )];
        }

        if portfolio.positions.len() >= self.config.max_positions && !self.legs.contains_key(&symbol) {
            return Vec::new();
        }

        // Snapshot the leg before calling back into `self` for strike/roll
        // decisions, so we never hold a `&mut` into `self.legs` across a
        // borrow of `self.config`/`self.vol_surface`.
        let leg_snapshot = self.legs.get(&symbol).cloned().unwrap_or_default();

        let (orders, new_leg) = match &leg_snapshot.contract {
            None => {
                let contract = self.select_call_contract(symbol.as_str(), spot, as_of);
                let qty = self.contracts_per_lot();
                let option_symbol = Symbol::new(&contract.ticker);
                info!(%symbol, strike = contract.strike, expiry = %contract.expiry, "opening covered call");
                let orders = vec![Order::market(OrderId::tagged("CCOPEN", &option_symbol), option_symbol, Side::Sell, qty)];
                let new_leg = LegState {
                    contract: Some(contract),
                    short_qty: qty,
                    credit_received: 0.0,
                };
                (orders, new_leg)
            }
            Some(contract) if self.should_roll(&leg_snapshot, spot, as_of) => {
                let old_symbol = Symbol::new(&contract.ticker);
                let close_qty = leg_snapshot.short_qty;
                let new_contract = self.select_call_contract(symbol.as_str(), spot, as_of);
                let new_symbol = Symbol::new(&new_contract.ticker);
                let new_qty = self.contracts_per_lot();

                info!(%symbol, old = %contract.ticker, new = %new_contract.ticker, "rolling covered call");
                let orders = vec![
                    Order::market(OrderId::tagged("CCCLOSE", &old_symbol), old_symbol, Side::Buy, close_qty),
                    Order::market(OrderId::tagged("CCOPEN", &new_symbol), new_symbol, Side::Sell, new_qty),
                ];
                let new_leg = LegState {
                    contract: Some(new_contract),
                    short_qty: new_qty,
                    credit_received: 0.0,
                };
                (orders, new_leg)
            }
            Some(_) => return Vec::new(),
        };

        self.legs.insert(symbol, new_leg);
        orders
    }

    fn on_fill(&mut self, fill: &Fill, _portfolio: &PortfolioState) {
        let Some(symbol) = fill.order_id.symbol_hint() else {
            return;
        };
        let id_str = fill.order_id.as_str();
        if id_str.starts_with("CCOPEN") {
            // The option symbol is the ticker; find the underlying leg that
            // references it as the currently open contract.
            for leg in self.legs.values_mut() {
                if leg.contract.as_ref().map(|c| c.ticker.as_str()) == Some(symbol.as_str()) {
                    leg.credit_received = fill.fill_px.to_f64().unwrap_or(0.0);
                }
            }
        }
    }

    fn on_order_ack(&mut self, _ack: &OrderAck) {}

    fn get_state(&self) -> serde_json::Value {
        let legs: HashMap<String, serde_json::Value> = self
            .legs
            .iter()
            .map(|(symbol, leg)| {
                (
                    symbol.to_string(),
                    serde_json::json!({
                        "contract": leg.contract.as_ref().map(|c| c.ticker.clone()),
                        "short_qty": leg.short_qty,
                        "credit_received": leg.credit_received,
                    }),
                )
            })
            .collect();
        serde_json::json!({ "legs": legs })
    }

    fn reset(&mut self) {
        self.legs.clear();
    }
}

fn ns_to_date(ts_ns: u64) -> Option<NaiveDate> {
    let secs = (ts_ns / 1_000_000_000) as i64;
    let nanos = (ts_ns % 1_000_000_000) as u32;
    chrono::DateTime::from_timestamp(secs, nanos).map(|dt| dt.date_naive())
}

fn strike_step(spot: f64) -> f64 {
    if spot < 50.0 {
        0.5
    } else if spot < 200.0 {
        1.0
    } else {
        5.0
    }
}

fn round_to_step(x: f64, step: f64) -> f64 {
    (x / step).round() * step
}

#[cfg(test)]
mod tests {
    use super::*;
    use backsim_core::kernel::Strategy;
    use backsim_core::model::tick::{MarketTick, TickKind};
    use backsim_core::options::surface::VolSurfaceBuilder;
    use rust_decimal_macros::dec;

    fn flat_surface() -> VolSurface {
        let mut builder = VolSurfaceBuilder::new();
        builder.add_point(30.0 / 365.25, 100.0, 0.22);
        builder.build()
    }

    fn config() -> CoveredCallConfig {
        CoveredCallConfig {
            symbols: vec!["SPY".to_string()],
            ..CoveredCallConfig::default()
        }
    }

    fn empty_portfolio(ts_ns: u64) -> PortfolioState {
        PortfolioState {
            ts_ns,
            cash: dec!(100_000),
            positions: vec![],
            unrealised_pnl: dec!(0),
            realised_pnl: dec!(0),
            net_greeks: backsim_core::options::Greeks::ZERO,
        }
    }

    fn spy_tick(ts_ns: u64, price: Decimal) -> Event {
        Event::MarketData(MarketTick::new(ts_ns, Symbol::new("SPY"), price, 1, TickKind::Trade))
    }

    #[test]
    fn first_tick_buys_the_underlying_lot() {
        let mut strategy = CoveredCall::new(config(), flat_surface());
        let portfolio = empty_portfolio(0);
        let orders = strategy.on_event(&spy_tick(1_700_000_000_000_000_000, dec!(450.0)), &portfolio);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, Side::Buy);
        assert_eq!(orders[0].qty, config().lot_size);
    }

    #[test]
    fn sells_a_call_once_the_lot_is_held() {
        let mut strategy = CoveredCall::new(config(), flat_surface());
        let mut portfolio = empty_portfolio(1_700_000_000_000_000_000);
        portfolio.positions.push(backsim_core::portfolio::Position {
            symbol: Symbol::new("SPY"),
            qty: 100,
            avg_px: dec!(450.0),
            mark_px: dec!(450.0),
            greeks: backsim_core::options::Greeks::ZERO,
        });

        let orders = strategy.on_event(&spy_tick(1_700_000_000_000_000_000, dec!(450.0)), &portfolio);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, Side::Sell);
        assert_eq!(orders[0].qty, 1);
    }

    #[test]
    fn does_not_resell_once_a_leg_is_already_open() {
        let mut strategy = CoveredCall::new(config(), flat_surface());
        let mut portfolio = empty_portfolio(1_700_000_000_000_000_000);
        portfolio.positions.push(backsim_core::portfolio::Position {
            symbol: Symbol::new("SPY"),
            qty: 100,
            avg_px: dec!(450.0),
            mark_px: dec!(450.0),
            greeks: backsim_core::options::Greeks::ZERO,
        });

        let first = strategy.on_event(&spy_tick(1_700_000_000_000_000_000, dec!(450.0)), &portfolio);
        assert_eq!(first.len(), 1);
        let second = strategy.on_event(&spy_tick(1_700_000_100_000_000_000, dec!(450.5)), &portfolio);
        assert!(second.is_empty());
    }

    #[test]
    fn rolls_the_call_once_dte_reaches_the_roll_threshold() {
        let mut strategy = CoveredCall::new(config(), flat_surface());
        let mut portfolio = empty_portfolio(1_700_000_000_000_000_000);
        portfolio.positions.push(backsim_core::portfolio::Position {
            symbol: Symbol::new("SPY"),
            qty: 100,
            avg_px: dec!(450.0),
            mark_px: dec!(450.0),
            greeks: backsim_core::options::Greeks::ZERO,
        });

        let day0 = 1_700_000_000_000_000_000u64;
        let opened = strategy.on_event(&spy_tick(day0, dec!(450.0)), &portfolio);
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].side, Side::Sell);

        // target_days_to_expiry defaults to 30, roll_at_dte to 7; 24 days
        // later the open leg's dte has fallen to ~6, past the threshold.
        const NS_PER_DAY: u64 = 86_400 * 1_000_000_000;
        let later = day0 + 24 * NS_PER_DAY;
        let rolled = strategy.on_event(&spy_tick(later, dec!(452.0)), &portfolio);
        assert_eq!(rolled.len(), 2, "expected a close+open roll pair, got {rolled:?}");
        assert_eq!(rolled[0].side, Side::Buy);
        assert_eq!(rolled[1].side, Side::Sell);
    }
}
