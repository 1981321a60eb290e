//! The simulation kernel: a single-threaded, cooperative event loop that
//! drains the event queue in order, maintains portfolio and book state,
//! drives the strategy, and routes its orders through risk and the fill
//! model.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::config::{BacktestConfig, RiskConfig};
use crate::error::BacktestError;
use crate::kernel::event_queue::EventQueue;
use crate::kernel::histogram::LatencyHistogram;
use crate::kernel::order_registry::OrderRegistry;
use crate::kernel::result::{BacktestResult, LatencyStats, PerformanceSnapshot, RunStatus};
use crate::kernel::strategy::Strategy;
use crate::matching::fill_model::simulate_fill;
use crate::matching::risk::{RiskDecision, RiskValidator};
use crate::model::book::BookState;
use crate::model::event::{Event, EventKind, OrderAck};
use crate::model::fill::Fill;
use crate::model::order::{Order, OrderId, OrderPending, OrderStatus, OrderType};
use crate::model::symbol::Symbol;
use crate::portfolio::Portfolio;

/// The simulation kernel. Construct with a strategy and configuration, seed
/// it with events via [`Kernel::enqueue`], then call [`Kernel::run`] once.
pub struct Kernel<S: Strategy> {
    queue: EventQueue,
    portfolio: Portfolio,
    books: HashMap<Symbol, BookState>,
    registry: OrderRegistry,
    risk_config: RiskConfig,
    backtest_config: BacktestConfig,
    strategy: S,

    strict: bool,
    errors: Vec<BacktestError>,
    events_processed: u64,
    next_exchange_id: u64,
    start_ts: Option<u64>,
    end_ts: u64,

    event_histograms: HashMap<EventKind, LatencyHistogram>,
    order_latency: LatencyHistogram,
    fill_counts: HashMap<String, u64>,
    ack_counts: HashMap<String, u64>,

    cancel_flag: Arc<AtomicBool>,
}

impl<S: Strategy> Kernel<S> {
    pub fn new(strategy: S, backtest_config: BacktestConfig, risk_config: RiskConfig, strict: bool) -> Result<Self, BacktestError> {
        backtest_config.validate()?;
        risk_config.validate()?;
        Ok(Kernel {
            queue: EventQueue::new(),
            portfolio: Portfolio::new(backtest_config.initial_cash),
            books: HashMap::new(),
            registry: OrderRegistry::new(),
            risk_config,
            backtest_config,
            strategy,
            strict,
            errors: Vec::new(),
            events_processed: 0,
            next_exchange_id: 1,
            start_ts: None,
            end_ts: 0,
            event_histograms: HashMap::new(),
            order_latency: LatencyHistogram::new(),
            fill_counts: HashMap::new(),
            ack_counts: HashMap::new(),
            cancel_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Seed the run with an event. Must be called before [`Kernel::run`];
    /// the queue is logically frozen once the loop starts.
    pub fn enqueue(&mut self, event: Event) {
        self.queue.push(event);
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// A handle the embedding host can use to cancel an in-progress (or
    /// not-yet-started) run from outside the kernel — set it from another
    /// thread, a UI callback, or a deadline timer. Polled between event
    /// buckets alongside the OS SIGINT hook `run()` installs, so either
    /// source can request a stop.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel_flag.clone()
    }

    /// Drain the event queue to completion (or until cancelled), producing
    /// the final result. Consumes nothing by value, but is meant to be
    /// called once per kernel instance.
    pub fn run(&mut self) -> BacktestResult {
        let cancel_flag = self.cancel_flag.clone();
        let _ = ctrlc::set_handler(move || {
            cancel_flag.store(true, Ordering::SeqCst);
        });

        let wall_start = Instant::now();
        info!(strategy = self.strategy.name(), "starting backtest run");

        let mut last_bucket_ts: Option<u64> = None;
        let mut status = RunStatus::Ok;

        loop {
            let next_ts = match self.queue.peek_ts() {
                Some(ts) => ts,
                None => break,
            };
            if last_bucket_ts != Some(next_ts) {
                if self.cancel_flag.load(Ordering::SeqCst) {
                    warn!("backtest run cancelled");
                    status = RunStatus::Cancelled;
                    break;
                }
                last_bucket_ts = Some(next_ts);
            }

            let event = match self.queue.pop() {
                Some(e) => e,
                None => break,
            };

            if self.start_ts.is_none() {
                self.start_ts = Some(event.ts_ns());
            }
            self.end_ts = self.end_ts.max(event.ts_ns());

            let kind = event.kind();
            let tick_start = Instant::now();
            self.dispatch(event);
            let elapsed_us = tick_start.elapsed().as_micros().min(u128::from(u64::MAX)) as u64;
            self.event_histograms.entry(kind).or_default().record_us(elapsed_us);

            self.events_processed += 1;

            if self.backtest_config.enable_checkpointing && self.events_processed % self.backtest_config.checkpoint_interval == 0 {
                self.checkpoint();
            }

            if self.errors.iter().any(|e| e.is_run_fatal()) && self.strict {
                error!("aborting run after fatal error in strict mode");
                status = RunStatus::Aborted;
                break;
            }
        }

        let duration = wall_start.elapsed();
        info!(events = self.events_processed, ?duration, "backtest run finished");
        self.build_result(duration, status)
    }

    fn dispatch(&mut self, event: Event) {
        match &event {
            Event::MarketData(tick) => {
                let book = self.books.entry(tick.symbol).or_default();
                book.apply_tick(tick.kind, tick.price, tick.qty, tick.ts_ns);
                self.portfolio.update_market_data(tick);
            }
            Event::Quote(quote) => {
                let book = self.books.entry(quote.symbol).or_default();
                book.apply_quote(quote.bid_px, quote.bid_sz, quote.ask_px, quote.ask_sz, quote.ts_ns);
                self.portfolio.update_quote(quote);
            }
            Event::Fill(fill) => self.dispatch_fill(fill),
            Event::OrderAck(ack) => self.dispatch_order_ack(ack),
        }

        let ts_ns = event.ts_ns();
        let snapshot = self.portfolio.snapshot(ts_ns);
        let orders = self.call_on_event(&event, &snapshot);
        for order in orders {
            self.handle_new_order(order, ts_ns);
        }
    }

    fn dispatch_fill(&mut self, fill: &Fill) {
        let symbol = fill.order_id.symbol_hint().unwrap_or_else(|| Symbol::new(""));
        self.portfolio.apply_fill(symbol, fill);

        match self.registry.fill(fill.order_id, fill.filled_qty.abs(), fill.ts_ns) {
            Ok(_) => {
                *self.fill_counts.entry(symbol.as_str().to_string()).or_insert(0) += 1;
                if let Some(created_ts) = self.order_created_ts(fill.order_id) {
                    let latency_ns = fill.ts_ns.saturating_sub(created_ts);
                    self.order_latency.record_us(latency_ns / 1_000);
                }
            }
            Err(e) => self.record_error(e),
        }

        let snapshot = self.portfolio.snapshot(fill.ts_ns);
        let result = catch_unwind(AssertUnwindSafe(|| {
            self.strategy.on_fill(fill, &snapshot);
        }));
        if result.is_err() {
            self.record_error(BacktestError::strategy_fault(fill.order_id.to_string(), "panic in on_fill"));
        }
    }

    fn dispatch_order_ack(&mut self, ack: &OrderAck) {
        *self.ack_counts.entry(format!("{:?}", ack.status)).or_insert(0) += 1;
        let result = catch_unwind(AssertUnwindSafe(|| {
            self.strategy.on_order_ack(ack);
        }));
        if result.is_err() {
            self.record_error(BacktestError::strategy_fault(ack.order_id.to_string(), "panic in on_order_ack"));
        }
    }

    fn call_on_event(&mut self, event: &Event, snapshot: &crate::portfolio::PortfolioState) -> Vec<Order> {
        let result = catch_unwind(AssertUnwindSafe(|| self.strategy.on_event(event, snapshot)));
        match result {
            Ok(orders) => orders,
            Err(_) => {
                self.record_error(BacktestError::strategy_fault("<unknown>", "panic in on_event"));
                Vec::new()
            }
        }
    }

    fn handle_new_order(&mut self, order: Order, ts_ns: u64) {
        if order.qty <= 0 || (order.order_type == OrderType::Limit && order.limit_px.map_or(true, |p| p <= Decimal::ZERO)) {
            self.record_error(BacktestError::strategy_fault(order.id.to_string(), "malformed order: non-positive quantity or limit price"));
            self.queue.push(Event::OrderAck(OrderAck {
                order_id: order.id,
                exchange_id: None,
                status: OrderStatus::Rejected,
                ts_ns,
                reason: Some("malformed order".to_string()),
            }));
            return;
        }

        let pending = OrderPending::new(order.id, order.symbol, order.side, order.order_type, order.limit_px, order.qty, order.tif, ts_ns);
        self.registry.insert_pending(pending);

        let book = self.books.entry(order.symbol).or_default();
        let reference_px = book.mid().or(order.limit_px).unwrap_or(Decimal::ZERO);
        let snapshot = self.portfolio.snapshot(ts_ns);
        let decision = RiskValidator::new(&self.risk_config).validate(&order, &snapshot, reference_px);

        match decision {
            RiskDecision::Rejected(reason) => {
                let _ = self.registry.reject(order.id, ts_ns);
                debug!(order_id = %order.id, %reason, "order rejected by risk predicate");
                self.queue.push(Event::OrderAck(OrderAck {
                    order_id: order.id,
                    exchange_id: None,
                    status: OrderStatus::Rejected,
                    ts_ns,
                    reason: Some(reason.to_string()),
                }));
            }
            RiskDecision::Allowed => {
                let exchange_id = self.next_exchange_id;
                self.next_exchange_id += 1;
                let _ = self.registry.accept(order.id, ts_ns);
                self.queue.push(Event::OrderAck(OrderAck {
                    order_id: order.id,
                    exchange_id: Some(exchange_id),
                    status: OrderStatus::Accepted,
                    ts_ns,
                    reason: None,
                }));

                let book = self.books.get(&order.symbol).copied().unwrap_or_default();
                if let Some(sim) = simulate_fill(&order, &book) {
                    let fill = Fill::new(order.id, exchange_id, sim.filled_qty, sim.fill_px, sim.leaves_qty, ts_ns, sim.commission);
                    self.queue.push(Event::Fill(fill));
                }
            }
        }
    }

    fn order_created_ts(&self, id: OrderId) -> Option<u64> {
        self.registry.created_ts(id)
    }

    fn record_error(&mut self, err: BacktestError) {
        warn!(%err, "recording run error");
        self.errors.push(err);
    }

    fn checkpoint(&self) {
        let Some(path) = &self.backtest_config.checkpoint_path else {
            return;
        };
        let snapshot = self.portfolio.snapshot(self.end_ts);
        match serde_json::to_vec_pretty(&CheckpointView::from(&snapshot)) {
            Ok(bytes) => {
                let file_path = format!("{path}.{}", self.events_processed);
                if let Err(e) = std::fs::write(&file_path, bytes) {
                    error!(error = %e, path = %file_path, "checkpoint write failed");
                }
            }
            Err(e) => error!(error = %e, "checkpoint serialisation failed"),
        }
    }

    fn build_result(&self, duration: Duration, status: RunStatus) -> BacktestResult {
        let elapsed_secs = duration.as_secs_f64().max(1e-9);
        let per_kind_latency = self
            .event_histograms
            .iter()
            .map(|(k, h)| (format!("{k:?}"), LatencyStats::from(h)))
            .collect();

        let performance = PerformanceSnapshot {
            backtest_duration: duration,
            events_per_second: self.events_processed as f64 / elapsed_secs,
            per_kind_latency,
            order_latency: LatencyStats::from(&self.order_latency),
            fill_counts: self.fill_counts.clone(),
            ack_counts: self.ack_counts.clone(),
        };

        BacktestResult {
            start_ts: self.start_ts.unwrap_or(0),
            end_ts: self.end_ts,
            events_processed: self.events_processed,
            final_portfolio: self.portfolio.snapshot(self.end_ts),
            performance,
            strategy_state: self.strategy.get_state(),
            duration,
            status,
            errors: self.errors.clone(),
        }
    }
}

#[derive(serde::Serialize)]
struct CheckpointView {
    cash: Decimal,
    unrealised_pnl: Decimal,
    realised_pnl: Decimal,
}

impl From<&crate::portfolio::PortfolioState> for CheckpointView {
    fn from(s: &crate::portfolio::PortfolioState) -> Self {
        CheckpointView {
            cash: s.cash,
            unrealised_pnl: s.unrealised_pnl,
            realised_pnl: s.realised_pnl,
        }
    }
}
