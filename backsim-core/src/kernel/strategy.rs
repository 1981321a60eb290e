//! The contract a strategy implements to participate in a backtest run.

use crate::model::event::{Event, OrderAck};
use crate::model::fill::Fill;
use crate::model::order::Order;
use crate::portfolio::PortfolioState;

/// Implemented by every strategy the kernel can drive. `on_event` is the
/// single place a strategy generates new orders; `on_fill`/`on_order_ack`
/// are notification-only side channels a strategy can use to keep its own
/// bookkeeping (e.g. which leg of a spread just got hit) in sync.
pub trait Strategy {
    fn name(&self) -> &str;

    /// Called for every event the kernel dispatches, after book and
    /// portfolio state have been updated for it. Returns any new orders to
    /// submit; an empty vec means "no action this event".
    fn on_event(&mut self, event: &Event, portfolio: &PortfolioState) -> Vec<Order>;

    fn on_fill(&mut self, _fill: &Fill, _portfolio: &PortfolioState) {}

    fn on_order_ack(&mut self, _ack: &OrderAck) {}

    /// A serialisable snapshot of whatever internal state the strategy
    /// wants reported in the backtest result.
    fn get_state(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn reset(&mut self) {}
}
