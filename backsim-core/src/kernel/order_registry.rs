//! Tracks every order's typestate across its lifetime so the kernel can
//! enforce "no fill after terminal" (a bookkeeping violation, §7) and
//! report per-status ack counts.

use std::collections::HashMap;

use crate::error::BacktestError;
use crate::model::order::{
    FillOutcome, OrderAccepted, OrderId, OrderPending, OrderState, OrderStatus,
};

#[derive(Debug, Default)]
pub struct OrderRegistry {
    orders: HashMap<OrderId, OrderState>,
}

impl OrderRegistry {
    pub fn new() -> Self {
        OrderRegistry::default()
    }

    pub fn insert_pending(&mut self, pending: OrderPending) {
        let id = pending.data.id;
        self.orders.insert(id, OrderState::Pending(pending));
    }

    pub fn status(&self, id: OrderId) -> Option<OrderStatus> {
        self.orders.get(&id).map(|s| s.status())
    }

    pub fn accept(&mut self, id: OrderId, ts_ns: u64) -> Result<(), BacktestError> {
        match self.orders.remove(&id) {
            Some(OrderState::Pending(pending)) => {
                self.orders.insert(id, OrderState::Accepted(pending.accept(ts_ns)));
                Ok(())
            }
            Some(other) => {
                let err = BacktestError::bookkeeping(id.to_string(), format!("accept called on {:?}", other.status()));
                self.orders.insert(id, other);
                Err(err)
            }
            None => Err(BacktestError::bookkeeping(id.to_string(), "accept called on unknown order")),
        }
    }

    pub fn reject(&mut self, id: OrderId, ts_ns: u64) -> Result<(), BacktestError> {
        match self.orders.remove(&id) {
            Some(OrderState::Pending(pending)) => {
                self.orders.insert(id, OrderState::Rejected(pending.reject(ts_ns)));
                Ok(())
            }
            Some(other) => {
                let err = BacktestError::bookkeeping(id.to_string(), format!("reject called on {:?}", other.status()));
                self.orders.insert(id, other);
                Err(err)
            }
            None => Err(BacktestError::bookkeeping(id.to_string(), "reject called on unknown order")),
        }
    }

    /// Apply a fill of `qty` to the order identified by `id`. Returns the
    /// resulting status. Fails with a `Bookkeeping` error if the order is
    /// unknown, already terminal, or the fill is otherwise invalid.
    pub fn fill(&mut self, id: OrderId, qty: i64, ts_ns: u64) -> Result<OrderStatus, BacktestError> {
        let accepted: OrderAccepted = match self.orders.remove(&id) {
            Some(OrderState::Accepted(a)) => a,
            Some(OrderState::PartiallyFilled(p)) => {
                match p.fill(qty, ts_ns) {
                    Ok(FillOutcome::PartiallyFilled(next)) => {
                        self.orders.insert(id, OrderState::PartiallyFilled(next));
                        return Ok(OrderStatus::PartiallyFilled);
                    }
                    Ok(FillOutcome::Filled(next)) => {
                        self.orders.insert(id, OrderState::Filled(next));
                        return Ok(OrderStatus::Filled);
                    }
                    Err((err, unchanged)) => {
                        self.orders.insert(id, OrderState::PartiallyFilled(unchanged));
                        return Err(BacktestError::bookkeeping(id.to_string(), err.to_string()));
                    }
                }
            }
            Some(other) => {
                let err = BacktestError::bookkeeping(id.to_string(), format!("fill called on terminal state {:?}", other.status()));
                self.orders.insert(id, other);
                return Err(err);
            }
            None => return Err(BacktestError::bookkeeping(id.to_string(), "fill called on unknown order")),
        };

        match accepted.fill(qty, ts_ns) {
            Ok(FillOutcome::PartiallyFilled(next)) => {
                self.orders.insert(id, OrderState::PartiallyFilled(next));
                Ok(OrderStatus::PartiallyFilled)
            }
            Ok(FillOutcome::Filled(next)) => {
                self.orders.insert(id, OrderState::Filled(next));
                Ok(OrderStatus::Filled)
            }
            Err((err, unchanged)) => {
                self.orders.insert(id, OrderState::Accepted(unchanged));
                Err(BacktestError::bookkeeping(id.to_string(), err.to_string()))
            }
        }
    }

    pub fn cancel(&mut self, id: OrderId, ts_ns: u64) -> Result<(), BacktestError> {
        match self.orders.remove(&id) {
            Some(OrderState::Accepted(a)) => {
                self.orders.insert(id, OrderState::Canceled(a.cancel(ts_ns)));
                Ok(())
            }
            Some(OrderState::PartiallyFilled(p)) => {
                self.orders.insert(id, OrderState::Canceled(p.cancel(ts_ns)));
                Ok(())
            }
            Some(other) => {
                let err = BacktestError::bookkeeping(id.to_string(), format!("cancel called on terminal state {:?}", other.status()));
                self.orders.insert(id, other);
                Err(err)
            }
            None => Err(BacktestError::bookkeeping(id.to_string(), "cancel called on unknown order")),
        }
    }

    pub fn active_count(&self) -> usize {
        self.orders.values().filter(|s| s.is_active()).count()
    }

    /// The timestamp the order was first submitted, used to measure
    /// order-to-fill latency. `None` if the order is unknown.
    pub fn created_ts(&self, id: OrderId) -> Option<u64> {
        self.orders.get(&id).map(|s| s.data().created_ts_ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::order::{OrderType, Side, TimeInForce};
    use crate::model::symbol::Symbol;
    use rust_decimal_macros::dec;

    fn new_pending(id: OrderId) -> OrderPending {
        OrderPending::new(
            id,
            Symbol::new("SPY"),
            Side::Buy,
            OrderType::Limit,
            Some(dec!(100.0)),
            100,
            TimeInForce::Gtc,
            0,
        )
    }

    #[test]
    fn happy_path_lifecycle() {
        let id = OrderId::new("ord_SPY_1");
        let mut reg = OrderRegistry::new();
        reg.insert_pending(new_pending(id));
        reg.accept(id, 1).unwrap();
        assert_eq!(reg.status(id), Some(OrderStatus::Accepted));
        let status = reg.fill(id, 100, 2).unwrap();
        assert_eq!(status, OrderStatus::Filled);
        assert_eq!(reg.status(id), Some(OrderStatus::Filled));
    }

    #[test]
    fn fill_after_terminal_is_a_bookkeeping_violation() {
        let id = OrderId::new("ord_SPY_2");
        let mut reg = OrderRegistry::new();
        reg.insert_pending(new_pending(id));
        reg.accept(id, 1).unwrap();
        reg.fill(id, 100, 2).unwrap();
        let err = reg.fill(id, 1, 3).unwrap_err();
        assert!(matches!(err, BacktestError::Bookkeeping { .. }));
    }

    #[test]
    fn rejecting_an_unknown_order_is_a_bookkeeping_violation() {
        let mut reg = OrderRegistry::new();
        let err = reg.accept(OrderId::new("ghost"), 1).unwrap_err();
        assert!(matches!(err, BacktestError::Bookkeeping { .. }));
    }

    #[test]
    fn partial_fill_then_cancel() {
        let id = OrderId::new("ord_SPY_3");
        let mut reg = OrderRegistry::new();
        reg.insert_pending(new_pending(id));
        reg.accept(id, 1).unwrap();
        reg.fill(id, 40, 2).unwrap();
        assert_eq!(reg.status(id), Some(OrderStatus::PartiallyFilled));
        reg.cancel(id, 3).unwrap();
        assert_eq!(reg.status(id), Some(OrderStatus::Canceled));
    }
}
