//! Order representation and its typestate lifecycle.
//!
//! States: `Pending -> Accepted -> PartiallyFilled -> Filled`,
//! `Pending -> Rejected` (terminal), `Accepted -> Canceled` (terminal).
//! `PartiallyFilled` can also be canceled. Each transition consumes the
//! previous state by value so a stale handle cannot be reused; fill
//! validation failures return the order unchanged rather than silently
//! clamping the quantity.

use rust_decimal::Decimal;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::symbol::Symbol;

/// Capacity for an order id string, generous enough for
/// `<PREFIX>_<OCC-TICKER>_<sequence>`.
pub const ORDER_ID_CAPACITY: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TimeInForce {
    Gtc,
    Ioc,
    Fok,
}

/// An order id: a fixed-capacity string so the portfolio's symbol-inference
/// convention (see [`OrderId::symbol_hint`]) has something to parse without
/// a heap allocation per order.
///
/// Strategies that follow the `"<PREFIX>_<SYMBOL>_<seq>"` convention get
/// automatic symbol inference in [`crate::portfolio::Portfolio::apply_fill`];
/// strategies that mint ids any other way must track the order-to-symbol
/// mapping themselves. This coupling is deliberately brittle — documented,
/// not hidden.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId {
    bytes: [u8; ORDER_ID_CAPACITY],
    len: u8,
}

impl OrderId {
    pub fn new(s: &str) -> Self {
        let mut bytes = [0u8; ORDER_ID_CAPACITY];
        let src = s.as_bytes();
        let len = src.len().min(ORDER_ID_CAPACITY);
        bytes[..len].copy_from_slice(&src[..len]);
        OrderId {
            bytes,
            len: len as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }

    /// Build an id following the `"<PREFIX>_<SYMBOL>_<seq>"` convention.
    pub fn tagged(prefix: &str, symbol: &Symbol) -> Self {
        let seq = NEXT_ORDER_SEQ.fetch_add(1, Ordering::Relaxed);
        OrderId::new(&format!("{prefix}_{}_{seq}", symbol.as_str()))
    }

    /// Parse the symbol out of the id assuming the `"<PREFIX>_<SYMBOL>_"`
    /// convention (split on `_`, take index 1). Returns `None` if the id
    /// doesn't have at least two underscore-separated components.
    pub fn symbol_hint(&self) -> Option<Symbol> {
        self.as_str().split('_').nth(1).map(Symbol::new)
    }

    /// Allocate a bare sequential id with no embedded symbol, for strategies
    /// that track symbol mapping themselves.
    pub fn next() -> Self {
        let seq = NEXT_ORDER_SEQ.fetch_add(1, Ordering::Relaxed);
        OrderId::new(&format!("ord_{seq}"))
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderId({:?})", self.as_str())
    }
}

impl serde::Serialize for OrderId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for OrderId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(OrderId::new(&s))
    }
}

static NEXT_ORDER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Fields shared by every order state.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderData {
    pub id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub limit_px: Option<Decimal>,
    pub qty: i64,
    pub filled_qty: i64,
    pub tif: TimeInForce,
    pub created_ts_ns: u64,
    pub updated_ts_ns: u64,
}

impl OrderData {
    pub fn remaining_qty(&self) -> i64 {
        self.qty - self.filled_qty
    }

    pub fn is_fully_filled(&self) -> bool {
        self.filled_qty >= self.qty
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FillError {
    ZeroQuantity,
    NonPositivePrice,
    ExceedsRemaining { fill_qty: i64, remaining_qty: i64 },
}

impl fmt::Display for FillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillError::ZeroQuantity => write!(f, "fill quantity must be positive"),
            FillError::NonPositivePrice => write!(f, "fill price must be positive"),
            FillError::ExceedsRemaining {
                fill_qty,
                remaining_qty,
            } => write!(
                f,
                "fill quantity {fill_qty} exceeds remaining quantity {remaining_qty}"
            ),
        }
    }
}

impl std::error::Error for FillError {}

macro_rules! terminal_state {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            pub data: OrderData,
        }
        impl $name {
            pub fn data(&self) -> &OrderData {
                &self.data
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderPending {
    pub data: OrderData,
}

impl OrderPending {
    pub fn new(
        id: OrderId,
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        limit_px: Option<Decimal>,
        qty: i64,
        tif: TimeInForce,
        ts_ns: u64,
    ) -> Self {
        OrderPending {
            data: OrderData {
                id,
                symbol,
                side,
                order_type,
                limit_px,
                qty,
                filled_qty: 0,
                tif,
                created_ts_ns: ts_ns,
                updated_ts_ns: ts_ns,
            },
        }
    }

    pub fn accept(mut self, ts_ns: u64) -> OrderAccepted {
        self.data.updated_ts_ns = ts_ns;
        OrderAccepted { data: self.data }
    }

    pub fn reject(mut self, ts_ns: u64) -> OrderRejected {
        self.data.updated_ts_ns = ts_ns;
        OrderRejected { data: self.data }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FillOutcome {
    PartiallyFilled(OrderPartiallyFilled),
    Filled(OrderFilled),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderAccepted {
    pub data: OrderData,
}

impl OrderAccepted {
    /// Apply a fill. On success, returns the next state (`PartiallyFilled`
    /// or `Filled` depending on whether quantity remains). On failure,
    /// returns the error alongside the order unchanged.
    pub fn fill(mut self, fill_qty: i64, ts_ns: u64) -> Result<FillOutcome, (FillError, OrderAccepted)> {
        if fill_qty <= 0 {
            return Err((FillError::ZeroQuantity, self));
        }
        let remaining = self.data.remaining_qty();
        if fill_qty > remaining {
            return Err((
                FillError::ExceedsRemaining {
                    fill_qty,
                    remaining_qty: remaining,
                },
                self,
            ));
        }
        self.data.filled_qty += fill_qty;
        self.data.updated_ts_ns = ts_ns;
        if self.data.is_fully_filled() {
            Ok(FillOutcome::Filled(OrderFilled { data: self.data }))
        } else {
            Ok(FillOutcome::PartiallyFilled(OrderPartiallyFilled { data: self.data }))
        }
    }

    pub fn cancel(mut self, ts_ns: u64) -> OrderCanceled {
        self.data.updated_ts_ns = ts_ns;
        OrderCanceled { data: self.data }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderPartiallyFilled {
    pub data: OrderData,
}

impl OrderPartiallyFilled {
    pub fn fill(mut self, fill_qty: i64, ts_ns: u64) -> Result<FillOutcome, (FillError, OrderPartiallyFilled)> {
        if fill_qty <= 0 {
            return Err((FillError::ZeroQuantity, self));
        }
        let remaining = self.data.remaining_qty();
        if fill_qty > remaining {
            return Err((
                FillError::ExceedsRemaining {
                    fill_qty,
                    remaining_qty: remaining,
                },
                self,
            ));
        }
        self.data.filled_qty += fill_qty;
        self.data.updated_ts_ns = ts_ns;
        if self.data.is_fully_filled() {
            Ok(FillOutcome::Filled(OrderFilled { data: self.data }))
        } else {
            Ok(FillOutcome::PartiallyFilled(OrderPartiallyFilled { data: self.data }))
        }
    }

    pub fn cancel(mut self, ts_ns: u64) -> OrderCanceled {
        self.data.updated_ts_ns = ts_ns;
        OrderCanceled { data: self.data }
    }
}

terminal_state!(OrderFilled);
terminal_state!(OrderRejected);
terminal_state!(OrderCanceled);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum OrderStatus {
    Pending,
    Accepted,
    PartiallyFilled,
    Filled,
    Rejected,
    Canceled,
}

/// A type-erased wrapper around any order state, used for storage in the
/// kernel's in-flight order registry.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderState {
    Pending(OrderPending),
    Accepted(OrderAccepted),
    PartiallyFilled(OrderPartiallyFilled),
    Filled(OrderFilled),
    Rejected(OrderRejected),
    Canceled(OrderCanceled),
}

impl OrderState {
    pub fn id(&self) -> OrderId {
        self.data().id
    }

    pub fn data(&self) -> &OrderData {
        match self {
            OrderState::Pending(o) => &o.data,
            OrderState::Accepted(o) => &o.data,
            OrderState::PartiallyFilled(o) => &o.data,
            OrderState::Filled(o) => &o.data,
            OrderState::Rejected(o) => &o.data,
            OrderState::Canceled(o) => &o.data,
        }
    }

    pub fn status(&self) -> OrderStatus {
        match self {
            OrderState::Pending(_) => OrderStatus::Pending,
            OrderState::Accepted(_) => OrderStatus::Accepted,
            OrderState::PartiallyFilled(_) => OrderStatus::PartiallyFilled,
            OrderState::Filled(_) => OrderStatus::Filled,
            OrderState::Rejected(_) => OrderStatus::Rejected,
            OrderState::Canceled(_) => OrderStatus::Canceled,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Filled(_) | OrderState::Rejected(_) | OrderState::Canceled(_)
        )
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl From<OrderPending> for OrderState {
    fn from(o: OrderPending) -> Self {
        OrderState::Pending(o)
    }
}
impl From<OrderAccepted> for OrderState {
    fn from(o: OrderAccepted) -> Self {
        OrderState::Accepted(o)
    }
}
impl From<OrderPartiallyFilled> for OrderState {
    fn from(o: OrderPartiallyFilled) -> Self {
        OrderState::PartiallyFilled(o)
    }
}
impl From<OrderFilled> for OrderState {
    fn from(o: OrderFilled) -> Self {
        OrderState::Filled(o)
    }
}
impl From<OrderRejected> for OrderState {
    fn from(o: OrderRejected) -> Self {
        OrderState::Rejected(o)
    }
}
impl From<OrderCanceled> for OrderState {
    fn from(o: OrderCanceled) -> Self {
        OrderState::Canceled(o)
    }
}

/// A plain request as produced by a strategy, before the kernel turns it
/// into a tracked [`OrderPending`].
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub limit_px: Option<Decimal>,
    pub qty: i64,
    pub tif: TimeInForce,
}

impl Order {
    pub fn market(id: OrderId, symbol: Symbol, side: Side, qty: i64) -> Self {
        Order {
            id,
            symbol,
            side,
            order_type: OrderType::Market,
            limit_px: None,
            qty,
            tif: TimeInForce::Ioc,
        }
    }

    pub fn limit(id: OrderId, symbol: Symbol, side: Side, qty: i64, limit_px: Decimal) -> Self {
        Order {
            id,
            symbol,
            side,
            order_type: OrderType::Limit,
            limit_px: Some(limit_px),
            qty,
            tif: TimeInForce::Gtc,
        }
    }

    pub fn notional(&self, reference_px: Decimal) -> Decimal {
        Decimal::from(self.qty.abs()) * self.limit_px.unwrap_or(reference_px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_pending(qty: i64) -> OrderPending {
        OrderPending::new(
            OrderId::new("ord_SPY_1"),
            Symbol::new("SPY"),
            Side::Buy,
            OrderType::Limit,
            Some(dec!(100.0)),
            qty,
            TimeInForce::Gtc,
            1000,
        )
    }

    #[test]
    fn pending_to_accepted_to_filled_happy_path() {
        let pending = sample_pending(100);
        let accepted = pending.accept(1100);
        assert_eq!(accepted.data.filled_qty, 0);
        match accepted.fill(100, 1200).unwrap() {
            FillOutcome::Filled(filled) => {
                assert_eq!(filled.data.filled_qty, 100);
                assert_eq!(filled.data.remaining_qty(), 0);
            }
            other => panic!("expected Filled, got {other:?}"),
        }
    }

    #[test]
    fn partial_fill_then_complete() {
        let accepted = sample_pending(100).accept(1000);
        let partial = match accepted.fill(40, 1100).unwrap() {
            FillOutcome::PartiallyFilled(p) => p,
            other => panic!("expected PartiallyFilled, got {other:?}"),
        };
        assert_eq!(partial.data.filled_qty, 40);
        match partial.fill(60, 1200).unwrap() {
            FillOutcome::Filled(f) => assert_eq!(f.data.filled_qty, 100),
            other => panic!("expected Filled, got {other:?}"),
        }
    }

    #[test]
    fn overfill_is_rejected_and_order_is_unchanged() {
        let accepted = sample_pending(100).accept(1000);
        let before = accepted.clone();
        let (err, returned) = accepted.fill(150, 1100).unwrap_err();
        assert_eq!(
            err,
            FillError::ExceedsRemaining {
                fill_qty: 150,
                remaining_qty: 100
            }
        );
        assert_eq!(returned, before);
    }

    #[test]
    fn zero_quantity_fill_is_rejected() {
        let accepted = sample_pending(100).accept(1000);
        let (err, _) = accepted.fill(0, 1100).unwrap_err();
        assert_eq!(err, FillError::ZeroQuantity);
    }

    #[test]
    fn reject_and_cancel_are_terminal() {
        let rejected = sample_pending(10).reject(1000);
        let state = OrderState::from(rejected);
        assert!(state.is_terminal());

        let canceled = sample_pending(10).accept(1000).cancel(1100);
        let state = OrderState::from(canceled);
        assert!(state.is_terminal());
    }

    #[test]
    fn order_state_status_and_terminality() {
        let pending_state = OrderState::from(sample_pending(10));
        assert_eq!(pending_state.status(), OrderStatus::Pending);
        assert!(pending_state.is_active());

        let accepted_state = OrderState::from(sample_pending(10).accept(5));
        assert_eq!(accepted_state.status(), OrderStatus::Accepted);
        assert!(accepted_state.is_active());
    }

    #[test]
    fn many_small_fills_reach_exact_completion() {
        let mut accepted = sample_pending(1000).accept(0);
        for i in 0..10 {
            match accepted.fill(100, i + 1).unwrap() {
                FillOutcome::PartiallyFilled(p) => accepted = OrderAccepted { data: p.data },
                FillOutcome::Filled(f) => {
                    assert_eq!(i, 9);
                    assert_eq!(f.data.filled_qty, 1000);
                    return;
                }
            }
        }
        panic!("order never reached Filled after 10 fills of 100");
    }

    #[test]
    fn tagged_order_id_round_trips_symbol_hint() {
        let id = OrderId::tagged("CC", &Symbol::new("SPY"));
        assert_eq!(id.symbol_hint(), Some(Symbol::new("SPY")));
    }

    #[test]
    fn bare_order_id_has_no_symbol_hint() {
        let id = OrderId::new("not-tagged");
        assert_eq!(id.symbol_hint(), None);
    }
}
