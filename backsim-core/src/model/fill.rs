//! A single execution against an order.

use rust_decimal::Decimal;

use crate::model::order::OrderId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub order_id: OrderId,
    pub exchange_id: u64,
    /// Signed: positive for buys, negative for sells.
    pub filled_qty: i64,
    pub fill_px: Decimal,
    pub leaves_qty: i64,
    pub ts_ns: u64,
    pub commission: Decimal,
}

impl Fill {
    pub fn new(
        order_id: OrderId,
        exchange_id: u64,
        filled_qty: i64,
        fill_px: Decimal,
        leaves_qty: i64,
        ts_ns: u64,
        commission: Decimal,
    ) -> Self {
        Fill {
            order_id,
            exchange_id,
            filled_qty,
            fill_px,
            leaves_qty,
            ts_ns,
            commission,
        }
    }
}
