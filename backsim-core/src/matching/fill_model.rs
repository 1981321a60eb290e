//! A pure `(order, book_state) -> fill` simulation: market-order slippage,
//! limit-order crossing with a spread-driven liquidity cap, and a flat
//! commission.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::model::book::BookState;
use crate::model::order::{Order, OrderType, Side};

pub const DEFAULT_COMMISSION: Decimal = Decimal::from_parts(65, 0, 0, false, 2);

/// Slippage factor applied to a market order's touched price: roughly 0.1
/// basis point per 100 units of quantity.
fn slippage_factor(qty: i64) -> Decimal {
    Decimal::ONE + Decimal::from(qty.abs()) / Decimal::from(10_000) * Decimal::new(1, 4)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedFill {
    pub filled_qty: i64,
    pub fill_px: Decimal,
    pub leaves_qty: i64,
    pub commission: Decimal,
}

/// Simulate a fill for `order` against `book`. Returns `None` if the book
/// has nothing to trade against or a limit order doesn't cross — this is
/// the normal, non-error "no liquidity" outcome described in the kernel's
/// failure semantics, not a fault.
pub fn simulate_fill(order: &Order, book: &BookState) -> Option<SimulatedFill> {
    match order.order_type {
        OrderType::Market => simulate_market(order, book),
        OrderType::Limit => simulate_limit(order, book),
    }
}

fn simulate_market(order: &Order, book: &BookState) -> Option<SimulatedFill> {
    let touched = match order.side {
        Side::Buy => book.best_ask_px,
        Side::Sell => book.best_bid_px,
    };
    let raw_price = match touched {
        Some(px) => px,
        None => {
            // Touched side is empty; fall back to the opposite side with a
            // 1% cushion if it exists, otherwise there is nothing to trade
            // against at all.
            let opposite = match order.side {
                Side::Buy => book.best_bid_px,
                Side::Sell => book.best_ask_px,
            }?;
            match order.side {
                Side::Buy => opposite * Decimal::new(101, 2),
                Side::Sell => opposite * Decimal::new(99, 2),
            }
        }
    };

    let factor = slippage_factor(order.qty);
    let fill_px = match order.side {
        Side::Buy => raw_price * factor,
        Side::Sell => raw_price / factor,
    };

    Some(SimulatedFill {
        filled_qty: order.qty * order.side.sign(),
        fill_px,
        leaves_qty: 0,
        commission: DEFAULT_COMMISSION,
    })
}

fn simulate_limit(order: &Order, book: &BookState) -> Option<SimulatedFill> {
    let limit_px = order.limit_px?;
    let (best_bid, best_ask) = (book.best_bid_px?, book.best_ask_px?);

    let crosses = match order.side {
        Side::Buy => limit_px >= best_ask,
        Side::Sell => limit_px <= best_bid,
    };
    if !crosses {
        return None;
    }

    let fill_px = match order.side {
        Side::Buy => best_ask,
        Side::Sell => best_bid,
    };

    let spread = best_ask - best_bid;
    if best_bid <= Decimal::ZERO {
        return None;
    }
    let ratio = (spread / best_bid).clamp(Decimal::new(1, 1), Decimal::new(2, 0));
    let available_f = (Decimal::from(1000) / ratio).to_f64().unwrap_or(1000.0);
    let available = available_f.max(1.0).round() as i64;

    let filled_qty_abs = order.qty.min(available);
    let leaves_qty = order.qty - filled_qty_abs;

    Some(SimulatedFill {
        filled_qty: filled_qty_abs * order.side.sign(),
        fill_px,
        leaves_qty,
        commission: DEFAULT_COMMISSION,
    })
}
