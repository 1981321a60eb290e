//! The event the kernel dispatches on: a tagged union over market data,
//! quotes, fills, and order acknowledgements, plus the kind-priority used to
//! break ties between events sharing a timestamp.

use crate::model::fill::Fill;
use crate::model::order::{OrderId, OrderStatus};
use crate::model::tick::{MarketTick, Quote};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum EventKind {
    MarketData,
    Quote,
    Fill,
    OrderAck,
}

impl EventKind {
    /// Dispatch priority within a shared timestamp bucket: market data and
    /// quotes first, then fills, then acknowledgements.
    pub fn priority(self) -> u8 {
        match self {
            EventKind::MarketData | EventKind::Quote => 0,
            EventKind::Fill => 1,
            EventKind::OrderAck => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub order_id: OrderId,
    pub exchange_id: Option<u64>,
    pub status: OrderStatus,
    pub ts_ns: u64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    MarketData(MarketTick),
    Quote(Quote),
    Fill(Fill),
    OrderAck(OrderAck),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("event is not of the requested kind")]
pub struct WrongEventKind;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::MarketData(_) => EventKind::MarketData,
            Event::Quote(_) => EventKind::Quote,
            Event::Fill(_) => EventKind::Fill,
            Event::OrderAck(_) => EventKind::OrderAck,
        }
    }

    pub fn ts_ns(&self) -> u64 {
        match self {
            Event::MarketData(t) => t.ts_ns,
            Event::Quote(q) => q.ts_ns,
            Event::Fill(f) => f.ts_ns,
            Event::OrderAck(a) => a.ts_ns,
        }
    }

    pub fn as_market_data(&self) -> Result<&MarketTick, WrongEventKind> {
        match self {
            Event::MarketData(t) => Ok(t),
            _ => Err(WrongEventKind),
        }
    }

    pub fn as_quote(&self) -> Result<&Quote, WrongEventKind> {
        match self {
            Event::Quote(q) => Ok(q),
            _ => Err(WrongEventKind),
        }
    }

    pub fn as_fill(&self) -> Result<&Fill, WrongEventKind> {
        match self {
            Event::Fill(f) => Ok(f),
            _ => Err(WrongEventKind),
        }
    }

    pub fn as_order_ack(&self) -> Result<&OrderAck, WrongEventKind> {
        match self {
            Event::OrderAck(a) => Ok(a),
            _ => Err(WrongEventKind),
        }
    }
}
