//! The data model: market events, orders (as a typestate lifecycle), fills,
//! order book snapshots, and the discriminated-union `Event` the kernel
//! dispatches on.

pub mod book;
pub mod event;
pub mod fill;
pub mod order;
pub mod symbol;
pub mod tick;

pub use book::{BookLevel, BookState, OrderBookSnapshot};
pub use event::{Event, EventKind, OrderAck, WrongEventKind};
pub use fill::Fill;
pub use order::{Order, OrderId, OrderState, OrderStatus, OrderType, Side, TimeInForce};
pub use symbol::Symbol;
pub use tick::{MarketTick, Quote, TickKind};
