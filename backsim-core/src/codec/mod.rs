//! Binary tick-log file format: a fixed header followed by fixed-width
//! little-endian trade/quote records.

pub mod tick_log;

pub use tick_log::{TickLogHeader, TickLogReader, TickLogWriter, TickRecord, TickRecordKind};
