//! Reader/writer for the tick-log file format: a 64-byte header followed by
//! fixed-width little-endian records — 27 bytes for trade/bid/ask ticks, 39
//! for quotes. The kernel only consumes the reader side; the writer exists
//! so fixtures and tools can produce logs in the same format.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::BacktestError;

pub const MAGIC: u32 = 0x5449_4B58; // "TIKX", little-endian on disk
pub const HEADER_LEN: usize = 64;
const TICK_RECORD_LEN: usize = 27;
const QUOTE_RECORD_LEN: usize = 39;
const PRICE_SCALE: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickRecordKind {
    Trade = 0,
    Bid = 1,
    Ask = 2,
    Quote = 3,
}

impl TickRecordKind {
    fn from_byte(b: u8) -> Result<Self, BacktestError> {
        match b {
            0 => Ok(TickRecordKind::Trade),
            1 => Ok(TickRecordKind::Bid),
            2 => Ok(TickRecordKind::Ask),
            3 => Ok(TickRecordKind::Quote),
            other => Err(BacktestError::input(format!("unknown tick record kind byte {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickRecord {
    Tick {
        ts_ns: u64,
        kind: TickRecordKind,
        symbol: String,
        price: Decimal,
        qty: i32,
    },
    Quote {
        ts_ns: u64,
        symbol: String,
        bid_px: Decimal,
        bid_sz: i32,
        ask_px: Decimal,
        ask_sz: i32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickLogHeader {
    pub version: [u8; 8],
    pub created_ts_ns: u64,
    pub description: String,
}

fn symbol_to_bytes6(symbol: &str) -> [u8; 6] {
    let mut out = [0u8; 6];
    let src = symbol.as_bytes();
    let len = src.len().min(6);
    out[..len].copy_from_slice(&src[..len]);
    out
}

fn bytes6_to_symbol(bytes: &[u8; 6]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(6);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn price_to_scaled(price: Decimal) -> Result<i64, BacktestError> {
    (price * Decimal::from(PRICE_SCALE))
        .to_i64()
        .ok_or_else(|| BacktestError::input(format!("price {price} out of range for tick-log encoding")))
}

fn scaled_to_price(scaled: i64) -> Decimal {
    Decimal::new(scaled, 4)
}

/// Appends tick and quote records to a fresh tick-log file, writing the
/// header on construction.
pub struct TickLogWriter {
    inner: BufWriter<File>,
}

impl TickLogWriter {
    pub fn create(path: impl AsRef<Path>, description: &str, created_ts_ns: u64) -> Result<Self, BacktestError> {
        let file = File::create(path).map_err(|e| BacktestError::io(e.to_string()))?;
        let mut inner = BufWriter::new(file);

        let mut header = [0u8; HEADER_LEN];
        header[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        header[4..12].copy_from_slice(b"TIKX0001");
        header[12..20].copy_from_slice(&created_ts_ns.to_le_bytes());
        let desc_bytes = description.as_bytes();
        let desc_len = desc_bytes.len().min(32);
        header[20..20 + desc_len].copy_from_slice(&desc_bytes[..desc_len]);
        // bytes 52..64 are reserved and left zero.

        inner.write_all(&header).map_err(|e| BacktestError::io(e.to_string()))?;
        Ok(TickLogWriter { inner })
    }

    pub fn write_tick(&mut self, ts_ns: u64, kind: TickRecordKind, symbol: &str, price: Decimal, qty: i32) -> Result<(), BacktestError> {
        if matches!(kind, TickRecordKind::Quote) {
            return Err(BacktestError::input("write_tick cannot encode a Quote record; use write_quote"));
        }
        let mut buf = [0u8; TICK_RECORD_LEN];
        buf[0..8].copy_from_slice(&ts_ns.to_le_bytes());
        buf[8] = kind as u8;
        buf[9..15].copy_from_slice(&symbol_to_bytes6(symbol));
        buf[15..23].copy_from_slice(&price_to_scaled(price)?.to_le_bytes());
        buf[23..27].copy_from_slice(&qty.to_le_bytes());
        self.inner.write_all(&buf).map_err(|e| BacktestError::io(e.to_string()))
    }

    pub fn write_quote(
        &mut self,
        ts_ns: u64,
        symbol: &str,
        bid_px: Decimal,
        bid_sz: i32,
        ask_px: Decimal,
        ask_sz: i32,
    ) -> Result<(), BacktestError> {
        let mut buf = [0u8; QUOTE_RECORD_LEN];
        buf[0..8].copy_from_slice(&ts_ns.to_le_bytes());
        buf[8] = TickRecordKind::Quote as u8;
        buf[9..15].copy_from_slice(&symbol_to_bytes6(symbol));
        buf[15..23].copy_from_slice(&price_to_scaled(bid_px)?.to_le_bytes());
        buf[23..27].copy_from_slice(&bid_sz.to_le_bytes());
        buf[27..35].copy_from_slice(&price_to_scaled(ask_px)?.to_le_bytes());
        buf[35..39].copy_from_slice(&ask_sz.to_le_bytes());
        self.inner.write_all(&buf).map_err(|e| BacktestError::io(e.to_string()))
    }

    pub fn flush(&mut self) -> Result<(), BacktestError> {
        self.inner.flush().map_err(|e| BacktestError::io(e.to_string()))
    }
}

/// Memory-maps a tick-log file for sequential record iteration. The whole
/// file lives in the process's address space but is paged in lazily by the
/// OS, so large logs don't need to fit in the allocator's heap.
pub struct TickLogReader {
    mmap: Mmap,
}

impl TickLogReader {
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, TickLogHeader), BacktestError> {
        let file = File::open(path).map_err(|e| BacktestError::io(e.to_string()))?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| BacktestError::io(e.to_string()))?;
        if mmap.len() < HEADER_LEN {
            return Err(BacktestError::input("tick-log file shorter than its header"));
        }
        let magic = u32::from_le_bytes(mmap[0..4].try_into().unwrap());
        if magic != MAGIC {
            return Err(BacktestError::input(format!("bad tick-log magic: {magic:#x}")));
        }
        let mut version = [0u8; 8];
        version.copy_from_slice(&mmap[4..12]);
        let created_ts_ns = u64::from_le_bytes(mmap[12..20].try_into().unwrap());
        let desc_end = mmap[20..52].iter().position(|&b| b == 0).map(|p| 20 + p).unwrap_or(52);
        let description = String::from_utf8_lossy(&mmap[20..desc_end]).into_owned();

        let header = TickLogHeader {
            version,
            created_ts_ns,
            description,
        };
        Ok((TickLogReader { mmap }, header))
    }

    /// Iterate the records in file order. A malformed trailing partial
    /// record is reported as an error rather than silently dropped.
    pub fn records(&self) -> TickLogIter<'_> {
        TickLogIter {
            data: &self.mmap,
            offset: HEADER_LEN,
        }
    }
}

pub struct TickLogIter<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for TickLogIter<'a> {
    type Item = Result<TickRecord, BacktestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }
        if self.offset + 9 > self.data.len() {
            self.offset = self.data.len();
            return Some(Err(BacktestError::input("truncated tick-log record header")));
        }

        let ts_ns = u64::from_le_bytes(self.data[self.offset..self.offset + 8].try_into().unwrap());
        let kind_byte = self.data[self.offset + 8];
        let kind = match TickRecordKind::from_byte(kind_byte) {
            Ok(k) => k,
            Err(e) => {
                self.offset = self.data.len();
                return Some(Err(e));
            }
        };

        let record_len = if kind == TickRecordKind::Quote { QUOTE_RECORD_LEN } else { TICK_RECORD_LEN };
        if self.offset + record_len > self.data.len() {
            self.offset = self.data.len();
            return Some(Err(BacktestError::input("truncated tick-log record body")));
        }
        let record = &self.data[self.offset..self.offset + record_len];
        self.offset += record_len;

        let mut symbol_bytes = [0u8; 6];
        symbol_bytes.copy_from_slice(&record[9..15]);
        let symbol = bytes6_to_symbol(&symbol_bytes);

        if kind == TickRecordKind::Quote {
            let bid_scaled = i64::from_le_bytes(record[15..23].try_into().unwrap());
            let bid_sz = i32::from_le_bytes(record[23..27].try_into().unwrap());
            let ask_scaled = i64::from_le_bytes(record[27..35].try_into().unwrap());
            let ask_sz = i32::from_le_bytes(record[35..39].try_into().unwrap());
            Some(Ok(TickRecord::Quote {
                ts_ns,
                symbol,
                bid_px: scaled_to_price(bid_scaled),
                bid_sz,
                ask_px: scaled_to_price(ask_scaled),
                ask_sz,
            }))
        } else {
            let price_scaled = i64::from_le_bytes(record[15..23].try_into().unwrap());
            let qty = i32::from_le_bytes(record[23..27].try_into().unwrap());
            Some(Ok(TickRecord::Tick {
                ts_ns,
                kind,
                symbol,
                price: scaled_to_price(price_scaled),
                qty,
            }))
        }
    }
}
