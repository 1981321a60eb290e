//! A fixed-capacity, stack-allocated symbol, used for underlyings (short) and
//! OCC option tickers (longer). Avoids a heap allocation per tick on the hot
//! path.

use std::fmt;
use std::str::FromStr;

/// Capacity large enough for a full OCC option ticker
/// (`UNDERLYING` up to 6 chars + `YYMMDD` + `C|P` + 8-digit strike).
pub const SYMBOL_CAPACITY: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    bytes: [u8; SYMBOL_CAPACITY],
    len: u8,
}

impl Symbol {
    pub fn new(s: &str) -> Self {
        let mut bytes = [0u8; SYMBOL_CAPACITY];
        let src = s.as_bytes();
        let len = src.len().min(SYMBOL_CAPACITY);
        bytes[..len].copy_from_slice(&src[..len]);
        Symbol {
            bytes,
            len: len as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol::new(&s)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Symbol::new(s))
    }
}

impl serde::Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Symbol::new(&s))
    }
}
