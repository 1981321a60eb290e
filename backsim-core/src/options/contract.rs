//! Option contract identity and the OCC-style packed ticker format
//! `<UNDERLYING><YYMMDD><C|P><strike x1000, 8 digits>`.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::BacktestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    fn code(self) -> char {
        match self {
            OptionType::Call => 'C',
            OptionType::Put => 'P',
        }
    }
}

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq)]
pub struct OptionContract {
    pub ticker: String,
    pub underlying: String,
    pub strike: f64,
    pub expiry: NaiveDate,
    pub option_type: OptionType,
}

impl OptionContract {
    pub fn new(underlying: impl Into<String>, strike: f64, expiry: NaiveDate, option_type: OptionType) -> Self {
        let underlying = underlying.into();
        let ticker = format_occ_ticker(&underlying, strike, expiry, option_type);
        OptionContract {
            ticker,
            underlying,
            strike,
            expiry,
            option_type,
        }
    }

    /// Time to expiry in years, measured from `as_of`, floored at zero.
    pub fn time_to_expiry_years(&self, as_of: NaiveDate) -> f64 {
        let days = (self.expiry - as_of).num_days();
        (days.max(0) as f64) / DAYS_PER_YEAR
    }

    /// Parse an OCC-style ticker into a contract. This is the single parser
    /// every surface/strategy lookup should route through.
    pub fn parse(ticker: &str) -> Result<Self, BacktestError> {
        // Find the first digit: everything before it is the underlying.
        let first_digit = ticker
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit())
            .map(|(i, _)| i)
            .ok_or_else(|| BacktestError::input(format!("malformed OCC ticker: {ticker}")))?;

        if ticker.len() < first_digit + 6 + 1 + 8 {
            return Err(BacktestError::input(format!(
                "OCC ticker too short: {ticker}"
            )));
        }

        let underlying = ticker[..first_digit].to_string();
        let date_str = &ticker[first_digit..first_digit + 6];
        let type_char = ticker
            .chars()
            .nth(first_digit + 6)
            .ok_or_else(|| BacktestError::input(format!("malformed OCC ticker: {ticker}")))?;
        let strike_str = &ticker[first_digit + 7..first_digit + 15];

        let year = 2000 + date_str[0..2].parse::<i32>().map_err(|e| {
            BacktestError::input(format!("bad year in ticker {ticker}: {e}"))
        })?;
        let month = date_str[2..4]
            .parse::<u32>()
            .map_err(|e| BacktestError::input(format!("bad month in ticker {ticker}: {e}")))?;
        let day = date_str[4..6]
            .parse::<u32>()
            .map_err(|e| BacktestError::input(format!("bad day in ticker {ticker}: {e}")))?;
        let expiry = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| BacktestError::input(format!("invalid expiry date in ticker {ticker}")))?;

        let option_type = match type_char {
            'C' => OptionType::Call,
            'P' => OptionType::Put,
            other => {
                return Err(BacktestError::input(format!(
                    "unknown option type char '{other}' in ticker {ticker}"
                )))
            }
        };

        let strike_millis: i64 = strike_str
            .parse()
            .map_err(|e| BacktestError::input(format!("bad strike in ticker {ticker}: {e}")))?;
        let strike = strike_millis as f64 / 1000.0;

        Ok(OptionContract {
            ticker: ticker.to_string(),
            underlying,
            strike,
            expiry,
            option_type,
        })
    }
}

pub fn format_occ_ticker(underlying: &str, strike: f64, expiry: NaiveDate, option_type: OptionType) -> String {
    let yy = expiry.format("%y%m%d");
    let strike_scaled = (strike * 1000.0).round() as i64;
    format!("{underlying}{yy}{}{:08}", option_type.code(), strike_scaled)
}

/// The next monthly-style expiry at least `min_days` from `from`, landing on
/// the same day-of-month `from` has (a simple approximation of "third Friday
/// of the month" scheduling, adequate for backtests driving off arbitrary
/// historical expiries rather than a live listings calendar).
pub fn next_expiry_at_least(from: NaiveDate, min_days: i64) -> NaiveDate {
    from + Duration::days(min_days.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_ticker() {
        let expiry = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let contract = OptionContract::new("SPY", 450.0, expiry, OptionType::Call);
        assert_eq!(contract.ticker, "SPY240621C00450000");

        let parsed = OptionContract::parse(&contract.ticker).unwrap();
        assert_eq!(parsed.underlying, "SPY");
        assert_eq!(parsed.expiry, expiry);
        assert_eq!(parsed.option_type, OptionType::Call);
        assert!((parsed.strike - 450.0).abs() < 1e-9);
    }

    #[test]
    fn parses_put_with_fractional_strike() {
        let expiry = NaiveDate::from_ymd_opt(2023, 12, 15).unwrap();
        let contract = OptionContract::new("AAPL", 172.5, expiry, OptionType::Put);
        let parsed = OptionContract::parse(&contract.ticker).unwrap();
        assert_eq!(parsed.option_type, OptionType::Put);
        assert!((parsed.strike - 172.5).abs() < 1e-9);
    }

    #[test]
    fn rejects_malformed_ticker() {
        assert!(OptionContract::parse("garbage").is_err());
        assert!(OptionContract::parse("SPY").is_err());
    }

    #[test]
    fn time_to_expiry_floors_at_zero() {
        let expiry = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let contract = OptionContract::new("SPY", 100.0, expiry, OptionType::Call);
        let after = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(contract.time_to_expiry_years(after), 0.0);
    }
}
