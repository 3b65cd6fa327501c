// Fixed-point price handling. Providers send amounts as decimal strings;
// we normalize once to two decimals, rounding half-up, and keep minor
// units in integer arithmetic from there on.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),

    #[error("amount {0:?} out of range")]
    OutOfRange(String),
}

// Minor units at scale 2 (cents). Structural equality includes the
// currency, which makes Money usable directly in variant dedup keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    minor: i64,
    currency: String,
}

impl Money {
    // Parse a non-negative decimal string like "84.82", "12.345" or "120".
    // Rounding is half-up at the second decimal: 12.345 becomes 12.35.
    pub fn parse(raw: &str, currency: &str) -> Result<Self, MoneyError> {
        let trimmed = raw.trim();
        let (int_part, frac_part) = match trimmed.split_once('.') {
            Some((i, f)) => (i, f),
            None => (trimmed, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(MoneyError::InvalidAmount(raw.to_string()));
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(MoneyError::InvalidAmount(raw.to_string()));
        }

        let units: i64 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| MoneyError::OutOfRange(raw.to_string()))?
        };

        let mut digits = frac_part.bytes();
        let d1 = digits.next().map_or(0, |b| i64::from(b - b'0'));
        let d2 = digits.next().map_or(0, |b| i64::from(b - b'0'));
        // Half-up: the first dropped digit decides, so an exact midpoint
        // (third digit 5, nothing after) always rounds away from zero.
        let round_up = digits.next().map_or(false, |b| b >= b'5');
        let cents = d1 * 10 + d2 + i64::from(round_up);

        let minor = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(|| MoneyError::OutOfRange(raw.to_string()))?;

        Ok(Self {
            minor,
            currency: currency.to_string(),
        })
    }

    pub fn from_minor(minor: i64, currency: &str) -> Self {
        Self {
            minor,
            currency: currency.to_string(),
        }
    }

    pub fn minor(&self) -> i64 {
        self.minor
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    // Two-decimal string form, e.g. "12.35".
    pub fn amount(&self) -> String {
        format!("{}.{:02}", self.minor / 100, self.minor % 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount(), self.currency)
    }
}
