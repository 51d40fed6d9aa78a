//! Currency pair model: an ordered (base, quote) conversion direction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RateError;

/// Ordered currency pair. Base is the account currency, quote is the
/// instrument currency; the pair defines the conversion direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    base: String,
    quote: String,
}

impl CurrencyPair {
    /// Build a pair from two currency codes, validating that each is a
    /// 3-letter alphabetic code. Codes are normalized to uppercase.
    pub fn new(base: &str, quote: &str) -> Result<Self, RateError> {
        Ok(Self {
            base: validate_code(base)?,
            quote: validate_code(quote)?,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// True when base and quote are the same currency; resolution
    /// short-circuits to a rate of 1.0 for these.
    pub fn is_identity(&self) -> bool {
        self.base == self.quote
    }

    /// The reverse conversion direction.
    pub fn inverted(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }

    /// Concatenated form used by the asset files, e.g. "EURUSD".
    pub fn code(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

fn validate_code(code: &str) -> Result<String, RateError> {
    let trimmed = code.trim();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(RateError::BadPair(format!(
            "currency code must be 3 letters, got {:?}",
            code
        )));
    }
    Ok(trimmed.to_ascii_uppercase())
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = RateError;

    /// Accepts "EURUSD" or "EUR/USD".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s.trim();
        if let Some((base, quote)) = cleaned.split_once('/') {
            return Self::new(base, quote);
        }
        if cleaned.len() == 6 {
            return Self::new(&cleaned[..3], &cleaned[3..]);
        }
        Err(RateError::BadPair(format!(
            "expected BASE/QUOTE or BASEQUOTE, got {:?}",
            s
        )))
    }
}
