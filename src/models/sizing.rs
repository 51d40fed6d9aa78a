//! Sizing request and result types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CurrencyPair;

/// One position sizing request. Constructed fresh per calculation,
/// immutable, discarded after use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingRequest {
    /// Account balance in the account currency
    pub account_balance: Decimal,

    /// Percentage of the balance to allocate, in (0, 100]
    pub allocation_pct: Decimal,

    /// Leverage multiplier, >= 1
    pub leverage: Decimal,

    /// Instrument price in the instrument currency
    pub instrument_price: Decimal,

    /// (account currency, instrument currency)
    pub pair: CurrencyPair,

    /// Operator-supplied rate; bypasses resolution entirely when set
    pub manual_rate: Option<Decimal>,
}

/// Output of one sizing calculation, handed to the display layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizingResult {
    /// Whole units of the instrument, floored toward zero
    pub quantity: u64,

    /// The exact rate applied (post-inversion)
    pub rate_used: Decimal,

    /// Whether the rate came from inverting the reverse pair
    pub inverted: bool,
}
