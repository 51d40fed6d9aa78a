//! Error taxonomy for rate resolution and position sizing.

use rust_decimal::Decimal;
use thiserror::Error;

/// Failure of a single provider fetch.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The provider responded but had no rate for the requested quote.
    /// Not worth retrying against the same provider.
    #[error("{provider} has no rate for {base}/{quote}")]
    NoRate {
        provider: &'static str,
        base: String,
        quote: String,
    },

    /// Network failure, timeout, or non-2xx status after retries.
    #[error("transport failure talking to {provider}: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },
}

impl SourceError {
    pub fn provider(&self) -> &'static str {
        match self {
            SourceError::NoRate { provider, .. } => provider,
            SourceError::Transport { provider, .. } => provider,
        }
    }
}

/// Failure of the full resolution chain.
#[derive(Debug, Error)]
pub enum RateError {
    /// Every source and the cache came up empty. The caller should
    /// prompt the operator for a manual rate.
    #[error("no rate available for {base}/{quote} from any source - enter a manual rate")]
    Unavailable { base: String, quote: String },

    #[error("invalid currency pair: {0}")]
    BadPair(String),

    /// Operator-supplied rate that is not a positive number.
    #[error("manual rate must be positive, got {0}")]
    BadManualRate(Decimal),
}

/// Rejected numeric input to the position sizer. Surfaced immediately,
/// no network involvement.
#[derive(Debug, Error)]
#[error("invalid input: {0}")]
pub struct InvalidInput(pub String);
