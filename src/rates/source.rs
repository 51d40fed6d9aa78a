//! Abstraction over a single rate provider.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::SourceError;

/// One named rate provider. A fetch is a single network round trip
/// (with transport-level retries); caching is the resolver's job, not
/// the source's.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Provider name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Fetch the base->quote rate. Fails with `NoRate` when the
    /// provider responded without the requested code, `Transport` for
    /// network/timeout/non-2xx failures.
    async fn fetch(&self, base: &str, quote: &str) -> Result<Decimal, SourceError>;
}
