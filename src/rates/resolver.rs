//! Rate resolution: cache lookups, source fallback chain, inversion.

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::RateError;
use crate::models::CurrencyPair;

use super::{RateCache, RateSource};

/// A resolved exchange rate and whether it came from inverting the
/// reverse pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub rate: Decimal,
    pub inverted: bool,
}

impl Resolution {
    fn direct(rate: Decimal) -> Self {
        Self {
            rate,
            inverted: false,
        }
    }
}

/// Orchestrates cache lookup and the primary -> secondary ->
/// secondary-inverted fallback chain. Owns the cache: nothing else
/// writes to it.
pub struct RateResolver {
    cache: RateCache,
    primary: Arc<dyn RateSource>,
    secondary: Arc<dyn RateSource>,
    standard_pairs: HashSet<CurrencyPair>,
    allow_stale: bool,
}

impl RateResolver {
    pub fn new(
        cache: RateCache,
        primary: Arc<dyn RateSource>,
        secondary: Arc<dyn RateSource>,
        standard_pairs: HashSet<CurrencyPair>,
    ) -> Self {
        Self {
            cache,
            primary,
            secondary,
            standard_pairs,
            allow_stale: false,
        }
    }

    /// Serve a stale cache entry as a last resort when every source
    /// fails. Off by default; a stale value is never silently preferred
    /// over a fresh fetch.
    pub fn with_stale_fallback(mut self, allow: bool) -> Self {
        self.allow_stale = allow;
        self
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    /// Resolve `pair` to an exchange rate. A manual rate always wins;
    /// identity pairs short-circuit to 1.0 without touching the network.
    pub async fn resolve(
        &self,
        pair: &CurrencyPair,
        manual_rate: Option<Decimal>,
    ) -> Result<Resolution, RateError> {
        if let Some(rate) = manual_rate {
            if rate <= Decimal::ZERO {
                return Err(RateError::BadManualRate(rate));
            }
            debug!(pair = %pair, rate = %rate, "Using manual rate");
            return Ok(Resolution::direct(rate));
        }

        if pair.is_identity() {
            return Ok(Resolution::direct(Decimal::ONE));
        }

        if let Some(rate) = self.cache.get_fresh(pair).await {
            debug!(pair = %pair, rate = %rate, "Cache hit");
            return Ok(Resolution::direct(rate));
        }

        let reverse = pair.inverted();
        if let Some(rate) = self.cache.get_fresh(&reverse).await {
            debug!(pair = %pair, rate = %rate, "Reverse cache hit");
            return Ok(Resolution {
                rate: Decimal::ONE / rate,
                inverted: true,
            });
        }

        // Prefer the direction listed as a standard pair; blind
        // inversion only for the other direction.
        let query = if self.standard_pairs.contains(pair) {
            pair.clone()
        } else if self.standard_pairs.contains(&reverse) {
            reverse.clone()
        } else {
            pair.clone()
        };

        match self.run_chain(&query).await {
            Some((fetched_pair, fetched_rate)) => {
                if fetched_pair == *pair {
                    Ok(Resolution::direct(fetched_rate))
                } else {
                    Ok(Resolution {
                        rate: Decimal::ONE / fetched_rate,
                        inverted: true,
                    })
                }
            }
            None => self.stale_fallback(pair, &reverse).await,
        }
    }

    /// Primary for the queried pair, then secondary, then secondary for
    /// the reverse pair. The first success is cached under the pair that
    /// was actually queried and returned as (queried pair, raw rate).
    async fn run_chain(&self, query: &CurrencyPair) -> Option<(CurrencyPair, Decimal)> {
        match self.primary.fetch(query.base(), query.quote()).await {
            Ok(rate) => {
                self.cache.put(query.clone(), rate).await;
                return Some((query.clone(), rate));
            }
            Err(e) => {
                warn!(pair = %query, source = e.provider(), error = %e, "Primary source failed");
            }
        }

        match self.secondary.fetch(query.base(), query.quote()).await {
            Ok(rate) => {
                self.cache.put(query.clone(), rate).await;
                return Some((query.clone(), rate));
            }
            Err(e) => {
                warn!(pair = %query, source = e.provider(), error = %e, "Secondary source failed");
            }
        }

        let reverse = query.inverted();
        match self.secondary.fetch(reverse.base(), reverse.quote()).await {
            Ok(rate) => {
                self.cache.put(reverse.clone(), rate).await;
                Some((reverse, rate))
            }
            Err(e) => {
                warn!(pair = %reverse, source = e.provider(), error = %e, "Inverted fallback failed");
                None
            }
        }
    }

    async fn stale_fallback(
        &self,
        pair: &CurrencyPair,
        reverse: &CurrencyPair,
    ) -> Result<Resolution, RateError> {
        if self.allow_stale {
            if let Some(rate) = self.cache.get_any(pair).await {
                info!(pair = %pair, rate = %rate, "Serving stale cached rate");
                return Ok(Resolution::direct(rate));
            }
            if let Some(rate) = self.cache.get_any(reverse).await {
                info!(pair = %pair, rate = %rate, "Serving stale reverse cached rate");
                return Ok(Resolution {
                    rate: Decimal::ONE / rate,
                    inverted: true,
                });
            }
        }

        Err(RateError::Unavailable {
            base: pair.base().to_string(),
            quote: pair.quote().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use crate::error::SourceError;

    /// Scripted source: serves a fixed rate table and counts calls.
    struct StubSource {
        name: &'static str,
        rates: HashMap<(String, String), Decimal>,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new(name: &'static str, entries: &[(&str, &str, Decimal)]) -> Arc<Self> {
            let rates = entries
                .iter()
                .map(|(b, q, r)| ((b.to_string(), q.to_string()), *r))
                .collect();
            Arc::new(Self {
                name,
                rates,
                calls: AtomicUsize::new(0),
            })
        }

        fn empty(name: &'static str) -> Arc<Self> {
            Self::new(name, &[])
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateSource for StubSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, base: &str, quote: &str) -> Result<Decimal, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rates
                .get(&(base.to_string(), quote.to_string()))
                .copied()
                .ok_or(SourceError::NoRate {
                    provider: self.name,
                    base: base.to_string(),
                    quote: quote.to_string(),
                })
        }
    }

    fn pair(base: &str, quote: &str) -> CurrencyPair {
        CurrencyPair::new(base, quote).unwrap()
    }

    fn resolver(
        primary: Arc<StubSource>,
        secondary: Arc<StubSource>,
        standard: &[&str],
    ) -> RateResolver {
        let standard_pairs = standard
            .iter()
            .map(|s| s.parse::<CurrencyPair>().unwrap())
            .collect();
        RateResolver::new(
            RateCache::new(Duration::from_secs(300)),
            primary,
            secondary,
            standard_pairs,
        )
    }

    #[tokio::test]
    async fn test_identity_pair_never_hits_network() {
        let primary = StubSource::empty("primary");
        let secondary = StubSource::empty("secondary");
        let r = resolver(primary.clone(), secondary.clone(), &[]);

        let res = r.resolve(&pair("USD", "USD"), None).await.unwrap();
        assert_eq!(res.rate, Decimal::ONE);
        assert!(!res.inverted);
        assert_eq!(primary.call_count(), 0);
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_manual_rate_overrides_cache_and_network() {
        let primary = StubSource::new("primary", &[("EUR", "USD", dec!(1.08))]);
        let secondary = StubSource::empty("secondary");
        let r = resolver(primary.clone(), secondary.clone(), &[]);

        let eurusd = pair("EUR", "USD");
        r.cache().put(eurusd.clone(), dec!(1.05)).await;

        let res = r.resolve(&eurusd, Some(dec!(1.2345))).await.unwrap();
        assert_eq!(res.rate, dec!(1.2345));
        assert!(!res.inverted);
        assert_eq!(primary.call_count(), 0);
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_positive_manual_rate_rejected() {
        let primary = StubSource::new("primary", &[("EUR", "USD", dec!(1.08))]);
        let secondary = StubSource::empty("secondary");
        let r = resolver(primary.clone(), secondary.clone(), &[]);

        let err = r
            .resolve(&pair("EUR", "USD"), Some(dec!(-2)))
            .await
            .unwrap_err();
        assert!(matches!(err, RateError::BadManualRate(_)));

        let err = r
            .resolve(&pair("EUR", "USD"), Some(Decimal::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, RateError::BadManualRate(_)));

        // A rejected manual rate must not fall through to the sources.
        assert_eq!(primary.call_count(), 0);
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_second_resolve_within_ttl_is_a_cache_hit() {
        let primary = StubSource::new("primary", &[("EUR", "USD", dec!(1.08))]);
        let secondary = StubSource::empty("secondary");
        let r = resolver(primary.clone(), secondary.clone(), &[]);

        let eurusd = pair("EUR", "USD");
        let first = r.resolve(&eurusd, None).await.unwrap();
        let second = r.resolve(&eurusd, None).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_fresh_fetch() {
        let primary = StubSource::new("primary", &[("EUR", "USD", dec!(1.08))]);
        let secondary = StubSource::empty("secondary");
        let standard_pairs = HashSet::new();
        let r = RateResolver::new(
            RateCache::new(Duration::from_millis(40)),
            primary.clone(),
            secondary,
            standard_pairs,
        );

        let eurusd = pair("EUR", "USD");
        r.resolve(&eurusd, None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        r.resolve(&eurusd, None).await.unwrap();

        assert_eq!(primary.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fresh_reverse_cache_entry_is_inverted() {
        let primary = StubSource::empty("primary");
        let secondary = StubSource::empty("secondary");
        let r = resolver(primary.clone(), secondary.clone(), &[]);

        r.cache().put(pair("USD", "EUR"), dec!(0.8)).await;

        let res = r.resolve(&pair("EUR", "USD"), None).await.unwrap();
        assert_eq!(res.rate, dec!(1.25));
        assert!(res.inverted);
        assert_eq!(primary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_secondary_fallback_on_primary_failure() {
        let primary = StubSource::empty("primary");
        let secondary = StubSource::new("secondary", &[("GBP", "JPY", dec!(190.5))]);
        let r = resolver(primary.clone(), secondary.clone(), &[]);

        let res = r.resolve(&pair("GBP", "JPY"), None).await.unwrap();
        assert_eq!(res.rate, dec!(190.5));
        assert!(!res.inverted);
        assert_eq!(primary.call_count(), 1);
        assert_eq!(secondary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_inverted_fallback_when_only_reverse_resolvable() {
        let primary = StubSource::empty("primary");
        let secondary = StubSource::new("secondary", &[("USD", "EUR", dec!(0.8))]);
        let r = resolver(primary.clone(), secondary.clone(), &[]);

        let res = r.resolve(&pair("EUR", "USD"), None).await.unwrap();
        assert_eq!(res.rate, dec!(1.25));
        assert!(res.inverted);

        // Cached under the queried pair, so the reverse request is now
        // a direct cache hit and the two rates multiply to one.
        let back = r.resolve(&pair("USD", "EUR"), None).await.unwrap();
        assert!(!back.inverted);
        assert_eq!(res.rate * back.rate, Decimal::ONE);
    }

    #[tokio::test]
    async fn test_standard_pair_direction_preferred() {
        // Only USD/THB is a standard pair; a THB/USD request should
        // query USD/THB and invert.
        let primary = StubSource::new("primary", &[("USD", "THB", dec!(32))]);
        let secondary = StubSource::empty("secondary");
        let r = resolver(primary.clone(), secondary.clone(), &["USDTHB"]);

        let res = r.resolve(&pair("THB", "USD"), None).await.unwrap();
        assert!(res.inverted);
        assert_eq!(res.rate, dec!(0.03125));
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_unavailable_not_one() {
        let primary = StubSource::empty("primary");
        let secondary = StubSource::empty("secondary");
        let r = resolver(primary.clone(), secondary.clone(), &[]);

        let err = r.resolve(&pair("EUR", "USD"), None).await.unwrap_err();
        assert!(matches!(err, RateError::Unavailable { .. }));
        // Full chain: primary direct, secondary direct, secondary inverted.
        assert_eq!(primary.call_count(), 1);
        assert_eq!(secondary.call_count(), 2);
    }

    #[tokio::test]
    async fn test_stale_fallback_only_when_enabled() {
        let primary = StubSource::empty("primary");
        let secondary = StubSource::empty("secondary");

        let cache = RateCache::new(Duration::from_millis(10));
        let eurusd = pair("EUR", "USD");
        cache.put(eurusd.clone(), dec!(1.07)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        let strict = RateResolver::new(
            cache.clone(),
            primary.clone(),
            secondary.clone(),
            HashSet::new(),
        );
        assert!(strict.resolve(&eurusd, None).await.is_err());

        let lenient = RateResolver::new(cache, primary, secondary, HashSet::new())
            .with_stale_fallback(true);
        let res = lenient.resolve(&eurusd, None).await.unwrap();
        assert_eq!(res.rate, dec!(1.07));
        assert!(!res.inverted);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_cache() {
        let primary = StubSource::new("primary", &[("EUR", "USD", dec!(1.08))]);
        let secondary = StubSource::empty("secondary");
        let r = Arc::new(resolver(primary.clone(), secondary, &[]));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let r = r.clone();
            handles.push(tokio::spawn(async move {
                r.resolve(&pair("EUR", "USD"), None).await.unwrap()
            }));
        }
        for h in handles {
            let res = h.await.unwrap();
            assert_eq!(res.rate, dec!(1.08));
        }

        // No torn state: exactly one entry, and every resolve saw the
        // same value. Overlapping fetches may each have hit the source.
        assert_eq!(r.cache().len().await, 1);
    }
}
