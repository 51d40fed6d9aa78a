//! In-memory rate cache with a freshness window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::models::CurrencyPair;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    rate: Decimal,
    fetched_at: Instant,
}

/// Thread-safe pair -> rate cache. Entries past the TTL are stale but
/// not erased; they stay readable through [`RateCache::get_any`] for
/// last-resort fallback and are overwritten lazily on the next
/// successful fetch. Overlapping writes for the same pair are
/// last-writer-wins.
#[derive(Debug, Clone)]
pub struct RateCache {
    inner: Arc<RwLock<HashMap<CurrencyPair, CacheEntry>>>,
    ttl: Duration,
}

impl RateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// The cached rate for `pair`, only if still within the TTL.
    pub async fn get_fresh(&self, pair: &CurrencyPair) -> Option<Decimal> {
        let map = self.inner.read().await;
        map.get(pair).and_then(|entry| {
            if entry.fetched_at.elapsed() < self.ttl {
                Some(entry.rate)
            } else {
                None
            }
        })
    }

    /// The cached rate regardless of freshness. Callers must prefer a
    /// fresh fetch; this exists only for explicit stale fallback.
    pub async fn get_any(&self, pair: &CurrencyPair) -> Option<Decimal> {
        let map = self.inner.read().await;
        map.get(pair).map(|entry| entry.rate)
    }

    /// Store a rate for `pair`, overwriting any previous entry.
    pub async fn put(&self, pair: CurrencyPair, rate: Decimal) {
        let mut map = self.inner.write().await;
        map.insert(
            pair,
            CacheEntry {
                rate,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Number of entries, stale ones included.
    pub async fn len(&self) -> usize {
        let map = self.inner.read().await;
        map.len()
    }
}
