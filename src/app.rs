//! Application controller: connectivity branching, worker scheduling,
//! and result delivery back to the display layer.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::api::{FloatRatesClient, FrankfurterClient};
use crate::assets::AssetCatalog;
use crate::config::EngineConfig;
use crate::connectivity;
use crate::models::{CurrencyPair, SizingRequest, SizingResult};
use crate::rates::{RateCache, RateResolver, Resolution};
use crate::runner::{Completions, TaskRunner};
use crate::sizing::PositionSizer;
use crate::snapshot::RateSnapshot;

/// Output of one scheduled job, delivered through the completion queue.
struct Completed {
    pair: CurrencyPair,
    resolved_from_network: bool,
    outcome: Result<(Resolution, Option<SizingResult>)>,
}

/// Owns the engine: one resolver, one bounded worker pool, one
/// completion queue drained here and nowhere else.
pub struct Controller {
    config: EngineConfig,
    catalog: AssetCatalog,
    resolver: Arc<RateResolver>,
    snapshot: RateSnapshot,
    runner: TaskRunner<Completed>,
    completions: Completions<Completed>,
}

impl Controller {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let catalog = match AssetCatalog::load(&config.assets_dir) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(error = %e, "Asset catalog unavailable; starting with an empty one");
                AssetCatalog::empty(&config.assets_dir)
            }
        };

        let primary = Arc::new(FrankfurterClient::new(&config)?);
        let secondary = Arc::new(FloatRatesClient::new(&config)?);
        let cache = RateCache::new(config.cache_ttl());
        let resolver = Arc::new(
            RateResolver::new(cache, primary, secondary, catalog.standard_pairs().clone())
                .with_stale_fallback(config.allow_stale),
        );

        let snapshot = RateSnapshot::load(&config.snapshot_path);
        let (runner, completions) = TaskRunner::new(config.worker_count);

        Ok(Self {
            config,
            catalog,
            resolver,
            snapshot,
            runner,
            completions,
        })
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &RateSnapshot {
        &self.snapshot
    }

    /// Probe connectivity. Cheap, never errors.
    pub async fn is_online(&self) -> bool {
        connectivity::is_online(&self.config.probe_addr, self.config.probe_timeout()).await
    }

    /// Size a position: resolve the pair's rate off the interactive
    /// context, run the calculation, and hand the result back here.
    pub async fn calculate(&mut self, request: SizingRequest) -> Result<SizingResult> {
        // Bad numbers are rejected before the probe or any fetch; the
        // error must read as invalid input, not as being offline.
        PositionSizer::validate_request(&request)?;
        self.require_rate_path(&request.pair, request.manual_rate)
            .await?;

        let resolver = self.resolver.clone();
        let manual = request.manual_rate;
        self.runner.submit(async move {
            let pair = request.pair.clone();
            let outcome = async {
                let resolution = resolver.resolve(&request.pair, manual).await?;
                let result =
                    PositionSizer::calculate(&request, resolution.rate, resolution.inverted)?;
                Ok((resolution, Some(result)))
            }
            .await;
            Completed {
                pair,
                resolved_from_network: manual.is_none(),
                outcome,
            }
        });

        let completed = self.next_completion().await?;
        let (resolution, result) = completed.outcome?;
        let result = result.context("sizing produced no result")?;

        if completed.resolved_from_network {
            self.remember_rate(&completed.pair, resolution.rate);
        }

        Ok(result)
    }

    /// Resolve a pair's rate without sizing anything.
    pub async fn resolve_rate(
        &mut self,
        pair: &CurrencyPair,
        manual: Option<Decimal>,
    ) -> Result<Resolution> {
        self.require_rate_path(pair, manual).await?;

        let resolver = self.resolver.clone();
        let pair_for_task = pair.clone();
        self.runner.submit(async move {
            let outcome = resolver
                .resolve(&pair_for_task, manual)
                .await
                .map(|resolution| (resolution, None))
                .map_err(Into::into);
            Completed {
                pair: pair_for_task,
                resolved_from_network: manual.is_none(),
                outcome,
            }
        });

        let completed = self.next_completion().await?;
        let (resolution, _) = completed.outcome?;

        if completed.resolved_from_network {
            self.remember_rate(&completed.pair, resolution.rate);
        }

        Ok(resolution)
    }

    /// Fire-and-forget resolve of every standard pair through the
    /// shared pool. Contends for the same slots as calculations but
    /// blocks nothing.
    pub fn prewarm(&self) {
        let pairs: Vec<CurrencyPair> = self.catalog.standard_pairs().iter().cloned().collect();
        info!(count = pairs.len(), "Pre-warming standard pairs");

        for pair in pairs {
            let resolver = self.resolver.clone();
            self.runner.submit_detached(async move {
                if let Err(e) = resolver.resolve(&pair, None).await {
                    warn!(pair = %pair, error = %e, "Pre-warm resolve failed");
                }
            });
        }
    }

    /// Wait for everything scheduled so far to finish. Pairs with
    /// [`Controller::prewarm`] in the one-shot CLI, where the process
    /// would otherwise exit under the sweep.
    pub async fn drain(&self) {
        self.runner.drain().await;
    }

    /// Number of pairs currently cached, stale entries included.
    pub async fn cached_rates(&self) -> usize {
        self.resolver.cache().len().await
    }

    /// Offline with no manual rate is a dead end; say so up front
    /// instead of burning the fetch timeout.
    async fn require_rate_path(
        &self,
        pair: &CurrencyPair,
        manual: Option<Decimal>,
    ) -> Result<()> {
        self.warn_unknown_currencies(pair);
        let needs_network = manual.is_none() && !pair.is_identity();
        if needs_network && !self.is_online().await {
            bail!("offline - no network connection; supply a manual rate and retry");
        }
        Ok(())
    }

    /// A code outside the catalog still resolves if a provider quotes
    /// it, so this only warns. An empty catalog knows nothing and stays
    /// quiet.
    fn warn_unknown_currencies(&self, pair: &CurrencyPair) {
        if self.catalog.currencies().is_empty() {
            return;
        }
        for code in [pair.base(), pair.quote()] {
            if !self.catalog.is_known_currency(code) {
                warn!(code, "Currency not in the local asset catalog");
            }
        }
    }

    async fn next_completion(&mut self) -> Result<Completed> {
        self.completions
            .next()
            .await
            .context("worker pool shut down")
    }

    fn remember_rate(&mut self, pair: &CurrencyPair, rate: Decimal) {
        if pair.is_identity() {
            return;
        }
        if let Err(e) = self.snapshot.record(pair, rate) {
            warn!(pair = %pair, error = %e, "Failed to persist rate snapshot");
        }
    }
}
