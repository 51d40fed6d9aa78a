//! Fallback rate provider: floatrates.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::SourceError;
use crate::rates::RateSource;

use super::types::DailyRateEntry;

const SOURCE_NAME: &str = "floatrates";

/// Client for floatrates daily files: one JSON document per base
/// currency, keyed by lowercase quote code.
pub struct FloatRatesClient {
    client: Client,
    base_url: String,
    retries: u32,
}

impl FloatRatesClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.fallback_url.clone(),
            retries: config.fetch_retries,
        })
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(config: &EngineConfig, base_url: String) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.base_url = base_url;
        Ok(client)
    }
}

#[async_trait]
impl RateSource for FloatRatesClient {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self, base: &str, quote: &str) -> Result<Decimal, SourceError> {
        let url = format!("{}/daily/{}.json", self.base_url, base.to_ascii_lowercase());
        debug!(url = %url, "Fetching daily rates file");

        let response =
            super::get_with_retries(&self.client, SOURCE_NAME, &url, self.retries).await?;

        let payload: HashMap<String, DailyRateEntry> =
            response.json().await.map_err(|e| SourceError::Transport {
                provider: SOURCE_NAME,
                message: format!("bad daily payload: {}", e),
            })?;

        match payload.get(&quote.to_ascii_lowercase()) {
            Some(entry) if entry.rate > Decimal::ZERO => Ok(entry.rate),
            _ => Err(SourceError::NoRate {
                provider: SOURCE_NAME,
                base: base.to_string(),
                quote: quote.to_string(),
            }),
        }
    }
}
