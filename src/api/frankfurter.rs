//! Primary rate provider: Frankfurter.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::SourceError;
use crate::rates::RateSource;

use super::types::LatestRatesResponse;

const SOURCE_NAME: &str = "frankfurter";

/// Client for the Frankfurter API: `GET /latest?from=BASE&to=QUOTE`,
/// rates keyed by uppercase quote code.
pub struct FrankfurterClient {
    client: Client,
    base_url: String,
    retries: u32,
}

impl FrankfurterClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.primary_url.clone(),
            retries: config.fetch_retries,
        })
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(config: &EngineConfig, base_url: String) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.base_url = base_url;
        Ok(client)
    }

    /// Fetch the full currency list, code -> display name. Used by the
    /// asset sync, not by rate resolution.
    pub async fn get_currencies(&self) -> Result<HashMap<String, String>, SourceError> {
        let url = format!("{}/currencies", self.base_url);
        debug!(url = %url, "Fetching currency list");

        let response =
            super::get_with_retries(&self.client, SOURCE_NAME, &url, self.retries).await?;

        response
            .json()
            .await
            .map_err(|e| SourceError::Transport {
                provider: SOURCE_NAME,
                message: format!("bad currencies payload: {}", e),
            })
    }
}

#[async_trait]
impl RateSource for FrankfurterClient {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self, base: &str, quote: &str) -> Result<Decimal, SourceError> {
        let url = format!("{}/latest?from={}&to={}", self.base_url, base, quote);
        debug!(url = %url, "Fetching rate");

        let response =
            super::get_with_retries(&self.client, SOURCE_NAME, &url, self.retries).await?;

        let payload: LatestRatesResponse =
            response.json().await.map_err(|e| SourceError::Transport {
                provider: SOURCE_NAME,
                message: format!("bad rates payload: {}", e),
            })?;

        // The remote answered; a missing or non-positive rate means it
        // simply does not quote this pair.
        match payload.rates.get(quote) {
            Some(rate) if *rate > Decimal::ZERO => Ok(*rate),
            _ => Err(SourceError::NoRate {
                provider: SOURCE_NAME,
                base: base.to_string(),
                quote: quote.to_string(),
            }),
        }
    }
}
