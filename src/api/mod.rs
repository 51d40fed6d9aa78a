//! HTTP clients for the rate providers.

mod floatrates;
mod frankfurter;
mod types;

pub use floatrates::FloatRatesClient;
pub use frankfurter::FrankfurterClient;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

use crate::error::SourceError;

/// Statuses worth retrying: the remote may recover shortly.
const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Issue a GET, retrying transient failures up to `max_retries` times
/// with exponential backoff. Anything still failing afterwards
/// surfaces as a `Transport` error.
pub(crate) async fn get_with_retries(
    client: &Client,
    provider: &'static str,
    url: &str,
    max_retries: u32,
) -> Result<reqwest::Response, SourceError> {
    let mut policy = ExponentialBackoff {
        initial_interval: Duration::from_millis(250),
        max_interval: Duration::from_secs(2),
        max_elapsed_time: None,
        ..ExponentialBackoff::default()
    };

    let mut attempt = 0u32;
    loop {
        match client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                if !TRANSIENT_STATUSES.contains(&status.as_u16()) || attempt >= max_retries {
                    return Err(SourceError::Transport {
                        provider,
                        message: format!("HTTP {} from {}", status, url),
                    });
                }
                warn!(provider, status = status.as_u16(), attempt, "Retrying transient status");
            }
            Err(e) => {
                let transient = e.is_timeout() || e.is_connect();
                if !transient || attempt >= max_retries {
                    return Err(SourceError::Transport {
                        provider,
                        message: e.to_string(),
                    });
                }
                warn!(provider, error = %e, attempt, "Retrying transport error");
            }
        }

        attempt += 1;
        let delay = policy.next_backoff().unwrap_or(Duration::from_secs(2));
        tokio::time::sleep(delay).await;
    }
}
