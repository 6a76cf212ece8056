//! HTTP adapters, one per external data provider.

pub mod chart;
pub mod coingecko;
pub mod frankfurter;
pub mod twelvedata;

use crate::core::series::Point;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Fixed timeout applied to every external call; no call blocks indefinitely.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure of a single provider attempt. Recovered at the orchestrator
/// boundary; never aborts the batch.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network failure, timeout, non-2xx status or unparseable payload.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    /// Parsed fine but no usable points, or below the adapter's sufficiency
    /// threshold.
    #[error("no usable data: {0}")]
    EmptyResult(String),
    /// A required API key or setting is absent; the provider family is
    /// skipped.
    #[error("missing configuration: {0}")]
    ConfigMissing(String),
}

/// Uniform adapter contract: fetch a normalized point series for one
/// provider-specific identifier, or fail with a `ProviderError`.
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, identifier: &str) -> Result<Vec<Point>, ProviderError>;
}

pub(crate) fn http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .user_agent("mmdash/1.0")
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::Unavailable(format!("failed to build HTTP client: {e}")))
}
