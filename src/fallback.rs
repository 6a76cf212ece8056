//! Per-instrument provider fallback: an ordered attempt list folded until
//! the first sufficient series.

use crate::core::config::AppConfig;
use crate::core::instrument::{InstrumentKind, InstrumentSpec};
use crate::core::series::Point;
use crate::providers::chart::ChartProvider;
use crate::providers::coingecko::CoinGeckoProvider;
use crate::providers::frankfurter::FrankfurterProvider;
use crate::providers::twelvedata::TwelveDataProvider;
use crate::providers::{ProviderError, SeriesProvider};
use tracing::debug;

/// Builds and runs the attempt chain for each instrument. Cheapest/most
/// specific providers go first; every attempt is tried exactly once per run,
/// with no retries or backoff.
pub struct Orchestrator {
    twelvedata: TwelveDataProvider,
    coingecko: CoinGeckoProvider,
    frankfurter: FrankfurterProvider,
    chart: ChartProvider,
}

impl Orchestrator {
    pub fn new(config: &AppConfig) -> Self {
        Orchestrator {
            twelvedata: TwelveDataProvider::new(
                config.providers.twelvedata_base_url(),
                config.twelvedata_key(),
            ),
            coingecko: CoinGeckoProvider::new(config.providers.coingecko_base_url()),
            frankfurter: FrankfurterProvider::new(config.providers.frankfurter_base_url()),
            chart: ChartProvider::new(config.providers.chart_hosts()),
        }
    }

    /// Ordered (adapter, identifier) attempts for one instrument: the keyed
    /// time-series provider over its aliases first (skipped entirely when no
    /// key is configured), then the kind-specific fallbacks.
    fn attempts(&self, spec: &InstrumentSpec) -> Vec<(&dyn SeriesProvider, String)> {
        let mut attempts: Vec<(&dyn SeriesProvider, String)> = Vec::new();

        if self.twelvedata.has_key() {
            for alias in &spec.aliases {
                attempts.push((&self.twelvedata, alias.clone()));
            }
        }

        match spec.kind {
            InstrumentKind::Index => {
                if let Some(symbol) = &spec.symbol {
                    attempts.push((&self.chart, symbol.clone()));
                }
            }
            InstrumentKind::Crypto => {
                if let Some(vs) = spec.quote_currency() {
                    attempts.push((&self.coingecko, vs));
                }
                if let Some(symbol) = &spec.symbol {
                    attempts.push((&self.chart, symbol.clone()));
                }
            }
            InstrumentKind::Fx => {
                attempts.push((&self.frankfurter, spec.key.clone()));
            }
            InstrumentKind::Derived => {}
        }

        attempts
    }

    /// Returns the first series that satisfied its adapter's sufficiency
    /// threshold, or the last error encountered across the chain. Earlier
    /// errors are discarded, not aggregated.
    pub async fn fetch_instrument(
        &self,
        spec: &InstrumentSpec,
    ) -> Result<Vec<Point>, ProviderError> {
        let attempts = self.attempts(spec);
        let mut last_err: Option<ProviderError> = None;

        for (provider, identifier) in attempts {
            debug!(
                "Trying {} for {} with identifier {}",
                provider.name(),
                spec.key,
                identifier
            );
            match provider.fetch(&identifier).await {
                Ok(series) => return Ok(series),
                Err(e) => {
                    debug!("{} failed for {}: {}", provider.name(), spec.key, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ProviderError::ConfigMissing(format!("no provider configured for {}", spec.key))
        }))
    }
}
