use crate::core::series::{Point, normalize};
use crate::providers::{ProviderError, SeriesProvider, http_client};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Adapter for the CoinGecko bitcoin market chart. No API key; the
/// identifier is the quote currency ("usd", "krw", ...).
pub struct CoinGeckoProvider {
    base_url: String,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str) -> Self {
        CoinGeckoProvider {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct MarketChartResponse {
    // Rows are [epoch milliseconds, price].
    prices: Vec<(f64, f64)>,
}

#[async_trait]
impl SeriesProvider for CoinGeckoProvider {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    #[instrument(name = "CoinGeckoFetch", skip(self), fields(vs_currency = %identifier))]
    async fn fetch(&self, identifier: &str) -> Result<Vec<Point>, ProviderError> {
        let url = format!("{}/api/v3/coins/bitcoin/market_chart", self.base_url);
        debug!("Requesting market chart from {}", url);

        let client = http_client()?;
        let response = client
            .get(&url)
            .query(&[
                ("vs_currency", identifier),
                ("days", "1825"),
                ("interval", "daily"),
            ])
            .send()
            .await
            .map_err(|e| {
                ProviderError::Unavailable(format!("request error for BTC/{identifier}: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "HTTP {} for BTC/{identifier}",
                response.status()
            )));
        }

        let data = response.json::<MarketChartResponse>().await.map_err(|e| {
            ProviderError::Unavailable(format!(
                "failed to parse response for BTC/{identifier}: {e}"
            ))
        })?;

        let series = normalize(
            data.prices
                .into_iter()
                .map(|(ms, value)| Point::new((ms / 1000.0) as i64, value))
                .collect(),
        );
        if series.is_empty() {
            return Err(ProviderError::EmptyResult(format!(
                "no prices for BTC/{identifier}"
            )));
        }
        Ok(series)
    }
}
