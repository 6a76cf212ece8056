use crate::core::series::{Point, normalize};
use crate::providers::{ProviderError, SeriesProvider, http_client};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use tracing::{debug, instrument};

/// Responses with this many points or fewer are treated as effectively
/// empty; thin Twelve Data results usually mean a wrong symbol match.
const MIN_USABLE_POINTS: usize = 10;

/// Adapter for the Twelve Data time-series API. Requires an API key; the
/// identifier is one candidate ticker (the orchestrator iterates aliases).
pub struct TwelveDataProvider {
    base_url: String,
    api_key: Option<String>,
}

impl TwelveDataProvider {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        TwelveDataProvider {
            base_url: base_url.to_string(),
            api_key,
        }
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Deserialize, Debug)]
struct TimeSeriesResponse {
    status: Option<String>,
    message: Option<String>,
    values: Option<Vec<TimeSeriesValue>>,
}

#[derive(Deserialize, Debug)]
struct TimeSeriesValue {
    datetime: Option<String>,
    // Twelve Data serializes numbers as strings.
    close: Option<String>,
}

fn parse_utc_timestamp(datetime: &str) -> Option<i64> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(datetime, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp());
    }
    NaiveDate::parse_from_str(datetime, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc().timestamp())
}

#[async_trait]
impl SeriesProvider for TwelveDataProvider {
    fn name(&self) -> &'static str {
        "twelvedata"
    }

    #[instrument(name = "TwelveDataFetch", skip(self), fields(symbol = %identifier))]
    async fn fetch(&self, identifier: &str) -> Result<Vec<Point>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::ConfigMissing("TWELVEDATA_API_KEY".to_string()))?;

        let url = format!("{}/time_series", self.base_url);
        debug!("Requesting time series from {}", url);

        let client = http_client()?;
        let response = client
            .get(&url)
            .query(&[
                ("symbol", identifier),
                ("interval", "1day"),
                ("outputsize", "5000"),
                ("timezone", "UTC"),
                ("apikey", api_key),
            ])
            .send()
            .await
            .map_err(|e| {
                ProviderError::Unavailable(format!("request error for {identifier}: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "HTTP {} for symbol {identifier}",
                response.status()
            )));
        }

        let data = response.json::<TimeSeriesResponse>().await.map_err(|e| {
            ProviderError::Unavailable(format!("failed to parse response for {identifier}: {e}"))
        })?;

        if data.status.as_deref() == Some("error") {
            return Err(ProviderError::Unavailable(
                data.message
                    .unwrap_or_else(|| format!("provider error for {identifier}")),
            ));
        }

        let points: Vec<Point> = data
            .values
            .unwrap_or_default()
            .iter()
            .filter_map(|v| {
                let time = v.datetime.as_deref().and_then(parse_utc_timestamp)?;
                let value = v.close.as_deref()?.parse::<f64>().ok()?;
                Some(Point::new(time, value))
            })
            .collect();
        let series = normalize(points);

        if series.len() <= MIN_USABLE_POINTS {
            return Err(ProviderError::EmptyResult(format!(
                "{identifier}: {} points, below threshold",
                series.len()
            )));
        }
        Ok(series)
    }
}
