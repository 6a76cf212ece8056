use crate::core::series::{Point, normalize};
use crate::providers::{ProviderError, SeriesProvider, http_client};
use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

const WINDOW_DAYS: u64 = 1825;

/// Adapter for the Frankfurter currency-rate API. No API key; the identifier
/// is a `BASE/QUOTE` pair such as "USD/KRW".
pub struct FrankfurterProvider {
    base_url: String,
}

impl FrankfurterProvider {
    pub fn new(base_url: &str) -> Self {
        FrankfurterProvider {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct RatesRangeResponse {
    // Date-keyed map; BTreeMap keeps days ascending.
    rates: BTreeMap<NaiveDate, HashMap<String, f64>>,
}

#[async_trait]
impl SeriesProvider for FrankfurterProvider {
    fn name(&self) -> &'static str {
        "frankfurter"
    }

    #[instrument(name = "FrankfurterFetch", skip(self), fields(pair = %identifier))]
    async fn fetch(&self, identifier: &str) -> Result<Vec<Point>, ProviderError> {
        let (base, quote) = identifier.split_once('/').ok_or_else(|| {
            ProviderError::ConfigMissing(format!("invalid currency pair: {identifier}"))
        })?;

        let end = Utc::now().date_naive();
        let start = end.checked_sub_days(Days::new(WINDOW_DAYS)).ok_or_else(|| {
            ProviderError::Unavailable(format!("date window underflow for {identifier}"))
        })?;

        let url = format!("{}/{}..{}", self.base_url, start, end);
        debug!("Requesting rate range from {}", url);

        let client = http_client()?;
        let response = client
            .get(&url)
            .query(&[("from", base), ("to", quote)])
            .send()
            .await
            .map_err(|e| {
                ProviderError::Unavailable(format!("request error for {identifier}: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "HTTP {} for pair {identifier}",
                response.status()
            )));
        }

        let data = response.json::<RatesRangeResponse>().await.map_err(|e| {
            ProviderError::Unavailable(format!("failed to parse response for {identifier}: {e}"))
        })?;

        let points: Vec<Point> = data
            .rates
            .iter()
            .filter_map(|(day, rates)| {
                let value = rates.get(quote)?;
                let time = day.and_time(NaiveTime::MIN).and_utc().timestamp();
                Some(Point::new(time, *value))
            })
            .collect();
        let series = normalize(points);

        if series.is_empty() {
            return Err(ProviderError::EmptyResult(format!(
                "no rates for {identifier}"
            )));
        }
        Ok(series)
    }
}
