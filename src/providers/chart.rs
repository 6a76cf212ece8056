use crate::core::series::{Point, normalize};
use crate::providers::{ProviderError, SeriesProvider, http_client};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Adapter for the Yahoo-style historical chart API, the last resort for
/// equities and indices. Tries each mirrored host in order before failing.
pub struct ChartProvider {
    hosts: Vec<String>,
}

impl ChartProvider {
    pub fn new(hosts: Vec<String>) -> Self {
        ChartProvider { hosts }
    }
}

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Vec<ChartItem>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

async fn fetch_from_host(host: &str, symbol: &str) -> Result<Vec<Point>, ProviderError> {
    let url = format!("{host}/v8/finance/chart/{symbol}?range=5y&interval=1d");
    debug!("Requesting chart data from {}", url);

    let client = http_client()?;
    let response = client.get(&url).send().await.map_err(|e| {
        ProviderError::Unavailable(format!("request error for {symbol} at {host}: {e}"))
    })?;

    if !response.status().is_success() {
        return Err(ProviderError::Unavailable(format!(
            "HTTP {} for symbol {symbol} at {host}",
            response.status()
        )));
    }

    let data = response.json::<ChartResponse>().await.map_err(|e| {
        ProviderError::Unavailable(format!("failed to parse chart for {symbol}: {e}"))
    })?;

    let item = data
        .chart
        .result
        .first()
        .ok_or_else(|| ProviderError::EmptyResult(format!("empty chart for {symbol} at {host}")))?;

    let timestamps = item.timestamp.as_deref().unwrap_or_default();
    let closes = item
        .indicators
        .as_ref()
        .and_then(|inds| inds.quote.first())
        .and_then(|q| q.close.as_deref())
        .unwrap_or_default();

    let points: Vec<Point> = timestamps
        .iter()
        .zip(closes.iter())
        .filter_map(|(t, close)| close.map(|value| Point::new(*t, value)))
        .collect();
    let series = normalize(points);

    if series.is_empty() {
        return Err(ProviderError::EmptyResult(format!(
            "no closes for {symbol} at {host}"
        )));
    }
    Ok(series)
}

#[async_trait]
impl SeriesProvider for ChartProvider {
    fn name(&self) -> &'static str {
        "chart"
    }

    #[instrument(name = "ChartFetch", skip(self), fields(symbol = %identifier))]
    async fn fetch(&self, identifier: &str) -> Result<Vec<Point>, ProviderError> {
        let mut last_err: Option<ProviderError> = None;
        for host in &self.hosts {
            match fetch_from_host(host, identifier).await {
                Ok(series) => return Ok(series),
                Err(e) => {
                    debug!("Chart host {} failed: {}", host, e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| ProviderError::ConfigMissing("no chart hosts".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CHART_JSON: &str = r#"{
        "chart": {
            "result": [{
                "timestamp": [1700000000, 1700086400, 1700172800],
                "indicators": {
                    "quote": [{
                        "close": [100.0, null, 102.5]
                    }]
                }
            }]
        }
    }"#;

    async fn create_mock_server(symbol: &str, response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v8/finance/chart/{symbol}")))
            .respond_with(response)
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_successful_fetch_skips_null_closes() {
        let mock_server =
            create_mock_server("IXIC", ResponseTemplate::new(200).set_body_string(CHART_JSON))
                .await;
        let provider = ChartProvider::new(vec![mock_server.uri()]);

        let series = provider.fetch("IXIC").await.unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0], Point::new(1_700_000_000, 100.0));
        assert_eq!(series[1], Point::new(1_700_172_800, 102.5));
    }

    #[tokio::test]
    async fn test_second_host_used_when_first_fails() {
        let bad_server = create_mock_server("IXIC", ResponseTemplate::new(500)).await;
        let good_server =
            create_mock_server("IXIC", ResponseTemplate::new(200).set_body_string(CHART_JSON))
                .await;
        let provider = ChartProvider::new(vec![bad_server.uri(), good_server.uri()]);

        let series = provider.fetch("IXIC").await.unwrap();
        assert_eq!(series.len(), 2);
    }

    #[tokio::test]
    async fn test_all_hosts_fail_surfaces_last_error() {
        let first = create_mock_server("IXIC", ResponseTemplate::new(500)).await;
        let second = create_mock_server(
            "IXIC",
            ResponseTemplate::new(200).set_body_string(r#"{"chart": {"result": []}}"#),
        )
        .await;
        let provider = ChartProvider::new(vec![first.uri(), second.uri()]);

        let err = provider.fetch("IXIC").await.unwrap_err();
        // The later host's empty-chart error wins over the earlier 500.
        assert!(matches!(err, ProviderError::EmptyResult(_)));
    }
}
