use std::fs;
use tracing::info;

use mmdash::report::MarketReport;
use mmdash::store::HistoryStore;

mod test_utils {
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Frankfurter-style mock answering both legs of the test basket.
    pub async fn create_fx_mock_server() -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("from", "USD"))
            .and(query_param("to", "KRW"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"rates": {"2023-11-14": {"KRW": 1300.0}, "2023-11-15": {"KRW": 1310.0}}}"#,
            ))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(query_param("from", "USD"))
            .and(query_param("to", "THB"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"rates": {"2023-11-14": {"THB": 35.0}, "2023-11-15": {"THB": 36.0}}}"#,
            ))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub async fn create_dead_server() -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;
        mock_server
    }

    pub fn write_config(
        config_path: &std::path::Path,
        data_dir: &std::path::Path,
        frankfurter_url: &str,
        chart_hosts: &[String],
        instruments_yaml: &str,
    ) {
        let hosts = chart_hosts
            .iter()
            .map(|h| format!("      - \"{h}\""))
            .collect::<Vec<_>>()
            .join("\n");
        let chart_block = if chart_hosts.is_empty() {
            String::new()
        } else {
            format!("  chart:\n    hosts:\n{hosts}\n")
        };
        let config_content = format!(
            r#"
providers:
  frankfurter:
    base_url: "{frankfurter_url}"
{chart_block}
instruments:
{instruments_yaml}
data_path: "{}"
"#,
            data_dir.display()
        );
        std::fs::write(config_path, config_content).expect("Failed to write config file");
    }
}

const FX_BASKET: &str = r#"  - key: "USD/KRW"
    label: "USD/KRW"
    kind: fx
  - key: "USD/THB"
    label: "USD/THB"
    kind: fx
  - key: "THB/KRW"
    label: "THB/KRW"
    kind: derived
    numerator: "USD/KRW"
    denominator: "USD/THB""#;

#[test_log::test(tokio::test)]
async fn test_full_update_flow_with_mock() {
    let fx_server = test_utils::create_fx_mock_server().await;

    let data_dir = tempfile::tempdir().expect("Failed to create data dir");
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    test_utils::write_config(
        config_file.path(),
        data_dir.path(),
        &fx_server.uri(),
        &[],
        FX_BASKET,
    );

    let result = mmdash::run_command(
        mmdash::AppCommand::Update,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Update failed with: {:?}", result.err());

    let snapshot_raw = fs::read_to_string(data_dir.path().join("market.json"))
        .expect("Snapshot file not written");
    let report: MarketReport = serde_json::from_str(&snapshot_raw).expect("Bad snapshot JSON");
    info!(?report.errors, "Snapshot loaded");

    assert!(report.errors.is_empty());
    assert_eq!(report.items.len(), 3);

    let usdkrw = report.items.iter().find(|i| i.key == "USD/KRW").unwrap();
    assert_eq!(usdkrw.price, Some(1310.0));
    let dod = usdkrw.dod.expect("dod missing");
    assert!((dod - 0.769).abs() < 0.01, "dod was {dod}");
    assert_eq!(usdkrw.raw_point_count, 2);

    // Cross rate built over the exact timestamp intersection of both legs.
    let thbkrw = report.items.iter().find(|i| i.key == "THB/KRW").unwrap();
    assert_eq!(thbkrw.raw_point_count, 2);
    let cross = thbkrw.price.expect("derived price missing");
    assert!((cross - 1310.0 / 36.0).abs() < 1e-9);

    // History was seeded from the fetched series plus today's point.
    let history = HistoryStore::load(&data_dir.path().join("history.json"));
    let usdkrw_history = history.series.get("USD/KRW").expect("no USD/KRW history");
    assert_eq!(usdkrw_history.len(), 3);
    assert_eq!(usdkrw_history.last().unwrap().value, 1310.0);
    assert!(usdkrw_history.windows(2).all(|w| w[0].time < w[1].time));

    // News key is not configured in this test; the file is still written.
    let news_raw =
        fs::read_to_string(data_dir.path().join("news.json")).expect("News file not written");
    let news: serde_json::Value = serde_json::from_str(&news_raw).unwrap();
    assert_eq!(news["key_configured"], serde_json::Value::Bool(false));
}

#[test_log::test(tokio::test)]
async fn test_rerun_same_day_is_idempotent() {
    let fx_server = test_utils::create_fx_mock_server().await;

    let data_dir = tempfile::tempdir().expect("Failed to create data dir");
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    test_utils::write_config(
        config_file.path(),
        data_dir.path(),
        &fx_server.uri(),
        &[],
        FX_BASKET,
    );
    let config_path = config_file.path().to_str().unwrap().to_string();

    mmdash::run_command(mmdash::AppCommand::Update, Some(&config_path))
        .await
        .expect("First run failed");
    let first = HistoryStore::load(&data_dir.path().join("history.json"));

    mmdash::run_command(mmdash::AppCommand::Update, Some(&config_path))
        .await
        .expect("Second run failed");
    let second = HistoryStore::load(&data_dir.path().join("history.json"));

    // Same UTC day, same prices: no new points on any instrument.
    for (key, series) in &first.series {
        assert_eq!(
            series.len(),
            second.series.get(key).map_or(0, Vec::len),
            "series length changed for {key}"
        );
    }
    assert_eq!(
        first.series.get("USD/KRW").unwrap(),
        second.series.get("USD/KRW").unwrap()
    );
}

#[test_log::test(tokio::test)]
async fn test_all_providers_failing_still_writes_files() {
    let dead_server = test_utils::create_dead_server().await;

    let data_dir = tempfile::tempdir().expect("Failed to create data dir");
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let instruments = r#"  - key: "NASDAQ"
    label: "NASDAQ"
    kind: index
    symbol: "^IXIC"
  - key: "USD/KRW"
    label: "USD/KRW"
    kind: fx"#;
    test_utils::write_config(
        config_file.path(),
        data_dir.path(),
        &dead_server.uri(),
        &[dead_server.uri()],
        instruments,
    );

    let result = mmdash::run_command(
        mmdash::AppCommand::Update,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    // Provider failures degrade instruments; they never abort the batch.
    assert!(result.is_ok(), "Update failed with: {:?}", result.err());

    let snapshot_raw = fs::read_to_string(data_dir.path().join("market.json"))
        .expect("Snapshot file not written");
    let report: MarketReport = serde_json::from_str(&snapshot_raw).expect("Bad snapshot JSON");

    assert_eq!(report.errors.len(), 2);
    assert!(report.items.iter().all(|i| i.price.is_none()));
    assert!(report.items.iter().all(|i| i.dod.is_none()));
    assert!(report.insight.starts_with("Market data refresh failed."));

    // The history file exists but gained no points.
    let history = HistoryStore::load(&data_dir.path().join("history.json"));
    assert!(history.series.values().all(|s| s.is_empty()));
    assert!(!history.generated_at.is_empty());
}
