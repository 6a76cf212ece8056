//! The batch run: fetch every instrument, derive cross rates, write the
//! snapshot, merge history and refresh news.

use crate::core::config::AppConfig;
use crate::core::instrument::{InstrumentKind, InstrumentSpec};
use crate::core::series::{Point, derive_ratio};
use crate::fallback::Orchestrator;
use crate::news::{NEWS_FILE, NewsClient, default_sections};
use crate::report::{MarketReport, SNAPSHOT_FILE, Snapshot, build_snapshot, failed_snapshot};
use crate::store::merge::merge_instrument;
use crate::store::{HISTORY_FILE, HistoryStore, write_json_atomic};
use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Pause between external calls, purely to respect provider rate limits.
const FETCH_DELAY: Duration = Duration::from_millis(120);

pub async fn run(config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    let data_dir = config.data_dir()?;
    let orchestrator = Orchestrator::new(&config);

    let mut raw_series: HashMap<String, Vec<Point>> = HashMap::new();
    let mut by_key: HashMap<String, Snapshot> = HashMap::new();
    let mut errors: Vec<String> = Vec::new();

    let fetchable: Vec<&InstrumentSpec> = config
        .instruments
        .iter()
        .filter(|s| s.kind != InstrumentKind::Derived)
        .collect();

    let pb = ProgressBar::new(fetchable.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    // One instrument at a time, one provider attempt at a time; a failed
    // instrument never aborts the batch.
    for spec in &fetchable {
        match orchestrator.fetch_instrument(spec).await {
            Ok(series) => {
                debug!("Fetched {} points for {}", series.len(), spec.key);
                by_key.insert(spec.key.clone(), build_snapshot(spec, &series));
                raw_series.insert(spec.key.clone(), series);
            }
            Err(e) => {
                errors.push(format!("{}: {}", spec.label, e));
                by_key.insert(spec.key.clone(), failed_snapshot(spec));
            }
        }
        pb.inc(1);
        tokio::time::sleep(FETCH_DELAY).await;
    }
    pb.finish_and_clear();

    // Derived instruments come after every operand had its chance to fetch.
    for spec in config
        .instruments
        .iter()
        .filter(|s| s.kind == InstrumentKind::Derived)
    {
        let numerator = spec
            .numerator
            .as_ref()
            .and_then(|k| raw_series.get(k))
            .map(Vec::as_slice)
            .unwrap_or_default();
        let denominator = spec
            .denominator
            .as_ref()
            .and_then(|k| raw_series.get(k))
            .map(Vec::as_slice)
            .unwrap_or_default();
        let series = derive_ratio(numerator, denominator);
        debug!("Derived {} points for {}", series.len(), spec.key);
        by_key.insert(spec.key.clone(), build_snapshot(spec, &series));
        raw_series.insert(spec.key.clone(), series);
    }

    let items: Vec<Snapshot> = config
        .instruments
        .iter()
        .filter_map(|s| by_key.get(&s.key).cloned())
        .collect();
    let report = MarketReport::new(items, errors);
    write_json_atomic(&data_dir.join(SNAPSHOT_FILE), &report)
        .context("Failed to write market snapshot")?;

    // History merge is per instrument; a bad stored series for one key must
    // not block the rest.
    let history_path = data_dir.join(HISTORY_FILE);
    let mut store = HistoryStore::load(&history_path);
    let now = Utc::now().timestamp();
    for spec in &config.instruments {
        let stored = store.series.get(&spec.key).cloned().unwrap_or_default();
        let fetched = raw_series
            .get(&spec.key)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let price = by_key.get(&spec.key).and_then(|s| s.price);
        let merged = merge_instrument(&stored, fetched, price, now);
        store.series.insert(spec.key.clone(), merged);
    }
    store.generated_at = Utc::now().to_rfc3339();
    store.save(&history_path).context("Failed to write history")?;

    let news_client = NewsClient::new(config.providers.news_base_url(), config.news_key());
    let news_report = news_client.build_report(&default_sections()).await;
    write_json_atomic(&data_dir.join(NEWS_FILE), &news_report)
        .context("Failed to write news")?;

    info!(
        "Run complete: {} instruments, {} errors",
        config.instruments.len(),
        report.errors.len()
    );
    println!(
        "Updated {}, {} and {} in {}",
        SNAPSHOT_FILE,
        NEWS_FILE,
        HISTORY_FILE,
        data_dir.display()
    );
    Ok(())
}
