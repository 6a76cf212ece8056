//! Per-run snapshot records and the run-level market report.

use crate::core::instrument::InstrumentSpec;
use crate::core::metrics::{lookback_value, percent_change};
use crate::core::series::{Point, downsample};
use chrono::Utc;
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_FILE: &str = "market.json";

/// Chart payload cap per instrument.
pub const MAX_CHART_POINTS: usize = 260;

/// Instruments quoted in the narrative insight, in display order.
const LEAD_KEYS: [&str; 4] = ["NASDAQ", "S&P500", "KOSPI", "USD/KRW"];

/// Headline metrics for one instrument, computed once per run. Absent fields
/// signal insufficient data, not zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub key: String,
    pub label: String,
    pub price: Option<f64>,
    pub dod: Option<f64>,
    pub mom: Option<f64>,
    pub yoy: Option<f64>,
    pub raw_point_count: usize,
    pub points: Vec<Point>,
}

/// The run-level snapshot file: one record per instrument plus narrative and
/// error context.
#[derive(Debug, Serialize, Deserialize)]
pub struct MarketReport {
    pub generated_at: String,
    pub insight: String,
    pub errors: Vec<String>,
    pub items: Vec<Snapshot>,
}

impl MarketReport {
    pub fn new(items: Vec<Snapshot>, errors: Vec<String>) -> Self {
        let insight = build_insight(&items, &errors);
        MarketReport {
            generated_at: Utc::now().to_rfc3339(),
            insight,
            errors,
            items,
        }
    }
}

/// Reduces a fetched series to its headline metrics and bounded chart
/// payload.
pub fn build_snapshot(spec: &InstrumentSpec, series: &[Point]) -> Snapshot {
    let price = series.last().map(|p| p.value);
    let prev = (series.len() > 1).then(|| series[series.len() - 2].value);
    Snapshot {
        key: spec.key.clone(),
        label: spec.label.clone(),
        price,
        dod: percent_change(price, prev),
        mom: percent_change(price, lookback_value(series, 30)),
        yoy: percent_change(price, lookback_value(series, 365)),
        raw_point_count: series.len(),
        points: downsample(series, MAX_CHART_POINTS),
    }
}

/// All-absent snapshot for an instrument whose every provider attempt failed.
pub fn failed_snapshot(spec: &InstrumentSpec) -> Snapshot {
    Snapshot {
        key: spec.key.clone(),
        label: spec.label.clone(),
        price: None,
        dod: None,
        mom: None,
        yoy: None,
        raw_point_count: 0,
        points: Vec::new(),
    }
}

/// Narrative summary for the dashboard. Falls back to a failure summary of
/// up to three error strings when not a single instrument yielded a price.
fn build_insight(items: &[Snapshot], errors: &[String]) -> String {
    let valid = items.iter().filter(|s| s.price.is_some()).count();
    if valid == 0 {
        let detail = if errors.is_empty() {
            "API/network error".to_string()
        } else {
            errors
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(" | ")
        };
        return format!("Market data refresh failed. {detail}");
    }

    let lead: Vec<String> = LEAD_KEYS
        .iter()
        .filter_map(|key| {
            let item = items.iter().find(|s| s.key == *key)?;
            let dod = item.dod?;
            Some(format!("{} {:+.2}%", item.label, dod))
        })
        .collect();
    let moves = if lead.is_empty() {
        "still aggregating".to_string()
    } else {
        lead.join(", ")
    };
    format!(
        "Rate paths and dollar direction continue to drive risk-asset swings. \
         Daily moves on the lead gauges: {moves}. \
         Watch flows, earnings guidance and inflation prints alongside."
    )
}
