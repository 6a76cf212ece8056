//! Incremental merge of freshly fetched data into the historical store.

use crate::core::series::{Point, collapse_daily, day_floor, normalize};

/// Trailing window kept in the store.
const RETENTION_SECONDS: i64 = 5 * 365 * 86_400;

/// Merges one instrument's run data into its stored series and returns the
/// updated series. Pure per-instrument: a bad series for one key can never
/// affect another.
///
/// Steps: sanitize and collapse the stored series; seed it from the fetched
/// raw series when the store is empty (one-time backfill); then either
/// overwrite today's point with the snapshot price or append a new one, and
/// prune everything older than the retention window. Re-running within the
/// same UTC day is idempotent and reflects the latest price.
pub fn merge_instrument(
    stored: &[Point],
    fetched: &[Point],
    price: Option<f64>,
    now: i64,
) -> Vec<Point> {
    let mut series = collapse_daily(&normalize(stored.to_vec()));

    if series.is_empty() && !fetched.is_empty() {
        series = collapse_daily(&normalize(fetched.to_vec()));
    }

    if let Some(price) = price {
        let today = day_floor(now);
        match series.last_mut() {
            Some(last) if last.time == today => last.value = price,
            _ => series.push(Point::new(today, price)),
        }
    }

    let cutoff = now - RETENTION_SECONDS;
    series.retain(|p| p.time >= cutoff);
    series
}
