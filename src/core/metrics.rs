//! Headline metric calculators for a daily series.

use crate::core::series::Point;

const SECONDS_PER_DAY: i64 = 86_400;

/// Percentage change from `old` to `new`. Returns `None` when either operand
/// is absent or `old` is zero, so callers never divide by zero.
pub fn percent_change(new: Option<f64>, old: Option<f64>) -> Option<f64> {
    match (new, old) {
        (Some(n), Some(o)) if o != 0.0 => Some((n - o) / o * 100.0),
        _ => None,
    }
}

/// Value of the latest point at least `days` days before the series' last
/// point. Falls back to the earliest point when the series does not reach
/// that far back; `None` on an empty series. This is backward
/// nearest-neighbor selection, not interpolation, so the returned value may
/// be several days staler than requested when data is sparse.
pub fn lookback_value(series: &[Point], days: i64) -> Option<f64> {
    let last = series.last()?;
    let target = last.time - days * SECONDS_PER_DAY;
    series
        .iter()
        .rev()
        .find(|p| p.time <= target)
        .or(series.first())
        .map(|p| p.value)
}
