//! Price series primitives: normalization, daily collapsing, downsampling
//! and cross-rate derivation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const SECONDS_PER_DAY: i64 = 86_400;

/// One observation in a price/rate series. `time` is epoch seconds UTC,
/// day-aligned after collapsing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub time: i64,
    pub value: f64,
}

impl Point {
    pub fn new(time: i64, value: f64) -> Self {
        Point { time, value }
    }
}

/// UTC midnight of the day containing `time`.
pub fn day_floor(time: i64) -> i64 {
    time - time.rem_euclid(SECONDS_PER_DAY)
}

/// Validates raw candidate points into a well-formed series: points with a
/// non-finite value are dropped, the rest are stable-sorted ascending by time.
/// Garbage in yields an empty series, never an error.
pub fn normalize(points: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = points.into_iter().filter(|p| p.value.is_finite()).collect();
    out.sort_by_key(|p| p.time);
    out
}

/// Reduces a normalized series to one point per UTC calendar day, keeping the
/// chronologically last value observed for each day. Timestamps in the output
/// sit at UTC midnight. Idempotent: collapsing a collapsed series is a no-op.
pub fn collapse_daily(points: &[Point]) -> Vec<Point> {
    let mut by_day: BTreeMap<i64, f64> = BTreeMap::new();
    for p in points {
        by_day.insert(day_floor(p.time), p.value);
    }
    by_day
        .into_iter()
        .map(|(time, value)| Point { time, value })
        .collect()
}

/// Bounds a series to at most `max_points` + 1 entries by striding, always
/// keeping the original final point so the most recent value survives.
pub fn downsample(points: &[Point], max_points: usize) -> Vec<Point> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let stride = points.len().div_ceil(max_points).max(1);
    let mut out: Vec<Point> = points.iter().copied().step_by(stride).collect();
    if let (Some(last_out), Some(last_in)) = (out.last(), points.last()) {
        if last_out.time != last_in.time {
            out.push(*last_in);
        }
    }
    out
}

/// Builds a cross-rate series as the ratio A/B over the exact timestamp
/// intersection of the two operands. Points of A with no equal-time, nonzero
/// counterpart in B are dropped silently; no nearest-neighbor matching is
/// attempted.
pub fn derive_ratio(numerator: &[Point], denominator: &[Point]) -> Vec<Point> {
    let by_time: HashMap<i64, f64> = denominator.iter().map(|p| (p.time, p.value)).collect();
    numerator
        .iter()
        .filter_map(|p| match by_time.get(&p.time) {
            Some(b) if *b != 0.0 => Some(Point::new(p.time, p.value / b)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(time: i64, value: f64) -> Point {
        Point::new(time, value)
    }

    #[test]
    fn test_normalize_drops_non_finite_and_sorts() {
        let raw = vec![
            pt(200, 2.0),
            pt(100, f64::NAN),
            pt(100, 1.0),
            pt(300, f64::INFINITY),
            pt(50, 0.5),
        ];
        let series = normalize(raw);
        assert_eq!(series, vec![pt(50, 0.5), pt(100, 1.0), pt(200, 2.0)]);
    }

    #[test]
    fn test_normalize_garbage_yields_empty() {
        let series = normalize(vec![pt(1, f64::NAN), pt(2, f64::NEG_INFINITY)]);
        assert!(series.is_empty());
    }

    #[test]
    fn test_collapse_keeps_last_value_per_day() {
        // Two samples on the same UTC day, one on the next.
        let series = normalize(vec![
            pt(86_400 + 100, 10.0),
            pt(86_400 + 50_000, 11.0),
            pt(2 * 86_400 + 10, 20.0),
        ]);
        let collapsed = collapse_daily(&series);
        assert_eq!(collapsed, vec![pt(86_400, 11.0), pt(2 * 86_400, 20.0)]);
    }

    #[test]
    fn test_collapse_is_idempotent() {
        let series = normalize(vec![pt(100, 1.0), pt(90_000, 2.0), pt(90_100, 3.0)]);
        let once = collapse_daily(&series);
        let twice = collapse_daily(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_collapse_timestamps_strictly_increasing() {
        let series = normalize(vec![
            pt(10, 1.0),
            pt(20, 2.0),
            pt(86_500, 3.0),
            pt(200_000, 4.0),
        ]);
        let collapsed = collapse_daily(&series);
        assert!(collapsed.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn test_downsample_short_series_unchanged() {
        let series: Vec<Point> = (0..260).map(|i| pt(i * 86_400, i as f64)).collect();
        assert_eq!(downsample(&series, 260), series);
    }

    #[test]
    fn test_downsample_bounds_length_and_keeps_final_point() {
        let series: Vec<Point> = (0..1000).map(|i| pt(i * 86_400, i as f64)).collect();
        let out = downsample(&series, 260);
        assert!(out.len() <= 261);
        assert_eq!(out.last().unwrap().time, series.last().unwrap().time);
    }

    #[test]
    fn test_derive_ratio_exact_intersection() {
        let a = vec![pt(100, 10.0)];
        let b = vec![pt(100, 2.0), pt(200, 4.0)];
        // t=200 has no match in A and is dropped.
        assert_eq!(derive_ratio(&a, &b), vec![pt(100, 5.0)]);
    }

    #[test]
    fn test_derive_ratio_skips_zero_denominator() {
        let a = vec![pt(100, 10.0), pt(200, 12.0)];
        let b = vec![pt(100, 0.0), pt(200, 4.0)];
        assert_eq!(derive_ratio(&a, &b), vec![pt(200, 3.0)]);
    }
}
