//! Spread statistics for an arbitrary near/far pair.

use super::primitives::{mean, median, percentile_of_score, sample_std_dev};
use crate::spreads::subtract;
use crate::table::DailyTable;
use crate::time_series::{to_points, DateRange, SeriesPoint};
use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::Serialize;

/// `near - far` over the whole table; `None` when either column is absent.
pub fn compute_spread(table: &DailyTable, near: &str, far: &str) -> Option<Vec<f64>> {
    Some(subtract(table.column(near)?, table.column(far)?))
}

/// Non-missing spread points inside `range`, minus the rows inside
/// `exclude`.
pub fn spread_points(
    table: &DailyTable,
    near: &str,
    far: &str,
    range: Option<&DateRange>,
    exclude: Option<&DateRange>,
) -> Option<Vec<SeriesPoint>> {
    let spread = compute_spread(table, near, far)?;
    let mut points = to_points(table.dates(), &spread);
    points.retain(|point| {
        range.map_or(true, |range| range.contains(point.date))
            && !exclude.map_or(false, |window| window.contains(point.date))
    });
    Some(points)
}

/// Summary of a spread series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SpreadSummary {
    pub last: f64,
    pub mean: f64,
    pub off_avg: f64,
    pub median: f64,
    pub std_dev: f64,
    /// `None` when the series has no dispersion
    pub std_from_mean: Option<f64>,
    pub percentile: f64,
    pub high: f64,
    pub high_date: NaiveDate,
    pub low: f64,
    pub low_date: NaiveDate,
    pub observations: usize,
}

/// Statistics of `points` (missing values already removed). `None` when
/// there are no points.
///
/// High and low dates are the first occurrence of the extreme.
pub fn summary_stats(points: &[SeriesPoint]) -> Option<SpreadSummary> {
    let last = points.last()?;
    let values: Vec<f64> = points.iter().map(|point| point.value).collect();

    let mean_value = mean(&values);
    let std_dev = sample_std_dev(&values);
    let std_from_mean = if std_dev.is_nan() || std_dev == 0.0 {
        None
    } else {
        Some((last.value - mean_value) / std_dev)
    };

    let high = points
        .iter()
        .rev()
        .max_by_key(|point| OrderedFloat(point.value))?;
    let low = points
        .iter()
        .min_by_key(|point| OrderedFloat(point.value))?;

    Some(SpreadSummary {
        last: last.value,
        mean: mean_value,
        off_avg: last.value - mean_value,
        median: median(&values),
        std_dev,
        std_from_mean,
        percentile: percentile_of_score(&values, last.value),
        high: high.value,
        high_date: high.date,
        low: low.value,
        low_date: low.date,
        observations: points.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::ColumnKind;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table() -> DailyTable {
        let dates = (1..=5).map(|d| day(2024, 1, d)).collect();
        let mut table = DailyTable::new(dates, "Date");
        table.insert_column("A", ColumnKind::MonthLeg { ordinal: 1 }, vec![10.0, 12.0, f64::NAN, 12.0, 11.0]);
        table.insert_column("B", ColumnKind::MonthLeg { ordinal: 2 }, vec![9.0, 9.0, 9.0, 9.0, 9.0]);
        table
    }

    #[test]
    fn test_compute_spread_missing_column() {
        assert!(compute_spread(&table(), "A", "Z").is_none());
        let spread = compute_spread(&table(), "A", "B").unwrap();
        assert_eq!(spread[0], 1.0);
        assert!(spread[2].is_nan());
    }

    #[test]
    fn test_spread_points_range_and_exclusion() {
        let table = table();
        let range = DateRange::new(day(2024, 1, 2), day(2024, 1, 5));
        let exclude = DateRange::new(day(2024, 1, 4), day(2024, 1, 4));
        let points = spread_points(&table, "A", "B", Some(&range), Some(&exclude)).unwrap();
        let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(2024, 1, 2), day(2024, 1, 5)]);
    }

    #[test]
    fn test_summary_stats() {
        let points = spread_points(&table(), "A", "B", None, None).unwrap();
        // spread: 1, 3, 3, 2
        let summary = summary_stats(&points).unwrap();
        assert_eq!(summary.last, 2.0);
        assert_eq!(summary.mean, 2.25);
        assert_eq!(summary.off_avg, -0.25);
        assert_eq!(summary.median, 2.5);
        assert_eq!(summary.high, 3.0);
        assert_eq!(summary.high_date, day(2024, 1, 2));
        assert_eq!(summary.low, 1.0);
        assert_eq!(summary.low_date, day(2024, 1, 1));
        assert_eq!(summary.percentile, 50.0);
        assert_eq!(summary.observations, 4);
        assert!(summary.std_from_mean.unwrap() < 0.0);
    }

    #[test]
    fn test_summary_stats_empty_and_flat() {
        assert!(summary_stats(&[]).is_none());
        let flat = vec![
            SeriesPoint::new(day(2024, 1, 1), 1.0),
            SeriesPoint::new(day(2024, 1, 2), 1.0),
        ];
        let summary = summary_stats(&flat).unwrap();
        assert_eq!(summary.std_dev, 0.0);
        assert!(summary.std_from_mean.is_none());
    }
}
