//! Weekly-to-daily stamping.
//!
//! Each weekly metric becomes two daily columns:
//! - `(Release)`: the value as the market learned it, stepping on the
//!   release weekday that follows the observation
//! - `(Interp)`: a straight line between neighbouring observations

use crate::config::BuildConfig;
use crate::instrument::{interp_name, release_name, ColumnKind};
use crate::table::DailyTable;
use crate::time_series::{to_points, SeriesPoint};
use crate::workbook::RawSheet;
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// First `weekday` strictly after `date` (a Wednesday maps to the next
/// Wednesday, never to itself).
pub fn next_weekday_after(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let today = date.weekday().num_days_from_monday() as i64;
    let target = weekday.num_days_from_monday() as i64;
    let offset = (target - today).rem_euclid(7);
    date + Duration::days(if offset == 0 { 7 } else { offset })
}

/// Release-stamped daily values over `index`.
///
/// `observations` must be sorted by date. The value on a day is the latest
/// observation whose release date is on or before that day; days before the
/// first release are missing.
pub fn release_series(observations: &[SeriesPoint], index: &[NaiveDate], weekday: Weekday) -> Vec<f64> {
    let releases: Vec<(NaiveDate, f64)> = observations
        .iter()
        .map(|point| (next_weekday_after(point.date, weekday), point.value))
        .collect();

    let mut result = Vec::with_capacity(index.len());
    let mut next = 0;
    let mut current = f64::NAN;
    for date in index {
        while next < releases.len() && releases[next].0 <= *date {
            current = releases[next].1;
            next += 1;
        }
        result.push(current);
    }
    result
}

/// Linearly interpolated daily values over `index`.
///
/// `observations` must be sorted by date with unique dates. Days before the
/// first observation take its value, days after the last take the last.
pub fn interp_series(observations: &[SeriesPoint], index: &[NaiveDate]) -> Vec<f64> {
    let (Some(first), Some(last)) = (observations.first(), observations.last()) else {
        return vec![f64::NAN; index.len()];
    };

    let mut result = Vec::with_capacity(index.len());
    let mut segment = 0;
    for date in index {
        if *date <= first.date {
            result.push(first.value);
            continue;
        }
        if *date >= last.date {
            result.push(last.value);
            continue;
        }
        while observations[segment + 1].date <= *date {
            segment += 1;
        }
        let left = &observations[segment];
        let right = &observations[segment + 1];
        let span = (right.date - left.date).num_days() as f64;
        let elapsed = (*date - left.date).num_days() as f64;
        result.push(left.value + (right.value - left.value) * elapsed / span);
    }
    result
}

/// Where a metric's observations were taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricOrigin {
    DailySheet,
    WeeklySheet,
}

/// A weekly metric ready to be stamped.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSource {
    pub name: String,
    pub origin: MetricOrigin,
    pub observations: Vec<SeriesPoint>,
}

/// Gathers every metric that gets release/interp columns.
///
/// Every weekly column is a metric. A metric that is also a raw daily
/// column with at least one value is sourced from the daily sheet. A
/// configured daily-native metric missing from the weekly sheet is still
/// stamped from its daily values. Metrics without any observation are
/// dropped.
pub fn collect_metric_sources(daily: &RawSheet, weekly: &RawSheet, config: &BuildConfig) -> Vec<MetricSource> {
    let daily_points = |name: &str| {
        daily
            .column(name)
            .map(|column| to_points(&daily.dates, &column.values))
            .filter(|points| !points.is_empty())
    };

    let mut sources: Vec<MetricSource> = weekly
        .columns
        .iter()
        .map(|column| match daily_points(&column.name) {
            Some(observations) => MetricSource {
                name: column.name.clone(),
                origin: MetricOrigin::DailySheet,
                observations,
            },
            None => MetricSource {
                name: column.name.clone(),
                origin: MetricOrigin::WeeklySheet,
                observations: to_points(&weekly.dates, &column.values),
            },
        })
        .collect();

    for metric in &config.daily_native_metrics {
        if sources.iter().any(|source| source.name == *metric) {
            continue;
        }
        if let Some(observations) = daily_points(metric) {
            sources.push(MetricSource {
                name: metric.clone(),
                origin: MetricOrigin::DailySheet,
                observations,
            });
        }
    }

    sources.retain(|source| {
        if source.observations.is_empty() {
            log::debug!("metric '{}' has no observations, skipped", source.name);
            false
        } else {
            true
        }
    });
    sources
}

/// Adds `(Release)` and `(Interp)` columns for every metric. The table's
/// date index must already be calendar-complete.
pub fn stamp_metrics(table: &mut DailyTable, sources: &[MetricSource], weekday: Weekday) {
    let index = table.dates().to_vec();
    for source in sources {
        table.insert_column(
            release_name(&source.name),
            ColumnKind::Release {
                metric: source.name.clone(),
            },
            release_series(&source.observations, &index, weekday),
        );
        table.insert_column(
            interp_name(&source.name),
            ColumnKind::Interp {
                metric: source.name.clone(),
            },
            interp_series(&source.observations, &index),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::RawColumn;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn days(start: NaiveDate, count: i64) -> Vec<NaiveDate> {
        (0..count).map(|i| start + Duration::days(i)).collect()
    }

    #[test]
    fn test_next_weekday_is_strictly_after() {
        // 2024-01-05 is a Friday
        assert_eq!(next_weekday_after(day(2024, 1, 5), Weekday::Wed), day(2024, 1, 10));
        // Wednesday maps to the following Wednesday
        assert_eq!(next_weekday_after(day(2024, 1, 10), Weekday::Wed), day(2024, 1, 17));
        assert_eq!(next_weekday_after(day(2024, 1, 9), Weekday::Wed), day(2024, 1, 10));
        assert_eq!(next_weekday_after(day(2024, 1, 5), Weekday::Mon), day(2024, 1, 8));
    }

    #[test]
    fn test_release_steps_on_release_day() {
        let observations = vec![
            SeriesPoint::new(day(2024, 1, 5), 50.0),
            SeriesPoint::new(day(2024, 1, 12), 52.0),
        ];
        let index = days(day(2024, 1, 5), 14);
        let release = release_series(&observations, &index, Weekday::Wed);

        // Jan 5..Jan 9 unknown, Jan 10..Jan 16 = 50, Jan 17.. = 52
        assert!(release[..5].iter().all(|v| v.is_nan()));
        assert!(release[5..12].iter().all(|v| *v == 50.0));
        assert!(release[12..].iter().all(|v| *v == 52.0));
    }

    #[test]
    fn test_release_same_release_day_latest_wins() {
        // Monday and Tuesday observations both release on Wednesday
        let observations = vec![
            SeriesPoint::new(day(2024, 1, 8), 1.0),
            SeriesPoint::new(day(2024, 1, 9), 2.0),
        ];
        let index = days(day(2024, 1, 10), 2);
        assert_eq!(release_series(&observations, &index, Weekday::Wed), vec![2.0, 2.0]);
    }

    #[test]
    fn test_interp_linear_between_and_flat_outside() {
        let observations = vec![
            SeriesPoint::new(day(2024, 1, 5), 100.0),
            SeriesPoint::new(day(2024, 1, 12), 114.0),
        ];
        let index = days(day(2024, 1, 1), 16);
        let interp = interp_series(&observations, &index);

        assert_eq!(interp[0], 100.0);
        assert_eq!(interp[4], 100.0);
        assert!((interp[7] - 106.0).abs() < 1e-12);
        assert_eq!(interp[11], 114.0);
        assert_eq!(interp[15], 114.0);
    }

    #[test]
    fn test_interp_uneven_spacing() {
        let observations = vec![
            SeriesPoint::new(day(2024, 1, 1), 0.0),
            SeriesPoint::new(day(2024, 1, 3), 2.0),
            SeriesPoint::new(day(2024, 1, 7), 0.0),
        ];
        let index = days(day(2024, 1, 1), 7);
        let interp = interp_series(&observations, &index);
        assert_eq!(interp, vec![0.0, 1.0, 2.0, 1.5, 1.0, 0.5, 0.0]);
    }

    #[test]
    fn test_interp_without_observations_is_missing() {
        let index = days(day(2024, 1, 1), 3);
        assert!(interp_series(&[], &index).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_daily_native_metric_preferred() {
        let daily = RawSheet {
            dates: vec![day(2024, 1, 5)],
            columns: vec![RawColumn {
                name: "Cushing Stocks (Mbbl)".to_string(),
                values: vec![33.0],
            }],
        };
        let weekly = RawSheet {
            dates: vec![day(2024, 1, 5)],
            columns: vec![
                RawColumn {
                    name: "Crude Stocks".to_string(),
                    values: vec![430.0],
                },
                RawColumn {
                    name: "Cushing Stocks (Mbbl)".to_string(),
                    values: vec![31.0],
                },
                RawColumn {
                    name: "Empty".to_string(),
                    values: vec![f64::NAN],
                },
            ],
        };
        let sources = collect_metric_sources(&daily, &weekly, &BuildConfig::default());
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1].name, "Cushing Stocks (Mbbl)");
        assert_eq!(sources[1].origin, MetricOrigin::DailySheet);
        assert_eq!(sources[1].observations[0].value, 33.0);
    }

    #[test]
    fn test_any_metric_on_daily_sheet_is_sourced_there() {
        let daily = RawSheet {
            dates: vec![day(2024, 1, 5)],
            columns: vec![
                RawColumn {
                    name: "Crude Stocks".to_string(),
                    values: vec![33.0],
                },
                RawColumn {
                    name: "Cushing Stocks (Mbbl)".to_string(),
                    values: vec![21.0],
                },
                RawColumn {
                    name: "Daily Only".to_string(),
                    values: vec![5.0],
                },
            ],
        };
        let weekly = RawSheet {
            dates: vec![day(2024, 1, 5)],
            columns: vec![RawColumn {
                name: "Crude Stocks".to_string(),
                values: vec![31.0],
            }],
        };
        let sources = collect_metric_sources(&daily, &weekly, &BuildConfig::default());
        let names: Vec<&str> = sources.iter().map(|source| source.name.as_str()).collect();
        // unlisted daily-only columns are not weekly metrics
        assert_eq!(names, vec!["Crude Stocks", "Cushing Stocks (Mbbl)"]);
        assert_eq!(sources[0].origin, MetricOrigin::DailySheet);
        assert_eq!(sources[0].observations[0].value, 33.0);
        assert_eq!(sources[1].origin, MetricOrigin::DailySheet);
    }

    #[test]
    fn test_daily_native_metric_falls_back_to_weekly() {
        let daily = RawSheet {
            dates: vec![day(2024, 1, 5)],
            columns: vec![RawColumn {
                name: "Cushing Stocks (Mbbl)".to_string(),
                values: vec![f64::NAN],
            }],
        };
        let weekly = RawSheet {
            dates: vec![day(2024, 1, 5)],
            columns: vec![RawColumn {
                name: "Cushing Stocks (Mbbl)".to_string(),
                values: vec![31.0],
            }],
        };
        let sources = collect_metric_sources(&daily, &weekly, &BuildConfig::default());
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].origin, MetricOrigin::WeeklySheet);
    }

    #[test]
    fn test_stamp_metrics_adds_named_columns() {
        let mut table = DailyTable::new(days(day(2024, 1, 5), 7), "Date");
        let sources = vec![MetricSource {
            name: "Crude".to_string(),
            origin: MetricOrigin::WeeklySheet,
            observations: vec![SeriesPoint::new(day(2024, 1, 5), 430.0)],
        }];
        stamp_metrics(&mut table, &sources, Weekday::Wed);
        assert_eq!(table.catalog().names(), vec!["Crude (Release)", "Crude (Interp)"]);
        assert_eq!(table.value("Crude (Release)", day(2024, 1, 10)), Some(430.0));
        assert_eq!(table.value("Crude (Release)", day(2024, 1, 9)), None);
        assert_eq!(table.value("Crude (Interp)", day(2024, 1, 6)), Some(430.0));
    }
}
