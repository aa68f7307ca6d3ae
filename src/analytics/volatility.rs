//! Rolling volatility and co-movement of daily percentage changes.

use super::primitives::pct_change;
use super::windows::FixedWindow;
use crate::table::{json_number, DailyTable};
use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Trading days per year used to annualise a daily volatility.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// A column's values aligned with a date index.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    pub name: String,
    pub values: Vec<f64>,
}

impl Serialize for NamedSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let values: Vec<serde_json::Value> = self.values.iter().map(|v| json_number(*v)).collect();
        let mut state = serializer.serialize_struct("NamedSeries", 2)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("values", &values)?;
        state.end()
    }
}

/// Rolling volatility of several columns over a shared date index.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RollingVol {
    pub dates: Vec<NaiveDate>,
    pub series: Vec<NamedSeries>,
}

impl RollingVol {
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|series| series.name == name)
            .map(|series| series.values.as_slice())
    }
}

/// Rolling sample standard deviation of each column's daily % change,
/// multiplied by √252 when `annualize` is set. Unknown columns are skipped.
pub fn rolling_vol(
    table: &DailyTable,
    columns: &[&str],
    window: usize,
    annualize: bool,
    min_periods: usize,
) -> RollingVol {
    let rolling = FixedWindow::new(window).with_min_periods(min_periods);
    let scale = if annualize {
        TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        1.0
    };

    let series = columns
        .iter()
        .filter_map(|name| {
            let values = table.column(name)?;
            let vol = rolling
                .rolling_std(&pct_change(values))
                .into_iter()
                .map(|sigma| sigma * scale)
                .collect();
            Some(NamedSeries {
                name: name.to_string(),
                values: vol,
            })
        })
        .collect();

    RollingVol {
        dates: table.dates().to_vec(),
        series,
    }
}

/// Square correlation matrix with labelled rows and columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl Serialize for CorrelationMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let values: Vec<Vec<serde_json::Value>> = self
            .values
            .iter()
            .map(|row| row.iter().map(|v| json_number(*v)).collect())
            .collect();
        let mut state = serializer.serialize_struct("CorrelationMatrix", 2)?;
        state.serialize_field("columns", &self.columns)?;
        state.serialize_field("values", &values)?;
        state.end()
    }
}

/// Pearson correlation over the rows where both values are present. NaN with
/// fewer than two such rows or no variance.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(x, y)| (*x, *y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    let r = cov / (var_a * var_b).sqrt();
    if r.is_finite() {
        r
    } else {
        f64::NAN
    }
}

/// Correlation matrix of absolute daily % changes over the latest `window`
/// rows. Columns that are unknown or entirely missing in the window are
/// left out.
pub fn rolling_abs_corr(table: &DailyTable, columns: &[&str], window: usize) -> CorrelationMatrix {
    let start = table.len().saturating_sub(window.max(1));

    let moves: Vec<(String, Vec<f64>)> = columns
        .iter()
        .filter_map(|name| {
            let changes = pct_change(table.column(name)?);
            let tail: Vec<f64> = changes[start..].iter().map(|v| v.abs()).collect();
            if tail.iter().all(|v| v.is_nan()) {
                log::debug!("'{}' has no moves in the last {} rows", name, window);
                None
            } else {
                Some((name.to_string(), tail))
            }
        })
        .collect();

    let values = moves
        .iter()
        .map(|(_, a)| moves.iter().map(|(_, b)| pearson(a, b)).collect())
        .collect();

    CorrelationMatrix {
        columns: moves.into_iter().map(|(name, _)| name).collect(),
        values,
    }
}
