//! Calendar completion.
//!
//! Reindexes a trading-day table onto every calendar day it spans and
//! carries the last known price across weekends, holidays and gaps.

use crate::table::DailyTable;
use crate::time_series::DateRange;
use chrono::NaiveDate;

/// Every calendar day in `range`, inclusive.
pub fn calendar_days(range: &DateRange) -> Vec<NaiveDate> {
    range.start.iter_days().take(range.num_days()).collect()
}

/// Aligns `values` (dated by `source`) onto `target`. Both date lists must
/// be ascending. Target dates with no source row are missing.
pub fn reindex(source: &[NaiveDate], values: &[f64], target: &[NaiveDate]) -> Vec<f64> {
    let mut result = Vec::with_capacity(target.len());
    let mut position = 0;
    for date in target {
        while position < source.len() && source[position] < *date {
            position += 1;
        }
        if position < source.len() && source[position] == *date {
            result.push(values[position]);
        } else {
            result.push(f64::NAN);
        }
    }
    result
}

/// Replaces each missing value with the last non-missing value before it.
/// Leading missing values stay missing.
pub fn forward_fill(values: &mut [f64]) {
    let mut last = f64::NAN;
    for value in values.iter_mut() {
        if value.is_nan() {
            *value = last;
        } else {
            last = *value;
        }
    }
}

/// Fills leading missing values with the first non-missing value.
pub fn backfill_leading(values: &mut [f64]) {
    let Some(first) = values.iter().position(|value| !value.is_nan()) else {
        return;
    };
    let fill = values[first];
    for value in &mut values[..first] {
        *value = fill;
    }
}

/// Reindexes `table` onto every calendar day between its first and last
/// date and forward-fills the price-like columns (optionally back-filling
/// their leading gaps). Other columns are only reindexed.
///
/// Running this on an already completed table returns the same table.
pub fn complete_calendar(table: &DailyTable, backfill_prices: bool) -> DailyTable {
    let (Some(first), Some(last)) = (table.first_date(), table.last_date()) else {
        return table.clone();
    };
    let full_index = calendar_days(&DateRange::new(first, last));

    let mut completed = DailyTable::new(full_index.clone(), table.date_label());
    for column in table.columns() {
        let mut values = reindex(table.dates(), column.values(), &full_index);
        if column.kind.is_price_like() {
            forward_fill(&mut values);
            if backfill_prices {
                backfill_leading(&mut values);
            }
        }
        completed.insert_column(column.name.clone(), column.kind.clone(), values);
    }
    completed
}
