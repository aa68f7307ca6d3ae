//! Largest unusual leg moves on the latest row.

use super::primitives::diff;
use super::term_structure::list_legs;
use super::windows::FixedWindow;
use crate::table::DailyTable;
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::cmp::Reverse;

/// A leg's last daily change and how unusual it is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mover {
    pub leg: String,
    /// Price change on the last row ($/bbl)
    pub change: f64,
    /// Change z-score against the trailing window
    pub z: f64,
}

/// The `k` legs with the largest |z| of their last daily change, measured
/// against the trailing `window` changes. Legs without a score are left
/// out.
pub fn top_movers(table: &DailyTable, window: usize, max_leg: u32, k: usize) -> Vec<Mover> {
    let Some(last) = table.len().checked_sub(1) else {
        return Vec::new();
    };
    let rolling = FixedWindow::new(window);

    let mut movers: Vec<Mover> = list_legs(table, max_leg)
        .into_iter()
        .filter_map(|leg| {
            let changes = diff(table.column(&leg)?);
            let z = rolling.rolling_zscore(&changes)[last];
            if z.is_nan() {
                return None;
            }
            Some(Mover {
                leg,
                change: changes[last],
                z,
            })
        })
        .collect();

    movers.sort_by_key(|mover| Reverse(OrderedFloat(mover.z.abs())));
    movers.truncate(k);
    movers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{month_leg_name, ColumnKind};
    use chrono::{Duration, NaiveDate};

    fn ladder(rows: usize, shocks: &[(u32, f64)]) -> DailyTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..rows).map(|i| start + Duration::days(i as i64)).collect();
        let mut table = DailyTable::new(dates, "Date");
        for ordinal in 1..=4u32 {
            let mut values: Vec<f64> = (0..rows)
                .map(|i| 70.0 + if i % 2 == 0 { 0.0 } else { 0.1 })
                .collect();
            if let Some((_, shock)) = shocks.iter().find(|(leg, _)| *leg == ordinal) {
                values[rows - 1] += shock;
            }
            table.insert_column(month_leg_name("CL", ordinal), ColumnKind::MonthLeg { ordinal }, values);
        }
        table
    }

    #[test]
    fn test_top_movers_ranked_by_abs_z() {
        let table = ladder(30, &[(2, -3.0), (3, 1.0)]);
        let movers = top_movers(&table, 10, 12, 2);
        assert_eq!(movers.len(), 2);
        assert_eq!(movers[0].leg, "%CL 2!");
        assert!(movers[0].z < 0.0);
        assert_eq!(movers[1].leg, "%CL 3!");
        assert!(movers[0].z.abs() >= movers[1].z.abs());
    }

    #[test]
    fn test_top_movers_short_history_is_empty() {
        let table = ladder(5, &[]);
        assert!(top_movers(&table, 10, 12, 5).is_empty());
    }
}
