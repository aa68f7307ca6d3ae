//! Term-structure views over the month-leg ladder.

use super::primitives::{clip, diff};
use super::windows::FixedWindow;
use crate::instrument::ColumnKind;
use crate::table::{json_number, DailyTable};
use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Kink-radar z-scores are bounded to this magnitude.
pub const KINK_Z_LIMIT: f64 = 3.0;

/// Month legs up to `max_leg`, ordered by ordinal.
pub fn list_legs(table: &DailyTable, max_leg: u32) -> Vec<String> {
    table
        .catalog()
        .month_legs(max_leg)
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// One point of the forward curve.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvePoint {
    pub leg: String,
    pub ordinal: u32,
    pub value: f64,
}

impl Serialize for CurvePoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CurvePoint", 3)?;
        state.serialize_field("leg", &self.leg)?;
        state.serialize_field("ordinal", &self.ordinal)?;
        state.serialize_field("value", &json_number(self.value))?;
        state.end()
    }
}

/// Forward curve on `date`. Gaps along the ladder are filled from the
/// nearer leg first, then from the farther one. `None` when the date is
/// outside the table or there are no legs.
pub fn curve_on_date(table: &DailyTable, date: NaiveDate, max_leg: u32) -> Option<Vec<CurvePoint>> {
    let row = table.row_index(date)?;
    let legs = list_legs(table, max_leg);
    if legs.is_empty() {
        return None;
    }

    let mut values: Vec<f64> = legs
        .iter()
        .map(|leg| table.column(leg).map_or(f64::NAN, |values| values[row]))
        .collect();
    crate::calendar::forward_fill(&mut values);
    crate::calendar::backfill_leading(&mut values);

    Some(
        legs.into_iter()
            .zip(values)
            .map(|(leg, value)| {
                let ordinal = match table.column_kind(&leg) {
                    Some(ColumnKind::MonthLeg { ordinal }) => *ordinal,
                    _ => 0,
                };
                CurvePoint { leg, ordinal, value }
            })
            .collect(),
    )
}

/// Grid of clipped daily-change z-scores, one row per date and one column
/// per leg.
#[derive(Debug, Clone, PartialEq)]
pub struct KinkRadar {
    pub dates: Vec<NaiveDate>,
    pub legs: Vec<String>,
    /// `z[row][leg]`
    pub z: Vec<Vec<f64>>,
}

impl Serialize for KinkRadar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let z: Vec<Vec<serde_json::Value>> = self
            .z
            .iter()
            .map(|row| row.iter().map(|v| json_number(*v)).collect())
            .collect();
        let mut state = serializer.serialize_struct("KinkRadar", 3)?;
        state.serialize_field("dates", &self.dates)?;
        state.serialize_field("legs", &self.legs)?;
        state.serialize_field("z", &z)?;
        state.end()
    }
}

/// Z-score of each leg's daily change against its trailing `window`,
/// clipped to ±3, for the last `lookback` rows.
pub fn kink_radar(table: &DailyTable, lookback: usize, window: usize, max_leg: u32) -> KinkRadar {
    let legs = list_legs(table, max_leg);
    let rolling = FixedWindow::new(window);
    let start = table.len().saturating_sub(lookback);

    let per_leg: Vec<Vec<f64>> = legs
        .iter()
        .map(|leg| {
            let changes = table.column(leg).map(diff).unwrap_or_default();
            rolling.rolling_zscore(&changes)
        })
        .collect();

    let z = (start..table.len())
        .map(|row| {
            per_leg
                .iter()
                .map(|scores| clip(scores[row], KINK_Z_LIMIT))
                .collect()
        })
        .collect();

    KinkRadar {
        dates: table.dates()[start..].to_vec(),
        legs,
        z,
    }
}
