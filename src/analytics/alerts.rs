//! Market alerts evaluated on the latest rows of a table.
//!
//! Every check returns `None` both when nothing is unusual and when the
//! table has too little history to judge.

use super::primitives::{diff, sample_std_dev};
use super::spread_summary::compute_spread;
use super::term_structure::list_legs;
use super::volatility::rolling_vol;
use super::windows::FixedWindow;
use crate::table::{json_number, DailyTable};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;

/// Which check raised an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    PromptShock,
    DecRed,
    VolSpike,
    SpreadHiLo,
    CurveKink,
}

/// One labelled value of the series that explains an alert. Labels are
/// dates, or leg names for the curve kink.
#[derive(Debug, Clone, PartialEq)]
pub struct TracePoint {
    pub label: String,
    pub value: f64,
}

impl Serialize for TracePoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TracePoint", 2)?;
        state.serialize_field("label", &self.label)?;
        state.serialize_field("value", &json_number(self.value))?;
        state.end()
    }
}

/// A raised alert.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    pub trace: Vec<TracePoint>,
}

/// Thresholds and windows of the alert checks.
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    pub front_leg: String,
    pub second_leg: String,
    /// Smallest prompt-spread move that can alert ($/bbl)
    pub prompt_min_move: f64,
    pub prompt_sigma_window: usize,
    pub prompt_sigma_multiple: f64,
    pub dec_red_column: String,
    pub dec_red_window: usize,
    pub dec_red_z: f64,
    pub vol_window: usize,
    pub vol_jump_multiple: f64,
    pub hi_lo_lookback: usize,
    pub kink_window: usize,
    pub max_leg: u32,
}

impl Default for AlertSettings {
    fn default() -> Self {
        AlertSettings {
            front_leg: "%CL 1!".to_string(),
            second_leg: "%CL 2!".to_string(),
            prompt_min_move: 0.40,
            prompt_sigma_window: 30,
            prompt_sigma_multiple: 2.0,
            dec_red_column: "Dec Red".to_string(),
            dec_red_window: 252 * 5,
            dec_red_z: 2.5,
            vol_window: 20,
            vol_jump_multiple: 3.0,
            hi_lo_lookback: 504,
            kink_window: 60,
            max_leg: 12,
        }
    }
}

fn dated_trace(table: &DailyTable, rows: &[usize], values: &[f64]) -> Vec<TracePoint> {
    rows.iter()
        .map(|&row| TracePoint {
            label: table.dates()[row].format("%Y-%m-%d").to_string(),
            value: values[row],
        })
        .collect()
}

fn tail(rows: &[usize], count: usize) -> &[usize] {
    &rows[rows.len().saturating_sub(count)..]
}

/// Last move of the prompt spread is larger than the minimum move and than
/// a multiple of the trailing σ of moves (σ as of the day before).
pub fn check_prompt_shock(table: &DailyTable, settings: &AlertSettings) -> Option<Alert> {
    let spread = compute_spread(table, &settings.front_leg, &settings.second_leg)?;
    let rows: Vec<usize> = (0..spread.len()).filter(|&row| !spread[row].is_nan()).collect();
    let observed: Vec<f64> = rows.iter().map(|&row| spread[row]).collect();
    if observed.len() < 3 {
        return None;
    }

    let moves = diff(&observed);
    let sigmas = FixedWindow::new(settings.prompt_sigma_window).rolling_std(&moves);
    let last_move = moves[moves.len() - 1];
    let sigma = sigmas[sigmas.len() - 2];
    if sigma.is_nan() {
        return None;
    }

    if last_move.abs() > settings.prompt_min_move
        && last_move.abs() > settings.prompt_sigma_multiple * sigma
    {
        return Some(Alert {
            kind: AlertKind::PromptShock,
            message: format!("Δ {:+.2} (>{}σ)", last_move, settings.prompt_sigma_multiple),
            trace: dated_trace(table, tail(&rows, 60), &spread),
        });
    }
    None
}

/// Rolling z-score of the Dec Red colour spread on the last row exceeds the
/// threshold.
pub fn check_dec_red(table: &DailyTable, settings: &AlertSettings) -> Option<Alert> {
    let spread = table.column(&settings.dec_red_column)?;
    let z = FixedWindow::new(settings.dec_red_window).rolling_zscore(spread);
    let last = *z.last()?;
    if last.is_nan() || last.abs() <= settings.dec_red_z {
        return None;
    }

    let rows: Vec<usize> = (0..z.len()).collect();
    Some(Alert {
        kind: AlertKind::DecRed,
        message: format!("z={:+.2}", last),
        trace: dated_trace(table, tail(&rows, 750), &z),
    })
}

/// Today's daily σ of front-month % changes is more than a multiple of
/// yesterday's.
pub fn check_vol_spike(table: &DailyTable, settings: &AlertSettings) -> Option<Alert> {
    let vol = rolling_vol(table, &[settings.front_leg.as_str()], settings.vol_window, false, 2);
    let sigmas = vol.get(&settings.front_leg)?;
    let rows: Vec<usize> = (0..sigmas.len()).filter(|&row| !sigmas[row].is_nan()).collect();
    if rows.len() < 2 {
        return None;
    }

    let today = sigmas[rows[rows.len() - 1]];
    let previous = sigmas[rows[rows.len() - 2]];
    if today > settings.vol_jump_multiple * previous {
        return Some(Alert {
            kind: AlertKind::VolSpike,
            message: format!("σ jump: {:.3}", today),
            trace: dated_trace(table, tail(&rows, 200), sigmas),
        });
    }
    None
}

/// The `near - far` spread closes the lookback window at its high or low.
pub fn check_spread_hi_lo(table: &DailyTable, near: &str, far: &str, settings: &AlertSettings) -> Option<Alert> {
    let spread = compute_spread(table, near, far)?;
    let rows: Vec<usize> = (spread.len().saturating_sub(settings.hi_lo_lookback)..spread.len()).collect();
    let window: Vec<f64> = rows.iter().map(|&row| spread[row]).collect();
    let last = *window.last()?;
    if last.is_nan() {
        return None;
    }

    let valid = window.iter().copied().filter(|v| !v.is_nan());
    let high = valid.clone().fold(f64::NEG_INFINITY, f64::max);
    let low = valid.fold(f64::INFINITY, f64::min);
    let years = settings.hi_lo_lookback as f64 / 252.0;
    let message = if last == high {
        format!("New {:.0}-yr high", years)
    } else if last == low {
        format!("New {:.0}-yr low", years)
    } else {
        return None;
    };

    Some(Alert {
        kind: AlertKind::SpreadHiLo,
        message,
        trace: dated_trace(table, &rows, &spread),
    })
}

/// One leg jumps by more than 2σ while both neighbours move less than 1σ
/// (σ of each leg's daily changes over the trailing window, as of the day
/// before).
pub fn check_curve_kink(table: &DailyTable, settings: &AlertSettings) -> Option<Alert> {
    if table.len() < 2 {
        return None;
    }
    let last = table.len() - 1;
    let legs = list_legs(table, settings.max_leg);

    let mut moves = Vec::with_capacity(legs.len());
    let mut sigmas = Vec::with_capacity(legs.len());
    for leg in &legs {
        let changes = diff(table.column(leg)?);
        let end = last.saturating_sub(1);
        let start = (end + 1).saturating_sub(settings.kink_window);
        let window = &changes[start..=end];
        let sigma = if window.iter().filter(|v| !v.is_nan()).count() < settings.kink_window {
            f64::NAN
        } else {
            sample_std_dev(window)
        };
        moves.push(changes[last]);
        sigmas.push(sigma);
    }

    for i in 1..legs.len().saturating_sub(1) {
        if moves[i].abs() > 2.0 * sigmas[i]
            && moves[i - 1].abs() < sigmas[i - 1]
            && moves[i + 1].abs() < sigmas[i + 1]
        {
            return Some(Alert {
                kind: AlertKind::CurveKink,
                message: format!("Kink at M{}: {:+.2}", i + 1, moves[i]),
                trace: legs
                    .iter()
                    .zip(moves.iter())
                    .map(|(leg, value)| TracePoint {
                        label: leg.clone(),
                        value: *value,
                    })
                    .collect(),
            });
        }
    }
    None
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AlertCheck {
    pub kind: AlertKind,
    pub alert: Option<Alert>,
}

/// Runs every check. The hi/lo check watches the front two legs.
pub fn run_all(table: &DailyTable, settings: &AlertSettings) -> Vec<AlertCheck> {
    let checks = [
        (AlertKind::PromptShock, check_prompt_shock(table, settings)),
        (AlertKind::DecRed, check_dec_red(table, settings)),
        (AlertKind::VolSpike, check_vol_spike(table, settings)),
        (
            AlertKind::SpreadHiLo,
            check_spread_hi_lo(table, &settings.front_leg, &settings.second_leg, settings),
        ),
        (AlertKind::CurveKink, check_curve_kink(table, settings)),
    ];

    let raised = checks.iter().filter(|(_, alert)| alert.is_some()).count();
    log::debug!("alerts evaluated: {} of {} raised", raised, checks.len());

    checks
        .into_iter()
        .map(|(kind, alert)| AlertCheck { kind, alert })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{month_leg_name, ColumnKind};
    use chrono::{Duration, NaiveDate};

    fn dated(rows: usize) -> DailyTable {
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let dates = (0..rows).map(|i| start + Duration::days(i as i64)).collect();
        DailyTable::new(dates, "Date")
    }

    fn wiggle(rows: usize, base: f64, amplitude: f64) -> Vec<f64> {
        (0..rows)
            .map(|i| base + amplitude * ((i % 4) as f64 - 1.5))
            .collect()
    }

    fn with_legs(rows: usize, legs: u32) -> DailyTable {
        let mut table = dated(rows);
        for ordinal in 1..=legs {
            table.insert_column(
                month_leg_name("CL", ordinal),
                ColumnKind::MonthLeg { ordinal },
                wiggle(rows, 80.0 - ordinal as f64, 0.05),
            );
        }
        table
    }

    #[test]
    fn test_short_table_raises_nothing() {
        let table = with_legs(1, 3);
        let checks = run_all(&table, &AlertSettings::default());
        assert_eq!(checks.len(), 5);
        assert!(checks
            .iter()
            .filter(|check| check.kind != AlertKind::SpreadHiLo)
            .all(|check| check.alert.is_none()));
        assert!(run_all(&dated(0), &AlertSettings::default())
            .iter()
            .all(|check| check.alert.is_none()));
    }

    #[test]
    fn test_prompt_shock() {
        let mut table = with_legs(40, 2);
        table.values_mut("%CL 1!").unwrap()[39] += 1.0;
        let alert = check_prompt_shock(&table, &AlertSettings::default()).unwrap();
        assert_eq!(alert.kind, AlertKind::PromptShock);
        assert!(alert.message.starts_with("Δ +"));
        assert_eq!(alert.trace.len(), 40);

        let calm = with_legs(40, 2);
        assert!(check_prompt_shock(&calm, &AlertSettings::default()).is_none());
    }

    #[test]
    fn test_dec_red_uses_colour_spread_column() {
        let rows = 30;
        let mut table = dated(rows);
        let mut values = wiggle(rows, 1.0, 0.1);
        values[rows - 1] = 5.0;
        table.insert_column("Dec Red", ColumnKind::ColourSpread, values);

        let settings = AlertSettings {
            dec_red_window: 20,
            ..AlertSettings::default()
        };
        let alert = check_dec_red(&table, &settings).unwrap();
        assert!(alert.message.starts_with("z=+"));
        // default five-year window needs more history
        assert!(check_dec_red(&table, &AlertSettings::default()).is_none());
    }

    #[test]
    fn test_vol_spike() {
        let rows = 30;
        let mut table = dated(rows);
        let mut prices = vec![100.0; rows];
        for (i, price) in prices.iter_mut().enumerate() {
            *price += if i % 2 == 0 { 0.0 } else { 0.01 };
        }
        prices[rows - 1] = 130.0;
        table.insert_column("%CL 1!", ColumnKind::MonthLeg { ordinal: 1 }, prices);
        let alert = check_vol_spike(&table, &AlertSettings::default()).unwrap();
        assert_eq!(alert.kind, AlertKind::VolSpike);
    }

    #[test]
    fn test_spread_hi_lo() {
        let mut table = with_legs(50, 2);
        table.values_mut("%CL 1!").unwrap()[49] += 2.0;
        let alert = check_spread_hi_lo(&table, "%CL 1!", "%CL 2!", &AlertSettings::default()).unwrap();
        assert_eq!(alert.message, "New 2-yr high");

        table.values_mut("%CL 1!").unwrap()[49] -= 4.0;
        let alert = check_spread_hi_lo(&table, "%CL 1!", "%CL 2!", &AlertSettings::default()).unwrap();
        assert_eq!(alert.message, "New 2-yr low");

        assert!(check_spread_hi_lo(&table, "%CL 1!", "missing", &AlertSettings::default()).is_none());
    }

    #[test]
    fn test_curve_kink_in_the_middle() {
        let mut table = with_legs(80, 4);
        table.values_mut("%CL 3!").unwrap()[79] += 1.0;
        let alert = check_curve_kink(&table, &AlertSettings::default()).unwrap();
        assert_eq!(alert.message, "Kink at M3: +1.05");
        assert_eq!(alert.trace.len(), 4);
        assert_eq!(alert.trace[2].label, "%CL 3!");
    }

    #[test]
    fn test_alert_serializes_kind_snake_case() {
        let alert = Alert {
            kind: AlertKind::SpreadHiLo,
            message: "x".to_string(),
            trace: vec![TracePoint {
                label: "2024-01-01".to_string(),
                value: f64::NAN,
            }],
        };
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["kind"], "spread_hi_lo");
        assert!(json["trace"][0]["value"].is_null());
    }
}
