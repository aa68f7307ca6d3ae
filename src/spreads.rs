//! Spread synthesis.
//!
//! Spreads are computed from the raw same-day leg prices, before any
//! forward-fill, so a spread never mixes a fresh price with a stale one.

use crate::config::{BuildConfig, ColourSpreadSpec};
use crate::instrument::{calendar_leg_name, spread_name, ColumnKind};
use crate::table::DailyTable;
use chrono::Datelike;

/// Row-wise `near - far`; missing on either side gives missing.
pub fn subtract(near: &[f64], far: &[f64]) -> Vec<f64> {
    near.iter().zip(far.iter()).map(|(n, f)| n - f).collect()
}

/// Adds `"<near> - <far>"` for every pair of month legs up to
/// `config.max_pair_leg`, nearer leg first. Returns the number of spreads.
pub fn synthesize_pair_spreads(table: &mut DailyTable, config: &BuildConfig) -> usize {
    let legs: Vec<String> = table
        .catalog()
        .month_legs(config.max_pair_leg)
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut count = 0;
    for (position, near) in legs.iter().enumerate() {
        for far in &legs[position + 1..] {
            let (Some(near_values), Some(far_values)) = (table.column(near), table.column(far)) else {
                continue;
            };
            let values = subtract(near_values, far_values);
            table.insert_column(
                spread_name(near, far),
                ColumnKind::Spread {
                    near: near.clone(),
                    far: far.clone(),
                },
                values,
            );
            count += 1;
        }
    }
    count
}

/// Adds the prompt spread (leg 1 - leg 2) unless the sheet already has it.
/// Returns false when it was neither present nor derivable.
pub fn synthesize_prompt_spread(table: &mut DailyTable, config: &BuildConfig) -> bool {
    if table.has_column(&config.prompt_spread) {
        return true;
    }
    let (Some(front), Some(second)) = (config.leg_name(1), config.leg_name(2)) else {
        log::debug!("'{}' not synthesized: fewer than two legs configured", config.prompt_spread);
        return false;
    };
    let (Some(front_values), Some(second_values)) = (table.column(&front), table.column(&second)) else {
        log::debug!(
            "'{}' not synthesized: '{}' or '{}' missing",
            config.prompt_spread,
            front,
            second
        );
        return false;
    };
    let values = subtract(front_values, second_values);
    table.insert_column(config.prompt_spread.clone(), ColumnKind::PromptSpread, values);
    true
}

/// Leg names a colour spread resolves to for a row dated in `year`.
pub fn resolve_colour_legs(spec: &ColourSpreadSpec, year: i32, config: &BuildConfig) -> (String, String) {
    (
        calendar_leg_name(&config.root_symbol, config.colour_month, year + spec.near_offset),
        calendar_leg_name(&config.root_symbol, config.colour_month, year + spec.far_offset),
    )
}

/// Adds every configured colour spread. Each row looks up the legs for its
/// own calendar year; a leg column that does not exist reads as missing.
pub fn synthesize_colour_spreads(table: &mut DailyTable, config: &BuildConfig) -> usize {
    for spec in &config.colour_spreads {
        let values: Vec<f64> = table
            .dates()
            .iter()
            .enumerate()
            .map(|(row, date)| {
                let (near, far) = resolve_colour_legs(spec, date.year(), config);
                let near_value = table.column(&near).map_or(f64::NAN, |values| values[row]);
                let far_value = table.column(&far).map_or(f64::NAN, |values| values[row]);
                near_value - far_value
            })
            .collect();
        table.insert_column(spec.name.clone(), ColumnKind::ColourSpread, values);
    }
    config.colour_spreads.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::month_leg_name;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn leg_table(legs: &[(u32, Vec<f64>)]) -> DailyTable {
        let len = legs.first().map_or(0, |(_, values)| values.len());
        let dates = (0..len).map(|i| day(2024, 1, 2 + i as u32)).collect();
        let mut table = DailyTable::new(dates, "Date");
        for (ordinal, values) in legs {
            table.insert_column(
                month_leg_name("CL", *ordinal),
                ColumnKind::MonthLeg { ordinal: *ordinal },
                values.clone(),
            );
        }
        table
    }

    #[test]
    fn test_pair_spreads_near_minus_far() {
        let mut table = leg_table(&[
            (2, vec![69.0, 70.0]),
            (1, vec![70.0, 72.0]),
            (3, vec![68.0, f64::NAN]),
        ]);
        let count = synthesize_pair_spreads(&mut table, &BuildConfig::default());
        assert_eq!(count, 3);
        assert_eq!(table.column("%CL 1! - %CL 2!").unwrap(), &[1.0, 2.0]);
        assert_eq!(table.column("%CL 1! - %CL 3!").unwrap()[0], 2.0);
        assert!(table.column("%CL 2! - %CL 3!").unwrap()[1].is_nan());
        assert!(!table.has_column("%CL 2! - %CL 1!"));
    }

    #[test]
    fn test_pair_spreads_respect_leg_cap() {
        let legs: Vec<(u32, Vec<f64>)> = (1..=14).map(|n| (n, vec![100.0 - n as f64])).collect();
        let mut table = leg_table(&legs);
        let count = synthesize_pair_spreads(&mut table, &BuildConfig::default());
        assert_eq!(count, 12 * 11 / 2);
        assert!(table.has_column("%CL 11! - %CL 12!"));
        assert!(!table.has_column("%CL 12! - %CL 13!"));
    }

    #[test]
    fn test_prompt_spread_synthesized_when_absent() {
        let mut table = leg_table(&[(1, vec![70.0]), (2, vec![69.5])]);
        assert!(synthesize_prompt_spread(&mut table, &BuildConfig::default()));
        assert_eq!(table.column("Prompt Spread").unwrap(), &[0.5]);
        assert_eq!(table.column_kind("Prompt Spread"), Some(&ColumnKind::PromptSpread));
    }

    #[test]
    fn test_prompt_spread_kept_when_present() {
        let mut table = leg_table(&[(1, vec![70.0]), (2, vec![69.5])]);
        table.insert_column("Prompt Spread", ColumnKind::PromptSpread, vec![9.0]);
        assert!(synthesize_prompt_spread(&mut table, &BuildConfig::default()));
        assert_eq!(table.column("Prompt Spread").unwrap(), &[9.0]);
    }

    #[test]
    fn test_prompt_spread_skipped_without_legs() {
        let mut table = leg_table(&[(1, vec![70.0])]);
        assert!(!synthesize_prompt_spread(&mut table, &BuildConfig::default()));
        assert!(!table.has_column("Prompt Spread"));
    }

    #[test]
    fn test_colour_legs_resolve_by_year() {
        let config = BuildConfig::default();
        let dec_red = &config.colour_spreads[0];
        let blue_green = &config.colour_spreads[2];
        assert_eq!(
            resolve_colour_legs(dec_red, 2024, &config),
            ("CL Z24".to_string(), "CL Z25".to_string())
        );
        assert_eq!(
            resolve_colour_legs(blue_green, 2024, &config),
            ("CL Z26".to_string(), "CL Z27".to_string())
        );
    }

    #[test]
    fn test_colour_spread_rolls_across_year_end() {
        let mut table = DailyTable::new(vec![day(2024, 12, 31), day(2025, 1, 2)], "Date");
        for (year, values) in [(2024, [70.0, 71.0]), (2025, [68.0, 69.0]), (2026, [65.0, 67.0])] {
            table.insert_column(
                calendar_leg_name("CL", 'Z', year),
                ColumnKind::CalendarLeg { month: 'Z', year },
                values.to_vec(),
            );
        }
        synthesize_colour_spreads(&mut table, &BuildConfig::default());

        let dec_red = table.column("Dec Red").unwrap();
        assert_eq!(dec_red[0], 70.0 - 68.0);
        assert_eq!(dec_red[1], 69.0 - 67.0);

        // Z27 is not listed: missing, not an error
        let red_blue = table.column("Red/Blue").unwrap();
        assert_eq!(red_blue[0], 68.0 - 65.0);
        assert!(red_blue[1].is_nan());
    }
}
