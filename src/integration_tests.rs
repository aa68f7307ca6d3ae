// Integration tests for end-to-end workflows and critical user scenarios

#[cfg(test)]
mod integration_tests {
    use crate::analytics::{curve_on_date, run_all, spread_points, summary_stats, AlertKind, AlertSettings};
    use crate::builder::DailyTableBuilder;
    use crate::cache::{content_key, TableCache};
    use crate::calendar::complete_calendar;
    use crate::config::BuildConfig;
    use crate::instrument::ColumnKind;
    use crate::store::SqliteTableStore;
    use crate::table::DailyTable;
    use crate::time_series::{DataProvider, DateRange};
    use crate::workbook::{Cell, InMemoryWorkbook};
    use chrono::{Datelike, NaiveDate, Weekday};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn num(value: Option<f64>) -> Cell {
        value.map_or(Cell::Empty, Cell::Number)
    }

    fn config() -> BuildConfig {
        BuildConfig {
            as_of: Some(day(2024, 1, 31)),
            ..BuildConfig::default()
        }
    }

    /// Daily sheet grid: five filler rows, then the header row.
    fn daily_grid(headers: &[&str], rows: &[(NaiveDate, Vec<Option<f64>>)]) -> Vec<Vec<Cell>> {
        let mut grid = vec![vec![Cell::Empty]; 5];
        let mut header = vec![text("Date (Day)")];
        header.extend(headers.iter().map(|h| text(h)));
        grid.push(header);
        for (date, values) in rows {
            let mut row = vec![text(&date.format("%Y-%m-%d").to_string())];
            row.extend(values.iter().map(|v| num(*v)));
            grid.push(row);
        }
        grid
    }

    /// Thursday 4th to Thursday 11th January 2024 with a weekend in the
    /// middle, a zero settle on Tuesday and a blank second leg on Thursday.
    fn scenario_workbook() -> InMemoryWorkbook {
        let headers = ["%CL 1!", "%CL 2!", "CL Z24", "CL Z25"];
        let rows = vec![
            (day(2024, 1, 4), vec![Some(72.0), Some(71.0), Some(70.0), Some(68.0)]),
            (day(2024, 1, 5), vec![Some(73.0), Some(71.5), Some(70.5), Some(68.5)]),
            (day(2024, 1, 8), vec![Some(74.0), Some(72.0), Some(71.0), Some(69.0)]),
            (day(2024, 1, 9), vec![Some(0.0), Some(72.5), Some(71.5), Some(69.0)]),
            (day(2024, 1, 10), vec![Some(75.0), Some(73.5), Some(72.0), Some(69.5)]),
            (day(2024, 1, 11), vec![Some(75.5), None, Some(72.5), Some(70.0)]),
        ];

        let mut workbook = InMemoryWorkbook::new();
        workbook.add_sheet("Daily Data", daily_grid(&headers, &rows));
        workbook
            .add_csv_sheet(
                "EIA WEEKLY DATA",
                "EIA,\n,\nWeek Ending,Crude Stocks\n2023-12-29,40.0\n2024-01-05,50.0\n",
            )
            .unwrap();
        workbook
    }

    fn scenario_table() -> DailyTable {
        let builder = DailyTableBuilder::new(config()).unwrap();
        builder.build(&mut scenario_workbook()).unwrap()
    }

    /// Test end-to-end workflow: Workbook -> Daily table with every calendar day
    #[test]
    fn test_calendar_is_complete() {
        let table = scenario_table();

        assert_eq!(table.first_date(), Some(day(2024, 1, 4)));
        assert_eq!(table.last_date(), Some(day(2024, 1, 11)));
        assert_eq!(table.len(), 8);
        for pair in table.dates().windows(2) {
            assert_eq!((pair[1] - pair[0]).num_days(), 1);
        }

        // Weekend carries Friday's settle
        assert_eq!(table.value("%CL 1!", day(2024, 1, 6)), Some(73.0));
        assert_eq!(table.value("%CL 1!", day(2024, 1, 7)), Some(73.0));
        // Zero settle is missing, then filled from Monday
        assert_eq!(table.value("%CL 1!", day(2024, 1, 9)), Some(74.0));
    }

    #[test]
    fn test_spreads_use_same_day_prices() {
        let table = scenario_table();
        let spread = "%CL 1! - %CL 2!";

        assert_eq!(table.value(spread, day(2024, 1, 4)), Some(1.0));
        assert_eq!(table.value(spread, day(2024, 1, 6)), Some(1.5));
        // Tuesday's leg 1 was missing on the sheet: the spread carries
        // Monday's 2.0 instead of 74.0 - 72.5
        assert_eq!(table.value(spread, day(2024, 1, 9)), Some(2.0));
        // Thursday's leg 2 was blank: carries Wednesday's 1.5, not 75.5 - 73.5
        assert_eq!(table.value(spread, day(2024, 1, 11)), Some(1.5));

        assert_eq!(table.value("Prompt Spread", day(2024, 1, 9)), Some(2.0));
        assert_eq!(table.column_kind("Prompt Spread"), Some(&ColumnKind::PromptSpread));
    }

    #[test]
    fn test_weekly_metric_released_on_wednesday() {
        let table = scenario_table();
        let release = "Crude Stocks (Release)";

        // Friday 29 Dec observation was released Wednesday 3 Jan
        assert_eq!(table.value(release, day(2024, 1, 4)), Some(40.0));
        // Friday 5 Jan observation is not known until Wednesday 10 Jan
        assert_eq!(table.value(release, day(2024, 1, 5)), Some(40.0));
        assert_eq!(table.value(release, day(2024, 1, 9)), Some(40.0));
        assert_eq!(table.value(release, day(2024, 1, 10)), Some(50.0));
        assert_eq!(table.value(release, day(2024, 1, 11)), Some(50.0));

        // Values only ever change on a release day
        let values = table.column(release).unwrap();
        for (row, pair) in values.windows(2).enumerate() {
            if pair[0] != pair[1] {
                assert_eq!(table.dates()[row + 1].weekday(), Weekday::Wed);
            }
        }
    }

    #[test]
    fn test_weekly_metric_interpolated() {
        let table = scenario_table();
        let interp = table.column("Crude Stocks (Interp)").unwrap();

        // 6 of the 7 days from 29 Dec to 5 Jan
        assert!((interp[0] - (40.0 + 10.0 * 6.0 / 7.0)).abs() < 1e-9);
        assert_eq!(interp[1], 50.0);
        assert!(interp[2..].iter().all(|v| *v == 50.0));
    }

    #[test]
    fn test_completion_is_idempotent() {
        let table = scenario_table();
        assert!(complete_calendar(&table, false).same_contents(&table));
    }

    #[test]
    fn test_colour_spread_rolls_with_calendar_year() {
        let headers = ["%CL 1!", "%CL 2!", "CL Z23", "CL Z24", "CL Z25"];
        let rows = vec![
            (day(2023, 12, 29), vec![Some(71.0), Some(70.5), Some(71.2), Some(69.0), Some(67.5)]),
            (day(2024, 1, 2), vec![Some(70.0), Some(69.8), None, Some(68.0), Some(67.0)]),
        ];
        let mut workbook = InMemoryWorkbook::new();
        workbook.add_sheet("Daily Data", daily_grid(&headers, &rows));
        workbook.add_sheet("EIA WEEKLY DATA", vec![vec![Cell::Empty], vec![Cell::Empty], vec![text("Week")]]);

        let table = DailyTableBuilder::new(config()).unwrap().build(&mut workbook).unwrap();

        let dec_red = table.column("Dec Red").unwrap();
        // 2023 rows use Z23 - Z24, 2024 rows use Z24 - Z25
        assert!((dec_red[0] - 2.2).abs() < 1e-9);
        assert!((dec_red[table.len() - 1] - 1.0).abs() < 1e-9);
        // Red/Blue in 2023 is Z24 - Z25
        assert!((table.column("Red/Blue").unwrap()[0] - 1.5).abs() < 1e-9);
        // Blue/Green has no Z26/Z27 legs
        assert!(table.column("Blue/Green").unwrap().iter().all(|v| v.is_nan()));
    }

    /// Test end-to-end workflow: Build -> Persist -> Reload -> Query
    #[test]
    fn test_store_round_trip_and_provider() {
        let table = scenario_table();
        let mut store = SqliteTableStore::new_in_memory().unwrap();
        store.save_table(&table).unwrap();

        let reloaded = store.load_table().unwrap();
        assert!(reloaded.same_contents(&table));

        let range = DateRange::new(day(2024, 1, 8), day(2024, 1, 10));
        let from_store = store.get_series("Dec Red", &range).unwrap();
        let from_table = table.get_series("Dec Red", &range).unwrap();
        assert_eq!(from_store, from_table);
        assert_eq!(from_table.len(), 3);
    }

    #[test]
    fn test_cache_shares_snapshot_between_identical_uploads() {
        let cache = TableCache::new(2);
        let table = scenario_table();
        let first = cache.insert(content_key(b"workbook", &config()), table.clone());
        let second = cache.insert(content_key(b"workbook", &config()), table);
        assert!(std::sync::Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    /// Test end-to-end workflow: Build -> Analytics consumers
    #[test]
    fn test_analytics_over_built_table() {
        let table = scenario_table();

        let curve = curve_on_date(&table, day(2024, 1, 11), 12).unwrap();
        assert_eq!(curve.len(), 2);
        assert_eq!(curve[0].value, 75.5);
        // Leg 2 was forward-filled from Wednesday
        assert_eq!(curve[1].value, 73.5);

        let points = spread_points(&table, "CL Z24", "CL Z25", None, None).unwrap();
        let summary = summary_stats(&points).unwrap();
        assert_eq!(summary.observations, 8);
        assert!((summary.high - 2.5).abs() < 1e-9);
        assert_eq!(summary.high_date, day(2024, 1, 9));

        // Only the hi/lo check works on a week of history: the front spread
        // closes at 75.5 - 73.5 = 2.0, level with Monday's high
        let checks = run_all(&table, &AlertSettings::default());
        for check in &checks {
            match check.kind {
                AlertKind::SpreadHiLo => {
                    assert_eq!(check.alert.as_ref().unwrap().message, "New 2-yr high");
                }
                _ => assert!(check.alert.is_none()),
            }
        }
    }
}
