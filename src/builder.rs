//! Daily Table Builder
//!
//! One pure pass from workbook to table:
//! 1. parse the daily and weekly sheets
//! 2. drop rows after the processing date and inside exclusion windows
//! 3. synthesize pair, prompt and colour spreads on the raw trading rows
//! 4. reindex onto every calendar day and forward-fill price-like columns
//! 5. stamp release / interp columns for every weekly metric

use crate::calendar::complete_calendar;
use crate::config::BuildConfig;
use crate::instrument::ColumnKind;
use crate::spreads::{synthesize_colour_spreads, synthesize_pair_spreads, synthesize_prompt_spread};
use crate::stamping::{collect_metric_sources, stamp_metrics};
use crate::table::DailyTable;
use crate::workbook::{parse_sheet, BuildError, RawSheet, SheetSource, XlsxWorkbook};

/// Builds `DailyTable` snapshots from workbooks.
#[derive(Debug, Clone)]
pub struct DailyTableBuilder {
    config: BuildConfig,
}

impl DailyTableBuilder {
    /// Creates a builder after validating `config`.
    pub fn new(config: BuildConfig) -> Result<Self, BuildError> {
        config.validate()?;
        Ok(DailyTableBuilder { config })
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Builds a table from the bytes of an XLSX workbook.
    ///
    /// # Errors
    /// - `BuildError::Unreadable` if the bytes are not a workbook
    /// - `BuildError::MalformedWorkbook` if a sheet or date column is missing
    pub fn build_from_bytes(&self, bytes: &[u8]) -> Result<DailyTable, BuildError> {
        let mut workbook = XlsxWorkbook::from_bytes(bytes.to_vec())?;
        self.build(&mut workbook)
    }

    /// Builds a table from any sheet source.
    pub fn build(&self, source: &mut dyn SheetSource) -> Result<DailyTable, BuildError> {
        let daily_grid = source.read_grid(&self.config.daily_sheet.name)?;
        let weekly_grid = source.read_grid(&self.config.weekly_sheet.name)?;
        let daily = parse_sheet(&daily_grid, &self.config.daily_sheet)?;
        let weekly = parse_sheet(&weekly_grid, &self.config.weekly_sheet)?;
        self.build_from_sheets(daily, weekly)
    }

    /// Builds a table from already parsed sheets.
    ///
    /// # Errors
    /// `BuildError::MalformedWorkbook` if no daily row survives the
    /// processing-date and exclusion filters.
    pub fn build_from_sheets(&self, mut daily: RawSheet, mut weekly: RawSheet) -> Result<DailyTable, BuildError> {
        let config = &self.config;
        let as_of = config.resolve_as_of();

        let daily_rows = daily.dates.len();
        daily.retain_dates(|date| date <= as_of && !config.is_excluded(date));
        weekly.retain_dates(|date| date <= as_of);
        if daily.dates.len() < daily_rows {
            log::debug!(
                "dropped {} daily rows after {} or inside exclusion windows",
                daily_rows - daily.dates.len(),
                as_of
            );
        }
        if daily.is_empty() {
            return Err(BuildError::MalformedWorkbook(format!(
                "sheet '{}' has no dated rows on or before {}",
                config.daily_sheet.name, as_of
            )));
        }

        let mut table = self.raw_table(&daily);
        let pair_spreads = synthesize_pair_spreads(&mut table, config);
        synthesize_prompt_spread(&mut table, config);
        synthesize_colour_spreads(&mut table, config);

        let trading_days = table.len();
        let mut table = complete_calendar(&table, config.backfill_prices);

        let sources = collect_metric_sources(&daily, &weekly, config);
        stamp_metrics(&mut table, &sources, config.release_weekday);

        log::info!(
            "Built daily table: {} calendar days ({} trading), {} columns, {} pair spreads, {} weekly metrics",
            table.len(),
            trading_days,
            table.catalog().len(),
            pair_spreads,
            sources.len()
        );
        Ok(table)
    }

    /// Raw daily columns on the trading-day index, classified, with zero
    /// leg prices treated as missing when configured.
    fn raw_table(&self, daily: &RawSheet) -> DailyTable {
        let config = &self.config;
        let colour_names = config.colour_spread_names();

        let mut table = DailyTable::new(daily.dates.clone(), config.date_label.clone());
        for column in &daily.columns {
            let kind = match config.leg_ordinal(&column.name) {
                Some(ordinal) => ColumnKind::MonthLeg { ordinal },
                // a configured leg list is the whole month-leg set
                None => match ColumnKind::classify(
                    &column.name,
                    &config.root_symbol,
                    &config.prompt_spread,
                    &colour_names,
                ) {
                    ColumnKind::MonthLeg { .. } => ColumnKind::Metric,
                    kind => kind,
                },
            };
            let mut values = column.values.clone();
            if config.zero_is_missing && kind.is_leg() {
                for value in values.iter_mut().filter(|value| **value == 0.0) {
                    *value = f64::NAN;
                }
            }
            table.insert_column(column.name.clone(), kind, values);
        }
        table
    }
}

/// Builds a daily table from workbook bytes with `config`.
pub fn build_daily_table(bytes: &[u8], config: BuildConfig) -> Result<DailyTable, BuildError> {
    DailyTableBuilder::new(config)?.build_from_bytes(bytes)
}
