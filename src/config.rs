//! Build configuration for the daily table.
//!
//! Every variant of the pipeline (zero handling, excluded windows, how far
//! the spread ladder goes) is a named flag here rather than a separate
//! code path.

use crate::instrument::{month_leg_name, parse_month_leg, MONTH_CODES};
use crate::time_series::DateRange;
use crate::workbook::BuildError;
use chrono::{NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where a sheet's table lives inside its worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetLayout {
    /// Worksheet name
    pub name: String,
    /// Zero-based row index of the header row (rows above it are skipped)
    pub header_row: usize,
    /// Zero-based index of the first column read
    #[serde(default)]
    pub first_column: usize,
    /// Zero-based index of the last column read (inclusive); `None` reads to the end
    #[serde(default)]
    pub last_column: Option<usize>,
    /// Header of the date column; `None` uses the first column of the window
    #[serde(default)]
    pub date_column: Option<String>,
}

impl SheetLayout {
    /// Layout of the "Daily Data" settle sheet: headers on row 6, all columns.
    pub fn daily_default() -> Self {
        SheetLayout {
            name: "Daily Data".to_string(),
            header_row: 5,
            first_column: 0,
            last_column: None,
            date_column: Some("Date (Day)".to_string()),
        }
    }

    /// Layout of the "EIA WEEKLY DATA" sheet: headers on row 3, columns A:P.
    pub fn weekly_default() -> Self {
        SheetLayout {
            name: "EIA WEEKLY DATA".to_string(),
            header_row: 2,
            first_column: 0,
            last_column: Some(15),
            date_column: None,
        }
    }
}

/// A rolling calendar-year spread, e.g. "Dec Red" = Z(Y) - Z(Y+1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColourSpreadSpec {
    pub name: String,
    /// Year offset of the near leg relative to the row's year
    pub near_offset: i32,
    /// Year offset of the far leg relative to the row's year
    pub far_offset: i32,
}

impl ColourSpreadSpec {
    pub fn new(name: impl Into<String>, near_offset: i32, far_offset: i32) -> Self {
        ColourSpreadSpec {
            name: name.into(),
            near_offset,
            far_offset,
        }
    }
}

/// Configuration of the daily table build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Layout of the daily settle sheet
    pub daily_sheet: SheetLayout,
    /// Layout of the weekly inventory sheet
    pub weekly_sheet: SheetLayout,
    /// Product root used in leg names (`%CL 1!`, `CL Z25`)
    pub root_symbol: String,
    /// Explicit ordered leg columns, front first; ordinals follow list
    /// position. `None` recognises legs by the `%<root> <n>!` pattern.
    pub legs: Option<Vec<String>>,
    /// Highest month-leg ordinal paired into spreads
    pub max_pair_leg: u32,
    /// Name of the M1 - M2 shorthand spread
    pub prompt_spread: String,
    /// Delivery month code used by the colour spreads
    pub colour_month: char,
    /// Colour spreads synthesized from calendar legs
    pub colour_spreads: Vec<ColourSpreadSpec>,
    /// Weekday on which weekly numbers become public
    pub release_weekday: Weekday,
    /// Metrics that may live on the daily sheet and still get weekly treatment
    pub daily_native_metrics: Vec<String>,
    /// Windows whose daily rows are dropped before the build.
    ///
    /// Calendar completion reinstates the dates with prices carried from
    /// the last row before the window, so statistics over the table count
    /// those rows unless the window is excluded again at query time. The
    /// `/spread` endpoint does that when no other window is requested.
    pub exclusions: Vec<DateRange>,
    /// Treat a zero leg price as missing
    pub zero_is_missing: bool,
    /// Back-fill leading gaps of price-like columns
    pub backfill_prices: bool,
    /// Processing date; rows after it are dropped. `None` means today (UTC).
    pub as_of: Option<NaiveDate>,
    /// Header of the date column in exported tables
    pub date_label: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            daily_sheet: SheetLayout::daily_default(),
            weekly_sheet: SheetLayout::weekly_default(),
            root_symbol: "CL".to_string(),
            legs: None,
            max_pair_leg: 12,
            prompt_spread: "Prompt Spread".to_string(),
            colour_month: 'Z',
            colour_spreads: vec![
                ColourSpreadSpec::new("Dec Red", 0, 1),
                ColourSpreadSpec::new("Red/Blue", 1, 2),
                ColourSpreadSpec::new("Blue/Green", 2, 3),
            ],
            release_weekday: Weekday::Wed,
            daily_native_metrics: vec!["Cushing Stocks (Mbbl)".to_string()],
            exclusions: Vec::new(),
            zero_is_missing: true,
            backfill_prices: false,
            as_of: None,
            date_label: "Date".to_string(),
        }
    }
}

impl BuildConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, BuildError> {
        let config: BuildConfig = serde_json::from_str(json)
            .map_err(|e| BuildError::InvalidConfig(format!("JSON error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, BuildError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            BuildError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Checks the configuration for values the builder cannot work with.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.root_symbol.is_empty() {
            return Err(BuildError::InvalidConfig(
                "root symbol cannot be empty".to_string(),
            ));
        }
        if !self.root_symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(BuildError::InvalidConfig(format!(
                "root symbol '{}' contains invalid characters",
                self.root_symbol
            )));
        }
        if self.max_pair_leg == 0 {
            return Err(BuildError::InvalidConfig(
                "max_pair_leg must be at least 1".to_string(),
            ));
        }
        if !MONTH_CODES.contains(&self.colour_month) {
            return Err(BuildError::InvalidConfig(format!(
                "'{}' is not a futures month code",
                self.colour_month
            )));
        }
        for layout in [&self.daily_sheet, &self.weekly_sheet] {
            if let Some(last) = layout.last_column {
                if last < layout.first_column {
                    return Err(BuildError::InvalidConfig(format!(
                        "sheet '{}' has last column before first column",
                        layout.name
                    )));
                }
            }
        }
        if let Some(legs) = &self.legs {
            if legs.is_empty() {
                return Err(BuildError::InvalidConfig(
                    "leg list cannot be empty".to_string(),
                ));
            }
            if let Some(blank) = legs.iter().find(|leg| leg.trim().is_empty()) {
                return Err(BuildError::InvalidConfig(format!(
                    "leg name '{}' is blank",
                    blank
                )));
            }
            for (position, leg) in legs.iter().enumerate() {
                if legs[..position].contains(leg) {
                    return Err(BuildError::InvalidConfig(format!(
                        "leg '{}' listed twice",
                        leg
                    )));
                }
            }
        }
        if let Some(window) = self.exclusions.iter().find(|window| !window.is_valid()) {
            return Err(BuildError::InvalidConfig(format!(
                "exclusion window {} to {} ends before it starts",
                window.start, window.end
            )));
        }
        Ok(())
    }

    /// The processing date: `as_of` if set, otherwise today in UTC.
    pub fn resolve_as_of(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Ordinal of a month-leg column, front month = 1.
    pub fn leg_ordinal(&self, name: &str) -> Option<u32> {
        match &self.legs {
            Some(legs) => legs
                .iter()
                .position(|leg| leg == name)
                .map(|position| position as u32 + 1),
            None => parse_month_leg(&self.root_symbol, name),
        }
    }

    /// Column name of the month leg with `ordinal`. `None` when a leg list
    /// is configured and is shorter than `ordinal`.
    pub fn leg_name(&self, ordinal: u32) -> Option<String> {
        match &self.legs {
            Some(legs) => ordinal
                .checked_sub(1)
                .and_then(|position| legs.get(position as usize))
                .cloned(),
            None => Some(month_leg_name(&self.root_symbol, ordinal)),
        }
    }

    /// Names of the configured colour spreads.
    pub fn colour_spread_names(&self) -> Vec<&str> {
        self.colour_spreads
            .iter()
            .map(|spec| spec.name.as_str())
            .collect()
    }

    /// Returns true if `date` falls in any exclusion window.
    pub fn is_excluded(&self, date: NaiveDate) -> bool {
        self.exclusions.iter().any(|window| window.contains(date))
    }
}
