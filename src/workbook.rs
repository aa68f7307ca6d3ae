//! Sheet ingestion.
//!
//! Turns a worksheet grid into a `RawSheet`: one ascending row per date and
//! one numeric column per header. Cells that are not numbers become missing
//! rather than failing the build.

use crate::config::SheetLayout;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;

/// Errors raised while building a daily table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A required sheet or date column is absent
    MalformedWorkbook(String),
    /// The input is not a readable workbook
    Unreadable(String),
    /// The build configuration is unusable
    InvalidConfig(String),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::MalformedWorkbook(msg) => write!(f, "Malformed workbook: {}", msg),
            BuildError::Unreadable(msg) => write!(f, "Unreadable workbook: {}", msg),
            BuildError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for BuildError {}

/// A single worksheet cell, reduced to what the builder cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    /// Numeric value of the cell; anything non-numeric is missing (NaN).
    pub fn as_number(&self) -> f64 {
        match self {
            Cell::Number(value) if value.is_finite() => *value,
            Cell::Text(text) => text.trim().parse::<f64>().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }

    /// Calendar date of the cell, if it holds one.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(date) => Some(*date),
            Cell::Number(serial) => excel_serial_to_date(*serial),
            Cell::Text(text) => parse_date_text(text),
            Cell::Empty => None,
        }
    }

    /// Header text of the cell, trimmed. Empty cells have no header.
    pub fn header(&self) -> Option<String> {
        let text = match self {
            Cell::Empty => return None,
            Cell::Text(text) => text.trim().to_string(),
            Cell::Number(value) => value.to_string(),
            Cell::Date(date) => date.format("%Y-%m-%d").to_string(),
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Rows of cells, indexed from the top-left corner of the worksheet (A1).
pub type Grid = Vec<Vec<Cell>>;

/// Source of worksheet grids.
///
/// Implementations:
/// - `XlsxWorkbook` reads an uploaded XLSX file
/// - `InMemoryWorkbook` holds grids directly (tests, CSV exports)
pub trait SheetSource {
    /// Returns the grid of `sheet`.
    ///
    /// # Errors
    /// `BuildError::MalformedWorkbook` if the sheet does not exist.
    fn read_grid(&mut self, sheet: &str) -> Result<Grid, BuildError>;
}

/// XLSX workbook backed by calamine.
pub struct XlsxWorkbook {
    inner: Xlsx<Cursor<Vec<u8>>>,
}

impl XlsxWorkbook {
    /// Opens a workbook from its raw bytes.
    ///
    /// # Errors
    /// `BuildError::Unreadable` if the bytes are not an XLSX file.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, BuildError> {
        let inner = open_workbook_from_rs::<Xlsx<_>, _>(Cursor::new(bytes))
            .map_err(|e| BuildError::Unreadable(e.to_string()))?;
        Ok(XlsxWorkbook { inner })
    }

    /// Names of the worksheets in the workbook.
    pub fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names()
    }
}

impl SheetSource for XlsxWorkbook {
    fn read_grid(&mut self, sheet: &str) -> Result<Grid, BuildError> {
        if !self.inner.sheet_names().iter().any(|name| name == sheet) {
            return Err(BuildError::MalformedWorkbook(format!(
                "sheet '{}' not found",
                sheet
            )));
        }
        let range = self
            .inner
            .worksheet_range(sheet)
            .map_err(|e| BuildError::Unreadable(format!("sheet '{}': {}", sheet, e)))?;

        // calamine ranges start at the first used cell, not at A1
        let (start_row, start_col) = range
            .start()
            .map(|(row, col)| (row as usize, col as usize))
            .unwrap_or((0, 0));

        let mut grid: Grid = vec![Vec::new(); start_row];
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; start_col];
            cells.extend(row.iter().map(convert_cell));
            grid.push(cells);
        }
        Ok(grid)
    }
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Float(value) => Cell::Number(*value),
        Data::String(text) => Cell::Text(text.clone()),
        Data::DateTime(value) => excel_serial_to_date(value.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Empty),
        Data::DateTimeIso(text) => parse_date_text(text)
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(text.clone())),
        Data::DurationIso(_) | Data::Bool(_) | Data::Error(_) | Data::Empty => Cell::Empty,
    }
}

/// Workbook whose sheets are held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkbook {
    sheets: HashMap<String, Grid>,
}

impl InMemoryWorkbook {
    pub fn new() -> Self {
        InMemoryWorkbook {
            sheets: HashMap::new(),
        }
    }

    /// Adds (or replaces) a sheet.
    pub fn add_sheet(&mut self, name: impl Into<String>, grid: Grid) {
        self.sheets.insert(name.into(), grid);
    }

    /// Adds a sheet parsed from CSV text. Every record becomes a grid row;
    /// numeric fields become numbers, everything else text.
    pub fn add_csv_sheet(&mut self, name: impl Into<String>, csv_text: &str) -> Result<(), BuildError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(csv_text.as_bytes());

        let mut grid = Grid::new();
        for record in reader.records() {
            let record = record.map_err(|e| BuildError::Unreadable(format!("CSV error: {}", e)))?;
            grid.push(record.iter().map(csv_field_to_cell).collect());
        }
        self.add_sheet(name, grid);
        Ok(())
    }
}

fn csv_field_to_cell(field: &str) -> Cell {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    match trimmed.parse::<f64>() {
        Ok(value) => Cell::Number(value),
        Err(_) => Cell::Text(field.to_string()),
    }
}

impl SheetSource for InMemoryWorkbook {
    fn read_grid(&mut self, sheet: &str) -> Result<Grid, BuildError> {
        self.sheets.get(sheet).cloned().ok_or_else(|| {
            BuildError::MalformedWorkbook(format!("sheet '{}' not found", sheet))
        })
    }
}

/// One named numeric column of a raw sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// A parsed sheet: unique ascending dates and one value per column per date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSheet {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<RawColumn>,
}

impl RawSheet {
    pub fn column(&self, name: &str) -> Option<&RawColumn> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Keeps only the rows whose date satisfies `keep`.
    pub fn retain_dates<F>(&mut self, keep: F)
    where
        F: Fn(NaiveDate) -> bool,
    {
        let mask: Vec<bool> = self.dates.iter().map(|date| keep(*date)).collect();
        let mut flags = mask.iter();
        self.dates.retain(|_| *flags.next().unwrap_or(&false));
        for column in &mut self.columns {
            let mut flags = mask.iter();
            column.values.retain(|_| *flags.next().unwrap_or(&false));
        }
    }
}

/// Parses a sheet grid according to `layout`.
///
/// Rows with a blank or unparseable date are skipped, rows are sorted by
/// date, and for duplicate dates the last row wins.
///
/// # Errors
/// `BuildError::MalformedWorkbook` if the header row or the date column is
/// missing.
pub fn parse_sheet(grid: &Grid, layout: &SheetLayout) -> Result<RawSheet, BuildError> {
    let header = grid.get(layout.header_row).ok_or_else(|| {
        BuildError::MalformedWorkbook(format!(
            "sheet '{}' has no header row {}",
            layout.name,
            layout.header_row + 1
        ))
    })?;

    let last_column = layout
        .last_column
        .unwrap_or(usize::MAX)
        .min(header.len().saturating_sub(1));

    let mut seen = HashSet::new();
    let mut headers: Vec<(usize, String)> = Vec::new();
    for index in layout.first_column..=last_column {
        let Some(name) = header.get(index).and_then(Cell::header) else {
            continue;
        };
        if seen.insert(name.clone()) {
            headers.push((index, name));
        } else {
            log::debug!("sheet '{}': duplicate header '{}' ignored", layout.name, name);
        }
    }

    // Without a configured name the first column of the window is the date,
    // whatever its header says (it is often blank)
    let date_index = match &layout.date_column {
        Some(date_column) => headers
            .iter()
            .find(|(_, name)| name == date_column)
            .map(|(index, _)| *index),
        None => Some(layout.first_column).filter(|index| *index < header.len()),
    };
    let date_index = date_index.ok_or_else(|| {
        BuildError::MalformedWorkbook(format!(
            "sheet '{}' has no date column '{}'",
            layout.name,
            layout.date_column.as_deref().unwrap_or("<first column>")
        ))
    })?;
    headers.retain(|(index, _)| *index != date_index);

    let mut rows: Vec<(NaiveDate, Vec<f64>)> = Vec::new();
    let mut skipped = 0usize;
    for row in grid.iter().skip(layout.header_row + 1) {
        let Some(date) = row.get(date_index).and_then(Cell::as_date) else {
            skipped += 1;
            continue;
        };
        let values = headers
            .iter()
            .map(|(index, _)| row.get(*index).map(Cell::as_number).unwrap_or(f64::NAN))
            .collect();
        rows.push((date, values));
    }
    if skipped > 0 {
        log::debug!(
            "sheet '{}': skipped {} rows without a usable date",
            layout.name,
            skipped
        );
    }

    // Stable sort keeps sheet order among equal dates, so the last one wins below
    rows.sort_by_key(|(date, _)| *date);
    let mut deduped: Vec<(NaiveDate, Vec<f64>)> = Vec::with_capacity(rows.len());
    for (date, values) in rows {
        match deduped.last_mut() {
            Some(last) if last.0 == date => {
                log::warn!(
                    "sheet '{}': duplicate date {}, keeping the later row",
                    layout.name,
                    date
                );
                last.1 = values;
            }
            _ => deduped.push((date, values)),
        }
    }

    let dates = deduped.iter().map(|(date, _)| *date).collect();
    let columns = headers
        .into_iter()
        .enumerate()
        .map(|(position, (_, name))| RawColumn {
            name,
            values: deduped.iter().map(|(_, values)| values[position]).collect(),
        })
        .collect();

    Ok(RawSheet { dates, columns })
}

/// Converts an Excel serial day number (1900 date system) to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%d-%b-%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parses the date formats seen in workbook exports.
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|datetime| datetime.date())
        })
}
