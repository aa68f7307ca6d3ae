use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single dated observation of one table column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Calendar date of the observation
    pub date: NaiveDate,
    /// Observed value
    pub value: f64,
}

impl SeriesPoint {
    /// Creates a new SeriesPoint.
    pub fn new(date: NaiveDate, value: f64) -> Self {
        SeriesPoint { date, value }
    }
}

/// Inclusive date range used for queries, slicing and exclusion windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// Start date (inclusive)
    pub start: NaiveDate,
    /// End date (inclusive)
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new DateRange.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Returns true when `start <= end`.
    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    /// Returns true if `date` falls inside the range (both ends inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, zero for an invalid range.
    pub fn num_days(&self) -> usize {
        if !self.is_valid() {
            return 0;
        }
        (self.end - self.start).num_days() as usize + 1
    }
}

/// Read access to dated column values.
///
/// Implemented by the in-memory `DailyTable` snapshot and by the SQLite
/// export, so consumers can query a column without knowing where the
/// table lives.
pub trait DataProvider {
    /// Retrieves the non-missing values of `column` within `date_range`.
    ///
    /// # Arguments
    /// * `column` - Exact column name (e.g. `"%CL 1! - %CL 2!"`)
    /// * `date_range` - The date range to query (inclusive on both ends)
    ///
    /// # Errors
    /// Returns an error if the column is unknown, the date range is invalid,
    /// or the backing store cannot be read.
    fn get_series(
        &self,
        column: &str,
        date_range: &DateRange,
    ) -> Result<Vec<SeriesPoint>, DataProviderError>;
}

/// Errors that can occur when querying a data provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataProviderError {
    /// Column not present in the table
    ColumnNotFound(String),
    /// Invalid date range (e.g., start > end)
    InvalidDateRange,
    /// Generic error message
    Other(String),
}

impl std::fmt::Display for DataProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataProviderError::ColumnNotFound(name) => write!(f, "Column not found: {}", name),
            DataProviderError::InvalidDateRange => write!(f, "Invalid date range"),
            DataProviderError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for DataProviderError {}

/// Collects the non-missing entries of a column into dated points.
pub fn to_points(dates: &[NaiveDate], values: &[f64]) -> Vec<SeriesPoint> {
    dates
        .iter()
        .zip(values.iter())
        .filter(|(_, value)| !value.is_nan())
        .map(|(date, value)| SeriesPoint::new(*date, *value))
        .collect()
}
