//! The daily table snapshot.
//!
//! A `DailyTable` is built once per workbook and then only read. Consumers
//! that need a narrower view take a derived copy with `slice` or `select`.

use crate::instrument::{ColumnCatalog, ColumnKind, ColumnSpec};
use crate::time_series::{to_points, DataProvider, DataProviderError, DateRange, SeriesPoint};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Write;

/// One column of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    values: Vec<f64>,
}

impl Column {
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Date-indexed table of instrument columns. Missing values are NaN.
#[derive(Debug, Clone)]
pub struct DailyTable {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    date_label: String,
}

impl DailyTable {
    /// Creates an empty table over `dates` (must be unique and ascending).
    pub(crate) fn new(dates: Vec<NaiveDate>, date_label: impl Into<String>) -> Self {
        DailyTable {
            dates,
            columns: Vec::new(),
            index: HashMap::new(),
            date_label: date_label.into(),
        }
    }

    /// Adds a column, replacing the values of an existing column of the same
    /// name in place (its position is kept).
    pub(crate) fn insert_column(&mut self, name: impl Into<String>, kind: ColumnKind, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.dates.len());
        let name = name.into();
        match self.index.get(&name) {
            Some(&position) => {
                self.columns[position].kind = kind;
                self.columns[position].values = values;
            }
            None => {
                self.index.insert(name.clone(), self.columns.len());
                self.columns.push(Column { name, kind, values });
            }
        }
    }

    /// Mutable access to the values of a column.
    #[cfg(test)]
    pub(crate) fn values_mut(&mut self, name: &str) -> Option<&mut Vec<f64>> {
        let position = *self.index.get(name)?;
        Some(&mut self.columns[position].values)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Header used for the date column on export.
    pub fn date_label(&self) -> &str {
        &self.date_label
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Values of a column, aligned with `dates()`.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.index
            .get(name)
            .map(|&position| self.columns[position].values.as_slice())
    }

    pub fn column_kind(&self, name: &str) -> Option<&ColumnKind> {
        self.index
            .get(name)
            .map(|&position| &self.columns[position].kind)
    }

    /// Tagged `{kind, name}` list of every column, in table order.
    pub fn catalog(&self) -> ColumnCatalog {
        ColumnCatalog::new(
            self.columns
                .iter()
                .map(|column| ColumnSpec::new(column.name.clone(), column.kind.clone()))
                .collect(),
        )
    }

    /// Row position of `date`.
    pub fn row_index(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Value of `name` on `date`; `None` when absent or missing.
    pub fn value(&self, name: &str, date: NaiveDate) -> Option<f64> {
        let row = self.row_index(date)?;
        self.column(name)
            .map(|values| values[row])
            .filter(|value| !value.is_nan())
    }

    /// Non-missing points of a column.
    pub fn series(&self, name: &str) -> Option<Vec<SeriesPoint>> {
        self.column(name).map(|values| to_points(&self.dates, values))
    }

    /// Most recent non-missing point of a column.
    pub fn last_valid(&self, name: &str) -> Option<SeriesPoint> {
        let values = self.column(name)?;
        self.dates
            .iter()
            .zip(values.iter())
            .rev()
            .find(|(_, value)| !value.is_nan())
            .map(|(date, value)| SeriesPoint::new(*date, *value))
    }

    /// Copy of the rows inside `range`.
    pub fn slice(&self, range: &DateRange) -> DailyTable {
        let start = self.dates.partition_point(|date| *date < range.start);
        let end = self.dates.partition_point(|date| *date <= range.end).max(start);

        let mut sliced = DailyTable::new(self.dates[start..end].to_vec(), self.date_label.clone());
        for column in &self.columns {
            sliced.insert_column(
                column.name.clone(),
                column.kind.clone(),
                column.values[start..end].to_vec(),
            );
        }
        sliced
    }

    /// Copy holding only the named columns (unknown names are skipped).
    pub fn select(&self, names: &[&str]) -> DailyTable {
        let mut selected = DailyTable::new(self.dates.clone(), self.date_label.clone());
        for name in names {
            if let Some(&position) = self.index.get(*name) {
                let column = &self.columns[position];
                selected.insert_column(column.name.clone(), column.kind.clone(), column.values.clone());
            }
        }
        selected
    }

    /// Writes the table as CSV: the date column first, missing values empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(self.date_label.as_str());
        header.extend(self.columns.iter().map(|column| column.name.as_str()));
        csv_writer.write_record(&header)?;

        for (row, date) in self.dates.iter().enumerate() {
            let mut record = Vec::with_capacity(self.columns.len() + 1);
            record.push(date.format("%Y-%m-%d").to_string());
            for column in &self.columns {
                let value = column.values[row];
                record.push(if value.is_nan() {
                    String::new()
                } else {
                    value.to_string()
                });
            }
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Row-oriented JSON records; missing values become `null`.
    pub fn to_json_records(&self) -> Vec<Value> {
        self.dates
            .iter()
            .enumerate()
            .map(|(row, date)| {
                let mut record = Map::new();
                record.insert(
                    self.date_label.clone(),
                    Value::String(date.format("%Y-%m-%d").to_string()),
                );
                for column in &self.columns {
                    record.insert(column.name.clone(), json_number(column.values[row]));
                }
                Value::Object(record)
            })
            .collect()
    }

    /// True when both tables have the same dates, columns and values,
    /// treating missing values as equal to each other.
    pub fn same_contents(&self, other: &DailyTable) -> bool {
        self.dates == other.dates
            && self.columns.len() == other.columns.len()
            && self.columns.iter().zip(other.columns.iter()).all(|(a, b)| {
                a.name == b.name
                    && a.kind == b.kind
                    && a.values.len() == b.values.len()
                    && a.values
                        .iter()
                        .zip(b.values.iter())
                        .all(|(x, y)| (x.is_nan() && y.is_nan()) || x == y)
            })
    }
}

/// JSON number for a value, `null` when missing or non-finite.
pub fn json_number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

impl DataProvider for DailyTable {
    fn get_series(
        &self,
        column: &str,
        date_range: &DateRange,
    ) -> Result<Vec<SeriesPoint>, DataProviderError> {
        if !date_range.is_valid() {
            return Err(DataProviderError::InvalidDateRange);
        }
        let values = self
            .column(column)
            .ok_or_else(|| DataProviderError::ColumnNotFound(column.to_string()))?;

        Ok(self
            .dates
            .iter()
            .zip(values.iter())
            .filter(|(date, value)| date_range.contains(**date) && !value.is_nan())
            .map(|(date, value)| SeriesPoint::new(*date, *value))
            .collect())
    }
}
