use crate::instrument::ColumnKind;
use crate::table::DailyTable;
use crate::time_series::{DataProvider, DataProviderError, DateRange, SeriesPoint};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::path::Path;

/// SQLite export of a daily table.
///
/// Values are stored in long format, one row per `(column, date)`, with
/// missing values as `NULL`. The column catalog keeps each column's kind as
/// JSON so a stored table can be read back with its classification.
/// Automatically creates schema on first use.
#[derive(Debug)]
pub struct SqliteTableStore {
    conn: Connection,
}

impl SqliteTableStore {
    /// Opens (or creates) a file-based store.
    ///
    /// # Errors
    /// Returns an error if the database connection cannot be established.
    pub fn new<P: AsRef<Path>>(db_path: P) -> SqliteResult<Self> {
        let conn = Connection::open(db_path)?;
        let store = SqliteTableStore { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Creates a store backed by an in-memory database. Useful for testing.
    pub fn new_in_memory() -> SqliteResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteTableStore { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> SqliteResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS columns (
                name TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                kind TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS calendar (
                date TEXT PRIMARY KEY
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS daily_values (
                column_name TEXT NOT NULL,
                date TEXT NOT NULL,
                value REAL,
                PRIMARY KEY (column_name, date)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_daily_values_column ON daily_values(column_name)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_daily_values_date ON daily_values(date)",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Checks if a table exists in the database.
    pub fn table_exists(&self, table_name: &str) -> SqliteResult<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")?;
        stmt.exists([table_name])
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Replaces the stored table with `table` in one transaction. Returns the
    /// number of value rows written.
    pub fn save_table(&mut self, table: &DailyTable) -> SqliteResult<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM daily_values", [])?;
        tx.execute("DELETE FROM columns", [])?;
        tx.execute("DELETE FROM calendar", [])?;

        let dates: Vec<String> = table.dates().iter().map(format_date).collect();
        let mut written = 0;
        {
            let mut insert_date = tx.prepare("INSERT INTO calendar (date) VALUES (?1)")?;
            for date in &dates {
                insert_date.execute([date])?;
            }

            let mut insert_column =
                tx.prepare("INSERT INTO columns (name, position, kind) VALUES (?1, ?2, ?3)")?;
            let mut insert_value =
                tx.prepare("INSERT INTO daily_values (column_name, date, value) VALUES (?1, ?2, ?3)")?;

            for (position, column) in table.columns().enumerate() {
                let kind = serde_json::to_string(&column.kind)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                insert_column.execute(params![column.name, position as i64, kind])?;

                for (date, value) in dates.iter().zip(column.values().iter()) {
                    let value = if value.is_nan() { None } else { Some(*value) };
                    insert_value.execute(params![column.name, date, value])?;
                    written += 1;
                }
            }
        }

        tx.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES ('date_label', ?1)",
            [table.date_label()],
        )?;
        tx.commit()?;

        log::info!(
            "Saved {} columns x {} days to SQLite",
            table.catalog().len(),
            table.len()
        );
        Ok(written)
    }

    /// Stored column names with their kinds, in table order.
    pub fn list_columns(&self) -> SqliteResult<Vec<(String, ColumnKind)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, kind FROM columns ORDER BY position")?;
        let rows = stmt.query_map([], |row| {
            let name: String = row.get(0)?;
            let kind_json: String = row.get(1)?;
            let kind: ColumnKind = serde_json::from_str(&kind_json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
            })?;
            Ok((name, kind))
        })?;
        rows.collect()
    }

    fn has_column(&self, name: &str) -> SqliteResult<bool> {
        let mut stmt = self.conn.prepare("SELECT 1 FROM columns WHERE name = ?1 LIMIT 1")?;
        stmt.exists([name])
    }

    /// Reads the stored table back.
    pub fn load_table(&self) -> SqliteResult<DailyTable> {
        let date_label: String = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = 'date_label'", [], |row| row.get(0))
            .optional()?
            .unwrap_or_else(|| "Date".to_string());

        let mut stmt = self.conn.prepare("SELECT date FROM calendar ORDER BY date")?;
        let dates = stmt
            .query_map([], |row| {
                let text: String = row.get(0)?;
                parse_date(&text, 0)
            })?
            .collect::<SqliteResult<Vec<NaiveDate>>>()?;

        let mut table = DailyTable::new(dates, date_label);
        let mut values_stmt = self
            .conn
            .prepare("SELECT value FROM daily_values WHERE column_name = ?1 ORDER BY date")?;
        for (name, kind) in self.list_columns()? {
            let values = values_stmt
                .query_map([&name], |row| {
                    let value: Option<f64> = row.get(0)?;
                    Ok(value.unwrap_or(f64::NAN))
                })?
                .collect::<SqliteResult<Vec<f64>>>()?;
            table.insert_column(name, kind, values);
        }
        Ok(table)
    }
}

fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(text: &str, column: usize) -> SqliteResult<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

impl DataProvider for SqliteTableStore {
    fn get_series(
        &self,
        column: &str,
        date_range: &DateRange,
    ) -> Result<Vec<SeriesPoint>, DataProviderError> {
        if !date_range.is_valid() {
            return Err(DataProviderError::InvalidDateRange);
        }

        let exists = self
            .has_column(column)
            .map_err(|e| DataProviderError::Other(format!("SQL error: {}", e)))?;
        if !exists {
            return Err(DataProviderError::ColumnNotFound(column.to_string()));
        }

        let mut stmt = self
            .conn
            .prepare(
                "SELECT date, value FROM daily_values
                 WHERE column_name = ?1
                 AND date >= ?2
                 AND date <= ?3
                 AND value IS NOT NULL
                 ORDER BY date",
            )
            .map_err(|e| DataProviderError::Other(format!("SQL error: {}", e)))?;

        let rows = stmt
            .query_map(
                params![
                    column,
                    format_date(&date_range.start),
                    format_date(&date_range.end)
                ],
                |row| {
                    let text: String = row.get(0)?;
                    let value: f64 = row.get(1)?;
                    Ok(SeriesPoint::new(parse_date(&text, 0)?, value))
                },
            )
            .map_err(|e| DataProviderError::Other(format!("SQL error: {}", e)))?;

        rows.collect::<SqliteResult<Vec<SeriesPoint>>>()
            .map_err(|e| DataProviderError::Other(format!("Row parsing error: {}", e)))
    }
}
