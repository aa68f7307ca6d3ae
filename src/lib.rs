pub mod time_series;
pub mod instrument;
pub mod config;
pub mod workbook;
pub mod table;
pub mod spreads;
pub mod stamping;
pub mod calendar;
pub mod builder;
pub mod cache;
pub mod store;
pub mod analytics;
pub mod server;

#[cfg(test)]
mod integration_tests;

pub use time_series::{SeriesPoint, DateRange, DataProvider, DataProviderError};
pub use instrument::{ColumnKind, ColumnSpec, ColumnCatalog};
pub use config::{BuildConfig, ColourSpreadSpec, SheetLayout};
pub use workbook::{BuildError, Cell, InMemoryWorkbook, SheetSource, XlsxWorkbook};
pub use table::DailyTable;
pub use builder::{build_daily_table, DailyTableBuilder};
pub use cache::TableCache;
pub use store::SqliteTableStore;
pub use server::{run_server, ServerConfig, AppState, ApiError};
