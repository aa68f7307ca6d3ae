//! Analytics Consumers
//!
//! Read-only views over a built `DailyTable`: curve shape, spread
//! statistics, volatility, movers and alerts. Every function borrows the
//! table and returns owned results; nothing here writes back.

pub mod alerts;
pub mod primitives;
pub mod spread_summary;
pub mod term_structure;
pub mod top_movers;
pub mod volatility;
pub mod windows;

pub use alerts::{run_all, Alert, AlertCheck, AlertKind, AlertSettings, TracePoint};
pub use spread_summary::{compute_spread, spread_points, summary_stats, SpreadSummary};
pub use term_structure::{curve_on_date, kink_radar, list_legs, CurvePoint, KinkRadar};
pub use top_movers::{top_movers, Mover};
pub use volatility::{rolling_abs_corr, rolling_vol, CorrelationMatrix, NamedSeries, RollingVol};
pub use windows::FixedWindow;
