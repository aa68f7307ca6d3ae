//! Shared application state for the API server

use crate::analytics::AlertSettings;
use crate::builder::DailyTableBuilder;
use crate::cache::TableCache;
use crate::table::DailyTable;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Builds tables from uploaded workbooks
    pub builder: Arc<DailyTableBuilder>,
    /// Built snapshots keyed by workbook content
    pub cache: Arc<TableCache>,
    /// Open sessions, each holding its own snapshot
    pub sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    /// Maximum number of concurrent sessions
    pub max_sessions: usize,
    /// Largest accepted workbook upload in bytes
    pub max_upload_bytes: usize,
    /// Thresholds used by the alerts endpoint
    pub alert_settings: Arc<AlertSettings>,
}

impl AppState {
    /// Creates a new application state
    pub fn new(builder: DailyTableBuilder, cache: TableCache, max_sessions: usize, max_upload_bytes: usize) -> Self {
        let mut alert_settings = AlertSettings::default();
        if let (Some(front), Some(second)) = (builder.config().leg_name(1), builder.config().leg_name(2)) {
            alert_settings.front_leg = front;
            alert_settings.second_leg = second;
        }
        AppState {
            builder: Arc::new(builder),
            cache: Arc::new(cache),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_sessions,
            max_upload_bytes,
            alert_settings: Arc::new(alert_settings),
        }
    }

    /// Snapshot of a session's table.
    pub async fn session_table(&self, id: Uuid) -> Option<Arc<DailyTable>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(|session| session.table.clone())
    }
}

/// An uploaded workbook and the table built from it.
pub struct Session {
    /// Unique session identifier
    pub id: Uuid,
    /// Immutable table snapshot; may be shared with other sessions
    pub table: Arc<DailyTable>,
    /// Size of the uploaded workbook
    pub workbook_bytes: usize,
    /// When session was created
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;

    #[test]
    fn test_alert_legs_follow_configured_legs() {
        let config = BuildConfig {
            legs: Some(vec!["L1".to_string(), "L2".to_string()]),
            ..BuildConfig::default()
        };
        let builder = DailyTableBuilder::new(config).unwrap();
        let state = AppState::new(builder, TableCache::new(1), 1, 1024);
        assert_eq!(state.alert_settings.front_leg, "L1");
        assert_eq!(state.alert_settings.second_leg, "L2");

        let state = AppState::new(DailyTableBuilder::new(BuildConfig::default()).unwrap(), TableCache::new(1), 1, 1024);
        assert_eq!(state.alert_settings.front_leg, "%CL 1!");
    }
}
