//! HTTP request handlers for API endpoints

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::error::ApiError;
use super::state::{AppState, Session};
use crate::analytics::{
    curve_on_date, kink_radar, rolling_abs_corr, rolling_vol, run_all, spread_points, summary_stats, top_movers,
    AlertCheck, CorrelationMatrix, CurvePoint, KinkRadar, Mover, RollingVol, SpreadSummary,
};
use crate::instrument::ColumnSpec;
use crate::table::DailyTable;
use crate::time_series::{DataProviderError, DateRange, SeriesPoint};

/// Health check endpoint
///
/// Returns a simple status response to verify the server is running
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok"
    }))
}

fn parse_session_id(session_id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(session_id).map_err(|_| ApiError::InvalidParameter("Invalid session ID".to_string()))
}

async fn session_table(state: &AppState, session_id: &str) -> Result<(Uuid, Arc<DailyTable>), ApiError> {
    let id = parse_session_id(session_id)?;
    let table = state
        .session_table(id)
        .await
        .ok_or(ApiError::SessionNotFound(id))?;
    Ok((id, table))
}

fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    Ok(NaiveDate::parse_from_str(value, "%Y-%m-%d")?)
}

/// Inclusive range from optional bounds, defaulting to the table's span.
fn date_range(table: &DailyTable, start: Option<&str>, end: Option<&str>) -> Result<Option<DateRange>, ApiError> {
    let (Some(first), Some(last)) = (table.first_date(), table.last_date()) else {
        return Ok(None);
    };
    let start = start.map(parse_date).transpose()?.unwrap_or(first);
    let end = end.map(parse_date).transpose()?.unwrap_or(last);
    let range = DateRange::new(start, end);
    if !range.is_valid() {
        return Err(DataProviderError::InvalidDateRange.into());
    }
    Ok(Some(range))
}

/// Splits a comma separated `columns` parameter.
fn column_list(param: Option<&str>) -> Vec<String> {
    param
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn require_columns(table: &DailyTable, columns: &[String]) -> Result<(), ApiError> {
    match columns.iter().find(|name| !table.has_column(name)) {
        Some(missing) => Err(ApiError::ColumnNotFound(missing.clone())),
        None => Ok(()),
    }
}

/// Summary of a session's table
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub columns: usize,
    pub workbook_bytes: usize,
    pub created_at: String,
}

impl SessionResponse {
    fn from_session(session: &Session) -> Self {
        SessionResponse {
            session_id: session.id.to_string(),
            rows: session.table.len(),
            first_date: session.table.first_date(),
            last_date: session.table.last_date(),
            columns: session.table.catalog().len(),
            workbook_bytes: session.workbook_bytes,
            created_at: session.created_at.to_rfc3339(),
        }
    }
}

/// POST /workbooks - Build a table from an uploaded workbook and open a session
pub async fn upload_workbook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    // Check session limit
    if state.sessions.read().await.len() >= state.max_sessions {
        return Err(ApiError::SessionLimitReached);
    }
    if body.is_empty() {
        return Err(ApiError::InvalidParameter("Empty workbook upload".to_string()));
    }

    let workbook_bytes = body.len();
    let builder = state.builder.clone();
    let cache = state.cache.clone();
    let table = tokio::task::spawn_blocking(move || cache.get_or_build(&body, &builder)).await??;

    let mut sessions = state.sessions.write().await;
    if sessions.len() >= state.max_sessions {
        return Err(ApiError::SessionLimitReached);
    }
    let session = Session {
        id: Uuid::new_v4(),
        table,
        workbook_bytes,
        created_at: Utc::now(),
    };
    let response = SessionResponse::from_session(&session);
    tracing::info!(
        session_id = %session.id,
        rows = response.rows,
        columns = response.columns,
        "session created"
    );
    sessions.insert(session.id, session);

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /sessions/{session_id} - Session summary
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = parse_session_id(&session_id)?;
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or(ApiError::SessionNotFound(id))?;
    Ok(Json(SessionResponse::from_session(session)))
}

/// Response for session deletion
#[derive(Debug, Serialize)]
pub struct DeleteSessionResponse {
    pub session_id: String,
    pub status: String,
}

/// DELETE /sessions/{session_id} - Close a session
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<DeleteSessionResponse>, ApiError> {
    let id = parse_session_id(&session_id)?;
    state
        .sessions
        .write()
        .await
        .remove(&id)
        .ok_or(ApiError::SessionNotFound(id))?;
    tracing::info!(session_id = %id, "session closed");

    Ok(Json(DeleteSessionResponse {
        session_id: id.to_string(),
        status: "closed".to_string(),
    }))
}

/// Response for the column catalog
#[derive(Debug, Serialize)]
pub struct ColumnsResponse {
    pub session_id: String,
    pub date_label: String,
    pub columns: Vec<ColumnSpec>,
}

/// GET /sessions/{session_id}/columns - Tagged column catalog
pub async fn list_columns(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<ColumnsResponse>, ApiError> {
    let (id, table) = session_table(&state, &session_id).await?;
    Ok(Json(ColumnsResponse {
        session_id: id.to_string(),
        date_label: table.date_label().to_string(),
        columns: table.catalog().iter().cloned().collect(),
    }))
}

/// Query parameters for row data
#[derive(Debug, Default, Deserialize)]
pub struct SeriesQueryParams {
    /// Comma separated column names; all columns when absent
    pub columns: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Response for row data
#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    pub session_id: String,
    pub rows: Vec<Value>,
}

/// GET /sessions/{session_id}/series - Row records for a date window
pub async fn get_series(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(params): Query<SeriesQueryParams>,
) -> Result<Json<SeriesResponse>, ApiError> {
    let (id, table) = session_table(&state, &session_id).await?;
    let columns = column_list(params.columns.as_deref());
    require_columns(&table, &columns)?;

    let Some(range) = date_range(&table, params.start.as_deref(), params.end.as_deref())? else {
        return Ok(Json(SeriesResponse {
            session_id: id.to_string(),
            rows: Vec::new(),
        }));
    };

    let view = table.slice(&range);
    let view = if columns.is_empty() {
        view
    } else {
        let names: Vec<&str> = columns.iter().map(String::as_str).collect();
        view.select(&names)
    };

    Ok(Json(SeriesResponse {
        session_id: id.to_string(),
        rows: view.to_json_records(),
    }))
}

/// GET /sessions/{session_id}/table.csv - Full table as CSV
pub async fn get_table_csv(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, table) = session_table(&state, &session_id).await?;
    let mut buffer = Vec::new();
    table
        .write_csv(&mut buffer)
        .map_err(|e| ApiError::InternalError(format!("CSV export failed: {}", e)))?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], buffer))
}

/// Response for the alerts endpoint
#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub session_id: String,
    pub as_of: Option<NaiveDate>,
    pub checks: Vec<AlertCheck>,
}

/// GET /sessions/{session_id}/alerts - Evaluate every alert check
pub async fn get_alerts(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<AlertsResponse>, ApiError> {
    let (id, table) = session_table(&state, &session_id).await?;
    Ok(Json(AlertsResponse {
        session_id: id.to_string(),
        as_of: table.last_date(),
        checks: run_all(&table, &state.alert_settings),
    }))
}

/// Query parameters for spread statistics
#[derive(Debug, Deserialize)]
pub struct SpreadQueryParams {
    pub near: String,
    pub far: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub exclude_start: Option<String>,
    pub exclude_end: Option<String>,
}

/// Response for spread statistics
#[derive(Debug, Serialize)]
pub struct SpreadResponse {
    pub near: String,
    pub far: String,
    pub summary: Option<SpreadSummary>,
    pub points: Vec<SeriesPoint>,
}

/// GET /sessions/{session_id}/spread - Statistics of `near - far`
pub async fn get_spread(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(params): Query<SpreadQueryParams>,
) -> Result<Json<SpreadResponse>, ApiError> {
    let (_, table) = session_table(&state, &session_id).await?;
    require_columns(&table, &[params.near.clone(), params.far.clone()])?;

    let range = date_range(&table, params.start.as_deref(), params.end.as_deref())?;
    let exclude = match (params.exclude_start.as_deref(), params.exclude_end.as_deref()) {
        (Some(start), Some(end)) => Some(DateRange::new(parse_date(start)?, parse_date(end)?)),
        (None, None) => None,
        _ => {
            return Err(ApiError::InvalidParameter(
                "exclude_start and exclude_end must be given together".to_string(),
            ))
        }
    };

    let mut points = spread_points(&table, &params.near, &params.far, range.as_ref(), exclude.as_ref())
        .unwrap_or_default();
    if exclude.is_none() {
        // Build exclusions come back forward-filled; leave them out of the stats
        let configured = &state.builder.config().exclusions;
        points.retain(|point| !configured.iter().any(|window| window.contains(point.date)));
    }
    Ok(Json(SpreadResponse {
        summary: summary_stats(&points),
        near: params.near,
        far: params.far,
        points,
    }))
}

/// Query parameters for the forward curve
#[derive(Debug, Default, Deserialize)]
pub struct CurveQueryParams {
    /// Curve date; the last table date when absent
    pub date: Option<String>,
    pub max_leg: Option<u32>,
}

/// Response for the forward curve
#[derive(Debug, Serialize)]
pub struct CurveResponse {
    pub date: NaiveDate,
    pub curve: Vec<CurvePoint>,
}

/// GET /sessions/{session_id}/curve - Forward curve on a date
pub async fn get_curve(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(params): Query<CurveQueryParams>,
) -> Result<Json<CurveResponse>, ApiError> {
    let (_, table) = session_table(&state, &session_id).await?;
    let date = match params.date.as_deref() {
        Some(date) => parse_date(date)?,
        None => table
            .last_date()
            .ok_or_else(|| ApiError::InvalidParameter("Table is empty".to_string()))?,
    };
    let curve = curve_on_date(&table, date, params.max_leg.unwrap_or(12))
        .ok_or_else(|| ApiError::InvalidParameter(format!("No curve on {}", date)))?;
    Ok(Json(CurveResponse { date, curve }))
}

/// Query parameters for the kink radar
#[derive(Debug, Default, Deserialize)]
pub struct KinkQueryParams {
    pub lookback: Option<usize>,
    pub window: Option<usize>,
    pub max_leg: Option<u32>,
}

/// GET /sessions/{session_id}/kinks - Clipped leg-change z-scores
pub async fn get_kinks(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(params): Query<KinkQueryParams>,
) -> Result<Json<KinkRadar>, ApiError> {
    let (_, table) = session_table(&state, &session_id).await?;
    Ok(Json(kink_radar(
        &table,
        params.lookback.unwrap_or(90),
        params.window.unwrap_or(60),
        params.max_leg.unwrap_or(12),
    )))
}

/// Query parameters for top movers
#[derive(Debug, Default, Deserialize)]
pub struct MoversQueryParams {
    pub window: Option<usize>,
    pub k: Option<usize>,
    pub max_leg: Option<u32>,
}

/// Response for top movers
#[derive(Debug, Serialize)]
pub struct MoversResponse {
    pub as_of: Option<NaiveDate>,
    pub movers: Vec<Mover>,
}

/// GET /sessions/{session_id}/movers - Largest unusual leg moves
pub async fn get_movers(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(params): Query<MoversQueryParams>,
) -> Result<Json<MoversResponse>, ApiError> {
    let (_, table) = session_table(&state, &session_id).await?;
    let window = params.window.unwrap_or(60);
    if window < 2 {
        return Err(ApiError::InvalidParameter("window must be at least 2".to_string()));
    }
    Ok(Json(MoversResponse {
        as_of: table.last_date(),
        movers: top_movers(&table, window, params.max_leg.unwrap_or(12), params.k.unwrap_or(5)),
    }))
}

/// Query parameters for volatility
#[derive(Debug, Default, Deserialize)]
pub struct VolatilityQueryParams {
    /// Comma separated column names; front leg and headline spreads when absent
    pub columns: Option<String>,
    pub window: Option<usize>,
    pub annualize: Option<bool>,
    pub min_periods: Option<usize>,
}

/// Response for volatility
#[derive(Debug, Serialize)]
pub struct VolatilityResponse {
    pub vol: RollingVol,
    pub abs_correlation: CorrelationMatrix,
}

/// GET /sessions/{session_id}/volatility - Rolling vol and |move| correlation
pub async fn get_volatility(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(params): Query<VolatilityQueryParams>,
) -> Result<Json<VolatilityResponse>, ApiError> {
    let (_, table) = session_table(&state, &session_id).await?;

    let mut columns = column_list(params.columns.as_deref());
    if columns.is_empty() {
        let config = state.builder.config();
        columns = [
            config.leg_name(1),
            Some(config.prompt_spread.clone()),
            Some("Dec Red".to_string()),
        ]
        .into_iter()
        .flatten()
        .filter(|name| table.has_column(name))
        .collect();
    }
    require_columns(&table, &columns)?;

    let window = params.window.unwrap_or(20);
    if window < 2 {
        return Err(ApiError::InvalidParameter("window must be at least 2".to_string()));
    }
    let names: Vec<&str> = columns.iter().map(String::as_str).collect();
    Ok(Json(VolatilityResponse {
        vol: rolling_vol(
            &table,
            &names,
            window,
            params.annualize.unwrap_or(true),
            params.min_periods.unwrap_or(2),
        ),
        abs_correlation: rolling_abs_corr(&table, &names, window),
    }))
}
