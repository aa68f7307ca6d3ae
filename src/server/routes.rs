//! Route definitions for the API server

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Creates the main application router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Workbook upload opens a session
        .route("/workbooks", post(handlers::upload_workbook))
        // Session management
        .route(
            "/sessions/:session_id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        // Table data
        .route("/sessions/:session_id/columns", get(handlers::list_columns))
        .route("/sessions/:session_id/series", get(handlers::get_series))
        .route("/sessions/:session_id/table.csv", get(handlers::get_table_csv))
        // Analytics
        .route("/sessions/:session_id/alerts", get(handlers::get_alerts))
        .route("/sessions/:session_id/spread", get(handlers::get_spread))
        .route("/sessions/:session_id/curve", get(handlers::get_curve))
        .route("/sessions/:session_id/kinks", get(handlers::get_kinks))
        .route("/sessions/:session_id/movers", get(handlers::get_movers))
        .route("/sessions/:session_id/volatility", get(handlers::get_volatility))
        // Add middleware
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
