//! Daily Table API Server Binary
//!
//! Run with: `cargo run --bin curvedesk-server`

use curvedesk::{run_server, BuildConfig, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Tracing is initialized in run_server(); RUST_LOG controls the level:
    //   RUST_LOG=debug cargo run --bin curvedesk-server

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .unwrap_or(3000);
    let build = match std::env::var("BUILD_CONFIG") {
        Ok(path) => BuildConfig::from_json_file(path)?,
        Err(_) => BuildConfig::default(),
    };

    let mut config = ServerConfig::new(host, port, build);
    if let Some(max_sessions) = std::env::var("MAX_SESSIONS").ok().and_then(|v| v.parse().ok()) {
        config.max_sessions = max_sessions;
    }

    println!("Starting daily table server...");
    println!("   Host: {}", config.host);
    println!("   Port: {}", config.port);
    println!("   Max sessions: {}", config.max_sessions);
    println!();
    println!("Available endpoints:");
    println!("  GET    /health                       - Health check");
    println!("  POST   /workbooks                    - Upload workbook, open session");
    println!("  GET    /sessions/:id                 - Session summary");
    println!("  DELETE /sessions/:id                 - Close session");
    println!("  GET    /sessions/:id/columns         - Column catalog");
    println!("  GET    /sessions/:id/series          - Rows for a date window");
    println!("  GET    /sessions/:id/table.csv       - Full table as CSV");
    println!("  GET    /sessions/:id/alerts          - Alert checks");
    println!("  GET    /sessions/:id/spread          - Spread statistics");
    println!("  GET    /sessions/:id/curve           - Forward curve");
    println!("  GET    /sessions/:id/kinks           - Kink radar");
    println!("  GET    /sessions/:id/movers          - Top movers");
    println!("  GET    /sessions/:id/volatility      - Rolling vol and correlation");
    println!();

    run_server(config).await?;

    Ok(())
}
