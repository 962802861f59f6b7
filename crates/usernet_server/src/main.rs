//! usernet HTTP server entry point.

use anyhow::Context;
use clap::Parser;
use usernet_core::db::open_db;
use usernet_core::{default_log_level, init_console_logging, init_logging};
use usernet_server::config::{build_cors_layer, ServerConfig};
use usernet_server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine; real env vars and flags still apply.
    dotenvy::dotenv().ok();
    let config = ServerConfig::parse();

    let level = config.log_level.as_deref().unwrap_or(default_log_level());
    match config.log_dir.as_deref() {
        Some(dir) => init_logging(level, dir),
        None => init_console_logging(level),
    }
    .map_err(anyhow::Error::msg)
    .context("failed to initialize logging")?;

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open database at {}", config.db_path))?;
    let state = AppState::new(conn);

    let app = build_router(state).layer(build_cors_layer(config.cors_origin.as_deref()));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!("event=server_start module=server status=ok addr={addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::warn!("event=shutdown_signal module=server status=error error={err}");
    }
}
