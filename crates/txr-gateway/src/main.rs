use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use txr_core::config::TxrConfig;
use txr_plugins::PluginRegistry;
use txr_scheduler::SchedulerEngine;
use txr_store::SqliteStore;

mod app;
mod http;

#[derive(Parser)]
#[command(name = "txr-gateway", about = "TXR task runner: HTTP API and sequence scheduler", version)]
struct Cli {
    /// Config file (default: ~/.txr/txr.toml)
    #[arg(long, env = "TXR_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "txr_gateway=info,txr_scheduler=info,txr_plugins=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref().and_then(|p| p.to_str());
    let config = TxrConfig::load(config_path).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        TxrConfig::default()
    });

    // initialize SQLite database
    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path)?;
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(&db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    txr_store::db::init_db(&db)?;
    info!("database migrations complete");

    let store = Arc::new(SqliteStore::new(db));
    let plugins = Arc::new(PluginRegistry::with_builtins());
    info!(plugins = ?plugins.names(), "plugins registered");
    let scheduler = SchedulerEngine::with_store(Arc::clone(&store), plugins);

    // Timers are in-memory only; re-arm what was ACTIVE before the restart.
    if config.scheduler.restore_on_start {
        scheduler.restore();
    }

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState::new(config, store, scheduler));
    let router = app::build_router(Arc::clone(&state));

    info!("TXR gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // stop every timer and let in-flight ticks finish
    state.scheduler.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn ensure_parent_dir(path: &str) -> std::io::Result<()> {
    match std::path::Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
