//! Upkeep Daemon - Main Entry Point
//! Maintenance schedule JSON-RPC server with background overdue sweeps

mod config;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::DaemonConfig;
use upkeep_api_rpc::{RpcServer, RpcServerConfig};
use upkeep_core::application::{shutdown_channel, OverdueSweeper, ScheduleService};
use upkeep_core::port::id_provider::UuidProvider;
use upkeep_core::port::time_provider::SystemTimeProvider;
use upkeep_infra_sqlite::{create_pool, run_migrations, SqliteScheduleRepository};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const LOG_FILE_PREFIX: &str = "upkeep.log";

/// Install the global subscriber. The returned guard flushes the file writer.
fn init_logging(cfg: &DaemonConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("upkeep=info"))
        .context("Failed to create env filter")?;

    let (file_layer, guard) = match &cfg.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    match cfg.log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(file_layer)
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(file_layer)
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let cfg = DaemonConfig::load()?;

    // 2. Initialize logging
    let _log_guard = init_logging(&cfg)?;
    info!("Upkeep daemon v{} starting...", VERSION);

    // 3. Initialize database
    if let Some(parent) = Path::new(&cfg.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    info!(db_path = %cfg.db_path, "Initializing database...");

    let pool = create_pool(&cfg.db_path)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 4. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    let repo = Arc::new(SqliteScheduleRepository::new(
        pool.clone(),
        time_provider.clone(),
    ));
    let service = Arc::new(ScheduleService::new(
        repo.clone(),
        id_provider,
        time_provider.clone(),
    ));

    // 5. Start JSON-RPC server
    let rpc_config = RpcServerConfig {
        host: cfg.rpc_host.clone(),
        port: cfg.rpc_port,
        upcoming_horizon_days: cfg.upcoming_horizon_days,
    };
    let (rpc_addr, rpc_handle) = RpcServer::new(rpc_config, service)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    // 6. Start overdue sweeper (optional)
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let sweeper_handle = match cfg.sweep_interval() {
        Some(interval) => {
            let sweeper = OverdueSweeper::new(repo, time_provider, interval);
            Some(tokio::spawn(sweeper.run(shutdown_rx)))
        }
        None => {
            info!("Overdue sweeper disabled");
            None
        }
    };

    info!(addr = %rpc_addr, "System ready. Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown
    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    if let Some(handle) = sweeper_handle {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
    }
    rpc_handle.stopped().await;
    pool.close().await;

    info!("Shutdown complete.");
    Ok(())
}
