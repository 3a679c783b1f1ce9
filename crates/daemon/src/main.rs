//! samsync daemon entry point.
//!
//! Loads configuration, initializes tracing, and either runs a single sync
//! (`--once`) or starts the interval scheduler with graceful shutdown.

mod scheduler;
mod signals;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use samsync_core::config::AppConfig;
use samsync_core::sync::SyncOrchestrator;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// samsync synchronization daemon.
#[derive(Parser, Debug)]
#[command(
    name = "samsync-daemon",
    version,
    about = "SAM.gov to SharePoint synchronization daemon"
)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Override the log level from the config file (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Run a single sync and exit instead of scheduling.
    #[arg(long)]
    once: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load and resolve configuration
    let mut config =
        AppConfig::load_from_file(&args.config).context("failed to load configuration file")?;
    config
        .resolve_env_vars()
        .context("failed to resolve environment variables in config")?;
    config
        .validate()
        .context("configuration validation failed")?;

    // Initialize tracing
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.daemon.log_level);

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    // Startup banner
    info!("========================================");
    info!("  samsync Daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!("Config file   : {}", args.config.display());
    info!("SAM.gov URL   : {}", config.sam.base_url);
    info!("Sync window   : {} days", config.sam.days_to_sync);
    info!("Site URL      : {}", config.sharepoint.site_url);
    info!("List name     : {}", config.sharepoint.list_name);
    info!("Sync interval : {}s", config.daemon.sync_interval_secs);
    info!("Attachments   : {}", config.sam.download_attachments);
    info!("Log level     : {}", log_level);
    info!("========================================");

    if args.once {
        // Single run: propagate a fatal sync error to the invoking
        // scheduler (systemd timer, cron) via the exit status.
        let mut orchestrator = SyncOrchestrator::from_config(&config);
        let stats = orchestrator.run().await.context("sync run failed")?;
        info!(
            total = stats.total,
            new = stats.new,
            skipped = stats.skipped,
            errors = stats.errors,
            "sync run completed"
        );
        return Ok(());
    }

    // Create a shutdown notify for cooperative cancellation
    let shutdown = Arc::new(tokio::sync::Notify::new());
    let scheduler_shutdown = shutdown.clone();

    let sched = scheduler::Scheduler::new(config);
    let scheduler_handle = tokio::spawn(async move {
        sched.run(scheduler_shutdown).await;
    });

    // Wait for shutdown signal
    signals::wait_for_shutdown().await;

    info!("Shutdown signal received, stopping...");

    // Signal cooperative shutdown to the scheduler
    shutdown.notify_waiters();

    // Wait for the scheduler to finish its current run (up to 30s)
    match tokio::time::timeout(std::time::Duration::from_secs(30), scheduler_handle).await {
        Ok(Ok(())) => info!("scheduler stopped gracefully"),
        Ok(Err(e)) => warn!("scheduler task error: {}", e),
        Err(_) => warn!("scheduler did not stop within 30s, forcing shutdown"),
    }

    info!("samsync daemon stopped.");
    Ok(())
}
