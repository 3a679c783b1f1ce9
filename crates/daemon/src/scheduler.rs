//! Sync scheduler that runs one sync per interval tick.
//!
//! Each run gets a freshly built orchestrator: SharePoint bearer tokens are
//! scoped to a run, so clients are not reused across cycles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time;
use tracing::{error, info};

use samsync_core::config::AppConfig;
use samsync_core::sync::SyncOrchestrator;

/// Tracks aggregate statistics across sync runs.
pub struct SchedulerStats {
    pub total_runs: AtomicU64,
    pub total_failures: AtomicU64,
    pub consecutive_failures: AtomicU64,
}

impl SchedulerStats {
    fn new() -> Self {
        Self {
            total_runs: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            consecutive_failures: AtomicU64::new(0),
        }
    }
}

/// The sync scheduler.
///
/// Runs a sync on a timer until shutdown is signalled. A fatal sync error
/// is logged and counted; the next interval tick tries again (alerting on
/// repeated failures is the operator's concern, surfaced via the
/// consecutive-failure count in the logs).
pub struct Scheduler {
    config: AppConfig,
    interval: Duration,
    stats: Arc<SchedulerStats>,
}

impl Scheduler {
    pub fn new(config: AppConfig) -> Self {
        let interval = Duration::from_secs(config.daemon.sync_interval_secs);
        Self {
            config,
            interval,
            stats: Arc::new(SchedulerStats::new()),
        }
    }

    /// Main scheduler loop. Returns when `shutdown` is notified.
    pub async fn run(&self, shutdown: Arc<Notify>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "scheduler started"
        );

        let mut interval = time::interval(self.interval);
        // The first tick fires immediately; consume it so the first sync
        // waits a full interval after startup.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_once().await;
                }
                _ = shutdown.notified() => {
                    info!("scheduler shutting down");
                    return;
                }
            }
        }
    }

    /// Execute a single sync run and record its outcome.
    pub async fn run_once(&self) {
        let run = self.stats.total_runs.fetch_add(1, Ordering::SeqCst) + 1;
        info!(run, "starting sync run");

        let mut orchestrator = SyncOrchestrator::from_config(&self.config);
        match orchestrator.run().await {
            Ok(stats) => {
                self.stats.consecutive_failures.store(0, Ordering::SeqCst);
                info!(
                    run,
                    total = stats.total,
                    new = stats.new,
                    skipped = stats.skipped,
                    errors = stats.errors,
                    "sync run completed"
                );
            }
            Err(e) => {
                let failures = self.stats.total_failures.fetch_add(1, Ordering::SeqCst) + 1;
                let consecutive = self
                    .stats
                    .consecutive_failures
                    .fetch_add(1, Ordering::SeqCst)
                    + 1;
                error!(
                    run,
                    error = %e,
                    total_failures = failures,
                    consecutive_failures = consecutive,
                    "sync run failed"
                );
            }
        }
    }
}
