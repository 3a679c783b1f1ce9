//! Termination signals for the sync daemon.

use tracing::info;

/// Resolve once the daemon is asked to stop.
///
/// On Unix this watches SIGTERM (what a service manager sends on stop)
/// and SIGINT; elsewhere only Ctrl+C is available. The caller then drains
/// the scheduler so an in-flight sync run can finish.
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("failed to watch SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to watch SIGINT");

        tokio::select! {
            _ = sigterm.recv() => info!("SIGTERM received, stopping sync scheduler"),
            _ = sigint.recv() => info!("SIGINT received, stopping sync scheduler"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to watch Ctrl+C");
        info!("Ctrl+C received, stopping sync scheduler");
    }
}
