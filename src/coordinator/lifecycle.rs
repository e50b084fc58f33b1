//! Shutdown coordination.

use crate::types::Event;
use std::sync::atomic::Ordering;

use super::JobCoordinator;

impl JobCoordinator {
    /// Gracefully shut down the coordinator
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new jobs
    /// 2. Requests a stop on every non-terminal job
    /// 3. Waits for the lifecycle tasks to release their handles, bounded by
    ///    `download.shutdown_timeout`
    /// 4. Shuts the transfer engine down
    /// 5. Emits [`Event::Shutdown`]
    ///
    /// Calling it more than once is harmless.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new jobs
        self.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new jobs");

        // 2. Stop every job that is still running
        let entries = self.registry.entries().await;
        for entry in &entries {
            if !entry.snapshot().state.is_terminal()
                && let Err(e) = self.stop(entry.id).await
            {
                tracing::warn!(job_id = %entry.id, error = %e, "Failed to stop job during shutdown");
            }
        }
        tracing::info!(job_count = entries.len(), "Signaled stop to all jobs");

        // 3. Wait for lifecycle tasks with timeout
        let shutdown_timeout = self.config.download.shutdown_timeout;
        let wait_all = futures::future::join_all(entries.iter().map(|entry| entry.wait_finished()));
        match tokio::time::timeout(shutdown_timeout, wait_all).await {
            Ok(_) => {
                tracing::info!("All lifecycle tasks finished");
            }
            Err(_) => {
                let unfinished: Vec<String> = entries
                    .iter()
                    .filter(|entry| !entry.is_finished())
                    .map(|entry| entry.id.to_string())
                    .collect();
                tracing::warn!(
                    unfinished = ?unfinished,
                    timeout_ms = shutdown_timeout.as_millis() as u64,
                    "Timeout waiting for lifecycle tasks, proceeding with shutdown"
                );
            }
        }

        // 4. Engine-wide teardown
        self.engine.shutdown().await;
        tracing::info!(engine = self.engine.name(), "Transfer engine shut down");

        // 5. Emit shutdown event
        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
    }

    /// Whether new jobs are still accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }
}
