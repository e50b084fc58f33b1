//! Shared test helpers for creating JobCoordinator instances in tests.

use crate::config::Config;
use crate::coordinator::JobCoordinator;
use crate::engine::{SimulatedEngine, SimulatedTransfer};
use crate::types::{JobId, JobSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

pub(crate) const MAGNET: &str = "magnet:?xt=urn:btih:AAA";
pub(crate) const OTHER_MAGNET: &str = "magnet:?xt=urn:btih:BBB";

/// Upper bound for every wait in tests; generous so slow CI does not flake
pub(crate) const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Config with short poll intervals and a download dir inside `temp_dir`
pub(crate) fn test_config(temp_dir: &tempfile::TempDir) -> Config {
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.download.poll_interval = Duration::from_millis(10);
    config.download.paused_poll_interval = Duration::from_millis(10);
    config.download.shutdown_timeout = Duration::from_secs(2);
    config.server.api.stream_interval = Duration::from_millis(20);
    config
}

/// Helper to create a coordinator on top of a manual simulated engine.
/// Returns the coordinator, the engine and the tempdir (which must be kept alive).
pub(crate) async fn create_test_coordinator() -> (JobCoordinator, Arc<SimulatedEngine>, tempfile::TempDir)
{
    let temp_dir = tempdir().unwrap();
    let config = test_config(&temp_dir);
    create_test_coordinator_with(config, temp_dir).await
}

pub(crate) async fn create_test_coordinator_with(
    config: Config,
    temp_dir: tempfile::TempDir,
) -> (JobCoordinator, Arc<SimulatedEngine>, tempfile::TempDir) {
    let engine = Arc::new(SimulatedEngine::new());
    let coordinator = JobCoordinator::new(config, engine.clone()).await.unwrap();
    (coordinator, engine, temp_dir)
}

/// Wait until the engine has seen an acquire for `identifier`
pub(crate) async fn wait_for_transfer(engine: &SimulatedEngine, identifier: &str) -> SimulatedTransfer {
    tokio::time::timeout(WAIT_LIMIT, async {
        loop {
            if let Some(transfer) = engine.transfer_for(identifier) {
                return transfer;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("engine never acquired the transfer")
}

/// Wait until the job's snapshot satisfies `predicate`
pub(crate) async fn wait_until(
    coordinator: &JobCoordinator,
    id: JobId,
    predicate: impl Fn(&JobSnapshot) -> bool,
) -> JobSnapshot {
    let mut rx = coordinator.watch(id).await.unwrap();
    tokio::time::timeout(WAIT_LIMIT, async {
        let snapshot = rx.wait_for(|s| predicate(s)).await.unwrap();
        snapshot.clone()
    })
    .await
    .expect("job never reached the expected snapshot")
}

/// Start a job and drive it to `Downloading` with metadata resolved
pub(crate) async fn start_downloading(
    coordinator: &JobCoordinator,
    engine: &SimulatedEngine,
    identifier: &str,
) -> (JobId, SimulatedTransfer) {
    let id = coordinator.start(identifier).await.unwrap();
    let transfer = wait_for_transfer(engine, identifier).await;
    transfer.set_metadata(true);
    wait_until(coordinator, id, |s| s.state == crate::types::JobState::Downloading).await;
    (id, transfer)
}
