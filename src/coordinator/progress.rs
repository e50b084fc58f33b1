//! Status reads and live progress subscriptions.

use crate::error::{Error, Result};
use crate::types::{JobId, JobSnapshot};
use tokio::sync::watch;

use super::JobCoordinator;

impl JobCoordinator {
    /// Current snapshot of a job
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id was never issued.
    pub async fn status(&self, id: JobId) -> Result<JobSnapshot> {
        let entry = self.registry.get(id).await.ok_or(Error::NotFound(id))?;
        Ok(entry.snapshot())
    }

    /// Snapshots of every job, in creation order
    pub async fn list(&self) -> Vec<JobSnapshot> {
        self.registry
            .entries()
            .await
            .iter()
            .map(|entry| entry.snapshot())
            .collect()
    }

    /// Subscribe to a job's snapshots
    ///
    /// The receiver always holds the latest snapshot and is notified on every
    /// change. It stays valid after the job is terminal.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use torrdown::*;
    /// # async fn example(coordinator: JobCoordinator, id: JobId) -> Result<()> {
    /// let mut rx = coordinator.watch(id).await?;
    /// while rx.changed().await.is_ok() {
    ///     let snapshot = rx.borrow_and_update().clone();
    ///     println!("{}% {}", snapshot.progress, snapshot.state);
    ///     if snapshot.state.is_terminal() {
    ///         break;
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn watch(&self, id: JobId) -> Result<watch::Receiver<JobSnapshot>> {
        let entry = self.registry.get(id).await.ok_or(Error::NotFound(id))?;
        Ok(entry.subscribe())
    }

    /// Wait until the job's lifecycle task has exited and its engine handle
    /// has been released, then return the final snapshot
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id was never issued.
    pub async fn wait(&self, id: JobId) -> Result<JobSnapshot> {
        let entry = self.registry.get(id).await.ok_or(Error::NotFound(id))?;
        entry.wait_finished().await;
        Ok(entry.snapshot())
    }
}
