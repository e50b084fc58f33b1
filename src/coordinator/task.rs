//! Per-job lifecycle loop.
//!
//! Each job gets one tokio task that owns its engine handle. The task is the
//! only writer of progress and of the final state, and it releases the handle
//! exactly once on every exit path.

use crate::engine::{EngineHandle, TransferStatus};
use crate::types::{Event, JobId, JobState, ratio_to_percent};
use std::sync::Arc;
use std::time::Instant;

use super::JobCoordinator;
use super::registry::JobEntry;

/// How the transfer loop ended
struct Outcome {
    state: JobState,
    error: Option<String>,
}

impl Outcome {
    fn stopped() -> Self {
        Self {
            state: JobState::Stopped,
            error: None,
        }
    }

    fn failed(reason: impl Into<String>) -> Self {
        Self {
            state: JobState::Stopped,
            error: Some(reason.into()),
        }
    }

    fn completed() -> Self {
        Self {
            state: JobState::Completed,
            error: None,
        }
    }
}

impl JobCoordinator {
    /// Spawn the lifecycle task for a freshly registered job
    pub(crate) fn spawn_job_task(&self, entry: Arc<JobEntry>) {
        let coordinator = self.clone();
        let task_entry = entry.clone();
        let task = tokio::spawn(async move { coordinator.run_job(task_entry).await });

        // Monitor: a panicking loop must still leave the job terminal
        let coordinator = self.clone();
        tokio::spawn(async move {
            if let Err(e) = task.await
                && e.is_panic()
            {
                tracing::error!(job_id = %entry.id, "Lifecycle task panicked");
                coordinator.finish(&entry, JobState::Stopped, Some("lifecycle task panicked".to_string()));
                entry.mark_finished();
            }
        });
    }

    async fn run_job(&self, entry: Arc<JobEntry>) {
        let id = entry.id;
        let source_identifier = entry.snapshot().source_identifier;
        let save_path = self.config.download_dir().clone();

        tracing::debug!(job_id = %id, engine = self.engine.name(), "Acquiring engine handle");

        match self.engine.acquire(&source_identifier, &save_path).await {
            Ok(mut handle) => {
                let outcome = self.drive(&entry, handle.as_mut()).await;
                self.release_handle(id, handle).await;
                self.finish(&entry, outcome.state, outcome.error);
            }
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "Failed to acquire engine handle");
                self.finish(&entry, JobState::Stopped, Some(e.to_string()));
            }
        }

        entry.mark_finished();
    }

    /// Metadata wait followed by the transfer loop
    async fn drive(&self, entry: &JobEntry, handle: &mut dyn EngineHandle) -> Outcome {
        let id = entry.id;
        let poll_interval = self.config.download.poll_interval;
        let paused_poll_interval = self.config.download.paused_poll_interval;
        let metadata_timeout = self.config.download.metadata_timeout;

        let waiting_since = Instant::now();
        loop {
            if entry.control.stop_requested() {
                tracing::info!(job_id = %id, "Stop requested while waiting for metadata");
                return Outcome::stopped();
            }
            if let Some(reason) = handle.failure() {
                return Outcome::failed(reason);
            }
            if handle.has_metadata() {
                break;
            }
            if let Some(timeout) = metadata_timeout
                && waiting_since.elapsed() >= timeout
            {
                tracing::warn!(job_id = %id, timeout_ms = timeout.as_millis() as u64, "Metadata not resolved in time");
                return Outcome::failed("metadata timeout");
            }
            tokio::time::sleep(poll_interval).await;
        }

        tracing::info!(
            job_id = %id,
            waited_ms = waiting_since.elapsed().as_millis() as u64,
            "Metadata resolved, transfer started"
        );
        self.publish_started(entry);

        loop {
            if entry.control.stop_requested() {
                tracing::info!(job_id = %id, "Stop requested");
                return Outcome::stopped();
            }
            if let Some(reason) = handle.failure() {
                tracing::warn!(job_id = %id, reason = %reason, "Engine reported a fatal failure");
                return Outcome::failed(reason);
            }

            // Pause state is taken from the engine, not tracked locally
            let status = handle.status();

            if entry.control.pause_requested() {
                if !status.is_paused {
                    match handle.pause().await {
                        Ok(()) => {
                            tracing::info!(job_id = %id, "Transfer paused");
                        }
                        Err(e) => {
                            tracing::warn!(job_id = %id, error = %e, "Pause failed, retrying next tick");
                        }
                    }
                }
                // A transfer can finish right as the pause lands
                if status.is_complete {
                    tracing::info!(job_id = %id, "Transfer complete while paused");
                    return Outcome::completed();
                }
                self.publish_paused(entry);
                tokio::time::sleep(paused_poll_interval).await;
                continue;
            }

            if status.is_paused {
                match handle.resume().await {
                    Ok(()) => {
                        tracing::info!(job_id = %id, "Transfer resumed");
                    }
                    Err(e) => {
                        tracing::warn!(job_id = %id, error = %e, "Resume failed, retrying next tick");
                        tokio::time::sleep(poll_interval).await;
                        continue;
                    }
                }
            }

            let status = handle.status();
            self.publish_progress(entry, &status);

            if status.is_complete {
                tracing::info!(job_id = %id, "Transfer complete");
                return Outcome::completed();
            }

            tokio::time::sleep(poll_interval).await;
        }
    }

    /// `Pending -> Downloading` once metadata is available
    fn publish_started(&self, entry: &JobEntry) {
        let changed = entry.update(|s| {
            if s.state != JobState::Pending || entry.control.stop_requested() {
                return false;
            }
            s.set_state(JobState::Downloading);
            true
        });
        if changed {
            self.emit_state_changed(entry.id, JobState::Downloading, None);
        }
    }

    fn publish_paused(&self, entry: &JobEntry) {
        let mut became_paused = false;
        entry.update(|s| {
            // Re-checked under the lock so a concurrent resume or stop wins
            if s.state.is_terminal()
                || entry.control.stop_requested()
                || !entry.control.pause_requested()
            {
                return false;
            }
            let mut modified = false;
            if !s.paused {
                s.paused = true;
                modified = true;
            }
            if s.state != JobState::Paused {
                s.set_state(JobState::Paused);
                s.download_rate = 0;
                became_paused = true;
                modified = true;
            }
            modified
        });
        if became_paused {
            self.emit_state_changed(entry.id, JobState::Paused, None);
        }
    }

    fn publish_progress(&self, entry: &JobEntry, status: &TransferStatus) {
        let mut became_downloading = false;
        let mut progress = None;

        entry.update(|s| {
            if s.state.is_terminal()
                || entry.control.stop_requested()
                || entry.control.pause_requested()
            {
                return false;
            }
            let mut modified = false;
            if s.state != JobState::Downloading {
                s.set_state(JobState::Downloading);
                became_downloading = true;
                modified = true;
            }
            if s.paused {
                s.paused = false;
                modified = true;
            }
            // Never move backwards, even if the engine re-checks pieces
            let percent = ratio_to_percent(status.progress_ratio).max(s.progress);
            if percent != s.progress
                || status.download_rate != s.download_rate
                || status.peer_count != s.peers
            {
                s.progress = percent;
                s.download_rate = status.download_rate;
                s.peers = status.peer_count;
                s.updated_at = chrono::Utc::now();
                progress = Some((percent, status.download_rate, status.peer_count));
                modified = true;
            }
            modified
        });

        if became_downloading {
            self.emit_state_changed(entry.id, JobState::Downloading, None);
        }
        if let Some((progress, download_rate, peers)) = progress {
            tracing::debug!(
                job_id = %entry.id,
                progress,
                download_rate,
                peers,
                "Transfer progress"
            );
            self.emit_event(Event::Progress {
                job_id: entry.id,
                progress,
                download_rate,
                peers,
            });
        }
    }

    /// Move the job to its terminal state unless it already is terminal
    pub(crate) fn finish(&self, entry: &JobEntry, state: JobState, error: Option<String>) {
        let mut recorded = None;
        entry.update(|s| {
            if s.state.is_terminal() {
                return false;
            }
            s.set_state(state);
            if state == JobState::Completed {
                s.paused = false;
            }
            s.error = error.clone();
            recorded = Some(state);
            true
        });

        match recorded {
            Some(state) => {
                tracing::info!(job_id = %entry.id, state = %state, error = ?error, "Job finished");
                self.emit_state_changed(entry.id, state, error);
            }
            None => {
                tracing::debug!(job_id = %entry.id, "Job already terminal, keeping recorded state");
            }
        }
    }

    async fn release_handle(&self, id: JobId, handle: Box<dyn EngineHandle>) {
        match handle.release().await {
            Ok(()) => tracing::debug!(job_id = %id, "Engine handle released"),
            Err(e) => tracing::warn!(job_id = %id, error = %e, "Failed to release engine handle"),
        }
    }

    pub(crate) fn emit_state_changed(&self, job_id: JobId, state: JobState, error: Option<String>) {
        self.emit_event(Event::StateChanged {
            job_id,
            state,
            error,
        });
    }
}
