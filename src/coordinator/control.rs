//! Job control - pause, resume, stop.
//!
//! Control operations never touch the engine. They set a request flag that
//! the owning lifecycle loop observes on its next tick, and update the
//! published state optimistically so a status read right after the call
//! already reflects the request.

use crate::error::{Error, Result};
use crate::types::{JobId, JobSnapshot, JobState};

use super::JobCoordinator;

impl JobCoordinator {
    /// Request that a job pause
    ///
    /// A `Downloading` job is reported as `Paused` immediately; the engine is
    /// paused on the loop's next tick. Pausing a paused, pending or terminal
    /// job is a no-op apart from recording the request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id was never issued.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use torrdown::*;
    /// # async fn example(coordinator: JobCoordinator, id: JobId) -> Result<()> {
    /// let snapshot = coordinator.pause(id).await?;
    /// println!("{}", snapshot.state);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn pause(&self, id: JobId) -> Result<JobSnapshot> {
        let entry = self.registry.get(id).await.ok_or(Error::NotFound(id))?;

        let mut transitioned = false;
        entry.update(|s| {
            if s.state.is_terminal() {
                return false;
            }
            entry.control.request_pause(true);
            s.paused = true;
            if s.state == JobState::Downloading {
                s.set_state(JobState::Paused);
                s.download_rate = 0;
                transitioned = true;
            }
            true
        });

        if transitioned {
            tracing::info!(job_id = %id, "Pause requested");
            self.emit_state_changed(id, JobState::Paused, None);
        } else {
            tracing::debug!(job_id = %id, "Pause requested, no state change");
        }
        Ok(entry.snapshot())
    }

    /// Request that a paused job resume
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id was never issued.
    pub async fn resume(&self, id: JobId) -> Result<JobSnapshot> {
        let entry = self.registry.get(id).await.ok_or(Error::NotFound(id))?;

        let mut transitioned = false;
        entry.update(|s| {
            if s.state.is_terminal() {
                return false;
            }
            entry.control.request_pause(false);
            s.paused = false;
            if s.state == JobState::Paused {
                s.set_state(JobState::Downloading);
                transitioned = true;
            }
            true
        });

        if transitioned {
            tracing::info!(job_id = %id, "Resume requested");
            self.emit_state_changed(id, JobState::Downloading, None);
        } else {
            tracing::debug!(job_id = %id, "Resume requested, no state change");
        }
        Ok(entry.snapshot())
    }

    /// Request that a job stop
    ///
    /// The job is reported as `Stopped` immediately; the lifecycle loop
    /// releases the engine handle within one poll interval. Stopping a job
    /// that is already terminal leaves it untouched, so repeated calls are
    /// harmless and a completed job stays completed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id was never issued.
    pub async fn stop(&self, id: JobId) -> Result<JobSnapshot> {
        let entry = self.registry.get(id).await.ok_or(Error::NotFound(id))?;

        let mut transitioned = false;
        entry.update(|s| {
            if s.state.is_terminal() {
                return false;
            }
            entry.control.request_stop();
            s.set_state(JobState::Stopped);
            transitioned = true;
            true
        });

        if transitioned {
            tracing::info!(job_id = %id, "Stop requested");
            self.emit_state_changed(id, JobState::Stopped, None);
        }
        Ok(entry.snapshot())
    }
}
