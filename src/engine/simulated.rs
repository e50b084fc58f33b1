//! In-memory transfer engine
//!
//! Two modes:
//! - **manual** ([`SimulatedEngine::new`]): every acquired transfer stays
//!   where it is until a [`SimulatedTransfer`] controller moves it. Tests use
//!   this to step a job through metadata, progress and completion and to count
//!   engine calls.
//! - **scripted** ([`SimulatedEngine::scripted`]): metadata resolves after a
//!   fixed delay and progress advances linearly with unpaused wall-clock time.
//!   Used when the server runs with `engine.kind = "simulated"`.

use super::{EngineHandle, TransferEngine, TransferStatus, validate_magnet};
use crate::error::EngineError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Script {
    metadata_after: Duration,
    duration: Duration,
}

#[derive(Debug)]
struct TransferState {
    acquired_at: Instant,
    has_metadata: bool,
    progress_ratio: f64,
    download_rate: u64,
    peer_count: usize,
    is_paused: bool,
    is_complete: bool,
    failure: Option<String>,
    // scripted mode bookkeeping
    active_since: Option<Instant>,
    active_banked: Duration,
    // injected faults
    failing_pauses: u32,
    failing_resumes: u32,
    failing_release: bool,
    // call counters
    pause_calls: usize,
    resume_calls: usize,
    release_calls: usize,
}

impl TransferState {
    fn new() -> Self {
        Self {
            acquired_at: Instant::now(),
            has_metadata: false,
            progress_ratio: 0.0,
            download_rate: 0,
            peer_count: 0,
            is_paused: false,
            is_complete: false,
            failure: None,
            active_since: None,
            active_banked: Duration::ZERO,
            failing_pauses: 0,
            failing_resumes: 0,
            failing_release: false,
            pause_calls: 0,
            resume_calls: 0,
            release_calls: 0,
        }
    }

    fn advance(&mut self, script: Script) {
        if !self.has_metadata && self.acquired_at.elapsed() >= script.metadata_after {
            self.has_metadata = true;
            self.peer_count = 8;
        }
        if !self.has_metadata || self.is_complete {
            return;
        }
        let now = Instant::now();
        let active = match self.active_since {
            Some(since) if !self.is_paused => self.active_banked + now.duration_since(since),
            Some(_) => self.active_banked,
            None => {
                if !self.is_paused {
                    self.active_since = Some(now);
                }
                self.active_banked
            }
        };
        let ratio = if script.duration.is_zero() {
            1.0
        } else {
            (active.as_secs_f64() / script.duration.as_secs_f64()).min(1.0)
        };
        self.progress_ratio = ratio;
        self.download_rate = if self.is_paused { 0 } else { 2 * 1024 * 1024 };
        if ratio >= 1.0 {
            self.is_complete = true;
            self.download_rate = 0;
        }
    }
}

/// Controller for one simulated transfer
///
/// Cloning is cheap; all clones observe and drive the same transfer.
#[derive(Debug, Clone)]
pub struct SimulatedTransfer {
    identifier: String,
    save_path: PathBuf,
    state: Arc<Mutex<TransferState>>,
}

impl SimulatedTransfer {
    fn new(identifier: &str, save_path: &Path) -> Self {
        Self {
            identifier: identifier.to_string(),
            save_path: save_path.to_path_buf(),
            state: Arc::new(Mutex::new(TransferState::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TransferState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The identifier this transfer was acquired for
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The save location handed to `acquire`
    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    /// Mark metadata as resolved (or not)
    pub fn set_metadata(&self, ready: bool) {
        self.lock().has_metadata = ready;
    }

    /// Set the completion ratio (clamped to 0.0 - 1.0)
    pub fn set_progress(&self, ratio: f64) {
        self.lock().progress_ratio = ratio.clamp(0.0, 1.0);
    }

    /// Set the reported download rate and peer count
    pub fn set_rate(&self, bytes_per_sec: u64, peers: usize) {
        let mut state = self.lock();
        state.download_rate = bytes_per_sec;
        state.peer_count = peers;
    }

    /// Finish the transfer
    pub fn complete(&self) {
        let mut state = self.lock();
        state.progress_ratio = 1.0;
        state.is_complete = true;
    }

    /// Pause or unpause on the engine side, bypassing the handle
    pub fn set_paused(&self, paused: bool) {
        let mut state = self.lock();
        if paused && let Some(since) = state.active_since.take() {
            state.active_banked += since.elapsed();
        }
        state.is_paused = paused;
    }

    /// Report a fatal engine-side failure
    pub fn fail(&self, reason: impl Into<String>) {
        self.lock().failure = Some(reason.into());
    }

    /// Make the next `count` pause calls fail
    pub fn fail_next_pauses(&self, count: u32) {
        self.lock().failing_pauses = count;
    }

    /// Make the next `count` resume calls fail
    pub fn fail_next_resumes(&self, count: u32) {
        self.lock().failing_resumes = count;
    }

    /// Make release fail
    pub fn fail_release(&self) {
        self.lock().failing_release = true;
    }

    /// Whether the engine side currently has the transfer paused
    pub fn is_paused(&self) -> bool {
        self.lock().is_paused
    }

    /// Number of pause calls received (successful or not)
    pub fn pause_calls(&self) -> usize {
        self.lock().pause_calls
    }

    /// Number of resume calls received (successful or not)
    pub fn resume_calls(&self) -> usize {
        self.lock().resume_calls
    }

    /// Number of release calls received
    pub fn release_calls(&self) -> usize {
        self.lock().release_calls
    }
}

struct SimulatedHandle {
    transfer: SimulatedTransfer,
    script: Option<Script>,
}

impl SimulatedHandle {
    fn state(&self) -> MutexGuard<'_, TransferState> {
        let mut state = self.transfer.lock();
        if let Some(script) = self.script {
            state.advance(script);
        }
        state
    }
}

#[async_trait]
impl EngineHandle for SimulatedHandle {
    fn has_metadata(&self) -> bool {
        self.state().has_metadata
    }

    fn status(&self) -> TransferStatus {
        let state = self.state();
        TransferStatus {
            progress_ratio: state.progress_ratio,
            download_rate: state.download_rate,
            peer_count: state.peer_count,
            is_paused: state.is_paused,
            is_complete: state.is_complete,
        }
    }

    fn failure(&self) -> Option<String> {
        self.transfer.lock().failure.clone()
    }

    async fn pause(&mut self) -> Result<(), EngineError> {
        let mut state = self.state();
        state.pause_calls += 1;
        if state.failing_pauses > 0 {
            state.failing_pauses -= 1;
            return Err(EngineError::Pause("simulated pause failure".to_string()));
        }
        if let Some(since) = state.active_since.take() {
            state.active_banked += since.elapsed();
        }
        state.is_paused = true;
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), EngineError> {
        let mut state = self.state();
        state.resume_calls += 1;
        if state.failing_resumes > 0 {
            state.failing_resumes -= 1;
            return Err(EngineError::Resume("simulated resume failure".to_string()));
        }
        state.is_paused = false;
        if self.script.is_some() {
            state.active_since = Some(Instant::now());
        }
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<(), EngineError> {
        let mut state = self.transfer.lock();
        state.release_calls += 1;
        if state.failing_release {
            return Err(EngineError::Release("simulated release failure".to_string()));
        }
        Ok(())
    }
}

/// In-memory [`TransferEngine`]
///
/// # Examples
///
/// ```
/// use torrdown::engine::{EngineHandle, SimulatedEngine, TransferEngine};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = SimulatedEngine::new();
/// let handle = engine
///     .acquire("magnet:?xt=urn:btih:AAA", Path::new("./downloads"))
///     .await?;
///
/// let transfer = engine.transfer_for("magnet:?xt=urn:btih:AAA").unwrap();
/// transfer.set_metadata(true);
/// transfer.set_progress(0.5);
/// assert!(handle.has_metadata());
/// assert_eq!(handle.status().progress_ratio, 0.5);
///
/// handle.release().await?;
/// assert_eq!(transfer.release_calls(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SimulatedEngine {
    script: Option<Script>,
    transfers: Mutex<Vec<SimulatedTransfer>>,
    rejected: Mutex<HashSet<String>>,
}

impl SimulatedEngine {
    /// Engine whose transfers only move when driven through a controller
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose transfers resolve metadata after `metadata_after` and
    /// complete after `duration` of unpaused time
    pub fn scripted(metadata_after: Duration, duration: Duration) -> Self {
        Self {
            script: Some(Script {
                metadata_after,
                duration,
            }),
            ..Self::default()
        }
    }

    /// Make every future `acquire` for `identifier` fail
    pub fn reject(&self, identifier: impl Into<String>) {
        self.rejected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(identifier.into());
    }

    /// All transfers acquired so far, in acquisition order
    pub fn transfers(&self) -> Vec<SimulatedTransfer> {
        self.transfers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The most recent transfer acquired for `identifier`
    pub fn transfer_for(&self, identifier: &str) -> Option<SimulatedTransfer> {
        self.transfers()
            .into_iter()
            .rev()
            .find(|t| t.identifier == identifier)
    }
}

#[async_trait]
impl TransferEngine for SimulatedEngine {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn acquire(
        &self,
        identifier: &str,
        save_path: &Path,
    ) -> Result<Box<dyn EngineHandle>, EngineError> {
        validate_magnet(identifier)?;

        let rejected = self
            .rejected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(identifier);
        if rejected {
            return Err(EngineError::Acquire {
                identifier: identifier.to_string(),
                reason: "rejected by simulated engine".to_string(),
            });
        }

        let transfer = SimulatedTransfer::new(identifier, save_path);
        self.transfers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(transfer.clone());

        tracing::debug!(identifier, "Simulated transfer acquired");

        Ok(Box::new(SimulatedHandle {
            transfer,
            script: self.script,
        }))
    }
}
