//! Core types for torrdown

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a transfer job
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a fresh random (v4) job id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle state of a job
///
/// `Completed` and `Stopped` are terminal: no transition leaves them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Created, waiting for the engine to resolve metadata
    Pending,
    /// Actively transferring
    Downloading,
    /// Paused by a client
    Paused,
    /// Transfer finished
    Completed,
    /// Stopped by a client, by shutdown, or by an engine failure
    Stopped,
}

impl JobState {
    /// Whether the state is final
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Stopped)
    }

    /// Lowercase name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Downloading => "downloading",
            JobState::Paused => "paused",
            JobState::Completed => "completed",
            JobState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a job, published to observers as one unit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobSnapshot {
    /// Job identifier
    pub job_id: JobId,
    /// What is being fetched (magnet link)
    pub source_identifier: String,
    /// Current lifecycle state
    pub state: JobState,
    /// Completion percentage (0-100, two decimals)
    pub progress: f64,
    /// Whether a pause has been requested
    pub paused: bool,
    /// Whether the job ended in `Stopped`
    pub stopped: bool,
    /// Last observed download rate in bytes per second
    pub download_rate: u64,
    /// Last observed number of connected peers
    pub peers: usize,
    /// Recorded failure cause, if the job was terminated by an error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When the snapshot last changed
    pub updated_at: DateTime<Utc>,
}

impl JobSnapshot {
    pub(crate) fn pending(job_id: JobId, source_identifier: String) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            source_identifier,
            state: JobState::Pending,
            progress: 0.0,
            paused: false,
            stopped: false,
            download_rate: 0,
            peers: 0,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `state`, keeping the derived `stopped` flag in sync
    pub(crate) fn set_state(&mut self, state: JobState) {
        self.state = state;
        self.stopped = state == JobState::Stopped;
        if state == JobState::Completed {
            self.progress = 100.0;
        }
        if state.is_terminal() {
            self.download_rate = 0;
            self.peers = 0;
        }
        self.updated_at = Utc::now();
    }

    /// The compact frame pushed over the progress stream
    pub fn frame(&self) -> ProgressFrame {
        ProgressFrame {
            progress: self.progress,
            state: self.state,
            paused: self.paused,
        }
    }
}

/// Compact progress frame emitted by the streaming endpoint
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProgressFrame {
    /// Completion percentage
    pub progress: f64,
    /// Current lifecycle state
    pub state: JobState,
    /// Whether a pause has been requested
    pub paused: bool,
}

/// Events broadcast to all subscribers
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A job was registered
    JobCreated {
        /// Job identifier
        job_id: JobId,
        /// What is being fetched
        source_identifier: String,
    },
    /// A job changed lifecycle state
    StateChanged {
        /// Job identifier
        job_id: JobId,
        /// New state
        state: JobState,
        /// Recorded failure cause, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// A downloading job reported new progress
    Progress {
        /// Job identifier
        job_id: JobId,
        /// Completion percentage
        progress: f64,
        /// Download rate in bytes per second
        download_rate: u64,
        /// Connected peers
        peers: usize,
    },
    /// The coordinator is shutting down
    Shutdown,
}

/// One search result from the catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CatalogEntry {
    /// Movie title
    pub title: String,
    /// Release year as printed by the catalog
    pub year: String,
    /// Cover image URL
    pub cover_url: String,
    /// Reference to the detail page, passed back to `resolve_links`
    pub page_reference: String,
}

/// One downloadable quality variant of a catalog entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MagnetLink {
    /// Quality label (e.g. "1080p")
    pub quality: String,
    /// Magnet link to hand to `start`
    pub source_identifier: String,
}

/// Round a completion ratio to a percentage with two decimals
pub(crate) fn ratio_to_percent(ratio: f64) -> f64 {
    let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
    (ratio * 100.0 * 100.0).round() / 100.0
}
