//! Transfer-job coordinator split into focused submodules.
//!
//! The `JobCoordinator` struct and its methods are organized by concern:
//! - [`registry`] - Owned job registry and per-job shared state
//! - [`task`] - The per-job lifecycle loop driving an engine handle
//! - [`control`] - Pause, resume and stop
//! - [`progress`] - Status reads and live subscriptions
//! - [`lifecycle`] - Graceful shutdown

mod control;
mod lifecycle;
mod progress;
pub(crate) mod registry;
mod task;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::engine::TransferEngine;
use crate::error::{Error, Result};
use crate::types::{Event, JobId};
use registry::{JobEntry, JobRegistry};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Main coordinator instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct JobCoordinator {
    /// All jobs ever created in this process
    pub(crate) registry: Arc<JobRegistry>,
    /// Transfer engine shared by every job
    pub(crate) engine: Arc<dyn TransferEngine>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Flag to indicate whether new jobs are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl JobCoordinator {
    /// Create a new coordinator on top of `engine`
    ///
    /// Validates the configuration and creates the download directory if it
    /// does not exist yet.
    pub async fn new(config: Config, engine: Arc<dyn TransferEngine>) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        // Buffer size of 1000 events; slow subscribers see `Lagged`
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        tracing::info!(
            engine = engine.name(),
            download_dir = %config.download.download_dir.display(),
            "Job coordinator initialized"
        );

        Ok(Self {
            registry: Arc::new(JobRegistry::new()),
            engine,
            event_tx,
            config: Arc::new(config),
            accepting_new: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Start a transfer for `source_identifier`
    ///
    /// Registers a `Pending` job, spawns its lifecycle task and returns the
    /// new id without waiting on the engine. Engine failures are recorded on
    /// the job and show up in a later [`status`](Self::status) read.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSource`] for an empty identifier
    /// - [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use torrdown::{Config, JobCoordinator, engine::SimulatedEngine};
    ///
    /// # async fn example() -> torrdown::Result<()> {
    /// let coordinator = JobCoordinator::new(Config::default(), Arc::new(SimulatedEngine::new())).await?;
    /// let id = coordinator.start("magnet:?xt=urn:btih:AAA").await?;
    /// println!("{:?}", coordinator.status(id).await?.state);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start(&self, source_identifier: &str) -> Result<JobId> {
        let source_identifier = source_identifier.trim();
        if source_identifier.is_empty() {
            return Err(Error::InvalidSource(
                "source identifier must not be empty".to_string(),
            ));
        }
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let mut entry = Arc::new(JobEntry::new(JobId::new(), source_identifier.to_string()));
        while !self.registry.insert(entry.clone()).await {
            // v4 collision; draw again so ids are never reused
            entry = Arc::new(JobEntry::new(JobId::new(), source_identifier.to_string()));
        }
        let id = entry.id;

        tracing::info!(job_id = %id, source_identifier, "Job created");
        self.emit_event(Event::JobCreated {
            job_id: id,
            source_identifier: source_identifier.to_string(),
        });

        self.spawn_job_task(entry);
        Ok(id)
    }

    /// Subscribe to job events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// If a subscriber falls behind by more than 1000 events, it will receive a
    /// `RecvError::Lagged` error.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Name of the transfer engine in use
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server listens on `server.api.bind_address` (default 127.0.0.1:8000).
    pub fn spawn_api_server(
        &self,
        catalog: Arc<dyn crate::catalog::CatalogClient>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        let coordinator = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(coordinator, catalog, config).await })
    }
}
