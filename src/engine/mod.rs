//! Transfer engine capability interface
//!
//! The coordinator never talks to a BitTorrent implementation directly. It
//! depends only on [`TransferEngine`] and [`EngineHandle`], so any engine that
//! can report metadata readiness and a status snapshot, and can pause, resume
//! and release a transfer, is substitutable.
//!
//! Implementations:
//! - [`RqbitEngine`] (feature `rqbit`) - librqbit session
//! - [`SimulatedEngine`] - in-memory engine for tests and front-end work

use crate::config::{Config, EngineKind};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

#[cfg(feature = "rqbit")]
mod rqbit;
mod simulated;

#[cfg(feature = "rqbit")]
pub use rqbit::RqbitEngine;
pub use simulated::{SimulatedEngine, SimulatedTransfer};

/// Status snapshot of a single transfer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransferStatus {
    /// Fraction of the payload that is present (0.0 - 1.0)
    pub progress_ratio: f64,
    /// Current download rate in bytes per second
    pub download_rate: u64,
    /// Number of connected peers
    pub peer_count: usize,
    /// Whether the engine currently has the transfer paused
    pub is_paused: bool,
    /// Whether the payload is complete
    pub is_complete: bool,
}

/// Per-job resource representing an active transfer inside the engine
///
/// A handle is owned by exactly one lifecycle task. `release` consumes the
/// handle, so it can run at most once.
#[async_trait]
pub trait EngineHandle: Send + Sync {
    /// Whether the engine has resolved the torrent metadata
    fn has_metadata(&self) -> bool;

    /// Current status snapshot
    fn status(&self) -> TransferStatus;

    /// A fatal failure the engine hit after acquisition (e.g. the magnet
    /// could not be resolved). The lifecycle loop stops the job when this
    /// returns `Some`.
    fn failure(&self) -> Option<String> {
        None
    }

    /// Pause the transfer
    async fn pause(&mut self) -> std::result::Result<(), EngineError>;

    /// Resume a paused transfer
    async fn resume(&mut self) -> std::result::Result<(), EngineError>;

    /// Release all engine resources held by this transfer
    async fn release(self: Box<Self>) -> std::result::Result<(), EngineError>;
}

/// Factory for engine handles
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
/// assert!(!handle.has_metadata());
/// handle.release().await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait TransferEngine: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &'static str;

    /// Start a transfer for `identifier`, writing content under `save_path`
    ///
    /// Must not block on metadata resolution; readiness is polled through
    /// [`EngineHandle::has_metadata`].
    async fn acquire(
        &self,
        identifier: &str,
        save_path: &Path,
    ) -> std::result::Result<Box<dyn EngineHandle>, EngineError>;

    /// Tear down engine-wide resources at process shutdown
    async fn shutdown(&self) {}
}

/// Build the engine selected by `config.engine.kind`
pub async fn build_engine(config: &Config) -> Result<Arc<dyn TransferEngine>> {
    tracing::info!(engine = ?config.engine.kind, "Initializing transfer engine");

    match config.engine.kind {
        EngineKind::Simulated => Ok(Arc::new(SimulatedEngine::scripted(
            std::time::Duration::from_secs(config.engine.simulated_metadata_secs),
            std::time::Duration::from_secs(config.engine.simulated_duration_secs),
        ))),
        #[cfg(feature = "rqbit")]
        EngineKind::Rqbit => {
            let engine = RqbitEngine::new(config.download.download_dir.clone()).await?;
            Ok(Arc::new(engine))
        }
        #[cfg(not(feature = "rqbit"))]
        EngineKind::Rqbit => Err(crate::error::Error::Config {
            message: "torrdown was built without the `rqbit` feature".to_string(),
            key: Some("engine.kind".to_string()),
        }),
    }
}

/// Reject identifiers that are not magnet links before handing them to an engine
pub(crate) fn validate_magnet(identifier: &str) -> std::result::Result<(), EngineError> {
    let malformed = |reason: &str| EngineError::Acquire {
        identifier: identifier.to_string(),
        reason: reason.to_string(),
    };

    let url = url::Url::parse(identifier).map_err(|e| malformed(&e.to_string()))?;
    if url.scheme() != "magnet" {
        return Err(malformed("not a magnet link"));
    }
    let has_topic = url
        .query_pairs()
        .any(|(k, v)| k == "xt" && v.starts_with("urn:btih:") && v.len() > "urn:btih:".len());
    if !has_topic {
        return Err(malformed("magnet missing xt=urn:btih:..."));
    }
    Ok(())
}
