//! # torrdown
//!
//! Backend for a small movie-download web application: search a public
//! catalog, pick a quality variant, and drive the magnet link through a
//! BitTorrent engine while clients poll or stream progress.
//!
//! ## Layout
//!
//! - [`coordinator`] - Job registry and per-job lifecycle tasks
//! - [`engine`] - Transfer engine seam (librqbit or simulated)
//! - [`catalog`] - Catalog search and magnet resolution
//! - [`api`] - REST and WebSocket facade
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use torrdown::{Config, JobCoordinator, engine::SimulatedEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = JobCoordinator::new(Config::default(), Arc::new(SimulatedEngine::new())).await?;
//!
//!     // Subscribe to events
//!     let mut events = coordinator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let id = coordinator.start("magnet:?xt=urn:btih:c9e15763f722f23e98a29decdfae341b98d53056").await?;
//!     let finished = coordinator.wait(id).await?;
//!     println!("{} ended as {}", id, finished.state);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Movie catalog client
pub mod catalog;
/// Configuration types
pub mod config;
/// Job coordinator (decomposed into focused submodules)
pub mod coordinator;
/// Transfer engine abstraction and implementations
pub mod engine;
/// Error types
pub mod error;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use catalog::{CatalogClient, YtsCatalog};
pub use config::{Config, EngineKind};
pub use coordinator::JobCoordinator;
pub use engine::{EngineHandle, TransferEngine, TransferStatus, build_engine};
pub use error::{ApiError, EngineError, Error, ErrorDetail, Result, ToHttpStatus};
pub use types::{CatalogEntry, Event, JobId, JobSnapshot, JobState, MagnetLink, ProgressFrame};

/// Helper function to run the coordinator with graceful signal handling.
///
/// Waits for a termination signal and then calls the coordinator's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use torrdown::{Config, JobCoordinator, engine::SimulatedEngine, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let coordinator = JobCoordinator::new(Config::default(), Arc::new(SimulatedEngine::new())).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(&coordinator).await;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(coordinator: &JobCoordinator) {
    wait_for_signal().await;
    coordinator.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
