//! Application state for the API server

use crate::catalog::CatalogClient;
use crate::{Config, JobCoordinator};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Job coordinator
    pub coordinator: JobCoordinator,

    /// Catalog client used by the search and magnet routes
    pub catalog: Arc<dyn CatalogClient>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(coordinator: JobCoordinator, catalog: Arc<dyn CatalogClient>, config: Arc<Config>) -> Self {
        Self {
            coordinator,
            catalog,
            config,
        }
    }
}
