//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] - Starting, controlling and observing transfer jobs
//! - [`catalog`] - Catalog search and magnet resolution
//! - [`system`] - Health, config, events, OpenAPI

use crate::error::{Error, Result};
use crate::types::{CatalogEntry, JobId, JobState, MagnetLink};
use serde::{Deserialize, Serialize};

mod catalog;
mod jobs;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use catalog::*;
pub use jobs::*;
pub use system::*;

/// Parse a job id taken from the request path
pub(crate) fn parse_job_id(raw: &str) -> Result<JobId> {
    raw.parse().map_err(|_| Error::InvalidJobId(raw.to_string()))
}

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StartDownloadRequest {
    /// Magnet link to fetch
    pub source_identifier: String,
}

/// Query parameters for POST /download
///
/// `magnet` is the parameter name used by the bundled front end.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StartDownloadQuery {
    /// Magnet link to fetch
    pub magnet: Option<String>,
    /// Magnet link to fetch (alias)
    pub source_identifier: Option<String>,
}

/// Response for POST /download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StartDownloadResponse {
    /// Id of the new job
    pub job_id: JobId,
}

/// Response for POST /pause/:id, /resume/:id and /stop/:id
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ControlResponse {
    /// State of the job after the request
    pub status: JobState,
    /// Job id
    pub job_id: JobId,
}

/// Query parameters for GET /search
#[derive(Debug, Deserialize, Serialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Free-text search
    pub query: String,
}

/// Response for GET /search
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SearchResponse {
    /// Results in catalog order
    pub results: Vec<CatalogEntry>,
}

/// Query parameters for GET /magnets
#[derive(Debug, Deserialize, Serialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MagnetsQuery {
    /// `page_reference` of a search result
    pub page: String,
}

/// Response for GET /magnets
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct MagnetsResponse {
    /// Quality variants in page order
    pub magnets: Vec<MagnetLink>,
}
