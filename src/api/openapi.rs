//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the torrdown REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the torrdown REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "torrdown REST API",
        version = "0.1.0",
        description = "REST API for searching a movie catalog and managing magnet-link transfers",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::start_download,
        crate::api::routes::list_downloads,
        crate::api::routes::get_status,
        crate::api::routes::pause_download,
        crate::api::routes::resume_download,
        crate::api::routes::stop_download,
        crate::api::routes::progress_socket,

        // Catalog
        crate::api::routes::search_catalog,
        crate::api::routes::resolve_magnets,

        // System
        crate::api::routes::health_check,
        crate::api::routes::get_config,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobId,
        crate::types::JobState,
        crate::types::JobSnapshot,
        crate::types::ProgressFrame,
        crate::types::Event,
        crate::types::CatalogEntry,
        crate::types::MagnetLink,

        // Config types from config.rs
        crate::config::Config,
        crate::config::DownloadConfig,
        crate::config::EngineConfig,
        crate::config::EngineKind,
        crate::config::CatalogConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,

        // API request/response types
        crate::api::routes::StartDownloadRequest,
        crate::api::routes::StartDownloadResponse,
        crate::api::routes::ControlResponse,
        crate::api::routes::SearchResponse,
        crate::api::routes::MagnetsResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Transfer jobs - Start, pause, resume, stop and observe downloads"),
        (name = "catalog", description = "Catalog - Search movies and resolve magnet links"),
        (name = "system", description = "System endpoints - Health checks, configuration, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
