//! REST API server module
//!
//! HTTP and WebSocket facade over the [`JobCoordinator`] and the catalog
//! client. Routes keep the flat layout the web front end expects.

use crate::catalog::CatalogClient;
use crate::{Config, JobCoordinator, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Jobs
/// - `POST /download` - Start a transfer (JSON body or `?magnet=` query)
/// - `GET /downloads` - List all jobs
/// - `GET /status/:id` - Get a job snapshot
/// - `POST /pause/:id` - Pause a job
/// - `POST /resume/:id` - Resume a job
/// - `POST /stop/:id` - Stop a job
/// - `GET /ws/:id` - WebSocket progress stream
///
/// ## Catalog
/// - `GET /search?query=` - Search the movie catalog
/// - `GET /magnets?page=` - Resolve a catalog page into magnet links
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /config` - Current configuration
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
pub fn create_router(
    coordinator: JobCoordinator,
    catalog: Arc<dyn CatalogClient>,
    config: Arc<Config>,
) -> Router {
    let state = AppState::new(coordinator, catalog, config.clone());

    let router = Router::new()
        // Jobs
        .route("/download", post(routes::start_download))
        .route("/downloads", get(routes::list_downloads))
        .route("/status/:id", get(routes::get_status))
        .route("/pause/:id", post(routes::pause_download))
        .route("/resume/:id", post(routes::resume_download))
        .route("/stop/:id", post(routes::stop_download))
        .route("/ws/:id", get(routes::progress_socket))
        // Catalog
        .route("/search", get(routes::search_catalog))
        .route("/magnets", get(routes::resolve_magnets))
        // System
        .route("/health", get(routes::health_check))
        .route("/config", get(routes::get_config))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream));

    // Swagger UI serves its own copy of the document under a separate path
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin, which is what the bundled
/// front end relies on during local development.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops or fails.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use torrdown::{Config, JobCoordinator, catalog::YtsCatalog, engine::SimulatedEngine};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let coordinator = JobCoordinator::new((*config).clone(), Arc::new(SimulatedEngine::new())).await?;
/// let catalog = Arc::new(YtsCatalog::new(&config.catalog)?);
///
/// torrdown::api::start_api_server(coordinator, catalog, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(
    coordinator: JobCoordinator,
    catalog: Arc<dyn CatalogClient>,
    config: Arc<Config>,
) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(coordinator, catalog, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
