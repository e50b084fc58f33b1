use super::*;
use crate::JobCoordinator;
use crate::coordinator::test_helpers::{create_test_coordinator, create_test_coordinator_with, test_config};
use crate::engine::SimulatedEngine;
use crate::error::{Error, Result};
use crate::types::{CatalogEntry, MagnetLink};
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use std::time::Duration;
use tower::ServiceExt;


/// Catalog double returning canned results, or failing every call
struct StaticCatalog {
    entries: Vec<CatalogEntry>,
    links: Vec<MagnetLink>,
    fail: bool,
}

impl StaticCatalog {
    fn with_results() -> Self {
        Self {
            entries: vec![CatalogEntry {
                title: "Night of the Living Dead".to_string(),
                year: "1968".to_string(),
                cover_url: "https://img.example/notld.jpg".to_string(),
                page_reference: "https://catalog.example/movies/notld-1968".to_string(),
            }],
            links: vec![
                MagnetLink {
                    quality: "720p".to_string(),
                    source_identifier: "magnet:?xt=urn:btih:AAA".to_string(),
                },
                MagnetLink {
                    quality: "1080p".to_string(),
                    source_identifier: "magnet:?xt=urn:btih:BBB".to_string(),
                },
            ],
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            entries: Vec::new(),
            links: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl CatalogClient for StaticCatalog {
    async fn search(&self, _query: &str) -> Result<Vec<CatalogEntry>> {
        if self.fail {
            return Err(Error::CatalogUnavailable("connection refused".to_string()));
        }
        Ok(self.entries.clone())
    }

    async fn resolve_links(&self, _page_reference: &str) -> Result<Vec<MagnetLink>> {
        if self.fail {
            return Err(Error::CatalogUnavailable("connection refused".to_string()));
        }
        Ok(self.links.clone())
    }
}

/// Router over a fresh coordinator and the canned catalog
async fn create_test_app() -> (Router, JobCoordinator, Arc<SimulatedEngine>, tempfile::TempDir) {
    let (coordinator, engine, temp_dir) = create_test_coordinator().await;
    let config = coordinator.get_config();
    let app = create_router(coordinator.clone(), Arc::new(StaticCatalog::with_results()), config);
    (app, coordinator, engine, temp_dir)
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn get(app: &Router, uri: &str) -> Response {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn post(app: &Router, uri: &str) -> Response {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (coordinator, _engine, _temp_dir) = create_test_coordinator().await;

    let mut config = (*coordinator.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { start_api_server(coordinator, Arc::new(StaticCatalog::with_results()), config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server exited early");

    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let (coordinator, _engine, _temp_dir) = create_test_coordinator().await;

    let mut config = (*coordinator.get_config()).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(coordinator, Arc::new(StaticCatalog::with_results()), Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers().contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&temp_dir);
    config.server.api.cors_enabled = false;
    let (coordinator, _engine, _temp_dir) = create_test_coordinator_with(config, temp_dir).await;
    let app = create_router(
        coordinator.clone(),
        Arc::new(StaticCatalog::with_results()),
        coordinator.get_config(),
    );

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_cors_specific_origins() {
    let (coordinator, _engine, _temp_dir) = create_test_coordinator().await;

    let mut config = (*coordinator.get_config()).clone();
    config.server.api.cors_origins = vec!["http://localhost:3000".to_string()];
    let app = create_router(coordinator, Arc::new(StaticCatalog::with_results()), Arc::new(config));

    let allowed = send(
        &app,
        Request::builder()
            .uri("/health")
            .header("Origin", "http://localhost:3000")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(
        allowed.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:3000"
    );

    let denied = send(
        &app,
        Request::builder()
            .uri("/health")
            .header("Origin", "http://evil.example")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert!(!denied.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let (app, _coordinator, _engine, _temp_dir) = create_test_app().await;
    let response = get(&app, "/api-docs/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&temp_dir);
    config.server.api.swagger_ui = false;
    let (coordinator, _engine, _temp_dir) = create_test_coordinator_with(config, temp_dir).await;
    let app = create_router(
        coordinator.clone(),
        Arc::new(StaticCatalog::with_results()),
        coordinator.get_config(),
    );
    let response = get(&app, "/api-docs/openapi.json").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _coordinator, _engine, _temp_dir) = create_test_app().await;
    let response = get(&app, "/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
