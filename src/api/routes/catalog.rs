//! Catalog handlers: search and magnet resolution.

use super::{MagnetsQuery, MagnetsResponse, SearchQuery, SearchResponse};
use crate::api::AppState;
use crate::error::Result;
use axum::{
    Json,
    extract::{Query, State},
};

/// GET /search - Search the movie catalog
#[utoipa::path(
    get,
    path = "/search",
    tag = "catalog",
    params(SearchQuery),
    responses(
        (status = 200, description = "Search results", body = SearchResponse),
        (status = 502, description = "Catalog unavailable", body = crate::error::ApiError)
    )
)]
pub async fn search_catalog(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let results = state.catalog.search(&query.query).await?;
    Ok(Json(SearchResponse { results }))
}

/// GET /magnets - Resolve a catalog page into quality / magnet pairs
#[utoipa::path(
    get,
    path = "/magnets",
    tag = "catalog",
    params(MagnetsQuery),
    responses(
        (status = 200, description = "Magnet links", body = MagnetsResponse),
        (status = 502, description = "Catalog unavailable", body = crate::error::ApiError)
    )
)]
pub async fn resolve_magnets(
    State(state): State<AppState>,
    Query(query): Query<MagnetsQuery>,
) -> Result<Json<MagnetsResponse>> {
    let magnets = state.catalog.resolve_links(&query.page).await?;
    Ok(Json(MagnetsResponse { magnets }))
}
