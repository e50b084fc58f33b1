//! Movie catalog client
//!
//! The catalog is an external collaborator: it turns a free-text query into
//! result summaries, and a result's page reference into downloadable quality
//! variants. [`YtsCatalog`] implements it by scraping the YTS site.

mod yts;

pub use yts::{YtsCatalog, parse_magnet_links, parse_search_results};

use crate::error::Result;
use crate::types::{CatalogEntry, MagnetLink};
use async_trait::async_trait;

/// Search and link-resolution interface
///
/// Any failure (network, non-success status, unexpected markup) is reported
/// as [`Error::CatalogUnavailable`](crate::error::Error::CatalogUnavailable).
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Search the catalog, results in page order
    async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>>;

    /// Resolve a detail page into its quality / magnet pairs, in page order
    async fn resolve_links(&self, page_reference: &str) -> Result<Vec<MagnetLink>>;
}
