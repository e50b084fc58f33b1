//! YTS HTML scraper.

use super::CatalogClient;
use crate::config::CatalogConfig;
use crate::error::{Error, Result};
use crate::types::{CatalogEntry, MagnetLink};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Catalog client backed by the YTS website
#[derive(Clone)]
pub struct YtsCatalog {
    http_client: reqwest::Client,
    base_url: Url,
}

impl YtsCatalog {
    /// Create a client from the catalog section of the config
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be created
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| Error::Config {
            message: format!("invalid catalog base URL '{}': {}", config.base_url, e),
            key: Some("catalog.base_url".to_string()),
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn search_url(&self, query: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let raw = format!(
            "{}/browse-movies?keyword={}&quality=all&genre=all&rating=0&year=0&order_by=latest",
            base,
            urlencoding::encode(query)
        );
        Url::parse(&raw).map_err(|e| Error::CatalogUnavailable(format!("bad search URL: {}", e)))
    }

    /// Page references are normally site-relative paths, but absolute URLs
    /// (as some mirrors emit) are used as-is
    fn page_url(&self, page_reference: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(page_reference) {
            return Ok(url);
        }
        self.base_url.join(page_reference).map_err(|e| {
            Error::CatalogUnavailable(format!("bad page reference '{}': {}", page_reference, e))
        })
    }

    async fn fetch(&self, url: Url) -> Result<String> {
        tracing::debug!(url = %url, "Fetching catalog page");

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::CatalogUnavailable(format!("request to {} failed: {}", url, e)))?;

        // Check HTTP status before trying to parse the response body
        let status = response.status();
        if !status.is_success() {
            return Err(Error::CatalogUnavailable(format!(
                "catalog returned HTTP {}: {}",
                status.as_u16(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::CatalogUnavailable(format!("failed to read catalog page: {}", e)))
    }
}

#[async_trait]
impl CatalogClient for YtsCatalog {
    async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>> {
        let url = self.search_url(query)?;
        let body = self.fetch(url).await?;
        let results = parse_search_results(&body)?;
        tracing::info!(query, results = results.len(), "Catalog search complete");
        Ok(results)
    }

    async fn resolve_links(&self, page_reference: &str) -> Result<Vec<MagnetLink>> {
        let url = self.page_url(page_reference)?;
        let body = self.fetch(url).await?;
        let links = parse_magnet_links(&body)?;
        tracing::info!(page_reference, links = links.len(), "Resolved magnet links");
        Ok(links)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Other(format!("invalid selector '{}': {}", css, e)))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn mismatch(what: &str) -> Error {
    Error::CatalogUnavailable(format!("unexpected catalog markup: {}", what))
}

/// Parse a `browse-movies` page into result summaries
///
/// A page without any `.browse-movie-wrap` card is an empty result. A card
/// that lacks its title, year, cover or link fails the whole parse.
pub fn parse_search_results(html: &str) -> Result<Vec<CatalogEntry>> {
    let card_sel = selector(".browse-movie-wrap")?;
    let title_sel = selector(".browse-movie-bottom a")?;
    let year_sel = selector(".browse-movie-year")?;
    let img_sel = selector("img")?;
    let link_sel = selector("a")?;

    let doc = Html::parse_document(html);
    let mut entries = Vec::new();

    for card in doc.select(&card_sel) {
        let title = card
            .select(&title_sel)
            .next()
            .map(text_of)
            .ok_or_else(|| mismatch("card without .browse-movie-bottom a"))?;
        let year = card
            .select(&year_sel)
            .next()
            .map(text_of)
            .ok_or_else(|| mismatch("card without .browse-movie-year"))?;
        let cover_url = card
            .select(&img_sel)
            .next()
            .and_then(|img| img.value().attr("src"))
            .ok_or_else(|| mismatch("card without img[src]"))?
            .to_string();
        let page_reference = card
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| mismatch("card without a[href]"))?
            .to_string();

        entries.push(CatalogEntry {
            title,
            year,
            cover_url,
            page_reference,
        });
    }

    Ok(entries)
}

/// Parse a movie detail page into quality / magnet pairs
///
/// Torrent blocks without a magnet anchor are skipped.
pub fn parse_magnet_links(html: &str) -> Result<Vec<MagnetLink>> {
    let block_sel = selector(".modal-torrent")?;
    let quality_sel = selector(".modal-quality span")?;
    let magnet_sel = selector("a.magnet-download")?;

    let doc = Html::parse_document(html);
    let mut links = Vec::new();

    for block in doc.select(&block_sel) {
        let Some(source_identifier) = block
            .select(&magnet_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            tracing::debug!("Skipping torrent block without magnet link");
            continue;
        };
        let quality = block
            .select(&quality_sel)
            .next()
            .map(text_of)
            .ok_or_else(|| mismatch("torrent block without .modal-quality span"))?;

        links.push(MagnetLink {
            quality,
            source_identifier: source_identifier.to_string(),
        });
    }

    Ok(links)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SEARCH_PAGE: &str = r#"
        <html><body>
          <div class="browse-movie-wrap">
            <a href="/movies/inception-2010" class="browse-movie-link">
              <figure><img src="https://img.example/inception.jpg" alt="Inception"></figure>
            </a>
            <div class="browse-movie-bottom">
              <a href="/movies/inception-2010" class="browse-movie-title">  Inception </a>
              <div class="browse-movie-year">2010</div>
            </div>
          </div>
          <div class="browse-movie-wrap">
            <a href="/movies/interstellar-2014" class="browse-movie-link">
              <figure><img src="https://img.example/interstellar.jpg"></figure>
            </a>
            <div class="browse-movie-bottom">
              <a href="/movies/interstellar-2014" class="browse-movie-title">Interstellar</a>
              <div class="browse-movie-year">2014</div>
            </div>
          </div>
        </body></html>
    "#;

    const DETAIL_PAGE: &str = r#"
        <html><body>
          <div class="modal-torrent">
            <div class="modal-quality"><span>720p</span></div>
            <a class="magnet-download" href="magnet:?xt=urn:btih:AAA&dn=Inception+720p">magnet</a>
          </div>
          <div class="modal-torrent">
            <div class="modal-quality"><span>1080p</span></div>
            <a class="magnet-download" href="magnet:?xt=urn:btih:BBB&dn=Inception+1080p">magnet</a>
          </div>
          <div class="modal-torrent">
            <div class="modal-quality"><span>2160p</span></div>
            <a class="download-torrent" href="/torrent/download/CCC">torrent file only</a>
          </div>
        </body></html>
    "#;

    fn catalog_for(server: &MockServer) -> YtsCatalog {
        YtsCatalog::new(&CatalogConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(2),
            ..CatalogConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_parse_search_results() {
        let results = parse_search_results(SEARCH_PAGE).unwrap();
        assert_eq!(
            results,
            vec![
                CatalogEntry {
                    title: "Inception".into(),
                    year: "2010".into(),
                    cover_url: "https://img.example/inception.jpg".into(),
                    page_reference: "/movies/inception-2010".into(),
                },
                CatalogEntry {
                    title: "Interstellar".into(),
                    year: "2014".into(),
                    cover_url: "https://img.example/interstellar.jpg".into(),
                    page_reference: "/movies/interstellar-2014".into(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_search_results_empty_page() {
        let results = parse_search_results("<html><body><p>No results</p></body></html>").unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_parse_search_results_card_missing_year_is_mismatch() {
        let html = r#"
            <div class="browse-movie-wrap">
              <a href="/movies/x"><img src="x.jpg"></a>
              <div class="browse-movie-bottom"><a href="/movies/x">X</a></div>
            </div>
        "#;
        assert!(matches!(
            parse_search_results(html),
            Err(Error::CatalogUnavailable(_))
        ));
    }

    #[test]
    fn test_parse_magnet_links_skips_blocks_without_magnet() {
        let links = parse_magnet_links(DETAIL_PAGE).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].quality, "720p");
        assert_eq!(links[0].source_identifier, "magnet:?xt=urn:btih:AAA&dn=Inception+720p");
        assert_eq!(links[1].quality, "1080p");
    }

    #[tokio::test]
    async fn test_search_builds_browse_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/browse-movies"))
            .and(query_param("keyword", "the matrix"))
            .and(query_param("quality", "all"))
            .and(query_param("order_by", "latest"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SEARCH_PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let results = catalog_for(&server).search("the matrix").await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_links_fetches_relative_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movies/inception-2010"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL_PAGE))
            .mount(&server)
            .await;

        let links = catalog_for(&server)
            .resolve_links("/movies/inception-2010")
            .await
            .unwrap();
        assert_eq!(links.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_links_accepts_absolute_reference() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movies/inception-2010"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL_PAGE))
            .mount(&server)
            .await;

        let catalog = YtsCatalog::new(&CatalogConfig::default()).unwrap();
        let absolute = format!("{}/movies/inception-2010", server.uri());
        let links = catalog.resolve_links(&absolute).await.unwrap();
        assert_eq!(links.len(), 2);
    }

    #[tokio::test]
    async fn test_http_error_is_catalog_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = catalog_for(&server).search("anything").await;
        match result {
            Err(Error::CatalogUnavailable(message)) => assert!(message.contains("503")),
            other => panic!("expected CatalogUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_network_error_is_catalog_unavailable() {
        // Nothing listens on this port once the server is dropped
        let server = MockServer::start().await;
        let catalog = catalog_for(&server);
        drop(server);

        assert!(matches!(
            catalog.search("anything").await,
            Err(Error::CatalogUnavailable(_))
        ));
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let config = CatalogConfig {
            base_url: "not a url".into(),
            ..CatalogConfig::default()
        };
        assert!(matches!(YtsCatalog::new(&config), Err(Error::Config { .. })));
    }
}
