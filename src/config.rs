//! Configuration types for torrdown

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Transfer behavior configuration (directories, poll cadence, timeouts)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    #[schema(value_type = String)]
    pub download_dir: PathBuf,

    /// Interval at which a job's lifecycle loop re-evaluates engine status
    /// and control flags (default: 1s)
    #[serde(default = "default_poll_interval", with = "duration_millis")]
    #[schema(value_type = u64)]
    pub poll_interval: Duration,

    /// Poll interval used while a job is paused (default: 500ms)
    #[serde(default = "default_paused_poll_interval", with = "duration_millis")]
    #[schema(value_type = u64)]
    pub paused_poll_interval: Duration,

    /// Give up on metadata resolution after this long (default: None = wait
    /// until the job is stopped)
    #[serde(default, with = "option_duration_millis")]
    #[schema(value_type = Option<u64>)]
    pub metadata_timeout: Option<Duration>,

    /// How long `shutdown` waits for lifecycle tasks to release their
    /// handles (default: 30s)
    #[serde(default = "default_shutdown_timeout", with = "duration_millis")]
    #[schema(value_type = u64)]
    pub shutdown_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            poll_interval: default_poll_interval(),
            paused_poll_interval: default_paused_poll_interval(),
            metadata_timeout: None,
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Which transfer engine backs the coordinator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// librqbit BitTorrent session
    #[default]
    Rqbit,
    /// In-memory engine that fakes transfers (front-end development, tests)
    Simulated,
}

/// Transfer engine configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EngineConfig {
    /// Engine implementation (default: rqbit)
    #[serde(default)]
    pub kind: EngineKind,

    /// Seconds a simulated transfer needs to resolve metadata (default: 2)
    #[serde(default = "default_simulated_metadata_secs")]
    pub simulated_metadata_secs: u64,

    /// Seconds a simulated transfer needs to finish once active (default: 60)
    #[serde(default = "default_simulated_duration_secs")]
    pub simulated_duration_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::default(),
            simulated_metadata_secs: default_simulated_metadata_secs(),
            simulated_duration_secs: default_simulated_duration_secs(),
        }
    }
}

/// Catalog site configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CatalogConfig {
    /// Base URL of the catalog site (default: "https://www.yts-official.cc")
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,

    /// Request timeout (default: 10s)
    #[serde(default = "default_catalog_timeout", with = "duration_millis")]
    #[schema(value_type = u64)]
    pub timeout: Duration,

    /// User-Agent header sent to the catalog
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            timeout: default_catalog_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Cadence of the per-job progress stream (default: 1s)
    #[serde(default = "default_stream_interval", with = "duration_millis")]
    #[schema(value_type = u64)]
    pub stream_interval: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            stream_interval: default_stream_interval(),
        }
    }
}

/// Main configuration for torrdown
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig) - download directory, poll cadence, timeouts
/// - [`engine`](EngineConfig) - transfer engine selection
/// - [`catalog`](CatalogConfig) - catalog site access
/// - [`server`](ServerIntegrationConfig) - REST API
///
/// Every field has a default, so `{}` is a valid configuration file.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Transfer behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Transfer engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Catalog site settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// API settings
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read '{}': {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse '{}': {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the coordinator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.poll_interval.is_zero() {
            return Err(Error::Config {
                message: "poll_interval must be greater than zero".to_string(),
                key: Some("download.poll_interval".to_string()),
            });
        }
        if self.download.paused_poll_interval.is_zero() {
            return Err(Error::Config {
                message: "paused_poll_interval must be greater than zero".to_string(),
                key: Some("download.paused_poll_interval".to_string()),
            });
        }
        if self.server.api.stream_interval.is_zero() {
            return Err(Error::Config {
                message: "stream_interval must be greater than zero".to_string(),
                key: Some("server.api.stream_interval".to_string()),
            });
        }
        if url::Url::parse(&self.catalog.base_url).is_err() {
            return Err(Error::Config {
                message: format!("invalid catalog base_url '{}'", self.catalog.base_url),
                key: Some("catalog.base_url".to_string()),
            });
        }
        Ok(())
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

mod option_duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_paused_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_simulated_metadata_secs() -> u64 {
    2
}

fn default_simulated_duration_secs() -> u64 {
    60
}

fn default_catalog_base_url() -> String {
    "https://www.yts-official.cc".to_string()
}

fn default_catalog_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_agent() -> String {
    format!("torrdown/{}", env!("CARGO_PKG_VERSION"))
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_stream_interval() -> Duration {
    Duration::from_secs(1)
}
