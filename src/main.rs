//! torrdown server
//!
//! Loads the configuration, builds the transfer engine and serves the REST
//! API until SIGINT/SIGTERM, then shuts the coordinator down gracefully.
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:8000/swagger-ui
//! - Search via GET http://localhost:8000/search?query=...
//! - Start a transfer via POST http://localhost:8000/download?magnet=...
//! - Stream events via GET http://localhost:8000/events

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use torrdown::{Config, EngineKind, JobCoordinator, YtsCatalog, build_engine, run_with_shutdown};
use tracing_subscriber::EnvFilter;

/// Movie catalog search and torrent download server
#[derive(Debug, Parser)]
#[command(name = "torrdown", version, about)]
struct Cli {
    /// JSON configuration file (every field optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind the API to (overrides the config file)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Download directory (overrides the config file)
    #[arg(short, long)]
    download_dir: Option<PathBuf>,

    /// Transfer engine: "rqbit" or "simulated" (overrides the config file)
    #[arg(short, long, value_parser = parse_engine_kind)]
    engine: Option<EngineKind>,
}

fn parse_engine_kind(raw: &str) -> std::result::Result<EngineKind, String> {
    match raw {
        "rqbit" => Ok(EngineKind::Rqbit),
        "simulated" => Ok(EngineKind::Simulated),
        other => Err(format!("unknown engine '{other}', expected 'rqbit' or 'simulated'")),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(bind) = cli.bind {
        config.server.api.bind_address = bind;
    }
    if let Some(dir) = &cli.download_dir {
        config.download.download_dir = dir.clone();
    }
    if let Some(kind) = cli.engine {
        config.engine.kind = kind;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,torrdown=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let engine = build_engine(&config)
        .await
        .context("initializing transfer engine")?;
    let catalog = Arc::new(YtsCatalog::new(&config.catalog).context("building catalog client")?);
    let coordinator = JobCoordinator::new(config, engine)
        .await
        .context("initializing job coordinator")?;

    let api_handle = coordinator.spawn_api_server(catalog);

    tokio::select! {
        result = api_handle => {
            // The server only returns on failure; still release engine handles
            coordinator.shutdown().await;
            result.context("API server task panicked")??;
        }
        _ = run_with_shutdown(&coordinator) => {
            tracing::info!("Shutdown complete");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_apply_on_top_of_defaults() {
        let cli = Cli::parse_from([
            "torrdown",
            "--bind",
            "0.0.0.0:9000",
            "--download-dir",
            "/tmp/movies",
            "--engine",
            "simulated",
        ]);
        let config = load_config(&cli).unwrap_or_default();

        assert_eq!(config.server.api.bind_address.port(), 9000);
        assert_eq!(config.download.download_dir, PathBuf::from("/tmp/movies"));
        assert_eq!(config.engine.kind, EngineKind::Simulated);
    }

    #[test]
    fn unknown_engine_is_rejected() {
        assert!(Cli::try_parse_from(["torrdown", "--engine", "aria2"]).is_err());
    }
}
