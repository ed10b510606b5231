use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use clearair::config::{self, AppConfig};
use clearair::open_meteo::OpenMeteoClient;
use clearair::opensky::OpenSkyClient;
use clearair::orchestrator::Orchestrator;
use clearair::sources::BoundingBox;

/// Live clear-air turbulence detection and drift forecasting.
#[derive(Debug, Parser)]
#[command(name = "clearair", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Watched area as min_lat,max_lat,min_lon,max_lon (overrides the config
    /// file). Omit to watch worldwide traffic.
    #[arg(long, value_parser = parse_bbox)]
    bbox: Option<BoundingBox>,
}

fn parse_bbox(raw: &str) -> Result<BoundingBox, String> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid bounding box value: {e}"))?;
    match parts.as_slice() {
        &[min_latitude, max_latitude, min_longitude, max_longitude] => Ok(BoundingBox {
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
        }),
        _ => Err("expected exactly four values: min_lat,max_lat,min_lon,max_lon".to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_or_default(&config::default_path())?,
    };
    config.opensky.apply_env_overrides();
    if cli.bbox.is_some() {
        config.bbox = cli.bbox;
    }

    let telemetry = OpenSkyClient::new(&config.opensky)?;
    let weather = OpenMeteoClient::new()?;
    let orchestrator = Orchestrator::new(telemetry, weather, &config);
    let snapshot = orchestrator.snapshot();

    tokio::spawn(orchestrator.run());
    info!("clearair running; press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    info!(active_cells = snapshot.read().len(), "shutting down");
    Ok(())
}
