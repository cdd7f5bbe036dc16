//! hls-cube command-line entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cube_builder::GeoTiffReader;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hls_cube::{run_catalog, run_scan, ServiceConfig};

#[derive(Parser, Debug)]
#[command(name = "hls-cube")]
#[command(about = "Build HLS data cubes from a STAC catalog or a directory of rasters")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "HLS_CUBE_CONFIG", default_value = "config/hls-cube.yaml")]
    config: PathBuf,

    /// Assemble the configured scan directory instead of searching the catalog
    #[arg(long)]
    scan: bool,

    /// Override the number of slices processed concurrently
    #[arg(short, long)]
    processes: Option<usize>,

    /// Log level (overrides logging.level)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format: text or json (overrides logging.format)
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let mut config = ServiceConfig::load(&args.config)?;
    if let Some(processes) = args.processes {
        config.assembly.processes = processes;
        config.validate()?;
    }

    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    let format = args.log_format.as_deref().unwrap_or(&config.logging.format);
    init_tracing(level, format)?;

    info!(config = %args.config.display(), scan = args.scan, "Starting hls-cube");

    let summary = if args.scan {
        let reader = Arc::new(GeoTiffReader::new(&config.session)?);
        run_scan(&config, reader).await?
    } else {
        run_catalog(&config).await?
    };

    info!(
        failures = summary.failures.len(),
        persisted = summary.persisted.len(),
        "Done"
    );
    Ok(())
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = if format.eq_ignore_ascii_case("json") {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.context("Failed to install tracing subscriber")
}
