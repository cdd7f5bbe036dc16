//! The two ways the service builds a cube: catalog search and directory scan.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use catalog::{CubeCatalog, StacClient};
use chrono::NaiveDate;
use cube_builder::{
    AssemblyReport, BandMap, CatalogIndex, Cube, CubeAssembler, CubeOutput, GeoTiffReader,
    Georef, PersistedSlice, RasterReader, ScanCubeAssembler,
};
use cube_common::{Geometry, GeometryInput};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::{ScanSection, ServiceConfig};

/// File written next to the output describing what was built.
pub const SUMMARY_FILE: &str = "summary.json";

/// Outcome of one service run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub mode: RunMode,
    /// Present for in-memory cubes.
    pub cube: Option<CubeSummary>,
    /// Present in cache mode.
    pub persisted: Vec<PersistedSlice>,
    pub failures: Vec<FailedSlice>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Catalog,
    Scan,
}

/// Axes of an in-memory cube, without the values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeSummary {
    pub shape: [usize; 4],
    pub times: Vec<NaiveDate>,
    pub satellites: Vec<String>,
    pub bands: Vec<String>,
    #[serde(default)]
    pub georef: Option<Georef>,
}

impl From<&Cube> for CubeSummary {
    fn from(cube: &Cube) -> Self {
        Self {
            shape: cube.shape(),
            times: cube.times.clone(),
            satellites: cube.satellites.clone(),
            bands: cube.bands.clone(),
            georef: cube.georef,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedSlice {
    pub date: NaiveDate,
    pub satellite_id: String,
    pub error: String,
}

impl RunSummary {
    fn from_report(mode: RunMode, report: &AssemblyReport) -> Self {
        let (cube, persisted) = match &report.output {
            CubeOutput::InMemory(cube) => (Some(CubeSummary::from(cube)), Vec::new()),
            CubeOutput::Cached(handles) => (None, handles.clone()),
        };
        Self {
            mode,
            cube,
            persisted,
            failures: report
                .failures
                .iter()
                .map(|f| FailedSlice {
                    date: f.date,
                    satellite_id: f.satellite_id.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }

    /// Write as pretty JSON to `{dir}/summary.json`.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;
        let path = dir.join(SUMMARY_FILE);
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, body).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(path)
    }
}

/// Search the catalog and assemble the matching scenes.
#[instrument(skip_all, fields(catalog = %config.catalog.url))]
pub async fn run_catalog(config: &ServiceConfig) -> Result<RunSummary> {
    let band_map = BandMap::load_product(&config.bandmap.product, &config.bandmap.path)
        .with_context(|| format!("Failed to load band map {:?}", config.bandmap.path))?;

    let collections = if config.catalog.collections.is_empty() {
        band_map.satellites().into_iter().map(String::from).collect()
    } else {
        config.catalog.collections.clone()
    };

    let search_path = config
        .region
        .search
        .clone()
        .context("region.search is required for a catalog run")?;

    let client = StacClient::open(&config.catalog.url, &config.catalog.name, &config.session)
        .await
        .with_context(|| format!("Failed to open catalog {}", config.catalog.url))?;
    let catalog = CubeCatalog::new(client).with_datetime(config.catalog.datetime.clone());

    let items = catalog
        .search(&collections, &GeometryInput::FeatureCollectionPath(search_path))
        .await
        .context("Catalog search failed")?;
    info!(items = items.len(), collections = ?collections, "Catalog search complete");

    let index = CatalogIndex::build(&items, &band_map);
    let reader = Arc::new(GeoTiffReader::new(&config.session)?);
    assemble_index(config, &index, reader).await
}

/// Assemble an already built index with `reader`.
pub async fn assemble_index(
    config: &ServiceConfig,
    index: &CatalogIndex,
    reader: Arc<dyn RasterReader>,
) -> Result<RunSummary> {
    index.require_non_empty()?;

    let clip = clip_region(config)?;
    let assembler = CubeAssembler::new(reader, config.assemble_options())
        .context("Invalid assembly options")?;
    let report = assembler
        .assemble(index, &clip)
        .await
        .context("Cube assembly failed")?;

    for failure in &report.failures {
        warn!(date = %failure.date, satellite = %failure.satellite_id, error = %failure.error, "Slice left out of cube");
    }

    let summary = RunSummary::from_report(RunMode::Catalog, &report);
    let path = summary.write(&config.output.dir)?;
    info!(summary = %path.display(), slices = report.slice_count(), "Catalog run complete");
    Ok(summary)
}

/// Assemble the files of the configured scan directory.
#[instrument(skip_all)]
pub async fn run_scan(config: &ServiceConfig, reader: Arc<dyn RasterReader>) -> Result<RunSummary> {
    let scan: &ScanSection = config
        .scan
        .as_ref()
        .context("a scan run needs a `scan` section")?;

    let cube = ScanCubeAssembler::new(reader)
        .with_processes(config.assembly.processes)
        .assemble(&scan.root, &scan.date_format, &scan.extension)
        .await
        .with_context(|| format!("Failed to assemble files under {:?}", scan.root))?;

    let summary = RunSummary {
        mode: RunMode::Scan,
        cube: Some(CubeSummary::from(&cube)),
        persisted: Vec::new(),
        failures: Vec::new(),
    };
    let path = summary.write(&config.output.dir)?;
    info!(summary = %path.display(), shape = ?cube.shape(), "Scan run complete");
    Ok(summary)
}

fn clip_region(config: &ServiceConfig) -> Result<Geometry> {
    let path = config
        .clip_path()
        .context("region.clip or region.search is required")?;
    GeometryInput::FeatureCollectionPath(path.to_path_buf())
        .resolve()
        .with_context(|| format!("Failed to load clip region {:?}", path))
}
