//! YAML configuration for the hls-cube service.
//!
//! `${VAR}` and `${VAR:-default}` are substituted from the environment
//! before the document is parsed. Relative paths are resolved against the
//! directory holding the configuration file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use catalog::{DEFAULT_CATALOG, DEFAULT_STAC_URL};
use cube_builder::AssembleOptions;
use cube_common::SessionConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub catalog: CatalogSection,
    pub bandmap: BandMapSection,
    pub region: RegionSection,
    pub output: OutputSection,
    pub assembly: AssembleOptions,
    pub session: SessionConfig,
    pub scan: Option<ScanSection>,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    pub url: String,
    pub name: String,
    /// Collections to search; empty means every satellite of the band map.
    pub collections: Vec<String>,
    /// RFC 3339 instant or `start/end` interval.
    pub datetime: Option<String>,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_STAC_URL.to_string(),
            name: DEFAULT_CATALOG.to_string(),
            collections: Vec::new(),
            datetime: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BandMapSection {
    pub path: PathBuf,
    pub product: String,
}

impl Default for BandMapSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("config/bandmap.json"),
            product: "HLSv2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionSection {
    /// GeoJSON FeatureCollection used for the catalog search.
    pub search: Option<PathBuf>,
    /// GeoJSON FeatureCollection used for clipping. Falls back to `search`.
    /// Moved into each raster's CRS before windowing.
    pub clip: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub dir: PathBuf,
    /// Persist each slice as Zarr under `dir` instead of holding the cube
    /// in memory.
    pub cache: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./cube"),
            cache: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSection {
    pub root: PathBuf,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_extension() -> String {
    "tif".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    /// `text` or `json`.
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Read, expand and parse a configuration file. `CUBE_*` environment
    /// variables then override the assembly settings.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.assembly = config.assembly.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Expand environment variables and parse, without path resolution.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let config = serde_yaml::from_str(&expanded)?;
        Ok(config)
    }

    /// Make relative paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        resolve(&mut self.bandmap.path);
        resolve(&mut self.output.dir);
        if let Some(p) = self.region.search.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.region.clip.as_mut() {
            resolve(p);
        }
        if let Some(scan) = self.scan.as_mut() {
            resolve(&mut scan.root);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.assembly
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid assembly settings: {}", e))?;
        if self.catalog.url.trim().is_empty() {
            bail!("catalog.url must not be empty");
        }
        if let Some(scan) = &self.scan {
            if scan.extension.trim_start_matches('.').is_empty() {
                bail!("scan.extension must not be empty");
            }
        }
        Ok(())
    }

    /// Clip region path: `region.clip`, else `region.search`.
    pub fn clip_path(&self) -> Option<&Path> {
        self.region
            .clip
            .as_deref()
            .or(self.region.search.as_deref())
    }

    /// Assembly options with the output settings applied.
    pub fn assemble_options(&self) -> AssembleOptions {
        AssembleOptions {
            cache: self.output.cache,
            cache_dir: self.output.dir.clone(),
            ..self.assembly.clone()
        }
    }
}

/// Substitute `${VAR}` and `${VAR:-default}` from the environment.
pub fn expand_env_vars(content: &str) -> Result<String> {
    let expanded = shellexpand::env(content)
        .map_err(|e| anyhow::anyhow!("environment substitution failed: {}", e))?;
    Ok(expanded.into_owned())
}
