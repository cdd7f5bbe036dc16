//! Configuration for cube assembly and persisted slices.
//!
//! Everything here has a default and can be overridden from `CUBE_*`
//! environment variables or deserialized from the service configuration.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Codec settings for persisted slices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeConfig {
    /// Row/col chunk edge. Bands are always chunked one at a time.
    pub chunk_size: usize,

    pub compression: ZarrCompression,

    /// 1 (fast) to 9 (small).
    pub compression_level: u8,

    /// Byte shuffle ahead of compression.
    pub shuffle: bool,
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            compression: ZarrCompression::BloscZstd,
            compression_level: 1,
            shuffle: true,
        }
    }
}

impl CubeConfig {
    /// Override with `CUBE_ZARR_CHUNK_SIZE`, `CUBE_ZARR_COMPRESSION`,
    /// `CUBE_ZARR_COMPRESSION_LEVEL` and `CUBE_ZARR_SHUFFLE` where set.
    pub fn with_env_overrides(self) -> Self {
        Self {
            chunk_size: env_or("CUBE_ZARR_CHUNK_SIZE", self.chunk_size),
            compression: env_or("CUBE_ZARR_COMPRESSION", self.compression),
            compression_level: env_or("CUBE_ZARR_COMPRESSION_LEVEL", self.compression_level),
            shuffle: std::env::var("CUBE_ZARR_SHUFFLE")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(self.shuffle),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be at least 1".to_string());
        }
        if !(1..=9).contains(&self.compression_level) {
            return Err(format!(
                "compression_level {} outside 1..=9",
                self.compression_level
            ));
        }
        Ok(())
    }
}

/// Parse `var` if set, keeping `default` when unset or unparsable.
fn env_or<T>(var: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!(var = var, value = %raw, error = %e, "Ignoring invalid environment value");
            default
        }),
        Err(_) => default,
    }
}

/// Compression of persisted slices. `Lz4` and `Zstd` go through Blosc as
/// well; the plain names are accepted for convenience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZarrCompression {
    None,
    Lz4,
    Zstd,
    BloscLz4,
    #[default]
    BloscZstd,
}

impl ZarrCompression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lz4 => "lz4",
            Self::Zstd => "zstd",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl FromStr for ZarrCompression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::None,
            Self::Lz4,
            Self::Zstd,
            Self::BloscLz4,
            Self::BloscZstd,
        ]
        .into_iter()
        .find(|c| c.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown compression '{}'", s))
    }
}

impl std::fmt::Display for ZarrCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do when one date slice cannot be assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the whole assembly on the first failed slice.
    #[default]
    Abort,
    /// Omit failed slices and report them next to the result.
    Skip,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" | "partial" => Ok(Self::Skip),
            other => Err(format!("unknown failure policy '{}'", other)),
        }
    }
}

/// Options for one cube assembly run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssembleOptions {
    /// Persist each slice instead of building an in-memory cube.
    pub cache: bool,

    /// Directory receiving persisted slices in cache mode.
    pub cache_dir: PathBuf,

    /// Number of date slices processed concurrently.
    pub processes: usize,

    pub failure_policy: FailurePolicy,

    pub zarr: CubeConfig,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            cache: false,
            cache_dir: PathBuf::from("./"),
            processes: default_processes(),
            failure_policy: FailurePolicy::Abort,
            zarr: CubeConfig::default(),
        }
    }
}

impl AssembleOptions {
    /// Options with cache mode enabled under `cache_dir`.
    pub fn cached(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache: true,
            cache_dir: cache_dir.into(),
            ..Default::default()
        }
    }

    /// Override `processes`, `failure_policy` and the Zarr settings from
    /// `CUBE_PROCESSES`, `CUBE_FAILURE_POLICY` and `CUBE_ZARR_*` where set.
    pub fn with_env_overrides(self) -> Self {
        Self {
            processes: env_or("CUBE_PROCESSES", self.processes),
            failure_policy: env_or("CUBE_FAILURE_POLICY", self.failure_policy),
            zarr: self.zarr.clone().with_env_overrides(),
            ..self
        }
    }

    pub fn with_processes(mut self, processes: usize) -> Self {
        self.processes = processes;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.processes == 0 {
            return Err("processes must be at least 1".to_string());
        }
        if self.cache {
            self.zarr.validate()?;
        }
        Ok(())
    }
}

/// Worker count derived from the available CPUs.
pub fn default_processes() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(8)
}
