//! Error types for cube assembly.

use thiserror::Error;

/// Errors that can occur while indexing, reading or assembling a cube.
#[derive(Error, Debug)]
pub enum CubeError {
    /// Band map or date format is malformed.
    #[error("configuration format error: {0}")]
    ConfigFormat(String),

    /// Requested satellite or product is absent from the band map.
    #[error("not found in band map: {0}")]
    NotFound(String),

    /// No substring of the file name matches the date pattern.
    #[error("no date matching '{format}' found in '{filename}'")]
    NoDateFound { filename: String, format: String },

    /// A directory scan matched no files.
    #[error("no files found in '{root}' matching '{pattern}'")]
    NoFilesFound { root: String, pattern: String },

    /// The catalog returned no usable scene items.
    #[error("catalog index is empty: no scene item matched the band map")]
    EmptyIndex,

    /// A band location could not be read or clipped.
    #[error("source unavailable: {location}: {reason}")]
    SourceUnavailable { location: String, reason: String },

    /// Rasters that must share a grid do not.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Invalid assembly options.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Writing or reading a persisted slice failed.
    #[error("slice persistence failed: {0}")]
    Persist(String),

    #[error(transparent)]
    Catalog(#[from] catalog::CatalogError),

    #[error(transparent)]
    Common(#[from] cube_common::CommonError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CubeError {
    pub fn config_format(msg: impl Into<String>) -> Self {
        Self::ConfigFormat(msg.into())
    }

    pub fn source_unavailable(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn persist(msg: impl Into<String>) -> Self {
        Self::Persist(msg.into())
    }

    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }
}

impl From<serde_json::Error> for CubeError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigFormat(err.to_string())
    }
}

impl From<serde_yaml::Error> for CubeError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::ConfigFormat(err.to_string())
    }
}

/// Result type for cube operations.
pub type Result<T> = std::result::Result<T, CubeError>;
