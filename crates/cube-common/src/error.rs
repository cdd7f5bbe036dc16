//! Error types for shared geometry and session handling.

use thiserror::Error;

/// Result type alias using CommonError.
pub type CommonResult<T> = Result<T, CommonError>;

#[derive(Debug, Error)]
pub enum CommonError {
    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    #[error("Feature collection has no features: {0}")]
    EmptyFeatureCollection(String),

    #[error("Region must be a Polygon or MultiPolygon, got {0}")]
    NotAreal(&'static str),

    #[error("Unsupported CRS EPSG:{0}")]
    UnsupportedCrs(u32),

    #[error("Failed to read geometry file: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP session error: {0}")]
    Http(String),
}

impl From<geojson::Error> for CommonError {
    fn from(err: geojson::Error) -> Self {
        CommonError::InvalidGeoJson(err.to_string())
    }
}
