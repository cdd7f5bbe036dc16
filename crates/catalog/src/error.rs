//! Error types for catalog access.

use thiserror::Error;

/// Errors that can occur while talking to a catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The endpoint does not serve a STAC catalog.
    #[error("STAC endpoint not available: {0}")]
    Unavailable(String),

    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("catalog request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// The response body is not what a STAC API returns.
    #[error("invalid catalog response: {0}")]
    InvalidResponse(String),

    /// A returned item lacks a field needed to index it.
    #[error("invalid scene item {id}: {reason}")]
    InvalidItem { id: String, reason: String },

    /// The search region could not be resolved.
    #[error("invalid search region: {0}")]
    Geometry(#[from] cube_common::CommonError),
}

impl CatalogError {
    pub fn invalid_item(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidItem {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
