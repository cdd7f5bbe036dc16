//! Scene items and the catalog capability trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use cube_common::Geometry;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One catalog entry: imagery from one satellite pass on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneItem {
    /// Catalog item identifier (granule id for HLS).
    pub id: String,
    /// Satellite/collection identifier, e.g. `HLSS30.v2.0`.
    pub satellite_id: String,
    /// Acquisition date, without time of day.
    pub date: NaiveDate,
    /// Asset name (native band code, metadata, quicklook, ...) to location.
    pub assets: BTreeMap<String, String>,
}

impl SceneItem {
    pub fn new(id: impl Into<String>, satellite_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            satellite_id: satellite_id.into(),
            date,
            assets: BTreeMap::new(),
        }
    }

    /// Builder-style asset insertion.
    pub fn with_asset(mut self, name: impl Into<String>, location: impl Into<String>) -> Self {
        self.assets.insert(name.into(), location.into());
        self
    }
}

/// Parameters of a catalog search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub collections: Vec<String>,
    pub intersects: Geometry,
    /// Optional RFC 3339 instant or `start/end` interval.
    pub datetime: Option<String>,
    /// Page size requested from the server.
    pub limit: usize,
}

impl SearchRequest {
    pub fn new(collections: Vec<String>, intersects: Geometry) -> Self {
        Self {
            collections,
            intersects,
            datetime: None,
            limit: 250,
        }
    }

    pub fn with_datetime(mut self, datetime: impl Into<String>) -> Self {
        self.datetime = Some(datetime.into());
        self
    }

    /// Request body for a STAC `POST /search`.
    pub fn to_body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "collections": self.collections,
            "intersects": self.intersects.to_geojson(),
            "limit": self.limit,
        });
        if let Some(datetime) = &self.datetime {
            body["datetime"] = serde_json::json!(datetime);
        }
        body
    }
}

/// A searchable spatiotemporal catalog.
///
/// Implementations return every matching item across all result pages; no
/// ordering is assumed by callers.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SceneItem>>;
}
