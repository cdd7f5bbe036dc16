//! Composition adapter that resolves region inputs before searching.

use cube_common::{GeometryInput, WGS84_EPSG};
use tracing::debug;

use crate::error::Result;
use crate::item::{CatalogClient, SceneItem, SearchRequest};

/// Wraps a catalog client and accepts unresolved region inputs.
///
/// The region is resolved to a single geometry (first feature of a
/// FeatureCollection file, or the loaded geometry as-is), brought to
/// longitude/latitude, and the search is delegated unchanged.
pub struct CubeCatalog<C> {
    client: C,
    datetime: Option<String>,
}

impl<C: CatalogClient> CubeCatalog<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            datetime: None,
        }
    }

    /// Restrict every search to an RFC 3339 instant or `start/end` interval.
    pub fn with_datetime(mut self, datetime: Option<String>) -> Self {
        self.datetime = datetime;
        self
    }

    pub fn inner(&self) -> &C {
        &self.client
    }

    /// Search `collections` for items intersecting the region.
    pub async fn search(
        &self,
        collections: &[String],
        intersects: &GeometryInput,
    ) -> Result<Vec<SceneItem>> {
        let geometry = intersects.resolve()?.to_crs(WGS84_EPSG)?;
        debug!(bbox = ?geometry.bbox(), "Resolved search region");

        let mut request = SearchRequest::new(collections.to_vec(), geometry);
        request.datetime = self.datetime.clone();

        self.client.search(&request).await
    }
}
