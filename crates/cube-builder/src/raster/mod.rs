//! Raster sources.
//!
//! Pixel decoding and clipping sit behind [`RasterReader`] so the assembler
//! can run against remote GeoTIFFs, local files or in-memory fakes.

pub mod geotiff;

use async_trait::async_trait;
use cube_common::Geometry;

use crate::error::Result;
use crate::types::Raster;

pub use geotiff::GeoTiffReader;

#[async_trait]
pub trait RasterReader: Send + Sync {
    /// Read the first band at `location`, clipped to the bounding window of
    /// `region` with cells outside the region set to `NaN`.
    async fn read_clipped(&self, location: &str, region: &Geometry) -> Result<Raster>;

    /// Read every band at `location`, unclipped.
    async fn read(&self, location: &str) -> Result<Vec<Raster>>;
}
