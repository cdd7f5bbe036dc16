//! Band/date reconciliation and data cube assembly for HLS imagery.
//!
//! This crate turns catalog search results into `[time, band, row, col]`
//! cubes:
//!
//! - **Band maps**: native band codes (`B8A`, `B05`) to canonical names (`nir`)
//! - **Indexing**: scene items flattened into sorted `(date, band) -> location` records
//! - **Assembly**: per-date slices read, clipped and stacked concurrently,
//!   kept in memory or persisted as Zarr V3 one slice at a time
//! - **Directory scans**: cubes from local files dated by their names
//!
//! # Architecture
//!
//! ```text
//! Catalog search              Directory of rasters
//!      │                             │
//!      ▼                             ▼
//! CatalogIndex::build          scan_directory (DateGlob)
//!      │                             │
//!      ▼                             │
//! group_by_date ─► DateSlice         │
//!      │                             │
//!      ├─► stack_slice (RasterReader::read_clipped per band)
//!      │         │                   │
//!      │         ├─► cache: SliceStore::persist, slice dropped
//!      │         │                   │
//!      │         └─► memory: kept    └─► RasterReader::read per file
//!      │                                     │
//!      └─► sort by date ─► Cube::from_slices ◄┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cube_builder::{AssembleOptions, BandMap, CatalogIndex, CubeAssembler, GeoTiffReader};
//!
//! let band_map = BandMap::load_product("HLSv2", Path::new("config/bandmap.json"))?;
//! let index = CatalogIndex::build(&items, &band_map);
//! index.require_non_empty()?;
//!
//! let reader = Arc::new(GeoTiffReader::new(&session)?);
//! let assembler = CubeAssembler::new(reader, AssembleOptions::cached("./cube"))?;
//! let report = assembler.assemble(&index, &region).await?;
//! ```

pub mod assembler;
pub mod band_map;
pub mod config;
pub mod date_glob;
pub mod error;
pub mod georef;
pub mod index;
pub mod raster;
pub mod scan;
pub mod types;
pub mod writer;

// Re-export commonly used types at crate root
pub use assembler::{
    assemble_cube, group_by_date, stack_slice, AssemblyReport, CubeAssembler, CubeOutput,
    DateSlice, SliceFailure,
};
pub use band_map::{BandMap, SatelliteBands};
pub use config::{AssembleOptions, CubeConfig, FailurePolicy, ZarrCompression};
pub use date_glob::DateGlob;
pub use error::{CubeError, Result};
pub use georef::{GeoTransform, Georef};
pub use index::{extract_records, CatalogIndex, SceneAssetRecord};
pub use raster::{GeoTiffReader, RasterReader};
pub use scan::{assemble_directory, scan_directory, ScanCubeAssembler, ScannedFile};
pub use types::{band_order, Cube, Raster, SliceArray, SliceBuilder};
pub use writer::{slice_key, PersistedSlice, SliceStore, ZarrSliceStore};
