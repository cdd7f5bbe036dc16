//! Spatiotemporal catalog access for HLS cube assembly.
//!
//! The catalog is consumed through the [`CatalogClient`] trait. A STAC API
//! implementation ([`StacClient`]) talks to NASA's CMR-STAC endpoint, and
//! [`CubeCatalog`] wraps any client to accept region inputs that still need
//! resolving (GeoJSON file paths or loaded geometries).
//!
//! ```ignore
//! use catalog::{CubeCatalog, StacClient};
//! use cube_common::{GeometryInput, SessionConfig};
//!
//! let client = StacClient::open(DEFAULT_STAC_URL, "LPCLOUD", &SessionConfig::from_env()).await?;
//! let catalog = CubeCatalog::new(client);
//! let items = catalog
//!     .search(&["HLSL30.v2.0".into()], &GeometryInput::FeatureCollectionPath("roi.geojson".into()))
//!     .await?;
//! ```

pub mod adapter;
pub mod error;
pub mod item;
pub mod stac;

pub use adapter::CubeCatalog;
pub use error::{CatalogError, Result};
pub use item::{CatalogClient, SceneItem, SearchRequest};
pub use stac::{ItemPage, NextPage, StacClient, DEFAULT_CATALOG, DEFAULT_STAC_URL};
