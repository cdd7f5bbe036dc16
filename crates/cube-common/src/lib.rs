//! Common types shared by the catalog client, the cube builder and the
//! `hls-cube` service.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod geometry;
pub mod session;

pub use bbox::BoundingBox;
pub use crs::{Crs, WGS84_EPSG};
pub use error::{CommonError, CommonResult};
pub use geometry::{Geometry, GeometryInput};
pub use session::SessionConfig;
