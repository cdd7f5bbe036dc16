//! HLS data cube service.
//!
//! Loads a YAML configuration and builds a cube either from a STAC catalog
//! search ([`pipeline::run_catalog`]) or from a directory of dated rasters
//! ([`pipeline::run_scan`]). Each run leaves a `summary.json` in the output
//! directory.

pub mod config;
pub mod pipeline;

pub use config::ServiceConfig;
pub use pipeline::{assemble_index, run_catalog, run_scan, RunMode, RunSummary};
