//! Persisted date slices.
//!
//! In cache mode every slice is handed to a [`SliceStore`] as soon as it is
//! stacked and dropped afterwards. Locations are derived from
//! `(satellite_id, date)` alone, so concurrent slices never share one and a
//! rerun overwrites what an earlier run wrote.

mod zarr_writer;

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::SliceArray;

pub use zarr_writer::ZarrSliceStore;

/// Handle to one persisted slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSlice {
    pub date: NaiveDate,
    pub satellite_id: String,
    pub location: PathBuf,
    pub bands: Vec<String>,
    /// `[bands, rows, cols]`
    pub shape: [usize; 3],
    /// Uncompressed size of the slice data.
    pub bytes_written: u64,
}

/// Sink for stacked slices.
pub trait SliceStore: Send + Sync {
    fn persist(&self, slice: &SliceArray) -> Result<PersistedSlice>;
}

/// Deterministic name of a slice: `{satellite_id}_{date}`.
pub fn slice_key(satellite_id: &str, date: NaiveDate) -> String {
    format!("{}_{}", satellite_id, date)
}
