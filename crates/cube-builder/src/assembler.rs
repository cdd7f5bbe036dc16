//! Per-date slice assembly.
//!
//! The index is grouped into one [`DateSlice`] per date. Slices are stacked
//! concurrently (`processes` at a time), each either kept in memory or
//! persisted and dropped right away, and the results are put back in date
//! order before they are returned.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use cube_common::Geometry;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{AssembleOptions, FailurePolicy};
use crate::error::{CubeError, Result};
use crate::index::CatalogIndex;
use crate::raster::RasterReader;
use crate::types::{Cube, SliceArray, SliceBuilder};
use crate::writer::{PersistedSlice, SliceStore, ZarrSliceStore};

/// The bands of one date, ready to be stacked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSlice {
    pub date: NaiveDate,
    /// Contributing satellites, sorted and joined with `+`.
    pub satellite_id: String,
    /// `(canonical_band_name, location)` in ascending band order.
    pub bands: Vec<(String, String)>,
}

/// Group an index into per-date slices, ascending by date.
///
/// A band offered more than once on one date (overlapping tiles, or both
/// satellites passing the same day) keeps its first record in index order.
pub fn group_by_date(index: &CatalogIndex) -> Vec<DateSlice> {
    let mut slices = Vec::new();
    let mut records = index.records().iter().peekable();

    while let Some(first) = records.peek() {
        let date = first.date;
        let mut bands: Vec<(String, String)> = Vec::new();
        let mut satellites = BTreeSet::new();

        while let Some(record) = records.next_if(|r| r.date == date) {
            if bands.iter().any(|(name, _)| *name == record.canonical_band_name) {
                warn!(
                    date = %date,
                    band = %record.canonical_band_name,
                    location = %record.location,
                    "Duplicate band for date, keeping first"
                );
                continue;
            }
            satellites.insert(record.satellite_id.as_str());
            bands.push((record.canonical_band_name.clone(), record.location.clone()));
        }

        slices.push(DateSlice {
            date,
            satellite_id: satellites.into_iter().collect::<Vec<_>>().join("+"),
            bands,
        });
    }

    slices
}

/// Read every band of `slice` clipped to `region` and stack them in slice
/// order.
///
/// Any failed read fails the whole slice with `SourceUnavailable`.
pub async fn stack_slice(
    slice: &DateSlice,
    region: &Geometry,
    reader: &dyn RasterReader,
) -> Result<SliceArray> {
    let mut builder = SliceBuilder::new(slice.date, slice.satellite_id.as_str(), slice.bands.len());

    for (band, location) in &slice.bands {
        let raster = reader
            .read_clipped(location, region)
            .await
            .map_err(|e| match e {
                CubeError::SourceUnavailable { .. } => e,
                other => CubeError::source_unavailable(location.as_str(), other.to_string()),
            })?;
        debug!(band = %band, rows = raster.rows, cols = raster.cols, "Read band");
        builder.push(band.as_str(), raster)?;
    }

    builder.finish()
}

/// A slice that could not be assembled under [`FailurePolicy::Skip`].
#[derive(Debug)]
pub struct SliceFailure {
    pub date: NaiveDate,
    pub satellite_id: String,
    pub error: CubeError,
}

/// What an assembly produced.
#[derive(Debug)]
pub enum CubeOutput {
    InMemory(Cube),
    /// Cache mode: one handle per slice, ascending by date.
    Cached(Vec<PersistedSlice>),
}

#[derive(Debug)]
pub struct AssemblyReport {
    pub output: CubeOutput,
    /// Always empty under [`FailurePolicy::Abort`].
    pub failures: Vec<SliceFailure>,
}

impl AssemblyReport {
    pub fn cube(&self) -> Option<&Cube> {
        match &self.output {
            CubeOutput::InMemory(cube) => Some(cube),
            CubeOutput::Cached(_) => None,
        }
    }

    pub fn into_cube(self) -> Option<Cube> {
        match self.output {
            CubeOutput::InMemory(cube) => Some(cube),
            CubeOutput::Cached(_) => None,
        }
    }

    pub fn persisted(&self) -> &[PersistedSlice] {
        match &self.output {
            CubeOutput::Cached(handles) => handles,
            CubeOutput::InMemory(_) => &[],
        }
    }

    /// Number of slices assembled successfully.
    pub fn slice_count(&self) -> usize {
        match &self.output {
            CubeOutput::InMemory(cube) => cube.times.len(),
            CubeOutput::Cached(handles) => handles.len(),
        }
    }
}

enum SliceOutcome {
    Stacked(SliceArray),
    Persisted(PersistedSlice),
    /// Not stacked or not persisted because the assembly was aborting.
    Abandoned,
}

/// Builds cubes from a catalog index.
pub struct CubeAssembler {
    reader: Arc<dyn RasterReader>,
    store: Option<Arc<dyn SliceStore>>,
    options: AssembleOptions,
}

impl CubeAssembler {
    /// Create an assembler. In cache mode slices go to a [`ZarrSliceStore`]
    /// under `options.cache_dir`, which is created if missing.
    pub fn new(reader: Arc<dyn RasterReader>, options: AssembleOptions) -> Result<Self> {
        options.validate().map_err(CubeError::InvalidConfig)?;

        let store: Option<Arc<dyn SliceStore>> = if options.cache {
            std::fs::create_dir_all(&options.cache_dir)?;
            Some(Arc::new(ZarrSliceStore::new(
                options.cache_dir.clone(),
                options.zarr.clone(),
            )))
        } else {
            None
        };

        Ok(Self {
            reader,
            store,
            options,
        })
    }

    /// Persist slices to `store` instead, turning cache mode on.
    pub fn with_store(mut self, store: Arc<dyn SliceStore>) -> Self {
        self.options.cache = true;
        self.store = Some(store);
        self
    }

    pub fn options(&self) -> &AssembleOptions {
        &self.options
    }

    /// Assemble every date of `index`.
    ///
    /// Under [`FailurePolicy::Abort`] the first failed slice is returned as
    /// the error. Slices not yet persisted are abandoned, and persists
    /// already running are waited for, so nothing is written once this
    /// returns. Under [`FailurePolicy::Skip`] failed slices are left out of
    /// the output and listed in the report.
    #[instrument(skip_all, fields(records = index.len(), cache = self.options.cache))]
    pub async fn assemble(&self, index: &CatalogIndex, region: &Geometry) -> Result<AssemblyReport> {
        let slices = group_by_date(index);
        let total = slices.len();
        info!(slices = total, processes = self.options.processes, "Assembling cube");

        let aborting = AtomicBool::new(false);
        let aborting = &aborting;
        let mut results = stream::iter(slices)
            .map(|slice| async move {
                let (date, satellite_id) = (slice.date, slice.satellite_id.clone());
                let outcome = self.process_slice(slice, region, aborting).await;
                (date, satellite_id, outcome)
            })
            .buffer_unordered(self.options.processes);

        let mut stacked = Vec::new();
        let mut persisted = Vec::new();
        let mut failures = Vec::new();
        let mut abort_error = None;

        // Drained to the end even when aborting: persists run on blocking
        // threads that dropping the stream would not stop.
        while let Some((date, satellite_id, outcome)) = results.next().await {
            match outcome {
                Ok(SliceOutcome::Stacked(slice)) => stacked.push(slice),
                Ok(SliceOutcome::Persisted(handle)) => persisted.push(handle),
                Ok(SliceOutcome::Abandoned) => {}
                Err(e) => match self.options.failure_policy {
                    FailurePolicy::Abort if abort_error.is_some() => {
                        debug!(date = %date, satellite = %satellite_id, error = %e, "Slice failed while aborting");
                    }
                    FailurePolicy::Abort => {
                        error!(date = %date, satellite = %satellite_id, error = %e, "Slice failed, aborting");
                        aborting.store(true, Ordering::SeqCst);
                        abort_error = Some(e);
                    }
                    FailurePolicy::Skip => {
                        warn!(date = %date, satellite = %satellite_id, error = %e, "Slice failed, skipping");
                        failures.push(SliceFailure {
                            date,
                            satellite_id,
                            error: e,
                        });
                    }
                },
            }
        }

        if let Some(e) = abort_error {
            if !persisted.is_empty() {
                warn!(persisted = persisted.len(), "Slices persisted before the abort are left in place");
            }
            return Err(e);
        }

        failures.sort_by_key(|f| f.date);

        let output = if self.options.cache {
            persisted.sort_by_key(|p| p.date);
            CubeOutput::Cached(persisted)
        } else {
            CubeOutput::InMemory(Cube::from_slices(stacked)?)
        };

        let report = AssemblyReport { output, failures };
        info!(
            slices = report.slice_count(),
            failed = report.failures.len(),
            "Cube assembly complete"
        );
        Ok(report)
    }

    #[instrument(skip_all, fields(date = %slice.date, satellite = %slice.satellite_id, bands = slice.bands.len()))]
    async fn process_slice(
        &self,
        slice: DateSlice,
        region: &Geometry,
        aborting: &AtomicBool,
    ) -> Result<SliceOutcome> {
        if aborting.load(Ordering::SeqCst) {
            return Ok(SliceOutcome::Abandoned);
        }
        let array = stack_slice(&slice, region, self.reader.as_ref()).await?;

        let Some(store) = &self.store else {
            info!(bytes = array.size_bytes(), "Stacked slice");
            return Ok(SliceOutcome::Stacked(array));
        };

        if aborting.load(Ordering::SeqCst) {
            debug!("Assembly aborting, slice not persisted");
            return Ok(SliceOutcome::Abandoned);
        }

        let store = Arc::clone(store);
        let handle = tokio::task::spawn_blocking(move || store.persist(&array))
            .await
            .map_err(|e| CubeError::persist(e.to_string()))??;

        info!(location = %handle.location.display(), "Persisted slice");
        Ok(SliceOutcome::Persisted(handle))
    }
}

/// Assemble a cube with a one-off [`CubeAssembler`].
pub async fn assemble_cube(
    index: &CatalogIndex,
    region: &Geometry,
    reader: Arc<dyn RasterReader>,
    options: AssembleOptions,
) -> Result<AssemblyReport> {
    CubeAssembler::new(reader, options)?
        .assemble(index, region)
        .await
}
