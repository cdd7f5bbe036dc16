//! In-memory stand-ins for the raster reader and the slice store.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cube_builder::{
    slice_key, CubeError, PersistedSlice, Raster, RasterReader, Result, SliceArray, SliceStore,
};
use cube_common::Geometry;

/// Raster reader returning fixed-size rasters.
///
/// Every cell of a raster read from `location` holds the value registered
/// with [`with_value`](Self::with_value), or the location's length if none
/// was registered. Locations marked [`failing`](Self::failing) return
/// `SourceUnavailable`.
#[derive(Debug)]
pub struct FakeRasterReader {
    rows: usize,
    cols: usize,
    bands_per_file: usize,
    values: HashMap<String, f32>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    reads: Mutex<Vec<String>>,
}

impl FakeRasterReader {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            bands_per_file: 1,
            values: HashMap::new(),
            failing: HashSet::new(),
            delay: None,
            reads: Mutex::new(Vec::new()),
        }
    }

    pub fn with_value(mut self, location: impl Into<String>, value: f32) -> Self {
        self.values.insert(location.into(), value);
        self
    }

    pub fn failing(mut self, location: impl Into<String>) -> Self {
        self.failing.insert(location.into());
        self
    }

    /// Bands returned by unclipped reads; band `i` holds `value + i`.
    pub fn with_bands_per_file(mut self, bands: usize) -> Self {
        self.bands_per_file = bands;
        self
    }

    /// Sleep before answering, so concurrent reads overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Locations read so far, in call order.
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Size of one raster this reader returns.
    pub fn raster_bytes(&self) -> usize {
        self.rows * self.cols * std::mem::size_of::<f32>()
    }

    pub fn value_for(&self, location: &str) -> f32 {
        self.values
            .get(location)
            .copied()
            .unwrap_or(location.len() as f32)
    }

    async fn begin_read(&self, location: &str) -> Result<f32> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Ok(mut reads) = self.reads.lock() {
            reads.push(location.to_string());
        }
        if self.failing.contains(location) {
            return Err(CubeError::source_unavailable(location, "fake read failure"));
        }
        Ok(self.value_for(location))
    }
}

#[async_trait]
impl RasterReader for FakeRasterReader {
    async fn read_clipped(&self, location: &str, _region: &Geometry) -> Result<Raster> {
        let value = self.begin_read(location).await?;
        Ok(Raster::filled(self.rows, self.cols, value))
    }

    async fn read(&self, location: &str) -> Result<Vec<Raster>> {
        let value = self.begin_read(location).await?;
        Ok((0..self.bands_per_file)
            .map(|i| Raster::filled(self.rows, self.cols, value + i as f32))
            .collect())
    }
}

/// Slice store that keeps handles only and drops the slice data.
#[derive(Debug, Default)]
pub struct MemorySliceStore {
    persisted: Mutex<Vec<PersistedSlice>>,
}

impl MemorySliceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles in persist order.
    pub fn persisted(&self) -> Vec<PersistedSlice> {
        self.persisted
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl SliceStore for MemorySliceStore {
    fn persist(&self, slice: &SliceArray) -> Result<PersistedSlice> {
        let handle = PersistedSlice {
            date: slice.date,
            satellite_id: slice.satellite_id.clone(),
            location: PathBuf::from(slice_key(&slice.satellite_id, slice.date)),
            bands: slice.bands.clone(),
            shape: slice.shape(),
            bytes_written: slice.size_bytes() as u64,
        };
        self.persisted
            .lock()
            .map_err(|e| CubeError::persist(e.to_string()))?
            .push(handle.clone());
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cube_common::BoundingBox;

    #[tokio::test]
    async fn test_fake_reader_values() {
        let reader = FakeRasterReader::new(2, 3)
            .with_value("a", 7.0)
            .failing("bad");
        let region = Geometry::from_bbox(&BoundingBox::new(0.0, 0.0, 1.0, 1.0));

        let raster = reader.read_clipped("a", &region).await.unwrap();
        assert_eq!((raster.rows, raster.cols), (2, 3));
        assert!(raster.data.iter().all(|v| *v == 7.0));

        let raster = reader.read_clipped("abcd", &region).await.unwrap();
        assert_eq!(raster.data[0], 4.0);

        assert!(reader.read_clipped("bad", &region).await.is_err());
        assert_eq!(reader.reads(), vec!["a", "abcd", "bad"]);
    }

    #[tokio::test]
    async fn test_fake_reader_multiband() {
        let reader = FakeRasterReader::new(1, 1)
            .with_bands_per_file(3)
            .with_value("f", 10.0);
        let bands = reader.read("f").await.unwrap();
        let values: Vec<f32> = bands.iter().map(|r| r.data[0]).collect();
        assert_eq!(values, vec![10.0, 11.0, 12.0]);
    }
}
