//! Zarr V3 slice store on the local filesystem.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use super::{slice_key, PersistedSlice, SliceStore};
use crate::config::{CubeConfig, ZarrCompression};
use crate::error::{CubeError, Result};
use crate::georef::{GeoTransform, Georef};
use crate::types::SliceArray;

/// Writes each slice as a `[band, row, col]` float32 array under
/// `{root}/{satellite_id}_{date}.zarr`.
///
/// Array attributes carry `satellite`, `date` and the `bands` labels, plus
/// `transform` (GDAL coefficient order) and `epsg` for georeferenced slices.
#[derive(Debug, Clone)]
pub struct ZarrSliceStore {
    root: PathBuf,
    config: CubeConfig,
}

impl ZarrSliceStore {
    pub fn new(root: impl Into<PathBuf>, config: CubeConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a slice is written to.
    pub fn location(&self, satellite_id: &str, date: NaiveDate) -> PathBuf {
        self.root
            .join(format!("{}.zarr", slice_key(satellite_id, date)))
    }

    /// Read a persisted slice back into memory.
    pub fn load(location: &Path) -> Result<SliceArray> {
        let store = FilesystemStore::new(location).map_err(|e| CubeError::persist(e.to_string()))?;
        let array = Array::open(Arc::new(store), "/")
            .map_err(|e| CubeError::persist(format!("{}: {}", location.display(), e)))?;

        let attrs = array.attributes();
        let satellite_id = attrs
            .get("satellite")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CubeError::persist("missing 'satellite' attribute"))?
            .to_string();
        let date = attrs
            .get("date")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<NaiveDate>().ok())
            .ok_or_else(|| CubeError::persist("missing or invalid 'date' attribute"))?;
        let bands: Vec<String> = attrs
            .get("bands")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .ok_or_else(|| CubeError::persist("missing 'bands' attribute"))?;

        let georef = attrs
            .get("transform")
            .map(|v| {
                serde_json::from_value::<Vec<f64>>(v.clone())
                    .ok()
                    .and_then(|c| GeoTransform::from_gdal(&c))
                    .ok_or_else(|| CubeError::persist("invalid 'transform' attribute"))
            })
            .transpose()?
            .map(|transform| {
                let epsg = attrs
                    .get("epsg")
                    .and_then(|v| v.as_u64())
                    .and_then(|v| u32::try_from(v).ok());
                Georef::new(transform, epsg)
            });

        let shape = array.shape().to_vec();
        if shape.len() != 3 || shape[0] as usize != bands.len() {
            return Err(CubeError::persist(format!(
                "{}: unexpected shape {:?} for {} bands",
                location.display(),
                shape,
                bands.len()
            )));
        }

        let subset = ArraySubset::new_with_shape(shape.clone());
        let data: Vec<f32> = array
            .retrieve_array_subset_elements(&subset)
            .map_err(|e| CubeError::persist(e.to_string()))?;

        Ok(SliceArray {
            date,
            satellite_id,
            bands,
            rows: shape[1] as usize,
            cols: shape[2] as usize,
            data,
            georef,
        })
    }

    fn build_array(
        &self,
        store: Arc<FilesystemStore>,
        slice: &SliceArray,
    ) -> Result<Array<FilesystemStore>> {
        let mut attrs = serde_json::Map::new();
        attrs.insert("satellite".to_string(), serde_json::json!(slice.satellite_id));
        attrs.insert("date".to_string(), serde_json::json!(slice.date.to_string()));
        attrs.insert("bands".to_string(), serde_json::json!(slice.bands));
        if let Some(georef) = &slice.georef {
            attrs.insert(
                "transform".to_string(),
                serde_json::json!(georef.transform.to_gdal()),
            );
            if let Some(epsg) = georef.epsg {
                attrs.insert("epsg".to_string(), serde_json::json!(epsg));
            }
        }

        let [bands, rows, cols] = slice.shape();
        let chunk = self.config.chunk_size as u64;
        let chunk_grid: zarrs::array::ChunkGrid = vec![1, chunk, chunk]
            .try_into()
            .map_err(|e| CubeError::InvalidConfig(format!("{:?}", e)))?;

        let mut binding = ArrayBuilder::new(
            vec![bands as u64, rows as u64, cols as u64],
            DataType::Float32,
            chunk_grid,
            FillValue::from(f32::NAN),
        );
        let mut builder = binding.attributes(attrs);

        if self.config.compression != ZarrCompression::None {
            let codec = self.create_compression_codec()?;
            builder = builder.bytes_to_bytes_codecs(vec![codec]);
        }

        builder
            .build(store, "/")
            .map_err(|e| CubeError::persist(e.to_string()))
    }

    fn create_compression_codec(
        &self,
    ) -> Result<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
        let level = BloscCompressionLevel::try_from(self.config.compression_level)
            .map_err(|_| CubeError::InvalidConfig("invalid compression level".to_string()))?;

        let shuffle = if self.config.shuffle {
            BloscShuffleMode::Shuffle
        } else {
            BloscShuffleMode::NoShuffle
        };

        // typesize is required when shuffle is enabled
        let typesize = self.config.shuffle.then_some(4);

        let compressor = match self.config.compression {
            ZarrCompression::None => {
                return Err(CubeError::InvalidConfig(
                    "no compression configured".to_string(),
                ))
            }
            ZarrCompression::Lz4 | ZarrCompression::BloscLz4 => BloscCompressor::LZ4,
            ZarrCompression::Zstd | ZarrCompression::BloscZstd => BloscCompressor::Zstd,
        };

        let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
            .map_err(|e| CubeError::InvalidConfig(e.to_string()))?;

        Ok(Arc::new(codec))
    }
}

impl SliceStore for ZarrSliceStore {
    fn persist(&self, slice: &SliceArray) -> Result<PersistedSlice> {
        let location = self.location(&slice.satellite_id, slice.date);

        if location.exists() {
            std::fs::remove_dir_all(&location)?;
        }
        std::fs::create_dir_all(&location)?;

        let store = FilesystemStore::new(&location).map_err(|e| CubeError::persist(e.to_string()))?;
        let array = self.build_array(Arc::new(store), slice)?;

        array
            .store_metadata()
            .map_err(|e| CubeError::persist(e.to_string()))?;

        let [bands, rows, cols] = slice.shape();
        let subset = ArraySubset::new_with_start_shape(
            vec![0, 0, 0],
            vec![bands as u64, rows as u64, cols as u64],
        )
        .map_err(|e| CubeError::persist(e.to_string()))?;

        array
            .store_array_subset_elements(&subset, slice.data.as_slice())
            .map_err(|e| CubeError::persist(e.to_string()))?;

        let bytes_written = slice.size_bytes() as u64;
        debug!(
            location = %location.display(),
            bytes = bytes_written,
            "Persisted slice"
        );

        Ok(PersistedSlice {
            date: slice.date,
            satellite_id: slice.satellite_id.clone(),
            location,
            bands: slice.bands.clone(),
            shape: [bands, rows, cols],
            bytes_written,
        })
    }
}
