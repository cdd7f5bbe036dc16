//! In-memory raster, slice and cube arrays.
//!
//! All arrays are row-major `f32` with `NaN` as the no-data value.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CubeError, Result};
use crate::georef::Georef;

/// A 2D raster of `rows x cols` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raster {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
    #[serde(default)]
    pub georef: Option<Georef>,
}

impl Raster {
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(CubeError::shape_mismatch(format!(
                "raster of {}x{} needs {} values, got {}",
                rows,
                cols,
                rows * cols,
                data.len()
            )));
        }
        Ok(Self {
            rows,
            cols,
            data,
            georef: None,
        })
    }

    /// A raster with every cell set to `value`.
    pub fn filled(rows: usize, cols: usize, value: f32) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
            georef: None,
        }
    }

    pub fn with_georef(mut self, georef: Georef) -> Self {
        self.georef = Some(georef);
        self
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col).copied()
        } else {
            None
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

/// One date's bands stacked along a leading band axis: `[band, row, col]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceArray {
    pub date: NaiveDate,
    pub satellite_id: String,
    /// Band labels in stacking order.
    pub bands: Vec<String>,
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
    /// Placement of the first band's grid.
    #[serde(default)]
    pub georef: Option<Georef>,
}

impl SliceArray {
    /// Stack labelled rasters in the given order.
    ///
    /// Every raster must have the same extent.
    pub fn stack(
        date: NaiveDate,
        satellite_id: impl Into<String>,
        rasters: Vec<(String, Raster)>,
    ) -> Result<Self> {
        let mut builder = SliceBuilder::new(date, satellite_id, rasters.len());
        for (band, raster) in rasters {
            builder.push(band, raster)?;
        }
        builder.finish()
    }

    /// `[bands, rows, cols]`
    pub fn shape(&self) -> [usize; 3] {
        [self.bands.len(), self.rows, self.cols]
    }

    /// Values of one band.
    pub fn band(&self, index: usize) -> Option<&[f32]> {
        let plane = self.rows * self.cols;
        self.data.get(index * plane..(index + 1) * plane)
    }

    pub fn band_index(&self, name: &str) -> Option<usize> {
        self.bands.iter().position(|b| b == name)
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

/// Stacks bands into a [`SliceArray`] one at a time.
///
/// The slice buffer is allocated once when the first band arrives, and each
/// band raster is dropped as soon as it has been copied in.
#[derive(Debug)]
pub struct SliceBuilder {
    date: NaiveDate,
    satellite_id: String,
    expected_bands: usize,
    bands: Vec<String>,
    extent: Option<(usize, usize)>,
    georef: Option<Georef>,
    data: Vec<f32>,
}

impl SliceBuilder {
    pub fn new(date: NaiveDate, satellite_id: impl Into<String>, expected_bands: usize) -> Self {
        Self {
            date,
            satellite_id: satellite_id.into(),
            expected_bands,
            bands: Vec::with_capacity(expected_bands),
            extent: None,
            georef: None,
            data: Vec::new(),
        }
    }

    /// Append one band below the ones already pushed.
    pub fn push(&mut self, band: impl Into<String>, raster: Raster) -> Result<()> {
        let band = band.into();
        match self.extent {
            None => {
                self.extent = Some((raster.rows, raster.cols));
                self.data
                    .reserve_exact(self.expected_bands.max(1) * raster.rows * raster.cols);
            }
            Some((rows, cols)) if rows != raster.rows || cols != raster.cols => {
                return Err(CubeError::shape_mismatch(format!(
                    "band '{}' of {} is {}x{}, expected {}x{}",
                    band, self.date, raster.rows, raster.cols, rows, cols
                )));
            }
            Some(_) => {}
        }
        match (self.georef, raster.georef) {
            (None, georef) if self.bands.is_empty() => self.georef = georef,
            (Some(first), Some(other)) if first != other => {
                warn!(band = %band, date = %self.date, "Band grid differs from the slice's first band");
            }
            _ => {}
        }
        self.data.extend_from_slice(&raster.data);
        self.bands.push(band);
        Ok(())
    }

    pub fn finish(self) -> Result<SliceArray> {
        let (rows, cols) = self.extent.ok_or_else(|| {
            CubeError::shape_mismatch(format!(
                "slice {} of {} has no bands",
                self.date, self.satellite_id
            ))
        })?;
        Ok(SliceArray {
            date: self.date,
            satellite_id: self.satellite_id,
            bands: self.bands,
            rows,
            cols,
            data: self.data,
            georef: self.georef,
        })
    }
}

/// Order of the cube's band axis: numeric labels (the band numbers of
/// scanned files) by value and ahead of names, names alphabetically.
pub fn band_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u32>(), b.parse::<u32>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// A `[time, band, row, col]` cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cube {
    /// Time axis labels, ascending.
    pub times: Vec<NaiveDate>,
    /// Satellite id of each time step.
    pub satellites: Vec<String>,
    /// Band axis labels: the union of every slice's bands in
    /// [`band_order`].
    pub bands: Vec<String>,
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
    /// Placement of the earliest slice.
    #[serde(default)]
    pub georef: Option<Georef>,
}

impl Cube {
    /// Concatenate slices along a new time axis.
    ///
    /// Slices are ordered by date (stable, so equal dates keep their given
    /// order). Bands missing from a slice are `NaN`. All slices must share
    /// one row/col extent.
    pub fn from_slices(mut slices: Vec<SliceArray>) -> Result<Self> {
        slices.sort_by_key(|s| s.date);

        let (rows, cols) = slices.first().map(|s| (s.rows, s.cols)).unwrap_or((0, 0));
        if let Some(odd) = slices.iter().find(|s| s.rows != rows || s.cols != cols) {
            return Err(CubeError::shape_mismatch(format!(
                "slice {} is {}x{}, expected {}x{}",
                odd.date, odd.rows, odd.cols, rows, cols
            )));
        }

        let mut bands: Vec<String> = slices
            .iter()
            .flat_map(|s| s.bands.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        bands.sort_by(|a, b| band_order(a, b));
        let georef = slices.first().and_then(|s| s.georef);

        let plane = rows * cols;
        let step = bands.len() * plane;
        let mut times = Vec::with_capacity(slices.len());
        let mut satellites = Vec::with_capacity(slices.len());
        let mut data = Vec::new();
        data.reserve_exact(slices.len() * step);

        for slice in slices {
            let start = data.len();
            data.resize(start + step, f32::NAN);
            for (i, band) in slice.bands.iter().enumerate() {
                if let Some(b) = bands.iter().position(|name| name == band) {
                    let dst = start + b * plane;
                    data[dst..dst + plane].copy_from_slice(&slice.data[i * plane..(i + 1) * plane]);
                }
            }
            times.push(slice.date);
            satellites.push(slice.satellite_id);
        }

        Ok(Self {
            times,
            satellites,
            bands,
            rows,
            cols,
            data,
            georef,
        })
    }

    /// `[time, band, row, col]`
    pub fn shape(&self) -> [usize; 4] {
        [self.times.len(), self.bands.len(), self.rows, self.cols]
    }

    pub fn get(&self, time: usize, band: usize, row: usize, col: usize) -> Option<f32> {
        let [t, b, r, c] = self.shape();
        if time >= t || band >= b || row >= r || col >= c {
            return None;
        }
        let index = ((time * b + band) * r + row) * c + col;
        self.data.get(index).copied()
    }

    pub fn band_index(&self, name: &str) -> Option<usize> {
        self.bands.iter().position(|b| b == name)
    }

    pub fn time_index(&self, date: NaiveDate) -> Option<usize> {
        self.times.iter().position(|d| *d == date)
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}
