//! Placement of rasters, slices and cubes in their CRS.

use cube_common::BoundingBox;
use serde::{Deserialize, Serialize};

/// Affine placement of a north-up raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// World coordinates of the top-left corner of pixel (0, 0).
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Positive; rows go south.
    pub pixel_height: f64,
}

impl GeoTransform {
    /// From GeoTIFF `ModelTiepoint` and `ModelPixelScale` tag values.
    pub fn from_tags(tiepoint: &[f64], scale: &[f64]) -> Option<Self> {
        match (tiepoint, scale) {
            ([i, j, _, x, y, ..], [sx, sy, ..]) if *sx > 0.0 && *sy > 0.0 => Some(Self {
                origin_x: x - i * sx,
                origin_y: y + j * sy,
                pixel_width: *sx,
                pixel_height: *sy,
            }),
            _ => None,
        }
    }

    /// GDAL coefficient order: `[x0, dx, 0, y0, 0, -dy]`.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            0.0,
            self.origin_y,
            0.0,
            -self.pixel_height,
        ]
    }

    /// Inverse of [`to_gdal`](Self::to_gdal); rotated grids are refused.
    pub fn from_gdal(c: &[f64]) -> Option<Self> {
        match c {
            [x0, dx, rx, y0, ry, dy] if *rx == 0.0 && *ry == 0.0 && *dx > 0.0 && *dy < 0.0 => {
                Some(Self {
                    origin_x: *x0,
                    origin_y: *y0,
                    pixel_width: *dx,
                    pixel_height: -dy,
                })
            }
            _ => None,
        }
    }

    /// World coordinates of the center of pixel (`row`, `col`).
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Transform of a sub-window whose top-left pixel is (`row`, `col`).
    pub fn offset(&self, row: usize, col: usize) -> Self {
        Self {
            origin_x: self.origin_x + col as f64 * self.pixel_width,
            origin_y: self.origin_y - row as f64 * self.pixel_height,
            ..*self
        }
    }

    /// World extent of a `width` x `height` raster.
    pub fn extent(&self, width: usize, height: usize) -> BoundingBox {
        BoundingBox::new(
            self.origin_x,
            self.origin_y - height as f64 * self.pixel_height,
            self.origin_x + width as f64 * self.pixel_width,
            self.origin_y,
        )
    }

    /// Pixel window `(row_start, row_end, col_start, col_end)` covering the
    /// part of `bbox` inside the raster. `None` if nothing overlaps.
    pub fn window(
        &self,
        bbox: &BoundingBox,
        width: usize,
        height: usize,
    ) -> Option<(usize, usize, usize, usize)> {
        let overlap = self.extent(width, height).intersection(bbox)?;
        let to_index = |v: f64, max: usize| (v.max(0.0) as usize).min(max);

        let col_start = to_index(((overlap.min_x - self.origin_x) / self.pixel_width).floor(), width);
        let col_end = to_index(((overlap.max_x - self.origin_x) / self.pixel_width).ceil(), width);
        let row_start = to_index(((self.origin_y - overlap.max_y) / self.pixel_height).floor(), height);
        let row_end = to_index(((self.origin_y - overlap.min_y) / self.pixel_height).ceil(), height);

        (col_start < col_end && row_start < row_end).then_some((row_start, row_end, col_start, col_end))
    }
}

/// Where a grid sits: its transform and, when the source declares one, the
/// EPSG code of its CRS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Georef {
    pub transform: GeoTransform,
    pub epsg: Option<u32>,
}

impl Georef {
    pub fn new(transform: GeoTransform, epsg: Option<u32>) -> Self {
        Self { transform, epsg }
    }
}
