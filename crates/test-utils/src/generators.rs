//! Test data generators: synthetic band values and small GeoTIFF files.

use std::fs::File;
use std::path::Path;

use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

/// Row-major grid where cell `(row, col)` holds `col * 1000 + row`, so a
/// value read back identifies its source pixel.
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    (0..height)
        .flat_map(|row| (0..width).map(move |col| (col * 1000 + row) as f32))
        .collect()
}

/// Surface-reflectance-like values (HLS scales reflectance by 10000).
///
/// A diagonal gradient from 0 to 10000, offset by `band` so bands differ.
pub fn create_reflectance_grid(width: usize, height: usize, band: usize) -> Vec<f32> {
    let span = (width + height).saturating_sub(2).max(1) as f32;
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(((row + col) as f32 / span * 10000.0 + band as f32).min(10000.0));
        }
    }
    data
}

/// Georeferencing for a synthetic GeoTIFF.
#[derive(Debug, Clone, Copy)]
pub struct GeoTiffSpec {
    pub width: usize,
    pub height: usize,
    /// Top-left corner in world coordinates.
    pub origin: (f64, f64),
    pub pixel_size: f64,
    pub nodata: Option<f32>,
    /// Written to the GeoKeyDirectory; `None` leaves the CRS undeclared.
    pub epsg: Option<u16>,
}

impl GeoTiffSpec {
    /// A north-up raster of 30 m pixels in UTM zone 10N (EPSG:32610) with
    /// its corner at `(500000, 4200000)`.
    pub fn utm(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            origin: (500000.0, 4200000.0),
            pixel_size: 30.0,
            nodata: None,
            epsg: Some(crate::fixtures::regions::UTM_10N),
        }
    }

    pub fn without_crs(mut self) -> Self {
        self.epsg = None;
        self
    }

    pub fn with_nodata(mut self, nodata: f32) -> Self {
        self.nodata = Some(nodata);
        self
    }
}

/// GeoKeyDirectory declaring `epsg`: model type, raster type and the CRS
/// key, geographic for 4326 and projected otherwise.
fn geokey_directory(epsg: u16) -> Vec<u16> {
    let (model, crs_key) = if epsg == 4326 { (2, 2048) } else { (1, 3072) };
    vec![1, 1, 0, 3, 1024, 0, 1, model, 1025, 0, 1, 1, crs_key, 0, 1, epsg]
}

/// Writes a float32 GeoTIFF with one band (gray) or three bands (RGB,
/// pixel interleaved).
pub fn write_geotiff(path: &Path, spec: &GeoTiffSpec, bands: &[Vec<f32>]) {
    let file = File::create(path).expect("Failed to create GeoTIFF");
    let mut encoder = TiffEncoder::new(file).expect("Failed to create encoder");
    let (w, h) = (spec.width as u32, spec.height as u32);
    let scale = [spec.pixel_size, spec.pixel_size, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, spec.origin.0, spec.origin.1, 0.0];
    let nodata = spec.nodata.map(|v| v.to_string());
    let geokeys = spec.epsg.map(geokey_directory);

    macro_rules! write_image {
        ($color:ty, $data:expr) => {{
            let mut image = encoder
                .new_image::<$color>(w, h)
                .expect("Failed to start image");
            image
                .encoder()
                .write_tag(Tag::ModelPixelScaleTag, &scale[..])
                .expect("Failed to write pixel scale");
            image
                .encoder()
                .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
                .expect("Failed to write tiepoint");
            if let Some(geokeys) = &geokeys {
                image
                    .encoder()
                    .write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])
                    .expect("Failed to write geokeys");
            }
            if let Some(nodata) = &nodata {
                image
                    .encoder()
                    .write_tag(Tag::GdalNodata, nodata.as_str())
                    .expect("Failed to write nodata");
            }
            image.write_data($data).expect("Failed to write data");
        }};
    }

    match bands {
        [band] => write_image!(colortype::Gray32Float, band),
        [r, g, b] => {
            let interleaved: Vec<f32> = (0..r.len())
                .flat_map(|i| [r[i], g[i], b[i]])
                .collect();
            write_image!(colortype::RGB32Float, &interleaved)
        }
        _ => panic!("write_geotiff supports 1 or 3 bands, got {}", bands.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_values_identify_pixels() {
        let grid = create_test_grid(4, 3);
        assert_eq!(grid.len(), 12);
        assert_eq!(grid[4 + 2], 2001.0); // row 1, col 2
    }

    #[test]
    fn test_reflectance_range() {
        let grid = create_reflectance_grid(10, 10, 0);
        assert_eq!((grid[0], grid[99]), (0.0, 10000.0));
        assert!(create_reflectance_grid(10, 10, 3)[0] == 3.0);
    }

    #[test]
    fn test_write_geotiff() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("band.tif");
        write_geotiff(&path, &GeoTiffSpec::utm(4, 3), &[create_test_grid(4, 3)]);
        assert!(std::fs::metadata(&path).unwrap().len() > 48);
    }

    #[test]
    fn test_geokey_directory() {
        assert_eq!(geokey_directory(32610)[12..], [3072, 0, 1, 32610]);
        assert_eq!(geokey_directory(4326)[7], 2);
        assert_eq!(geokey_directory(4326)[12], 2048);
    }
}
