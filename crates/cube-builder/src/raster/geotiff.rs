//! GeoTIFF reader for HLS band files.
//!
//! Files are fetched whole (over HTTP with the session's credentials, or from
//! the local filesystem) and decoded on the blocking pool. The region is
//! moved into the CRS named by the file's GeoKeyDirectory, then the raster
//! is clipped using the `ModelTiepoint`/`ModelPixelScale` tags. Files
//! without a CRS are taken to share the region's.

use std::borrow::Cow;
use std::io::Cursor;

use async_trait::async_trait;
use cube_common::{Geometry, SessionConfig};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::{debug, instrument};

use super::RasterReader;
use crate::error::{CubeError, Result};
use crate::georef::{GeoTransform, Georef};
use crate::types::Raster;

/// GeoKeyDirectory key ids.
const GEO_KEY_GEOGRAPHIC_CRS: u16 = 2048;
const GEO_KEY_PROJECTED_CRS: u16 = 3072;
const GEO_KEY_USER_DEFINED: u16 = 32767;

/// EPSG code declared by a GeoKeyDirectory: the projected CRS key, else the
/// geographic one. User-defined codes and values stored in other tags are
/// ignored.
fn epsg_from_geokeys(directory: &[u16]) -> Option<u32> {
    let count = usize::from(*directory.get(3)?);
    let keys: Vec<&[u16]> = directory.get(4..)?.chunks_exact(4).take(count).collect();
    let lookup = |id: u16| {
        keys.iter()
            .find(|k| k[0] == id && k[1] == 0 && k[3] != GEO_KEY_USER_DEFINED)
            .map(|k| u32::from(k[3]))
    };
    lookup(GEO_KEY_PROJECTED_CRS).or_else(|| lookup(GEO_KEY_GEOGRAPHIC_CRS))
}

/// A decoded image with samples interleaved per pixel.
#[derive(Debug)]
struct DecodedTiff {
    width: usize,
    height: usize,
    samples: usize,
    data: Vec<f32>,
    transform: Option<GeoTransform>,
    epsg: Option<u32>,
    nodata: Option<f64>,
}

impl DecodedTiff {
    fn value(&self, row: usize, col: usize, sample: usize) -> f32 {
        let v = self.data[(row * self.width + col) * self.samples + sample];
        match self.nodata {
            Some(nodata) if f64::from(v) == nodata => f32::NAN,
            _ => v,
        }
    }

    fn band(&self, sample: usize) -> Raster {
        let mut data = Vec::with_capacity(self.width * self.height);
        for row in 0..self.height {
            for col in 0..self.width {
                data.push(self.value(row, col, sample));
            }
        }
        Raster {
            rows: self.height,
            cols: self.width,
            data,
            georef: self.transform.map(|t| Georef::new(t, self.epsg)),
        }
    }

    fn clip(&self, region: &Geometry) -> std::result::Result<Raster, String> {
        let transform = self
            .transform
            .ok_or_else(|| "missing ModelTiepoint/ModelPixelScale tags".to_string())?;

        let bbox = region.bbox();
        let (row_start, row_end, col_start, col_end) = transform
            .window(&bbox, self.width, self.height)
            .ok_or_else(|| "region does not intersect raster".to_string())?;

        let mut data = Vec::with_capacity((row_end - row_start) * (col_end - col_start));
        for row in row_start..row_end {
            for col in col_start..col_end {
                let (x, y) = transform.pixel_center(row, col);
                if bbox.contains_point(x, y) && region.contains(x, y) {
                    data.push(self.value(row, col, 0));
                } else {
                    data.push(f32::NAN);
                }
            }
        }

        Ok(Raster {
            rows: row_end - row_start,
            cols: col_end - col_start,
            data,
            georef: Some(Georef::new(transform.offset(row_start, col_start), self.epsg)),
        })
    }
}

fn to_f32(result: DecodingResult) -> std::result::Result<Vec<f32>, String> {
    Ok(match result {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        #[allow(unreachable_patterns)]
        _ => return Err("unsupported sample format".to_string()),
    })
}

fn decode(bytes: Vec<u8>) -> std::result::Result<DecodedTiff, String> {
    let mut decoder = Decoder::new(Cursor::new(bytes))
        .map_err(|e| format!("not a TIFF: {}", e))?
        .with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions().map_err(|e| e.to_string())?;
    let (width, height) = (width as usize, height as usize);

    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)
        .ok()
        .flatten()
        .and_then(|v| v.into_f64_vec().ok());
    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)
        .ok()
        .flatten()
        .and_then(|v| v.into_f64_vec().ok());
    let transform = match (tiepoint, scale) {
        (Some(t), Some(s)) => GeoTransform::from_tags(&t, &s),
        _ => None,
    };

    let epsg = decoder
        .find_tag(Tag::GeoKeyDirectoryTag)
        .ok()
        .flatten()
        .and_then(|v| v.into_u16_vec().ok())
        .and_then(|keys| epsg_from_geokeys(&keys));

    let nodata = decoder
        .find_tag(Tag::GdalNodata)
        .ok()
        .flatten()
        .and_then(|v| v.into_string().ok())
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok());

    let data = to_f32(decoder.read_image().map_err(|e| e.to_string())?)?;

    let pixels = width * height;
    if pixels == 0 || data.len() % pixels != 0 {
        return Err(format!(
            "decoded {} values for a {}x{} image",
            data.len(),
            width,
            height
        ));
    }

    Ok(DecodedTiff {
        width,
        height,
        samples: data.len() / pixels,
        data,
        transform,
        epsg,
        nodata,
    })
}

/// Reads GeoTIFF band files from HTTP(S) URLs or local paths.
pub struct GeoTiffReader {
    client: reqwest::Client,
}

impl GeoTiffReader {
    pub fn new(session: &SessionConfig) -> Result<Self> {
        Ok(Self {
            client: session.build_client()?,
        })
    }

    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        if location.starts_with("http://") || location.starts_with("https://") {
            let response = self
                .client
                .get(location)
                .send()
                .await
                .map_err(|e| CubeError::source_unavailable(location, e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(CubeError::source_unavailable(
                    location,
                    format!("HTTP {}", status),
                ));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| CubeError::source_unavailable(location, e.to_string()))?;
            return Ok(bytes.to_vec());
        }

        let path = location.strip_prefix("file://").unwrap_or(location);
        tokio::fs::read(path)
            .await
            .map_err(|e| CubeError::source_unavailable(location, e.to_string()))
    }

    async fn decode(&self, location: &str) -> Result<DecodedTiff> {
        let bytes = self.fetch(location).await?;
        debug!(location = %location, bytes = bytes.len(), "Fetched raster");

        tokio::task::spawn_blocking(move || decode(bytes))
            .await
            .map_err(|e| CubeError::source_unavailable(location, e.to_string()))?
            .map_err(|reason| CubeError::source_unavailable(location, reason))
    }
}

#[async_trait]
impl RasterReader for GeoTiffReader {
    #[instrument(skip(self, region))]
    async fn read_clipped(&self, location: &str, region: &Geometry) -> Result<Raster> {
        let decoded = self.decode(location).await?;
        let region = match decoded.epsg {
            Some(epsg) if epsg != region.epsg() => {
                debug!(from = region.epsg(), to = epsg, "Reprojecting region to raster CRS");
                let moved = region
                    .to_crs(epsg)
                    .map_err(|e| CubeError::source_unavailable(location, e.to_string()))?;
                Cow::Owned(moved)
            }
            _ => Cow::Borrowed(region),
        };
        let raster = decoded
            .clip(&region)
            .map_err(|reason| CubeError::source_unavailable(location, reason))?;
        debug!(rows = raster.rows, cols = raster.cols, "Clipped raster");
        Ok(raster)
    }

    #[instrument(skip(self))]
    async fn read(&self, location: &str) -> Result<Vec<Raster>> {
        let decoded = self.decode(location).await?;
        Ok((0..decoded.samples).map(|s| decoded.band(s)).collect())
    }
}
