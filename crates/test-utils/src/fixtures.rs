//! Common test fixtures for HLS cube tests.
//!
//! Scene items mimic what CMR-STAC returns for the HLS v2 collections:
//! one asset per band plus ancillary assets (metadata, browse image).

use catalog::SceneItem;
use chrono::{Datelike, NaiveDate};
use cube_builder::{BandMap, SatelliteBands};
use cube_common::{BoundingBox, Geometry};

/// HLS collection identifiers.
pub mod collections {
    pub const L30: &str = "HLSL30.v2.0";
    pub const S30: &str = "HLSS30.v2.0";

    /// Band codes published for HLSL30 granules.
    pub const L30_BANDS: [&str; 9] = [
        "B01", "B02", "B03", "B04", "B05", "B06", "B07", "B09", "Fmask",
    ];

    /// Band codes published for HLSS30 granules (subset mapped by the band map).
    pub const S30_BANDS: [&str; 9] = [
        "B01", "B02", "B03", "B04", "B8A", "B10", "B11", "B12", "Fmask",
    ];
}

/// Common regions for testing.
pub mod regions {
    /// EPSG code of the synthetic test tiles.
    pub const UTM_10N: u16 = 32610;

    /// A 300 m square near the origin of the synthetic test tile, in UTM
    /// zone 10N meters.
    pub const SMALL_SQUARE: (f64, f64, f64, f64) = (500000.0, 4199700.0, 500300.0, 4200000.0);

    /// Longitude/latitude box around the 2x2 pixels at the corner of the
    /// synthetic tile: UTM 10N x 499950..500050, y 4199950..4200050.
    pub const CORNER_LON_LAT: (f64, f64, f64, f64) =
        (-123.000_569_1, 37.947_138_9, -122.999_430_9, 37.948_040_2);
}

/// Calendar date shorthand.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

/// Rectangular region in UTM zone 10N, the CRS of the synthetic tiles.
pub fn square_region(bbox: (f64, f64, f64, f64)) -> Geometry {
    lon_lat_region(bbox).with_epsg(u32::from(regions::UTM_10N))
}

/// Rectangular region in longitude/latitude.
pub fn lon_lat_region(bbox: (f64, f64, f64, f64)) -> Geometry {
    Geometry::from_bbox(&BoundingBox::new(bbox.0, bbox.1, bbox.2, bbox.3))
}

/// HLS granule id, e.g. `HLS.S30.T10SEG.2021166T185921.v2.0`.
pub fn granule_id(satellite_id: &str, tile: &str, date: NaiveDate) -> String {
    let short = if satellite_id.starts_with("HLSL30") {
        "L30"
    } else {
        "S30"
    };
    format!(
        "HLS.{}.{}.{}{:03}T185921.v2.0",
        short,
        tile,
        date.year(),
        date.ordinal()
    )
}

/// A scene item with one asset per band code plus metadata and browse assets.
pub fn scene_item(satellite_id: &str, date: NaiveDate, bands: &[&str]) -> SceneItem {
    let id = granule_id(satellite_id, "T10SEG", date);
    let base = format!(
        "https://data.lpdaac.earthdatacloud.nasa.gov/lp-prod-protected/{}/{}",
        satellite_id, id
    );

    let mut item = SceneItem::new(id.clone(), satellite_id, date)
        .with_asset("metadata", format!("{}/{}.cmr.xml", base, id))
        .with_asset("browse", format!("{}/{}.jpg", base, id));
    for band in bands {
        item = item.with_asset(*band, format!("{}/{}.{}.tif", base, id, band));
    }
    item
}

/// Band map with one satellite `SAT`: `B01 -> blue`, `B02 -> red`.
pub fn simple_band_map() -> BandMap {
    let bands = [("B01", "blue"), ("B02", "red")]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    BandMap::new().with_satellite(
        "SAT",
        SatelliteBands::new(bands).expect("unique canonical names"),
    )
}

/// The shipped HLS v2 band map.
pub fn hls_band_map() -> BandMap {
    BandMap::load_product("HLSv2", &crate::paths::bandmap_path()).expect("load HLSv2 band map")
}
