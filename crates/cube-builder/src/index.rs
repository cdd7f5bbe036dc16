//! Flattening catalog search results into a sorted band index.

use catalog::SceneItem;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::band_map::BandMap;
use crate::error::{CubeError, Result};

/// One (scene, band) pair referenced by the band map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneAssetRecord {
    pub date: NaiveDate,
    pub satellite_id: String,
    pub native_band_code: String,
    pub canonical_band_name: String,
    pub location: String,
}

impl SceneAssetRecord {
    fn sort_key(&self) -> (NaiveDate, &str, &str, &str) {
        (
            self.date,
            self.canonical_band_name.as_str(),
            self.satellite_id.as_str(),
            self.location.as_str(),
        )
    }
}

/// Records for the assets of `item` that the band map knows about.
///
/// Assets outside the map (metadata, browse images, ...) are skipped. An item
/// from a satellite the map does not list yields no records.
pub fn extract_records(item: &SceneItem, band_map: &BandMap) -> Vec<SceneAssetRecord> {
    let Some(bands) = band_map.get(&item.satellite_id) else {
        warn!(
            item = %item.id,
            satellite = %item.satellite_id,
            "Satellite not in band map, skipping item"
        );
        return Vec::new();
    };

    item.assets
        .iter()
        .filter_map(|(code, location)| {
            let canonical = bands.canonical(code)?;
            Some(SceneAssetRecord {
                date: item.date,
                satellite_id: item.satellite_id.clone(),
                native_band_code: code.clone(),
                canonical_band_name: canonical.to_string(),
                location: location.clone(),
            })
        })
        .collect()
}

/// Records of a catalog search, ordered by date and then canonical band name.
///
/// Satellite id and location break remaining ties, so the order does not
/// depend on the order the catalog returned items in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogIndex {
    records: Vec<SceneAssetRecord>,
}

impl CatalogIndex {
    pub fn build<'a, I>(items: I, band_map: &BandMap) -> Self
    where
        I: IntoIterator<Item = &'a SceneItem>,
    {
        let mut item_count = 0;
        let mut records = Vec::new();
        for item in items {
            item_count += 1;
            records.extend(extract_records(item, band_map));
        }
        let index = Self::sorted(records);
        debug!(items = item_count, records = index.records.len(), "Built catalog index");
        index
    }

    /// Index already-extracted records.
    pub fn from_records(records: Vec<SceneAssetRecord>) -> Self {
        let index = Self::sorted(records);
        debug!(records = index.records.len(), "Indexed asset records");
        index
    }

    fn sorted(mut records: Vec<SceneAssetRecord>) -> Self {
        records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Self { records }
    }

    /// Fail with `EmptyIndex` when nothing was indexed.
    pub fn require_non_empty(&self) -> Result<&Self> {
        if self.records.is_empty() {
            return Err(CubeError::EmptyIndex);
        }
        Ok(self)
    }

    pub fn records(&self) -> &[SceneAssetRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct dates in ascending order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.records.iter().map(|r| r.date).collect();
        dates.dedup();
        dates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band_map::SatelliteBands;

    fn band_map() -> BandMap {
        let bands = [("B01", "blue"), ("B02", "red")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BandMap::new().with_satellite("SAT", SatelliteBands::new(bands).unwrap())
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, m, d).unwrap()
    }

    #[test]
    fn test_extract_drops_unmapped_assets() {
        let item = SceneItem::new("a", "SAT", date(1, 1))
            .with_asset("B01", "s3://a/B01.tif")
            .with_asset("metadata", "s3://a/meta.xml");

        let records = extract_records(&item, &band_map());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].canonical_band_name, "blue");
        assert_eq!(records[0].native_band_code, "B01");
    }

    #[test]
    fn test_extract_unknown_satellite() {
        let item = SceneItem::new("a", "OTHER", date(1, 1)).with_asset("B01", "x");
        assert!(extract_records(&item, &band_map()).is_empty());
    }

    #[test]
    fn test_build_sorts_by_date_then_band() {
        let items = vec![
            SceneItem::new("late", "SAT", date(2, 1)).with_asset("B01", "late/B01"),
            SceneItem::new("early", "SAT", date(1, 1))
                .with_asset("B02", "early/B02")
                .with_asset("B01", "early/B01"),
        ];

        let index = CatalogIndex::build(&items, &band_map());
        let order: Vec<&str> = index.records().iter().map(|r| r.location.as_str()).collect();
        assert_eq!(order, vec!["early/B01", "early/B02", "late/B01"]);
        assert_eq!(index.dates(), vec![date(1, 1), date(2, 1)]);
    }

    #[test]
    fn test_require_non_empty() {
        let index = CatalogIndex::build(std::iter::empty(), &band_map());
        assert!(matches!(index.require_non_empty(), Err(CubeError::EmptyIndex)));
    }
}
