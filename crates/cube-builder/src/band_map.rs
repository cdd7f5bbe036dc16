//! Per-satellite mapping from native band codes to canonical band names.
//!
//! Band map files are JSON (or YAML, by extension) in one of two layouts:
//!
//! ```text
//! flat:     { "HLSS30.v2.0": { "B02": "blue", ... }, ... }
//! product:  { "HLSv2": { "HLSS30.v2.0": { "B02": "blue", ... }, ... } }
//! ```
//!
//! Canonical names must be unique within a satellite so the map can be
//! inverted without loss; this is checked when a map is built.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde_json::Value;

use crate::error::{CubeError, Result};

/// Native code to canonical name for one satellite.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SatelliteBands {
    bands: BTreeMap<String, String>,
}

impl SatelliteBands {
    /// Build from native code -> canonical name pairs.
    ///
    /// Fails with `ConfigFormat` if two codes share a canonical name.
    pub fn new(bands: BTreeMap<String, String>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for (code, name) in &bands {
            if !seen.insert(name.as_str()) {
                return Err(CubeError::config_format(format!(
                    "canonical band name '{}' is mapped more than once (again by '{}')",
                    name, code
                )));
            }
        }
        Ok(Self { bands })
    }

    /// Canonical name for a native code.
    pub fn canonical(&self, native: &str) -> Option<&str> {
        self.bands.get(native).map(String::as_str)
    }

    /// Native code for a canonical name.
    pub fn native(&self, canonical: &str) -> Option<&str> {
        self.bands
            .iter()
            .find(|(_, name)| name.as_str() == canonical)
            .map(|(code, _)| code.as_str())
    }

    pub fn contains(&self, native: &str) -> bool {
        self.bands.contains_key(native)
    }

    /// Swap keys and values. Applying it twice gives back the original map.
    pub fn invert(&self) -> SatelliteBands {
        SatelliteBands {
            bands: self
                .bands
                .iter()
                .map(|(code, name)| (name.clone(), code.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// `(native, canonical)` pairs ordered by native code.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bands.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical names in ascending order.
    pub fn canonical_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bands.values().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn from_value(satellite_id: &str, value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            CubeError::config_format(format!(
                "band map for '{}' must be an object of band code to name",
                satellite_id
            ))
        })?;

        let mut bands = BTreeMap::new();
        for (code, name) in object {
            let name = name.as_str().ok_or_else(|| {
                CubeError::config_format(format!(
                    "band '{}' of '{}' must map to a string",
                    code, satellite_id
                ))
            })?;
            bands.insert(code.clone(), name.to_string());
        }
        Self::new(bands)
    }
}

/// Band maps for every configured satellite.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BandMap {
    satellites: BTreeMap<String, SatelliteBands>,
}

impl BandMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style satellite insertion.
    pub fn with_satellite(mut self, satellite_id: impl Into<String>, bands: SatelliteBands) -> Self {
        self.insert(satellite_id, bands);
        self
    }

    pub fn insert(&mut self, satellite_id: impl Into<String>, bands: SatelliteBands) {
        self.satellites.insert(satellite_id.into(), bands);
    }

    /// Parse a flat `satellite -> {code -> name}` JSON document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Parse a flat band map file.
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_value(&read_source(path)?)
    }

    /// Load one satellite's bands from a band map file.
    ///
    /// The satellite is looked up at the top level first and then inside
    /// each product entry, so both file layouts work.
    pub fn load(satellite_id: &str, source: &Path) -> Result<SatelliteBands> {
        let value = read_source(source)?;
        let root = value
            .as_object()
            .ok_or_else(|| CubeError::config_format("band map root must be an object"))?;

        if let Some(bands) = root.get(satellite_id) {
            return SatelliteBands::from_value(satellite_id, bands);
        }

        for product in root.values() {
            if let Some(bands) = product.as_object().and_then(|p| p.get(satellite_id)) {
                return SatelliteBands::from_value(satellite_id, bands);
            }
        }

        Err(CubeError::NotFound(format!(
            "satellite '{}' in {}",
            satellite_id,
            source.display()
        )))
    }

    /// Load every satellite of one product from a product-level band map file.
    pub fn load_product(product: &str, source: &Path) -> Result<Self> {
        let value = read_source(source)?;
        let entry = value
            .as_object()
            .ok_or_else(|| CubeError::config_format("band map root must be an object"))?
            .get(product)
            .ok_or_else(|| {
                CubeError::NotFound(format!("product '{}' in {}", product, source.display()))
            })?;
        Self::from_value(entry)
    }

    fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| CubeError::config_format("band map must be an object of satellites"))?;

        let mut satellites = BTreeMap::new();
        for (satellite_id, bands) in object {
            satellites.insert(
                satellite_id.clone(),
                SatelliteBands::from_value(satellite_id, bands)?,
            );
        }
        Ok(Self { satellites })
    }

    /// Bands for one satellite, or `NotFound`.
    pub fn satellite(&self, satellite_id: &str) -> Result<&SatelliteBands> {
        self.satellites
            .get(satellite_id)
            .ok_or_else(|| CubeError::NotFound(format!("satellite '{}'", satellite_id)))
    }

    /// Bands for one satellite if configured.
    pub fn get(&self, satellite_id: &str) -> Option<&SatelliteBands> {
        self.satellites.get(satellite_id)
    }

    /// Configured satellite ids in ascending order.
    pub fn satellites(&self) -> Vec<&str> {
        self.satellites.keys().map(String::as_str).collect()
    }

    /// Invert every satellite entry.
    pub fn invert(&self) -> BandMap {
        BandMap {
            satellites: self
                .satellites
                .iter()
                .map(|(id, bands)| (id.clone(), bands.invert()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }
}

/// Read a structured document, choosing YAML or JSON by file extension.
fn read_source(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);

    if is_yaml {
        Ok(serde_yaml::from_str(&text)?)
    } else {
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bands(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_lookup_both_directions() {
        let sat = SatelliteBands::new(bands(&[("B02", "blue"), ("B04", "red")])).unwrap();
        assert_eq!(sat.canonical("B02"), Some("blue"));
        assert_eq!(sat.native("red"), Some("B04"));
        assert_eq!(sat.canonical("B99"), None);
        assert_eq!(sat.canonical_names(), vec!["blue", "red"]);
    }

    #[test]
    fn test_invert_twice_is_identity() {
        let sat = SatelliteBands::new(bands(&[
            ("B01", "aerosal"),
            ("B02", "blue"),
            ("B8A", "nir"),
            ("Fmask", "fmask"),
        ]))
        .unwrap();
        assert_eq!(sat.invert().invert(), sat);
        assert_eq!(sat.invert().canonical("nir"), Some("B8A"));
    }

    #[test]
    fn test_duplicate_canonical_rejected() {
        let err = SatelliteBands::new(bands(&[("B8A", "nir"), ("B08", "nir")])).unwrap_err();
        assert!(matches!(err, CubeError::ConfigFormat(_)));
    }

    #[test]
    fn test_flat_document() {
        let map = BandMap::from_json_str(r#"{"SAT":{"B01":"blue","B02":"red"}}"#).unwrap();
        assert_eq!(map.satellites(), vec!["SAT"]);
        assert_eq!(map.satellite("SAT").unwrap().canonical("B02"), Some("red"));
        assert!(matches!(map.satellite("OTHER"), Err(CubeError::NotFound(_))));
    }

    #[test]
    fn test_non_string_band_rejected() {
        let err = BandMap::from_json_str(r#"{"SAT":{"B01":1}}"#).unwrap_err();
        assert!(matches!(err, CubeError::ConfigFormat(_)));
    }

    #[test]
    fn test_malformed_document_rejected() {
        let err = BandMap::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, CubeError::ConfigFormat(_)));

        let err = BandMap::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, CubeError::ConfigFormat(_)));
    }
}
