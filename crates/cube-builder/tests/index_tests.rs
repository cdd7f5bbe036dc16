//! Band map loading and catalog indexing against HLS-shaped scene items.

use std::io::Write;

use catalog::SceneItem;
use cube_builder::{BandMap, CatalogIndex, CubeError};
use test_utils::{capture_logs, collections, date, hls_band_map, scene_item, simple_band_map};

fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("create file");
    file.write_all(body.as_bytes()).expect("write file");
    path
}

#[test]
fn test_build_index_drops_unmapped_assets() {
    let items = vec![
        SceneItem::new("a", "SAT", date(2021, 1, 1))
            .with_asset("B02", "a/B02.tif")
            .with_asset("B01", "a/B01.tif")
            .with_asset("META", "a/meta.xml"),
        SceneItem::new("b", "SAT", date(2021, 1, 1)).with_asset("B01", "b/B01.tif"),
    ];

    let index = CatalogIndex::build(&items, &simple_band_map());
    assert_eq!(index.len(), 3);

    let bands: Vec<&str> = index
        .records()
        .iter()
        .map(|r| r.canonical_band_name.as_str())
        .collect();
    assert_eq!(bands, vec!["blue", "blue", "red"]);
    assert!(index.records().iter().all(|r| r.native_band_code != "META"));
}

#[test]
fn test_index_independent_of_item_order() {
    let band_map = hls_band_map();
    let mut items = vec![
        scene_item(collections::S30, date(2021, 6, 20), &collections::S30_BANDS),
        scene_item(collections::L30, date(2021, 6, 15), &collections::L30_BANDS),
        scene_item(collections::S30, date(2021, 6, 10), &["B02", "B8A"]),
    ];

    let forward = CatalogIndex::build(&items, &band_map);
    items.reverse();
    let backward = CatalogIndex::build(&items, &band_map);

    assert_eq!(forward, backward);
    assert_eq!(forward.len(), 9 + 9 + 2);
    assert_eq!(
        forward.dates(),
        vec![date(2021, 6, 10), date(2021, 6, 15), date(2021, 6, 20)]
    );
    // Metadata and browse assets never reach the index.
    assert!(forward
        .records()
        .iter()
        .all(|r| r.location.ends_with(".tif")));
}

#[test]
fn test_index_maps_both_satellites_to_same_names() {
    let band_map = hls_band_map();
    let items = vec![
        scene_item(collections::S30, date(2021, 6, 10), &["B8A"]),
        scene_item(collections::L30, date(2021, 6, 11), &["B05"]),
    ];

    let index = CatalogIndex::build(&items, &band_map);
    let names: Vec<&str> = index
        .records()
        .iter()
        .map(|r| r.canonical_band_name.as_str())
        .collect();
    assert_eq!(names, vec!["nir", "nir"]);
}

#[test]
fn test_empty_search_is_reported() {
    let index = CatalogIndex::build(&Vec::<SceneItem>::new(), &simple_band_map());
    assert!(index.is_empty());
    assert!(matches!(index.require_non_empty(), Err(CubeError::EmptyIndex)));

    // Items whose bands are all unmapped also leave the index empty.
    let items = vec![SceneItem::new("a", "SAT", date(2021, 1, 1)).with_asset("META", "m")];
    let index = CatalogIndex::build(&items, &simple_band_map());
    assert!(index.require_non_empty().is_err());
}

#[test]
fn test_load_satellite_from_product_file() {
    let path = test_utils::bandmap_path();
    let bands = BandMap::load(collections::S30, &path).unwrap();
    assert_eq!(bands.canonical("B8A"), Some("nir"));
    assert_eq!(bands.native("swir1"), Some("B11"));

    let err = BandMap::load("HLSX99.v9.9", &path).unwrap_err();
    assert!(matches!(err, CubeError::NotFound(_)));
}

#[test]
fn test_load_satellite_from_flat_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "bands.json", r#"{"SAT": {"B01": "blue", "B02": "red"}}"#);

    let bands = BandMap::load("SAT", &path).unwrap();
    assert_eq!(bands.len(), 2);
    assert_eq!(bands.canonical("B01"), Some("blue"));
}

#[test]
fn test_load_yaml_band_map() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "bands.yaml",
        "HLSv2:\n  SAT:\n    B01: blue\n    B02: red\n",
    );

    let map = BandMap::load_product("HLSv2", &path).unwrap();
    assert_eq!(map.satellites(), vec!["SAT"]);

    let err = BandMap::load_product("HLSv1", &path).unwrap_err();
    assert!(matches!(err, CubeError::NotFound(_)));
}

#[test]
fn test_load_rejects_duplicate_canonical_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "bands.json", r#"{"SAT": {"B08": "nir", "B8A": "nir"}}"#);

    let err = BandMap::load("SAT", &path).unwrap_err();
    assert!(matches!(err, CubeError::ConfigFormat(_)));
}

#[test]
fn test_load_rejects_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "bands.json", "{\"SAT\": ");

    let err = BandMap::load("SAT", &path).unwrap_err();
    assert!(matches!(err, CubeError::ConfigFormat(_)));
}

#[test]
fn test_invert_all_satellites() {
    let map = hls_band_map();
    let inverted = map.invert();

    assert_eq!(
        inverted.satellite(collections::L30).unwrap().canonical("nir"),
        Some("B05")
    );
    assert_eq!(
        inverted.satellite(collections::S30).unwrap().canonical("nir"),
        Some("B8A")
    );
    assert_eq!(inverted.invert(), map);
}

#[test]
fn test_index_logs_scene_and_record_counts() {
    let items = vec![
        SceneItem::new("a", "SAT", date(2021, 1, 1))
            .with_asset("B01", "a/B01.tif")
            .with_asset("B02", "a/B02.tif"),
        SceneItem::new("b", "SAT", date(2021, 1, 2)).with_asset("B01", "b/B01.tif"),
    ];

    let (index, logs) = capture_logs(|| CatalogIndex::build(&items, &simple_band_map()));
    assert!(logs.contains("items=2 records=3"), "{}", logs);

    let records = index.records().to_vec();
    let (_, logs) = capture_logs(|| CatalogIndex::from_records(records));
    assert!(logs.contains("records=3"), "{}", logs);
    assert!(!logs.contains("items="), "{}", logs);
}
