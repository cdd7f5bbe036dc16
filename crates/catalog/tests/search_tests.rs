//! Tests for decoding STAC search pages and for the region adapter.

use std::sync::Mutex;

use async_trait::async_trait;
use catalog::{CatalogClient, CubeCatalog, ItemPage, NextPage, SceneItem, SearchRequest};
use chrono::NaiveDate;
use cube_common::{BoundingBox, Geometry, GeometryInput};

fn page_fixture() -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/hls_search_page.json");
    std::fs::read_to_string(path).expect("read search fixture")
}

#[test]
fn test_decode_search_page() {
    let request = serde_json::json!({"collections": ["HLSS30.v2.0", "HLSL30.v2.0"], "limit": 2});
    let page = ItemPage::from_json(&page_fixture(), &request).unwrap();

    assert_eq!(page.items.len(), 2);

    let s30 = &page.items[0];
    assert_eq!(s30.satellite_id, "HLSS30.v2.0");
    assert_eq!(s30.date, NaiveDate::from_ymd_opt(2021, 6, 15).unwrap());
    assert_eq!(s30.assets.len(), 4);
    assert!(s30.assets["B8A"].ends_with("B8A.tif"));

    // datetime is null, start_datetime carries the date
    let l30 = &page.items[1];
    assert_eq!(l30.date, NaiveDate::from_ymd_opt(2021, 6, 17).unwrap());

    match page.next {
        Some(NextPage::Post { body, .. }) => {
            assert_eq!(body["page"], 2);
            assert_eq!(body["limit"], 2);
        }
        other => panic!("expected POST next link, got {:?}", other),
    }
}

#[test]
fn test_last_page_has_no_next() {
    let text = r#"{"type":"FeatureCollection","features":[],"links":[{"rel":"self","href":"x"}]}"#;
    let page = ItemPage::from_json(text, &serde_json::Value::Null).unwrap();
    assert!(page.items.is_empty());
    assert!(page.next.is_none());
}

/// Records the request it receives and answers with a fixed item list.
struct RecordingClient {
    seen: Mutex<Vec<SearchRequest>>,
}

#[async_trait]
impl CatalogClient for RecordingClient {
    async fn search(&self, request: &SearchRequest) -> catalog::Result<Vec<SceneItem>> {
        self.seen.lock().unwrap().push(request.clone());
        Ok(vec![SceneItem::new(
            "item-1",
            "HLSL30.v2.0",
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
        )
        .with_asset("B02", "s3://bucket/b02.tif")])
    }
}

#[tokio::test]
async fn test_adapter_resolves_feature_collection_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roi.geojson");
    std::fs::write(
        &path,
        r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},
            "geometry":{"type":"Polygon","coordinates":[[[1,1],[2,1],[2,2],[1,2],[1,1]]]}}]}"#,
    )
    .unwrap();

    let catalog = CubeCatalog::new(RecordingClient {
        seen: Mutex::new(Vec::new()),
    })
    .with_datetime(Some("2021-01-01/2021-02-01".to_string()));

    let items = catalog
        .search(
            &["HLSL30.v2.0".to_string()],
            &GeometryInput::FeatureCollectionPath(path),
        )
        .await
        .unwrap();
    assert_eq!(items.len(), 1);

    let seen = catalog.inner().seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].intersects.bbox(), BoundingBox::new(1.0, 1.0, 2.0, 2.0));
    assert_eq!(seen[0].datetime.as_deref(), Some("2021-01-01/2021-02-01"));
}

#[tokio::test]
async fn test_adapter_passes_loaded_geometry() {
    let geometry = Geometry::from_bbox(&BoundingBox::new(0.0, 0.0, 5.0, 5.0));
    let catalog = CubeCatalog::new(RecordingClient {
        seen: Mutex::new(Vec::new()),
    });

    catalog
        .search(&[], &GeometryInput::Loaded(geometry.clone()))
        .await
        .unwrap();

    let seen = catalog.inner().seen.lock().unwrap();
    assert_eq!(seen[0].intersects, geometry);
    assert!(seen[0].datetime.is_none());
}

#[tokio::test]
async fn test_adapter_searches_in_lon_lat() {
    let utm = Geometry::from_bbox(&BoundingBox::new(500000.0, 4199700.0, 500300.0, 4200000.0))
        .with_epsg(32610);
    let catalog = CubeCatalog::new(RecordingClient {
        seen: Mutex::new(Vec::new()),
    });

    catalog.search(&[], &GeometryInput::Loaded(utm)).await.unwrap();

    let seen = catalog.inner().seen.lock().unwrap();
    assert_eq!(seen[0].intersects.epsg(), 4326);
    let bbox = seen[0].intersects.bbox();
    assert!((bbox.min_x + 123.0).abs() < 1e-6, "{:?}", bbox);
    assert!(bbox.min_y > 37.94 && bbox.max_y < 37.95, "{:?}", bbox);
}
