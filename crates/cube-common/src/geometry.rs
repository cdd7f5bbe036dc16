//! Regions of interest for catalog searches and clip masks.
//!
//! GeoJSON is parsed with `geojson` into `geo` shapes, which provide
//! containment, extents and coordinate mapping. Only areal geometries
//! (`Polygon`, `MultiPolygon`) are accepted: a region has to enclose pixels.

use std::path::{Path, PathBuf};

use geo::{BoundingRect, Contains, LineString, MapCoords, MultiPolygon, Point, Polygon};
use geojson::GeoJson;

use crate::bbox::BoundingBox;
use crate::crs::{Crs, WGS84_EPSG};
use crate::error::{CommonError, CommonResult};

/// An areal region and the EPSG code of its coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    shape: MultiPolygon<f64>,
    epsg: u32,
}

impl Geometry {
    pub fn new(shape: impl Into<MultiPolygon<f64>>, epsg: u32) -> Self {
        Self {
            shape: shape.into(),
            epsg,
        }
    }

    /// Geographic rectangle.
    pub fn from_bbox(bbox: &BoundingBox) -> Self {
        let ring = LineString::from(vec![
            (bbox.min_x, bbox.min_y),
            (bbox.max_x, bbox.min_y),
            (bbox.max_x, bbox.max_y),
            (bbox.min_x, bbox.max_y),
            (bbox.min_x, bbox.min_y),
        ]);
        Self::new(Polygon::new(ring, vec![]), WGS84_EPSG)
    }

    /// Relabel the coordinates with another CRS without moving them.
    pub fn with_epsg(mut self, epsg: u32) -> Self {
        self.epsg = epsg;
        self
    }

    /// Convert a GeoJSON geometry, taken as geographic WGS84.
    pub fn from_geojson(geometry: geojson::Geometry) -> CommonResult<Self> {
        let shape = match geo_types::Geometry::<f64>::try_from(geometry)? {
            geo_types::Geometry::Polygon(polygon) => MultiPolygon::from(polygon),
            geo_types::Geometry::MultiPolygon(polygons) => polygons,
            geo_types::Geometry::Point(_) | geo_types::Geometry::MultiPoint(_) => {
                return Err(CommonError::NotAreal("points"))
            }
            geo_types::Geometry::GeometryCollection(_) => {
                return Err(CommonError::NotAreal("a geometry collection"))
            }
            _ => return Err(CommonError::NotAreal("lines")),
        };
        Ok(Self::new(shape, WGS84_EPSG))
    }

    /// First feature's geometry of a GeoJSON FeatureCollection document,
    /// or `None` if it has no feature with a geometry.
    ///
    /// Coordinates are WGS84 unless the collection names an EPSG code in a
    /// legacy `crs` member.
    pub fn from_feature_collection(text: &str) -> CommonResult<Option<Self>> {
        let collection = geojson::FeatureCollection::try_from(text.parse::<GeoJson>()?)?;

        let epsg = match collection
            .foreign_members
            .as_ref()
            .and_then(|members| members.get("crs"))
            .and_then(|crs| crs.pointer("/properties/name"))
            .and_then(|name| name.as_str())
        {
            Some(name) => Crs::parse_name(name)
                .ok_or_else(|| CommonError::InvalidGeoJson(format!("unknown crs '{}'", name)))?,
            None => WGS84_EPSG,
        };

        match collection.features.into_iter().next().and_then(|f| f.geometry) {
            Some(geometry) => Ok(Some(Self::from_geojson(geometry)?.with_epsg(epsg))),
            None => Ok(None),
        }
    }

    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Extent over every vertex; empty for an empty shape.
    pub fn bbox(&self) -> BoundingBox {
        self.shape
            .bounding_rect()
            .map(|r| BoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y))
            .unwrap_or_else(BoundingBox::empty)
    }

    /// Whether `(x, y)` lies in the interior. Points inside holes and on
    /// the boundary are outside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.shape.contains(&Point::new(x, y))
    }

    /// The region in another CRS. Vertices are transformed one by one, so
    /// edges stay straight in the target CRS.
    pub fn to_crs(&self, epsg: u32) -> CommonResult<Self> {
        if epsg == self.epsg {
            return Ok(self.clone());
        }
        let (from, to) = (Crs::from_epsg(self.epsg)?, Crs::from_epsg(epsg)?);
        let shape = self.shape.map_coords(|c| to.project(from.unproject(c)));
        Ok(Self::new(shape, epsg))
    }

    /// GeoJSON geometry value, e.g. for an `intersects` search filter. A
    /// single polygon is written as `Polygon`.
    pub fn to_geojson(&self) -> serde_json::Value {
        let value = match self.shape.0.as_slice() {
            [polygon] => geojson::Value::from(polygon),
            _ => geojson::Value::from(&self.shape),
        };
        serde_json::to_value(geojson::Geometry::new(value)).unwrap_or(serde_json::Value::Null)
    }
}

/// The ways a caller can hand over a region of interest.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryInput {
    /// Path to a GeoJSON FeatureCollection; its first feature is used.
    FeatureCollectionPath(PathBuf),
    /// A geometry already in memory.
    Loaded(Geometry),
}

impl GeometryInput {
    /// Resolve to the one canonical geometry used by search and clipping.
    pub fn resolve(&self) -> CommonResult<Geometry> {
        match self {
            GeometryInput::Loaded(geometry) => Ok(geometry.clone()),
            GeometryInput::FeatureCollectionPath(path) => read_first_geometry(path),
        }
    }
}

fn read_first_geometry(path: &Path) -> CommonResult<Geometry> {
    let text = std::fs::read_to_string(path)?;
    Geometry::from_feature_collection(&text)?
        .ok_or_else(|| CommonError::EmptyFeatureCollection(path.display().to_string()))
}

impl From<Geometry> for GeometryInput {
    fn from(geometry: Geometry) -> Self {
        GeometryInput::Loaded(geometry)
    }
}

impl From<PathBuf> for GeometryInput {
    fn from(path: PathBuf) -> Self {
        GeometryInput::FeatureCollectionPath(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_with_hole() -> Geometry {
        let outer = LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]);
        let hole = LineString::from(vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0), (4.0, 4.0)]);
        Geometry::new(Polygon::new(outer, vec![hole]), 32610)
    }

    #[test]
    fn test_contains_respects_holes() {
        let g = square_with_hole();
        assert!(g.contains(1.0, 1.0));
        assert!(!g.contains(5.0, 5.0));
        assert!(!g.contains(11.0, 5.0));
    }

    #[test]
    fn test_bbox() {
        assert_eq!(square_with_hole().bbox(), BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        assert!(Geometry::new(MultiPolygon::<f64>::new(vec![]), 4326).bbox().is_empty());
    }

    #[test]
    fn test_parse_drops_z() {
        let text = r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},
            "geometry":{"type":"Polygon","coordinates":[[[0,0,5],[1,0,5],[1,1,5],[0,0,5]]]}}]}"#;
        let g = Geometry::from_feature_collection(text).unwrap().unwrap();
        assert_eq!(g.epsg(), WGS84_EPSG);
        assert_eq!(g.bbox(), BoundingBox::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_point_geometry_rejected() {
        let geometry: geojson::Geometry = r#"{"type":"Point","coordinates":[0,0]}"#.parse::<GeoJson>()
            .and_then(geojson::Geometry::try_from)
            .unwrap();
        assert!(matches!(
            Geometry::from_geojson(geometry),
            Err(CommonError::NotAreal("points"))
        ));
    }

    #[test]
    fn test_legacy_crs_member() {
        let text = r#"{"type":"FeatureCollection",
            "crs":{"type":"name","properties":{"name":"urn:ogc:def:crs:EPSG::32610"}},
            "features":[{"type":"Feature","properties":{},
            "geometry":{"type":"Polygon","coordinates":[[[500000,4199700],[500300,4199700],[500300,4200000],[500000,4199700]]]}}]}"#;
        let g = Geometry::from_feature_collection(text).unwrap().unwrap();
        assert_eq!(g.epsg(), 32610);

        let bad = text.replace("EPSG::32610", "FOO::1");
        assert!(matches!(
            Geometry::from_feature_collection(&bad),
            Err(CommonError::InvalidGeoJson(_))
        ));
    }

    #[test]
    fn test_to_crs_moves_vertices() {
        // Corners of a 300 m UTM square on the zone 10 central meridian.
        let utm = Geometry::new(
            Polygon::new(
                LineString::from(vec![
                    (500000.0, 4199700.0),
                    (500300.0, 4199700.0),
                    (500300.0, 4200000.0),
                    (500000.0, 4200000.0),
                    (500000.0, 4199700.0),
                ]),
                vec![],
            ),
            32610,
        );

        let geographic = utm.to_crs(WGS84_EPSG).unwrap();
        let bbox = geographic.bbox();
        assert!((bbox.min_x + 123.0).abs() < 1e-9);
        assert!((bbox.max_y - 37.947_589_6).abs() < 1e-6);
        assert!(bbox.max_x - bbox.min_x < 0.01);

        let back = geographic.to_crs(32610).unwrap();
        assert!((back.bbox().max_x - 500300.0).abs() < 1e-3);
        assert!(utm.to_crs(3857).is_err());
        assert_eq!(utm.to_crs(32610).unwrap(), utm);
    }
}
