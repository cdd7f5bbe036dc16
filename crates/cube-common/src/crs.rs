//! Coordinate reference systems regions can be moved between.
//!
//! Only geographic WGS84 and the WGS84 UTM zones are handled, which covers
//! GeoJSON regions and every HLS tile. UTM uses the Krüger series to third
//! order in the flattening, good to well below a millimetre inside a zone.

use geo::Coord;

use crate::error::{CommonError, CommonResult};

/// EPSG code of geographic WGS84 (longitude, latitude in degrees).
pub const WGS84_EPSG: u32 = 4326;

const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
const INVERSE_FLATTENING: f64 = 298.257_223_563;
const UTM_SCALE: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// EPSG:4326, axis order longitude then latitude.
    Geographic,
    /// EPSG:326zz (north) or EPSG:327zz (south).
    Utm { zone: u32, north: bool },
}

impl Crs {
    pub fn from_epsg(epsg: u32) -> CommonResult<Self> {
        match epsg {
            WGS84_EPSG => Ok(Crs::Geographic),
            32601..=32660 => Ok(Crs::Utm {
                zone: epsg - 32600,
                north: true,
            }),
            32701..=32760 => Ok(Crs::Utm {
                zone: epsg - 32700,
                north: false,
            }),
            other => Err(CommonError::UnsupportedCrs(other)),
        }
    }

    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Geographic => WGS84_EPSG,
            Crs::Utm { zone, north: true } => 32600 + zone,
            Crs::Utm { zone, north: false } => 32700 + zone,
        }
    }

    /// EPSG code from a CRS name as found in legacy GeoJSON `crs` members:
    /// `EPSG:32610`, `urn:ogc:def:crs:EPSG::32610` or the OGC CRS84 URN.
    pub fn parse_name(name: &str) -> Option<u32> {
        let name = name.trim();
        if name.ends_with("CRS84") {
            return Some(WGS84_EPSG);
        }
        let (authority, code) = name.rsplit_once(':')?;
        if !authority.to_ascii_uppercase().contains("EPSG") {
            return None;
        }
        code.parse().ok()
    }

    /// Geographic coordinates of a point given in this CRS.
    pub fn unproject(&self, c: Coord<f64>) -> Coord<f64> {
        match *self {
            Crs::Geographic => c,
            Crs::Utm { zone, north } => utm_inverse(c, zone, north),
        }
    }

    /// A geographic point expressed in this CRS.
    pub fn project(&self, c: Coord<f64>) -> Coord<f64> {
        match *self {
            Crs::Geographic => c,
            Crs::Utm { zone, north } => utm_forward(c, zone, north),
        }
    }
}

struct Kruger {
    /// k0 times the rectifying radius.
    scaled_radius: f64,
    conformal: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
}

fn kruger() -> Kruger {
    let f = 1.0 / INVERSE_FLATTENING;
    let n = f / (2.0 - f);
    let (n2, n3) = (n * n, n * n * n);
    Kruger {
        scaled_radius: UTM_SCALE * SEMI_MAJOR_AXIS / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0),
        conformal: 2.0 * n.sqrt() / (1.0 + n),
        alpha: [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
            61.0 * n3 / 240.0,
        ],
        beta: [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
            n2 / 48.0 + n3 / 15.0,
            17.0 * n3 / 480.0,
        ],
        delta: [
            2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
            7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
            56.0 * n3 / 15.0,
        ],
    }
}

fn central_meridian(zone: u32) -> f64 {
    (zone as f64 * 6.0 - 183.0).to_radians()
}

fn false_northing(north: bool) -> f64 {
    if north {
        0.0
    } else {
        FALSE_NORTHING_SOUTH
    }
}

fn utm_forward(c: Coord<f64>, zone: u32, north: bool) -> Coord<f64> {
    let k = kruger();
    let lat = c.y.to_radians();
    let dlon = c.x.to_radians() - central_meridian(zone);

    let t = (lat.sin().atanh() - k.conformal * (k.conformal * lat.sin()).atanh()).sinh();
    let xi = t.atan2(dlon.cos());
    let eta = (dlon.sin() / (1.0 + t * t).sqrt()).atanh();

    let (mut e, mut n) = (eta, xi);
    for (j, a) in k.alpha.iter().enumerate() {
        let m = 2.0 * (j + 1) as f64;
        e += a * (m * xi).cos() * (m * eta).sinh();
        n += a * (m * xi).sin() * (m * eta).cosh();
    }

    Coord {
        x: FALSE_EASTING + k.scaled_radius * e,
        y: false_northing(north) + k.scaled_radius * n,
    }
}

fn utm_inverse(c: Coord<f64>, zone: u32, north: bool) -> Coord<f64> {
    let k = kruger();
    let xi = (c.y - false_northing(north)) / k.scaled_radius;
    let eta = (c.x - FALSE_EASTING) / k.scaled_radius;

    let (mut xi_p, mut eta_p) = (xi, eta);
    for (j, b) in k.beta.iter().enumerate() {
        let m = 2.0 * (j + 1) as f64;
        xi_p -= b * (m * xi).sin() * (m * eta).cosh();
        eta_p -= b * (m * xi).cos() * (m * eta).sinh();
    }

    let chi = (xi_p.sin() / eta_p.cosh()).asin();
    let mut lat = chi;
    for (j, d) in k.delta.iter().enumerate() {
        lat += d * (2.0 * (j + 1) as f64 * chi).sin();
    }
    let lon = central_meridian(zone) + eta_p.sinh().atan2(xi_p.cos());

    Coord {
        x: lon.to_degrees(),
        y: lat.to_degrees(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsg_codes() {
        assert_eq!(Crs::from_epsg(4326).unwrap(), Crs::Geographic);
        assert_eq!(
            Crs::from_epsg(32610).unwrap(),
            Crs::Utm { zone: 10, north: true }
        );
        assert_eq!(Crs::from_epsg(32756).unwrap().epsg(), 32756);
        assert!(matches!(
            Crs::from_epsg(3857),
            Err(CommonError::UnsupportedCrs(3857))
        ));
    }

    #[test]
    fn test_parse_name() {
        assert_eq!(Crs::parse_name("EPSG:32610"), Some(32610));
        assert_eq!(Crs::parse_name("urn:ogc:def:crs:EPSG::32610"), Some(32610));
        assert_eq!(Crs::parse_name("urn:ogc:def:crs:OGC:1.3:CRS84"), Some(4326));
        assert_eq!(Crs::parse_name("ESRI:102003"), None);
    }

    #[test]
    fn test_central_meridian_maps_to_false_easting() {
        let utm = Crs::Utm { zone: 10, north: true };
        let p = utm.project(Coord { x: -123.0, y: 38.0 });
        assert!((p.x - 500000.0).abs() < 1e-6);
        assert!((p.y - 4205815.02).abs() < 0.01);
    }

    #[test]
    fn test_known_point() {
        // CN Tower, 17T 630084 4833438.
        let utm = Crs::Utm { zone: 17, north: true };
        let p = utm.project(Coord { x: -79.3871, y: 43.6426 });
        assert!((p.x - 630084.0).abs() < 10.0, "easting {}", p.x);
        assert!((p.y - 4833438.0).abs() < 10.0, "northing {}", p.y);
    }

    #[test]
    fn test_round_trip_both_hemispheres() {
        for (epsg, lon, lat) in [(32610, -122.9, 37.9), (32756, 151.2153, -33.8568)] {
            let crs = Crs::from_epsg(epsg).unwrap();
            let back = crs.unproject(crs.project(Coord { x: lon, y: lat }));
            assert!((back.x - lon).abs() < 1e-8 && (back.y - lat).abs() < 1e-8);
        }

        let south = Crs::Utm { zone: 56, north: false };
        assert!(south.project(Coord { x: 151.2, y: -33.9 }).y > 6_000_000.0);
    }
}
