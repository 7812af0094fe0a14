//! Coordinate systems accepted in boundary uploads.
//!
//! Korean census tract files are usually published in one of the national
//! transverse Mercator grids. Coordinates in those grids are converted to
//! WGS84 longitude/latitude on load; geographic systems pass through
//! unchanged (GRS80 and WGS84 differ by well under a millimetre).

use std::f64::consts::PI;

use geo::{Coord, MapCoords as _, MultiPolygon};

/// A reference ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in metres.
    pub semi_major: f64,
    /// Inverse flattening.
    pub inverse_flattening: f64,
}

#[allow(clippy::suboptimal_flops)]
impl Ellipsoid {
    /// GRS80, used by Korea 2000.
    pub const GRS80: Self = Self {
        semi_major: 6_378_137.0,
        inverse_flattening: 298.257_222_101,
    };

    /// WGS84.
    pub const WGS84: Self = Self {
        semi_major: 6_378_137.0,
        inverse_flattening: 298.257_223_563,
    };

    /// Bessel 1841, used by the older Korean datum.
    pub const BESSEL_1841: Self = Self {
        semi_major: 6_377_397.155,
        inverse_flattening: 299.152_812_8,
    };

    /// First eccentricity squared.
    #[must_use]
    pub fn eccentricity_squared(self) -> f64 {
        let f = self.inverse_flattening.recip();
        f * (2.0 - f)
    }

    /// Earth-centred cartesian coordinates of a point at zero height.
    fn ecef(self, lat: f64, lon: f64) -> [f64; 3] {
        let e2 = self.eccentricity_squared();
        let n = self.semi_major / (1.0 - e2 * lat.sin().powi(2)).sqrt();
        [
            n * lat.cos() * lon.cos(),
            n * lat.cos() * lon.sin(),
            n * (1.0 - e2) * lat.sin(),
        ]
    }

    /// Geodetic `(lat, lon)` in radians of an earth-centred point.
    #[allow(clippy::many_single_char_names)]
    fn geodetic(self, [x, y, z]: [f64; 3]) -> (f64, f64) {
        let e2 = self.eccentricity_squared();
        let p = x.hypot(y);
        let mut lat = z.atan2(p * (1.0 - e2));
        for _ in 0..5 {
            let n = self.semi_major / (1.0 - e2 * lat.sin().powi(2)).sqrt();
            let h = p / lat.cos() - n;
            lat = z.atan2(p * (1.0 - e2 * n / (n + h)));
        }
        (lat, y.atan2(x))
    }
}

/// Seven-parameter datum shift to WGS84 (position vector convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Helmert {
    /// Translation in metres.
    pub translation: [f64; 3],
    /// Rotation in arc seconds.
    pub rotation: [f64; 3],
    /// Scale difference in parts per million.
    pub scale_ppm: f64,
}

impl Helmert {
    fn apply(&self, [x, y, z]: [f64; 3]) -> [f64; 3] {
        let arcsec = PI / (180.0 * 3600.0);
        let [rx, ry, rz] = self.rotation.map(|r| r * arcsec);
        let [tx, ty, tz] = self.translation;
        let m = 1.0 + self.scale_ppm * 1e-6;
        [
            m.mul_add(ry.mul_add(z, rz.mul_add(-y, x)), tx),
            m.mul_add(rx.mul_add(-z, rz.mul_add(x, y)), ty),
            m.mul_add(rx.mul_add(y, ry.mul_add(-x, z)), tz),
        ]
    }
}

/// A transverse Mercator grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    /// Ellipsoid of the grid's datum.
    pub ellipsoid: Ellipsoid,
    /// Latitude of origin in degrees.
    pub origin_latitude: f64,
    /// Central meridian in degrees.
    pub central_meridian: f64,
    /// Scale factor on the central meridian.
    pub scale: f64,
    /// False easting in metres.
    pub false_easting: f64,
    /// False northing in metres.
    pub false_northing: f64,
    /// Shift from the grid's datum to WGS84, if they differ.
    pub to_wgs84: Option<Helmert>,
}

#[allow(clippy::suboptimal_flops)]
impl TransverseMercator {
    /// Meridian arc length from the equator to `lat` (radians).
    fn meridian_arc(self, lat: f64) -> f64 {
        let e2 = self.ellipsoid.eccentricity_squared();
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.ellipsoid.semi_major
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
    }

    /// Converts grid `(easting, northing)` to WGS84 `(longitude, latitude)`
    /// in degrees.
    #[must_use]
    #[allow(clippy::similar_names)]
    pub fn to_lon_lat(self, easting: f64, northing: f64) -> (f64, f64) {
        let a = self.ellipsoid.semi_major;
        let e2 = self.ellipsoid.eccentricity_squared();
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);
        let k0 = self.scale;

        let arc = self.meridian_arc(self.origin_latitude.to_radians())
            + (northing - self.false_northing) / k0;
        let mu = arc / (a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin1, cos1, tan1) = (phi1.sin(), phi1.cos(), phi1.tan());
        let c1 = ep2 * cos1 * cos1;
        let t1 = tan1 * tan1;
        let n1 = a / (1.0 - e2 * sin1 * sin1).sqrt();
        let r1 = a * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
        let d = (easting - self.false_easting) / (n1 * k0);

        let lat = phi1
            - (n1 * tan1 / r1)
                * (d.powi(2) / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);
        let lon = self.central_meridian.to_radians()
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                    * d.powi(5)
                    / 120.0)
                / cos1;

        let (lat, lon) = match self.to_wgs84 {
            Some(shift) => Ellipsoid::WGS84.geodetic(shift.apply(self.ellipsoid.ecef(lat, lon))),
            None => (lat, lon),
        };
        (lon.to_degrees(), lat.to_degrees())
    }
}

/// Korean 1985 (Bessel) to WGS84.
const KOREAN_1985_TO_WGS84: Helmert = Helmert {
    translation: [-115.80, 474.99, 674.11],
    rotation: [1.16, -2.31, -1.63],
    scale_ppm: 6.43,
};

/// Coordinate system of an uploaded boundary file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinateSystem {
    /// Longitude/latitude on a WGS84-compatible datum.
    LonLat,
    /// A projected grid, converted on load.
    Projected(TransverseMercator),
}

impl CoordinateSystem {
    /// Looks up a supported EPSG code.
    #[must_use]
    pub const fn from_epsg(code: u32) -> Option<Self> {
        let grid = match code {
            4326 | 4166 | 4737 => return Some(Self::LonLat),
            // Korea 2000 / Unified CS
            5179 => TransverseMercator {
                ellipsoid: Ellipsoid::GRS80,
                origin_latitude: 38.0,
                central_meridian: 127.5,
                scale: 0.9996,
                false_easting: 1_000_000.0,
                false_northing: 2_000_000.0,
                to_wgs84: None,
            },
            // Korea 2000 / Central Belt
            5181 => TransverseMercator {
                ellipsoid: Ellipsoid::GRS80,
                origin_latitude: 38.0,
                central_meridian: 127.0,
                scale: 1.0,
                false_easting: 200_000.0,
                false_northing: 500_000.0,
                to_wgs84: None,
            },
            // Korea 2000 / Central Belt 2010
            5186 => TransverseMercator {
                ellipsoid: Ellipsoid::GRS80,
                origin_latitude: 38.0,
                central_meridian: 127.0,
                scale: 1.0,
                false_easting: 200_000.0,
                false_northing: 600_000.0,
                to_wgs84: None,
            },
            // Korean 1985 / Modified Central Belt
            5174 => TransverseMercator {
                ellipsoid: Ellipsoid::BESSEL_1841,
                origin_latitude: 38.0,
                central_meridian: 127.002_890_277_777_8,
                scale: 1.0,
                false_easting: 200_000.0,
                false_northing: 500_000.0,
                to_wgs84: Some(KOREAN_1985_TO_WGS84),
            },
            _ => return None,
        };
        Some(Self::Projected(grid))
    }

    /// Parses a `GeoJSON` `crs` name such as `urn:ogc:def:crs:EPSG::5179`,
    /// `EPSG:5186`, or `urn:ogc:def:crs:OGC:1.3:CRS84`.
    #[must_use]
    pub fn from_crs_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() || name.ends_with("CRS84") {
            return Some(Self::LonLat);
        }
        let code = name.rsplit(':').next()?.trim().parse().ok()?;
        Self::from_epsg(code)
    }

    /// Converts `polygon` to WGS84 longitude/latitude.
    #[must_use]
    pub fn to_wgs84(self, polygon: MultiPolygon<f64>) -> MultiPolygon<f64> {
        match self {
            Self::LonLat => polygon,
            Self::Projected(grid) => polygon.map_coords(move |c| {
                let (x, y) = grid.to_lon_lat(c.x, c.y);
                Coord { x, y }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(code: u32) -> TransverseMercator {
        match CoordinateSystem::from_epsg(code) {
            Some(CoordinateSystem::Projected(grid)) => grid,
            other => panic!("expected a projected grid for {code}, got {other:?}"),
        }
    }

    fn assert_near(actual: (f64, f64), expected: (f64, f64), tolerance: f64) {
        assert!(
            (actual.0 - expected.0).abs() < tolerance && (actual.1 - expected.1).abs() < tolerance,
            "{actual:?} is not within {tolerance} of {expected:?}"
        );
    }

    #[test]
    fn grid_origins_map_to_their_meridians() {
        assert_near(grid(5179).to_lon_lat(1_000_000.0, 2_000_000.0), (127.5, 38.0), 1e-9);
        assert_near(grid(5186).to_lon_lat(200_000.0, 600_000.0), (127.0, 38.0), 1e-9);
        assert_near(grid(5181).to_lon_lat(200_000.0, 500_000.0), (127.0, 38.0), 1e-9);
    }

    #[test]
    fn converts_seongsu_grid_coordinates() {
        let seongsu = (127.0557, 37.5445);
        assert_near(grid(5179).to_lon_lat(960_751.505, 1_949_556.022), seongsu, 1e-6);
        assert_near(grid(5186).to_lon_lat(204_922.373, 549_444.523), seongsu, 1e-6);
    }

    #[test]
    fn shifts_korean_1985_datum() {
        // the shift moves points roughly ten arc seconds
        let (lon, lat) = grid(5174).to_lon_lat(200_000.0, 500_000.0);
        assert_near((lon, lat), (127.000_78, 38.002_75), 1e-4);
        assert!((lon - 127.002_89).abs() > 1e-3);
    }

    #[test]
    fn parses_crs_names() {
        assert_eq!(
            CoordinateSystem::from_crs_name("urn:ogc:def:crs:OGC:1.3:CRS84"),
            Some(CoordinateSystem::LonLat)
        );
        assert_eq!(
            CoordinateSystem::from_crs_name("urn:ogc:def:crs:EPSG::4326"),
            Some(CoordinateSystem::LonLat)
        );
        assert_eq!(
            CoordinateSystem::from_crs_name("EPSG:5179"),
            Some(CoordinateSystem::Projected(grid(5179)))
        );
        assert_eq!(CoordinateSystem::from_crs_name("EPSG:3857"), None);
        assert_eq!(CoordinateSystem::from_crs_name("urn:ogc:def:crs:EPSG::abc"), None);
    }
}
