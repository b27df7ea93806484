//! Coordinate reference systems and point reprojection.
//!
//! CRSs are identified by EPSG code and resolved through the
//! `crs-definitions` database into PROJ.4 strings, which `proj4rs` executes.
//! Everything is pure Rust; there is no PROJ or GDAL system dependency.
//!
//! `proj4rs` works in radians for geographic systems, so [`CrsTransformer`]
//! converts degrees in and out around every call.

use crate::error::{RasterError, Result};
use proj4rs::proj::Proj;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An EPSG-coded coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs {
    epsg: u16,
}

impl Crs {
    pub const WGS84: Crs = Crs { epsg: 4326 };

    /// Look up an EPSG code. Fails with [`RasterError::UnsupportedCrs`] when
    /// the code is not in the definitions database.
    pub fn from_epsg(code: u32) -> Result<Self> {
        let epsg = u16::try_from(code)
            .map_err(|_| RasterError::UnsupportedCrs(format!("EPSG:{code}")))?;
        if crs_definitions::from_code(epsg).is_none() {
            return Err(RasterError::UnsupportedCrs(format!("EPSG:{code}")));
        }
        Ok(Self { epsg })
    }

    /// Parse the spellings found in GeoJSON files and on the command line:
    ///
    /// - `EPSG:32611`, `epsg:4326`, `32611`
    /// - `urn:ogc:def:crs:EPSG::32611`, `urn:ogc:def:crs:EPSG:6.6:32611`
    /// - `OGC:CRS84`, `urn:ogc:def:crs:OGC:1.3:CRS84` (WGS84 lon/lat)
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let upper = trimmed.to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Ok(Self::WGS84);
        }
        let code = if let Some(rest) = upper.strip_prefix("EPSG:") {
            rest
        } else if upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            upper.rsplit(':').next().unwrap_or_default()
        } else {
            upper.as_str()
        };
        let code: u32 = code
            .parse()
            .map_err(|_| RasterError::UnsupportedCrs(trimmed.to_string()))?;
        Self::from_epsg(code)
    }

    pub fn epsg(&self) -> u16 {
        self.epsg
    }

    pub fn proj4(&self) -> &'static str {
        crs_definitions::from_code(self.epsg)
            .map(|def| def.proj4)
            .unwrap_or_default()
    }

    /// Geographic (lon/lat in degrees) rather than projected.
    pub fn is_geographic(&self) -> bool {
        self.proj4().contains("+proj=longlat")
    }

    fn to_proj(self) -> Result<Proj> {
        Proj::from_proj_string(self.proj4())
            .map_err(|e| RasterError::UnsupportedCrs(format!("{self}: {e:?}")))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

impl FromStr for Crs {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Crs {
    type Error = RasterError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

/// A prepared source → destination point transformation.
///
/// Building the two `Proj` objects parses PROJ strings, so a transformer is
/// created once per operation and reused for every point.
pub struct CrsTransformer {
    source: Crs,
    target: Crs,
    source_proj: Proj,
    target_proj: Proj,
}

impl CrsTransformer {
    pub fn new(source: Crs, target: Crs) -> Result<Self> {
        Ok(Self {
            source,
            target,
            source_proj: source.to_proj()?,
            target_proj: target.to_proj()?,
        })
    }

    pub fn is_noop(&self) -> bool {
        self.source == self.target
    }

    /// Transform one point. Geographic coordinates are in degrees.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if self.is_noop() {
            return Ok((x, y));
        }
        let (x_in, y_in) = if self.source.is_geographic() {
            (x.to_radians(), y.to_radians())
        } else {
            (x, y)
        };

        let mut point = (x_in, y_in, 0.0);
        proj4rs::transform::transform(&self.source_proj, &self.target_proj, &mut point).map_err(
            |e| {
                RasterError::UnsupportedCrs(format!(
                    "transform {} -> {} failed at ({x}, {y}): {e:?}",
                    self.source, self.target
                ))
            },
        )?;

        let out = if self.target.is_geographic() {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };
        if !out.0.is_finite() || !out.1.is_finite() {
            return Err(RasterError::UnsupportedCrs(format!(
                "transform {} -> {} produced a non-finite point for ({x}, {y})",
                self.source, self.target
            )));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_common_spellings() {
        assert_eq!(Crs::parse("EPSG:4326").unwrap().epsg(), 4326);
        assert_eq!(Crs::parse("epsg:32611").unwrap().epsg(), 32611);
        assert_eq!(Crs::parse("32611").unwrap().epsg(), 32611);
        assert_eq!(
            Crs::parse("urn:ogc:def:crs:EPSG::32611").unwrap().epsg(),
            32611
        );
        assert_eq!(
            Crs::parse("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap(),
            Crs::WGS84
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Crs::parse("not-a-crs"),
            Err(RasterError::UnsupportedCrs(_))
        ));
        assert!(matches!(
            Crs::parse("EPSG:99999999"),
            Err(RasterError::UnsupportedCrs(_))
        ));
    }

    #[test]
    fn geographic_detection() {
        assert!(Crs::WGS84.is_geographic());
        assert!(!Crs::parse("EPSG:32611").unwrap().is_geographic());
        assert!(!Crs::parse("EPSG:3857").unwrap().is_geographic());
    }

    #[test]
    fn display_is_epsg_prefixed() {
        assert_eq!(Crs::parse("3857").unwrap().to_string(), "EPSG:3857");
    }

    #[test]
    fn serde_uses_string_form() {
        let json = serde_json::to_string(&Crs::WGS84).unwrap();
        assert_eq!(json, "\"EPSG:4326\"");
        let back: Crs = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Crs::WGS84);
    }

    #[test]
    fn utm_central_meridian_maps_to_false_easting() {
        let utm = Crs::parse("EPSG:32611").unwrap();
        let t = CrsTransformer::new(Crs::WGS84, utm).unwrap();
        // Zone 11 central meridian is -117°.
        let (x, y) = t.transform(-117.0, 0.0).unwrap();
        assert!((x - 500_000.0).abs() < 1e-3, "x = {x}");
        assert!(y.abs() < 1e-3, "y = {y}");
    }

    #[test]
    fn round_trip_through_web_mercator() {
        let merc = Crs::parse("EPSG:3857").unwrap();
        let fwd = CrsTransformer::new(Crs::WGS84, merc).unwrap();
        let back = CrsTransformer::new(merc, Crs::WGS84).unwrap();
        let (x, y) = fwd.transform(12.5, 41.9).unwrap();
        let (lon, lat) = back.transform(x, y).unwrap();
        assert!((lon - 12.5).abs() < 1e-9);
        assert!((lat - 41.9).abs() < 1e-9);
    }

    #[test]
    fn same_crs_is_noop() {
        let t = CrsTransformer::new(Crs::WGS84, Crs::WGS84).unwrap();
        assert!(t.is_noop());
        assert_eq!(t.transform(1.0, 2.0).unwrap(), (1.0, 2.0));
    }
}
