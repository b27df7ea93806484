//! Area-of-interest boundaries loaded from GeoJSON.
//!
//! A [`Boundary`] is an ordered list of polygons plus the CRS their vertices
//! are expressed in. Accepted inputs are a `FeatureCollection`, a single
//! `Feature` or a bare geometry; `Polygon`, `MultiPolygon` and
//! `GeometryCollection`s of those are flattened in document order.
//!
//! ## CRS
//!
//! RFC 7946 fixes GeoJSON to WGS84 lon/lat, but many AOI exports still carry
//! the legacy named-CRS member:
//!
//! ```json
//! "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::32611" } }
//! ```
//!
//! When present it wins; otherwise the boundary is EPSG:4326.
//!
//! ## Validation
//!
//! Best-effort: every ring needs three distinct finite vertices, the
//! exterior must enclose a non-zero area and no ring may cross itself.
//! Anything that is not polygonal is rejected.

use crate::crs::{Crs, CrsTransformer};
use crate::error::{RasterError, Result};
use geo::{Area, BoundingRect, Coord, Intersects, LineString, MultiPolygon, Polygon, Rect};
use geojson::{GeoJson, JsonObject};
use std::path::Path;
use tracing::{debug, warn};

/// Rings longer than this skip the quadratic self-intersection scan.
const MAX_SELF_INTERSECTION_SEGMENTS: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    polygons: Vec<Polygon<f64>>,
    crs: Option<Crs>,
}

impl Boundary {
    pub fn new(polygons: Vec<Polygon<f64>>, crs: Option<Crs>) -> Self {
        Self { polygons, crs }
    }

    pub fn polygons(&self) -> &[Polygon<f64>] {
        &self.polygons
    }

    pub fn crs(&self) -> Option<Crs> {
        self.crs
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// Envelope of all polygons, `None` when empty.
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        MultiPolygon::new(self.polygons.clone()).bounding_rect()
    }

    /// Reproject every vertex into `target`.
    ///
    /// Edges are not densified, so long edges in strongly curved projections
    /// stay straight in the target CRS.
    pub fn to_crs(&self, target: Crs) -> Result<Boundary> {
        let source = self.crs.ok_or_else(|| {
            RasterError::UnsupportedCrs("boundary has no CRS to reproject from".into())
        })?;
        if source == target {
            return Ok(self.clone());
        }
        let transformer = CrsTransformer::new(source, target)?;
        let project_ring = |ring: &LineString<f64>| -> Result<LineString<f64>> {
            ring.coords()
                .map(|c| transformer.transform(c.x, c.y).map(|(x, y)| Coord { x, y }))
                .collect::<Result<Vec<_>>>()
                .map(LineString::new)
        };
        let polygons = self
            .polygons
            .iter()
            .map(|p| {
                let exterior = project_ring(p.exterior())?;
                let interiors = p
                    .interiors()
                    .iter()
                    .map(project_ring)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Polygon::new(exterior, interiors))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(from = %source, to = %target, polygons = polygons.len(), "reprojected boundary");
        Ok(Boundary::new(polygons, Some(target)))
    }
}

/// Load and validate a GeoJSON boundary file.
pub fn load(path: &Path) -> Result<Boundary> {
    let text =
        std::fs::read_to_string(path).map_err(|e| RasterError::io("load boundary", path, e))?;
    let boundary = parse(&text)?;
    debug!(
        path = %path.display(),
        polygons = boundary.len(),
        crs = ?boundary.crs(),
        "loaded boundary"
    );
    Ok(boundary)
}

/// Parse GeoJSON text into a validated boundary.
pub fn parse(text: &str) -> Result<Boundary> {
    let geojson: GeoJson = text.parse().map_err(|e| RasterError::InvalidGeometry {
        index: 0,
        reason: format!("not valid GeoJSON: {e}"),
    })?;

    let mut values = Vec::new();
    let foreign = match geojson {
        GeoJson::FeatureCollection(fc) => {
            for (i, feature) in fc.features.into_iter().enumerate() {
                let geometry = feature.geometry.ok_or_else(|| RasterError::InvalidGeometry {
                    index: i,
                    reason: "feature has no geometry".into(),
                })?;
                values.push(geometry.value);
            }
            fc.foreign_members
        }
        GeoJson::Feature(feature) => {
            let geometry = feature.geometry.ok_or_else(|| RasterError::InvalidGeometry {
                index: 0,
                reason: "feature has no geometry".into(),
            })?;
            values.push(geometry.value);
            feature.foreign_members
        }
        GeoJson::Geometry(geometry) => {
            values.push(geometry.value);
            geometry.foreign_members
        }
    };

    let crs = match foreign.as_ref().and_then(named_crs) {
        Some(name) => Crs::parse(&name)?,
        None => Crs::WGS84,
    };

    let mut polygons = Vec::new();
    for value in values {
        flatten_polygons(value, &mut polygons)?;
    }
    for (i, polygon) in polygons.iter().enumerate() {
        validate_polygon(i, polygon)?;
    }
    Ok(Boundary::new(polygons, Some(crs)))
}

/// `crs.properties.name` from a GeoJSON object's foreign members.
fn named_crs(members: &JsonObject) -> Option<String> {
    members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

fn flatten_polygons(value: geojson::Value, out: &mut Vec<Polygon<f64>>) -> Result<()> {
    use geojson::Value;
    match value {
        Value::Polygon(rings) => {
            let index = out.len();
            out.push(polygon_from_rings(index, &rings)?);
        }
        Value::MultiPolygon(parts) => {
            for rings in parts {
                let index = out.len();
                out.push(polygon_from_rings(index, &rings)?);
            }
        }
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                flatten_polygons(geometry.value, out)?;
            }
        }
        other => {
            return Err(RasterError::InvalidGeometry {
                index: out.len(),
                reason: format!("expected Polygon or MultiPolygon, found {}", kind(&other)),
            });
        }
    }
    Ok(())
}

fn kind(value: &geojson::Value) -> &'static str {
    use geojson::Value;
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn polygon_from_rings(index: usize, rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>> {
    let invalid = |reason: String| RasterError::InvalidGeometry { index, reason };
    let mut rings = rings.iter().map(|ring| {
        ring.iter()
            .map(|position| match position.as_slice() {
                [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
                [_, _, ..] => Err(invalid("non-finite coordinate".into())),
                _ => Err(invalid("position needs at least two coordinates".into())),
            })
            .collect::<Result<Vec<_>>>()
            .map(LineString::new)
    });
    let exterior = rings
        .next()
        .ok_or_else(|| invalid("polygon has no exterior ring".into()))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    // Polygon::new closes open rings.
    Ok(Polygon::new(exterior, interiors))
}

fn validate_polygon(index: usize, polygon: &Polygon<f64>) -> Result<()> {
    let invalid = |reason: String| RasterError::InvalidGeometry { index, reason };

    for (r, ring) in std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .enumerate()
    {
        let mut distinct: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
        for c in ring.coords() {
            if !distinct.contains(c) {
                distinct.push(*c);
            }
        }
        if distinct.len() < 3 {
            return Err(invalid(format!(
                "ring {r} has {} distinct vertices, need at least 3",
                distinct.len()
            )));
        }
        if ring_self_intersects(ring) {
            return Err(invalid(format!("ring {r} intersects itself")));
        }
    }

    let exterior_only = Polygon::new(polygon.exterior().clone(), vec![]);
    if exterior_only.unsigned_area() == 0.0 {
        return Err(invalid("polygon encloses zero area".into()));
    }
    if polygon.unsigned_area() == 0.0 {
        warn!(index, "holes cover the whole polygon");
    }
    Ok(())
}

/// True when two non-adjacent edges of a closed ring touch or cross.
fn ring_self_intersects(ring: &LineString<f64>) -> bool {
    let segments: Vec<_> = ring.lines().filter(|l| l.start != l.end).collect();
    let n = segments.len();
    if n > MAX_SELF_INTERSECTION_SEGMENTS {
        debug!(segments = n, "ring too long for self-intersection check");
        return false;
    }
    for i in 0..n {
        for j in (i + 2)..n {
            // First and last segments share the closing vertex.
            if i == 0 && j == n - 1 {
                continue;
            }
            if segments[i].intersects(&segments[j]) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SQUARE: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]
            }
        }]
    }"#;

    #[test]
    fn parse_feature_collection_defaults_to_wgs84() {
        let b = parse(SQUARE).unwrap();
        assert_eq!(b.len(), 1);
        assert_eq!(b.crs(), Some(Crs::WGS84));
        let rect = b.bounding_rect().unwrap();
        assert_eq!(rect.min(), Coord { x: 0.0, y: 0.0 });
        assert_eq!(rect.max(), Coord { x: 10.0, y: 10.0 });
    }

    #[test]
    fn parse_named_crs_member() {
        let json = r#"{
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::32611" } },
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[500000, 3790000], [501000, 3790000], [501000, 3791000], [500000, 3790000]]]
                }
            }]
        }"#;
        let b = parse(json).unwrap();
        assert_eq!(b.crs().unwrap().epsg(), 32611);
    }

    #[test]
    fn multipolygon_flattens_in_order() {
        let json = r#"{
            "type": "MultiPolygon",
            "coordinates": [
                [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]],
                [[[5, 5], [6, 5], [6, 6], [5, 6], [5, 5]]]
            ]
        }"#;
        let b = parse(json).unwrap();
        assert_eq!(b.len(), 2);
        assert_eq!(b.polygons()[1].exterior().0[0], Coord { x: 5.0, y: 5.0 });
    }

    #[test]
    fn polygon_with_hole_is_kept() {
        let json = r#"{
            "type": "Polygon",
            "coordinates": [
                [[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]],
                [[4, 4], [6, 4], [6, 6], [4, 6], [4, 4]]
            ]
        }"#;
        let b = parse(json).unwrap();
        assert_eq!(b.polygons()[0].interiors().len(), 1);
    }

    #[test]
    fn empty_feature_collection_is_empty_boundary() {
        let b = parse(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
        assert!(b.is_empty());
        assert!(b.bounding_rect().is_none());
    }

    #[test]
    fn bow_tie_is_invalid() {
        let json = r#"{
            "type": "Polygon",
            "coordinates": [[[0, 0], [10, 10], [10, 0], [0, 10], [0, 0]]]
        }"#;
        let err = parse(json).unwrap_err();
        assert!(
            matches!(&err, RasterError::InvalidGeometry { reason, .. } if reason.contains("intersects itself")),
            "{err}"
        );
    }

    #[test]
    fn zero_area_is_invalid() {
        let json = r#"{
            "type": "Polygon",
            "coordinates": [[[0, 0], [5, 0], [10, 0], [0, 0]]]
        }"#;
        assert!(matches!(
            parse(json),
            Err(RasterError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn point_geometry_is_rejected() {
        let json = r#"{"type": "Point", "coordinates": [1, 2]}"#;
        let err = parse(json).unwrap_err();
        assert!(matches!(err, RasterError::InvalidGeometry { index: 0, .. }));
    }

    #[test]
    fn malformed_json_is_invalid_geometry() {
        assert!(matches!(
            parse("{ not json"),
            Err(RasterError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn unknown_crs_name_is_unsupported() {
        let json = r#"{
            "type": "Polygon",
            "crs": { "type": "name", "properties": { "name": "LOCAL_CS" } },
            "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]
        }"#;
        assert!(matches!(parse(json), Err(RasterError::UnsupportedCrs(_))));
    }

    #[test]
    fn load_missing_file() {
        let err = load(Path::new("/definitely/not/here.geojson")).unwrap_err();
        assert!(matches!(err, RasterError::MissingFile { .. }));
    }

    #[test]
    fn load_from_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("aoi.geojson");
        fs::write(&path, SQUARE).unwrap();
        assert_eq!(load(&path).unwrap().len(), 1);
    }

    #[test]
    fn to_crs_projects_vertices() {
        let b = parse(
            r#"{"type": "Polygon", "coordinates": [[[-117, 34], [-116.99, 34], [-116.99, 34.01], [-117, 34]]]}"#,
        )
        .unwrap();
        let utm = Crs::parse("EPSG:32611").unwrap();
        let projected = b.to_crs(utm).unwrap();
        assert_eq!(projected.crs(), Some(utm));
        let first = projected.polygons()[0].exterior().0[0];
        assert!((first.x - 500_000.0).abs() < 1e-3);
        assert!(first.y > 3_700_000.0 && first.y < 3_800_000.0);
    }

    #[test]
    fn to_crs_without_source_crs_fails() {
        let b = Boundary::new(vec![], None);
        assert!(matches!(
            b.to_crs(Crs::WGS84),
            Err(RasterError::UnsupportedCrs(_))
        ));
    }
}
