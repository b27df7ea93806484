//! GeoTIFF georeferencing tags.
//!
//! Three TIFF tags carry the grid-to-map transform:
//!
//! - `ModelPixelScale` (33550) + `ModelTiepoint` (33922) for north-up grids
//! - `ModelTransformation` (34264), a 4×4 matrix, for rotated or sheared grids
//!
//! and `GeoKeyDirectory` (34735) carries the CRS as short key entries:
//!
//! ```text
//! [version=1, revision=1, minor=0, n_keys,
//!  key_id, tag_location, count, value, ...]
//! ```
//!
//! Only keys stored inline (`tag_location == 0`) are interpreted.

use crate::affine::GeoTransform;
use crate::crs::Crs;

pub const TAG_MODEL_TRANSFORMATION: u16 = 34264;
pub const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
pub const TAG_GDAL_NODATA: u16 = 42113;

const KEY_MODEL_TYPE: u32 = 1024;
const KEY_RASTER_TYPE: u32 = 1025;
const KEY_GEOGRAPHIC_TYPE: u32 = 2048;
const KEY_PROJECTED_CS_TYPE: u32 = 3072;

const MODEL_PROJECTED: u16 = 1;
const MODEL_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const RASTER_PIXEL_IS_POINT: u32 = 2;
const USER_DEFINED: u32 = 32767;

/// The GeoKeys this crate understands.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeys {
    pub model_type: Option<u32>,
    pub pixel_is_point: bool,
    pub projected_epsg: Option<u32>,
    pub geographic_epsg: Option<u32>,
}

impl GeoKeys {
    /// The EPSG code the file declares, preferring the projected system.
    /// User-defined (32767) codes count as absent.
    pub fn epsg(&self) -> Option<u32> {
        self.projected_epsg
            .or(self.geographic_epsg)
            .filter(|&code| code != USER_DEFINED)
    }

    /// True when a key names a CRS that cannot be represented as EPSG.
    pub fn has_user_defined_crs(&self) -> bool {
        self.projected_epsg == Some(USER_DEFINED)
            || (self.projected_epsg.is_none() && self.geographic_epsg == Some(USER_DEFINED))
    }
}

pub fn parse_key_directory(directory: &[u32]) -> GeoKeys {
    let mut keys = GeoKeys::default();
    let Some(&n_keys) = directory.get(3) else {
        return keys;
    };
    for entry in directory[4..].chunks_exact(4).take(n_keys as usize) {
        let (id, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 {
            continue;
        }
        match id {
            KEY_MODEL_TYPE => keys.model_type = Some(value),
            KEY_RASTER_TYPE => keys.pixel_is_point = value == RASTER_PIXEL_IS_POINT,
            KEY_GEOGRAPHIC_TYPE => keys.geographic_epsg = Some(value),
            KEY_PROJECTED_CS_TYPE => keys.projected_epsg = Some(value),
            _ => {}
        }
    }
    keys
}

/// Key directory declaring `crs`, or only the raster type when absent.
pub fn build_key_directory(crs: Option<Crs>) -> Vec<u16> {
    let mut entries: Vec<[u16; 4]> = Vec::with_capacity(3);
    if let Some(crs) = crs {
        let (model, key) = if crs.is_geographic() {
            (MODEL_GEOGRAPHIC, KEY_GEOGRAPHIC_TYPE)
        } else {
            (MODEL_PROJECTED, KEY_PROJECTED_CS_TYPE)
        };
        entries.push([KEY_MODEL_TYPE as u16, 0, 1, model]);
        entries.push([KEY_RASTER_TYPE as u16, 0, 1, RASTER_PIXEL_IS_AREA]);
        entries.push([key as u16, 0, 1, crs.epsg()]);
    } else {
        entries.push([KEY_RASTER_TYPE as u16, 0, 1, RASTER_PIXEL_IS_AREA]);
    }
    let mut directory = vec![1, 1, 0, entries.len() as u16];
    directory.extend(entries.into_iter().flatten());
    directory
}

/// Grid transform from the model tags. `None` when the file carries none.
pub fn transform_from_tags(
    matrix: Option<&[f64]>,
    scale: Option<&[f64]>,
    tiepoint: Option<&[f64]>,
) -> Option<GeoTransform> {
    if let Some(m) = matrix.filter(|m| m.len() >= 16) {
        return Some(GeoTransform::new(m[0], m[1], m[3], m[4], m[5], m[7]));
    }
    match (scale, tiepoint) {
        (Some(s), Some(t)) if s.len() >= 2 && t.len() >= 6 => {
            let (sx, sy) = (s[0], s[1]);
            let (i, j, x, y) = (t[0], t[1], t[3], t[4]);
            Some(GeoTransform::new(sx, 0.0, x - i * sx, 0.0, -sy, y + j * sy))
        }
        _ => None,
    }
}

/// PixelIsPoint rasters tie coordinates to pixel centres; shift the
/// transform by half a pixel so it addresses corners like PixelIsArea.
pub fn point_to_area(t: GeoTransform) -> GeoTransform {
    t.shifted(-0.5, -0.5)
}

/// `(ModelPixelScale, ModelTiepoint)` for north-up grids, else `None`.
pub fn scale_and_tiepoint(t: &GeoTransform) -> Option<([f64; 3], [f64; 6])> {
    t.is_rectilinear()
        .then(|| ([t.a, -t.e, 0.0], [0.0, 0.0, 0.0, t.c, t.f, 0.0]))
}

/// Row-major 4×4 `ModelTransformation` matrix.
pub fn model_transformation(t: &GeoTransform) -> [f64; 16] {
    [
        t.a, t.b, 0.0, t.c, //
        t.d, t.e, 0.0, t.f, //
        0.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_directory_round_trip_projected() {
        let utm = Crs::parse("EPSG:32611").unwrap();
        let dir = build_key_directory(Some(utm));
        assert_eq!(&dir[..4], &[1, 1, 0, 3]);
        let wide: Vec<u32> = dir.iter().map(|&v| u32::from(v)).collect();
        let keys = parse_key_directory(&wide);
        assert_eq!(keys.model_type, Some(1));
        assert_eq!(keys.epsg(), Some(32611));
        assert!(!keys.pixel_is_point);
    }

    #[test]
    fn key_directory_geographic() {
        let dir = build_key_directory(Some(Crs::WGS84));
        let wide: Vec<u32> = dir.iter().map(|&v| u32::from(v)).collect();
        let keys = parse_key_directory(&wide);
        assert_eq!(keys.model_type, Some(2));
        assert_eq!(keys.geographic_epsg, Some(4326));
        assert_eq!(keys.epsg(), Some(4326));
    }

    #[test]
    fn key_directory_without_crs() {
        let dir = build_key_directory(None);
        let wide: Vec<u32> = dir.iter().map(|&v| u32::from(v)).collect();
        assert_eq!(parse_key_directory(&wide).epsg(), None);
    }

    #[test]
    fn user_defined_crs_is_absent() {
        let dir = [1, 1, 0, 2, 1024, 0, 1, 1, 3072, 0, 1, 32767];
        let keys = parse_key_directory(&dir);
        assert_eq!(keys.epsg(), None);
        assert!(keys.has_user_defined_crs());
    }

    #[test]
    fn projected_wins_over_geographic() {
        let dir = [1, 1, 0, 2, 2048, 0, 1, 4326, 3072, 0, 1, 32611];
        assert_eq!(parse_key_directory(&dir).epsg(), Some(32611));
    }

    #[test]
    fn entries_stored_elsewhere_are_skipped() {
        let dir = [1, 1, 0, 1, 3072, 34737, 5, 0];
        assert_eq!(parse_key_directory(&dir).epsg(), None);
    }

    #[test]
    fn truncated_directory_is_empty() {
        assert_eq!(parse_key_directory(&[1, 1]), GeoKeys::default());
    }

    #[test]
    fn tiepoint_with_offset_pixel() {
        let t = transform_from_tags(
            None,
            Some(&[30.0, 30.0, 0.0]),
            Some(&[10.0, 20.0, 0.0, 500_300.0, 3_799_400.0, 0.0]),
        )
        .unwrap();
        assert_eq!(t, GeoTransform::from_origin(500_000.0, 3_800_000.0, 30.0, 30.0));
    }

    #[test]
    fn matrix_takes_precedence() {
        let rotated = GeoTransform::new(10.0, 2.0, 100.0, 1.0, -10.0, 200.0);
        let m = model_transformation(&rotated);
        let t = transform_from_tags(Some(&m), Some(&[1.0, 1.0, 0.0]), None).unwrap();
        assert_eq!(t, rotated);
        assert!(scale_and_tiepoint(&rotated).is_none());
    }

    #[test]
    fn no_tags_no_transform() {
        assert!(transform_from_tags(None, None, None).is_none());
    }

    #[test]
    fn pixel_is_point_shifts_half_pixel() {
        let t = point_to_area(GeoTransform::from_origin(100.0, 200.0, 10.0, 10.0));
        assert_eq!((t.c, t.f), (95.0, 205.0));
    }
}
