//! Shared test utilities for the sat-raster test suite.
//!
//! Provides synthetic raster fixtures, boundary builders and float
//! assertions so unit tests can exercise the pipeline without real imagery.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let raster = raster_from_fn(utm_profile(100, 100, 1), |_, col, row| (col + row) as f64);
//! let aoi = rect_boundary(raster.crs(), 500_000.0, 3_797_000.0, 501_500.0, 3_800_000.0);
//! let (pixels, transform) = clip(&raster, &aoi, true).unwrap();
//! ```

use crate::affine::GeoTransform;
use crate::boundary::Boundary;
use crate::crs::Crs;
use crate::profile::{Driver, Profile};
use crate::raster::Raster;
use crate::types::{Codec, SampleType};
use geo::{LineString, Polygon};

// =========================================================================
// Raster fixtures
// =========================================================================

/// UTM zone 11N origin on the zone's central meridian, 30 m pixels.
pub const UTM_LEFT: f64 = 500_000.0;
pub const UTM_TOP: f64 = 3_800_000.0;
pub const UTM_RES: f64 = 30.0;

/// A uint8 profile in EPSG:32611 with no-data 0 and no compression.
pub fn utm_profile(width: usize, height: usize, count: usize) -> Profile {
    Profile {
        driver: Driver::GTiff,
        dtype: SampleType::U8,
        width,
        height,
        count,
        crs: Some(Crs::parse("EPSG:32611").unwrap()),
        transform: GeoTransform::from_origin(UTM_LEFT, UTM_TOP, UTM_RES, UTM_RES),
        nodata: Some(0.0),
        compress: Codec::None,
    }
}

/// Build a raster by evaluating `f(band, col, row)` for every sample.
pub fn raster_from_fn(profile: Profile, f: impl Fn(usize, usize, usize) -> f64) -> Raster {
    let bands = (0..profile.count)
        .map(|b| {
            (0..profile.height)
                .flat_map(|row| (0..profile.width).map(move |col| (col, row)))
                .map(|(col, row)| f(b, col, row))
                .collect()
        })
        .collect();
    Raster::new(profile, bands).unwrap()
}

/// Deterministic pseudo-random samples in `0..=255` (xorshift), for
/// high-entropy compression fixtures.
pub fn noise(seed: u64, len: usize) -> Vec<f64> {
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 256) as f64
        })
        .collect()
}

// =========================================================================
// Boundary fixtures
// =========================================================================

/// Axis-aligned rectangle polygon.
pub fn rect(left: f64, bottom: f64, right: f64, top: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            (left, bottom),
            (right, bottom),
            (right, top),
            (left, top),
            (left, bottom),
        ]),
        vec![],
    )
}

/// Single-rectangle boundary in the given CRS.
pub fn rect_boundary(crs: Option<Crs>, left: f64, bottom: f64, right: f64, top: f64) -> Boundary {
    Boundary::new(vec![rect(left, bottom, right, top)], crs)
}

// =========================================================================
// Assertions
// =========================================================================

/// Assert two floats are within `tol`, with a readable message.
pub fn assert_close(actual: f64, expected: f64, tol: f64, what: &str) {
    assert!(
        (actual - expected).abs() <= tol,
        "{what}: expected {expected} ± {tol}, got {actual}"
    );
}
