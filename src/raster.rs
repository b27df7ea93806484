//! In-memory raster dataset.
//!
//! A [`Raster`] owns its pixel grid and its [`Profile`]. It is immutable once
//! built: clipping and reprojection produce new rasters. The constructor is
//! the single place the shape invariant is enforced:
//!
//! ```text
//! width × height × count == total samples, every band == width × height
//! ```
//!
//! Bands are stored row-major as `f64`; band indexes in the public API are
//! 1-based, matching GDAL/rasterio conventions.

use crate::affine::GeoTransform;
use crate::crs::Crs;
use crate::error::{RasterError, Result};
use crate::profile::Profile;
use crate::types::{Bounds, Resolution, SampleType};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    profile: Profile,
    bands: Vec<Vec<f64>>,
}

impl Raster {
    pub fn new(profile: Profile, bands: Vec<Vec<f64>>) -> Result<Self> {
        if profile.width == 0 || profile.height == 0 {
            return Err(RasterError::InvalidRaster(format!(
                "zero-sized grid {}x{}",
                profile.width, profile.height
            )));
        }
        if bands.len() != profile.count {
            return Err(RasterError::InvalidRaster(format!(
                "profile declares {} bands, got {}",
                profile.count,
                bands.len()
            )));
        }
        let pixels = profile.width * profile.height;
        if let Some((i, band)) = bands.iter().enumerate().find(|(_, b)| b.len() != pixels) {
            return Err(RasterError::InvalidRaster(format!(
                "band {} holds {} samples, expected {}x{} = {pixels}",
                i + 1,
                band.len(),
                profile.width,
                profile.height
            )));
        }
        Ok(Self { profile, bands })
    }

    /// Open a GeoTIFF from disk.
    pub fn open(path: &Path) -> Result<Self> {
        crate::geotiff::open(path)
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn width(&self) -> usize {
        self.profile.width
    }

    pub fn height(&self) -> usize {
        self.profile.height
    }

    pub fn count(&self) -> usize {
        self.profile.count
    }

    pub fn dtype(&self) -> SampleType {
        self.profile.dtype
    }

    pub fn crs(&self) -> Option<Crs> {
        self.profile.crs
    }

    pub fn transform(&self) -> GeoTransform {
        self.profile.transform
    }

    pub fn nodata(&self) -> Option<f64> {
        self.profile.nodata
    }

    /// 1-based band indexes, `[1, 2, ..., count]`.
    pub fn indexes(&self) -> Vec<usize> {
        (1..=self.count()).collect()
    }

    /// Samples of one band (1-based index), row-major.
    pub fn band(&self, index: usize) -> Option<&[f64]> {
        index
            .checked_sub(1)
            .and_then(|i| self.bands.get(i))
            .map(Vec::as_slice)
    }

    pub fn bands(&self) -> &[Vec<f64>] {
        &self.bands
    }

    pub fn into_parts(self) -> (Profile, Vec<Vec<f64>>) {
        (self.profile, self.bands)
    }

    /// Sample at `(col, row)` of a 0-based band.
    pub fn sample(&self, band: usize, col: usize, row: usize) -> f64 {
        self.bands[band][row * self.width() + col]
    }

    /// Bounding box of the grid in CRS units.
    ///
    /// For rotated grids this is the envelope of the four corners.
    pub fn bounds(&self) -> Bounds {
        let t = self.transform();
        let (w, h) = (self.width() as f64, self.height() as f64);
        let corners = [
            t.apply(0.0, 0.0),
            t.apply(w, 0.0),
            t.apply(0.0, h),
            t.apply(w, h),
        ];
        let (mut left, mut bottom) = (f64::INFINITY, f64::INFINITY);
        let (mut right, mut top) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (x, y) in corners {
            left = left.min(x);
            right = right.max(x);
            bottom = bottom.min(y);
            top = top.max(y);
        }
        Bounds {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Pixel size in CRS units: `(right − left) / width`, `(top − bottom) / height`.
    pub fn resolution(&self) -> Resolution {
        let b = self.bounds();
        Resolution {
            x: b.width() / self.width() as f64,
            y: b.height() / self.height() as f64,
        }
    }

    /// Map coordinates of the upper-left pixel `(0, 0)` and the lower-right
    /// pixel `(width − 1, height − 1)`, each at its top-left corner.
    pub fn corner_coordinates(&self) -> ((f64, f64), (f64, f64)) {
        let t = self.transform();
        let last_col = (self.width() - 1) as f64;
        let last_row = (self.height() - 1) as f64;
        (t.apply(0.0, 0.0), t.apply(last_col, last_row))
    }

    /// Number of samples in a band that are not the no-data sentinel.
    pub fn valid_count(&self, band: usize) -> usize {
        match self.nodata() {
            Some(nd) => self.bands[band].iter().filter(|&&v| !is_nodata(v, nd)).count(),
            None => self.bands[band].len(),
        }
    }
}

/// Sentinel comparison that also treats a NaN sentinel as matching NaN.
pub fn is_nodata(value: f64, nodata: f64) -> bool {
    if nodata.is_nan() {
        value.is_nan()
    } else {
        value == nodata
    }
}
