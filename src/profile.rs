//! Raster profile: everything needed to allocate and write a raster.
//!
//! A [`Profile`] is the typed form of a dataset's creation metadata. Derived
//! outputs never mutate a profile in place; they describe their changes as a
//! sparse [`ProfileUpdate`] and merge it over the source profile:
//!
//! ```text
//! clipped  = source.merged(ProfileUpdate { width, height, transform, .. })
//! warped   = source.merged(ProfileUpdate { crs, width, height, transform, .. })
//! squeezed = source.merged(ProfileUpdate { compress: Some(Codec::Jpeg), .. })
//! ```
//!
//! Fields left as `None` in the update keep the base value, so driver, dtype,
//! band count and no-data propagate unless an operation overrides them.

use crate::affine::GeoTransform;
use crate::crs::Crs;
use crate::types::{Codec, SampleType};
use serde::{Deserialize, Serialize};

/// Output file format. Only GeoTIFF is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Driver {
    #[default]
    GTiff,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub driver: Driver,
    pub dtype: SampleType,
    pub width: usize,
    pub height: usize,
    pub count: usize,
    pub crs: Option<Crs>,
    pub transform: GeoTransform,
    pub nodata: Option<f64>,
    pub compress: Codec,
}

/// Sparse override of a [`Profile`].
///
/// `nodata` is doubly optional: `Some(None)` clears the sentinel, `None`
/// leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub dtype: Option<SampleType>,
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub count: Option<usize>,
    pub crs: Option<Crs>,
    pub transform: Option<GeoTransform>,
    pub nodata: Option<Option<f64>>,
    pub compress: Option<Codec>,
}

impl ProfileUpdate {
    /// New grid geometry: the three fields that must change together.
    pub fn grid(transform: GeoTransform, width: usize, height: usize) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            transform: Some(transform),
            ..Self::default()
        }
    }
}

impl Profile {
    /// Return a new profile with the update's fields applied.
    pub fn merged(&self, update: ProfileUpdate) -> Profile {
        Profile {
            driver: self.driver,
            dtype: update.dtype.unwrap_or(self.dtype),
            width: update.width.unwrap_or(self.width),
            height: update.height.unwrap_or(self.height),
            count: update.count.unwrap_or(self.count),
            crs: update.crs.or(self.crs),
            transform: update.transform.unwrap_or(self.transform),
            nodata: update.nodata.unwrap_or(self.nodata),
            compress: update.compress.unwrap_or(self.compress),
        }
    }
}
