//! Reprojection of rasters between coordinate reference systems.
//!
//! Two steps, usable separately:
//!
//! 1. [`calculate_default_transform`] picks the destination grid: extent,
//!    dimensions and north-up transform in the target CRS.
//! 2. [`resample`] fills that grid. Every destination pixel centre is mapped
//!    back to the source by inverse projection:
//!
//! ```text
//! (col, row) ──dst transform──▶ (x, y) in dst CRS
//!            ──dst → src CRS──▶ (x', y') in src CRS
//!            ──inverse src transform──▶ (u, v) source pixel
//!            ──kernel──▶ sample
//! ```
//!
//! Source positions are computed once per destination pixel and shared by
//! all bands; each band is then sampled independently in band order.
//!
//! [`reproject`] chains both for the common case.

mod calculations;
mod kernels;

pub use calculations::calculate_default_transform;
pub use kernels::{BandView, Resampling};

use crate::affine::GeoTransform;
use crate::crs::{Crs, CrsTransformer};
use crate::error::{RasterError, Result};
use crate::profile::ProfileUpdate;
use crate::raster::Raster;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Points sampled along each edge of the source extent.
pub const DEFAULT_EDGE_SAMPLES: usize = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarpOptions {
    pub resampling: Resampling,
    pub edge_samples: usize,
}

impl Default for WarpOptions {
    fn default() -> Self {
        Self {
            resampling: Resampling::Nearest,
            edge_samples: DEFAULT_EDGE_SAMPLES,
        }
    }
}

/// Reproject `raster` into `dst_crs` on the default destination grid.
pub fn reproject(raster: &Raster, dst_crs: Crs, options: &WarpOptions) -> Result<Raster> {
    let src_crs = source_crs(raster)?;
    let (transform, width, height) = calculate_default_transform(
        src_crs,
        dst_crs,
        raster.width(),
        raster.height(),
        &raster.bounds(),
        options.edge_samples,
    )?;
    resample(raster, transform, width, height, dst_crs, options.resampling)
}

/// Warp `raster` onto the given destination grid.
///
/// Destination pixels that fall outside the source grid, or whose inverse
/// projection fails, take the no-data value (the source sentinel, or 0 when
/// it has none; the output profile records it either way).
pub fn resample(
    raster: &Raster,
    dst_transform: GeoTransform,
    width: usize,
    height: usize,
    dst_crs: Crs,
    resampling: Resampling,
) -> Result<Raster> {
    let src_crs = source_crs(raster)?;
    let src_inverse = raster.transform().inverse().ok_or_else(|| {
        RasterError::DegenerateTransform(format!(
            "source transform is not invertible:\n{}",
            raster.transform()
        ))
    })?;
    if width == 0 || height == 0 {
        return Err(RasterError::DegenerateTransform(format!(
            "destination grid is {width}x{height}"
        )));
    }
    let to_source = CrsTransformer::new(dst_crs, src_crs)?;

    let mut failed = 0usize;
    let positions: Vec<Option<(f64, f64)>> = (0..height)
        .flat_map(|row| (0..width).map(move |col| (col, row)))
        .map(|(col, row)| {
            let (x, y) = dst_transform.apply(col as f64 + 0.5, row as f64 + 0.5);
            match to_source.transform(x, y) {
                Ok((sx, sy)) => Some(src_inverse.apply(sx, sy)),
                Err(_) => {
                    failed += 1;
                    None
                }
            }
        })
        .collect();
    if failed > 0 {
        warn!(failed, "destination pixels could not be projected back to the source");
    }

    let fill = raster.nodata().unwrap_or(0.0);
    let dtype = raster.dtype();
    let bands = raster
        .bands()
        .iter()
        .map(|data| {
            let view = BandView {
                data,
                width: raster.width(),
                height: raster.height(),
                nodata: raster.nodata(),
            };
            positions
                .iter()
                .map(|pos| {
                    pos.and_then(|(u, v)| view.sample(resampling, u, v))
                        .map_or(fill, |value| dtype.cast(value))
                })
                .collect()
        })
        .collect();

    let update = ProfileUpdate {
        crs: Some(dst_crs),
        nodata: Some(Some(fill)),
        ..ProfileUpdate::grid(dst_transform, width, height)
    };
    debug!(
        from = %src_crs,
        to = %dst_crs,
        width,
        height,
        %resampling,
        "resampled raster"
    );
    Raster::new(raster.profile().merged(update), bands)
}

fn source_crs(raster: &Raster) -> Result<Crs> {
    raster
        .crs()
        .ok_or_else(|| RasterError::UnsupportedCrs("source raster has no CRS".into()))
}
