//! Pure grid calculations for reprojection.
//!
//! No pixel data is touched here; everything works on extents and
//! dimensions so it can be tested without rasters.

use crate::affine::GeoTransform;
use crate::crs::{Crs, CrsTransformer};
use crate::error::{RasterError, Result};
use crate::types::Bounds;
use tracing::debug;

/// Output grid for warping `width × height` pixels covering `bounds` in
/// `src_crs` into `dst_crs`.
///
/// Each edge of `bounds` is sampled at `edge_samples` evenly spaced points
/// (corners included) and projected; the destination extent is their bounding
/// box. The pixel size keeps the source pixel count along the diagonal:
///
/// ```text
/// res    = diag(dst extent) / sqrt(width² + height²)
/// width' = max(1, round(dx / res)),  height' = max(1, round(dy / res))
/// ```
///
/// and the final x/y resolutions are `dx / width'` and `dy / height'`, so the
/// grid covers the extent exactly. The result is north-up.
///
/// # Examples
/// ```
/// # use sat_raster::{Bounds, Crs, calculate_default_transform};
/// let utm = Crs::parse("EPSG:32611").unwrap();
/// let bounds = Bounds { left: 500_000.0, bottom: 3_797_000.0, right: 503_000.0, top: 3_800_000.0 };
/// let (transform, w, h) = calculate_default_transform(utm, utm, 100, 100, &bounds, 21).unwrap();
/// assert_eq!((w, h), (100, 100));
/// assert!((transform.a - 30.0).abs() < 1e-9);
/// ```
pub fn calculate_default_transform(
    src_crs: Crs,
    dst_crs: Crs,
    width: usize,
    height: usize,
    bounds: &Bounds,
    edge_samples: usize,
) -> Result<(GeoTransform, usize, usize)> {
    if width == 0 || height == 0 {
        return Err(RasterError::DegenerateTransform(format!(
            "source grid is {width}x{height}"
        )));
    }
    let (src_w, src_h) = (bounds.width(), bounds.height());
    if !(src_w.is_finite() && src_h.is_finite()) || src_w <= 0.0 || src_h <= 0.0 {
        return Err(RasterError::DegenerateTransform(format!(
            "source pixel size is zero: extent {src_w} x {src_h}"
        )));
    }

    let transformer = CrsTransformer::new(src_crs, dst_crs)?;
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    let mut failed = 0usize;
    for (x, y) in edge_points(bounds, edge_samples) {
        match transformer.transform(x, y) {
            Ok((px, py)) => {
                min_x = min_x.min(px);
                max_x = max_x.max(px);
                min_y = min_y.min(py);
                max_y = max_y.max(py);
            }
            Err(_) => failed += 1,
        }
    }
    if !min_x.is_finite() {
        return Err(RasterError::UnsupportedCrs(format!(
            "no point of the source extent projects from {src_crs} to {dst_crs}"
        )));
    }

    let (dx, dy) = (max_x - min_x, max_y - min_y);
    if dx <= 0.0 || dy <= 0.0 {
        return Err(RasterError::DegenerateTransform(format!(
            "projected extent collapses to {dx} x {dy}"
        )));
    }
    let src_diagonal = (width as f64).hypot(height as f64);
    let res = dx.hypot(dy) / src_diagonal;
    let dst_width = ((dx / res + 0.5).floor() as usize).max(1);
    let dst_height = ((dy / res + 0.5).floor() as usize).max(1);
    let transform = GeoTransform::from_origin(
        min_x,
        max_y,
        dx / dst_width as f64,
        dy / dst_height as f64,
    );
    debug!(
        from = %src_crs,
        to = %dst_crs,
        dst_width,
        dst_height,
        failed,
        "calculated default transform"
    );
    Ok((transform, dst_width, dst_height))
}

/// `samples` points along each of the four edges, corners included.
fn edge_points(bounds: &Bounds, samples: usize) -> Vec<(f64, f64)> {
    let n = samples.max(2);
    let step = |i: usize| i as f64 / (n - 1) as f64;
    let mut points = Vec::with_capacity(4 * n);
    for i in 0..n {
        let x = bounds.left + step(i) * bounds.width();
        let y = bounds.bottom + step(i) * bounds.height();
        points.push((x, bounds.top));
        points.push((x, bounds.bottom));
        points.push((bounds.left, y));
        points.push((bounds.right, y));
    }
    points
}
