//! Clip a raster to an area-of-interest boundary.
//!
//! The boundary is burned into a pixel mask on the source grid: a pixel is
//! inside when its centre falls inside the union of the polygons. Each polygon
//! is filled with the even-odd rule, so holes stay outside; polygons are
//! OR-ed together.
//!
//! ```text
//!  source grid            mask              crop = true
//!  ┌──────────┐        ┌──────────┐          ┌─────┐
//!  │ ........ │        │   ####   │          │ ### │
//!  │ ........ │   →    │  ######  │    →     │#####│
//!  │ ........ │        │   ###    │          │ ### │
//!  └──────────┘        └──────────┘          └─────┘
//! ```
//!
//! Pixels outside the mask take the no-data value. Cropping only moves the
//! grid origin; scale and shear are untouched and nothing is resampled.

use crate::affine::GeoTransform;
use crate::boundary::Boundary;
use crate::error::{RasterError, Result};
use crate::profile::ProfileUpdate;
use crate::raster::Raster;
use geo::{Coord, LineString, Polygon};
use tracing::debug;

/// Band data cut out of a raster, row-major per band.
#[derive(Debug, Clone, PartialEq)]
pub struct ClippedPixels {
    pub width: usize,
    pub height: usize,
    pub bands: Vec<Vec<f64>>,
}

/// Pixel rectangle `[col, col + width) × [row, row + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub col: usize,
    pub row: usize,
    pub width: usize,
    pub height: usize,
}

/// Mask `raster` with `boundary`, optionally cropping to the mask's extent.
///
/// Returns the masked pixels and the transform of their grid. The no-data
/// fill is the raster's sentinel, or 0 when it has none.
pub fn clip(
    raster: &Raster,
    boundary: &Boundary,
    crop: bool,
) -> Result<(ClippedPixels, GeoTransform)> {
    if boundary.is_empty() {
        return Err(RasterError::EmptyGeometry);
    }
    match (raster.crs(), boundary.crs()) {
        (Some(r), Some(b)) if r != b => {
            return Err(RasterError::CrsMismatch {
                raster: r.to_string(),
                boundary: b.to_string(),
            });
        }
        (None, Some(b)) => {
            return Err(RasterError::CrsMismatch {
                raster: "none".into(),
                boundary: b.to_string(),
            });
        }
        _ => {}
    }
    let inverse = raster.transform().inverse().ok_or_else(|| {
        RasterError::DegenerateTransform(format!(
            "raster transform is not invertible:\n{}",
            raster.transform()
        ))
    })?;

    let bounds = raster.bounds();
    if let Some(envelope) = boundary.bounding_rect() {
        let (lo, hi) = (envelope.min(), envelope.max());
        if hi.x <= bounds.left
            || lo.x >= bounds.right
            || hi.y <= bounds.bottom
            || lo.y >= bounds.top
        {
            debug!(?envelope, ?bounds, "boundary envelope misses the raster");
            return Err(RasterError::NoOverlap);
        }
    }

    let (width, height) = (raster.width(), raster.height());
    let mask = rasterize_mask(boundary.polygons(), &inverse, width, height);
    let window = mask_window(&mask, width, height).ok_or(RasterError::NoOverlap)?;
    let window = if crop {
        window
    } else {
        Window {
            col: 0,
            row: 0,
            width,
            height,
        }
    };

    let fill = raster.nodata().unwrap_or(0.0);
    let bands = raster
        .bands()
        .iter()
        .map(|band| {
            let mut out = Vec::with_capacity(window.width * window.height);
            for row in window.row..window.row + window.height {
                let start = row * width + window.col;
                let end = start + window.width;
                out.extend(
                    band[start..end]
                        .iter()
                        .zip(&mask[start..end])
                        .map(|(&v, &inside)| if inside { v } else { fill }),
                );
            }
            out
        })
        .collect();

    let transform = raster
        .transform()
        .shifted(window.col as f64, window.row as f64);
    debug!(
        inside = mask.iter().filter(|&&m| m).count(),
        ?window,
        crop,
        "clipped raster"
    );
    Ok((
        ClippedPixels {
            width: window.width,
            height: window.height,
            bands,
        },
        transform,
    ))
}

/// [`clip`], wrapped into a derived raster whose profile carries the new
/// grid and the no-data fill value.
pub fn clip_raster(raster: &Raster, boundary: &Boundary, crop: bool) -> Result<Raster> {
    let (pixels, transform) = clip(raster, boundary, crop)?;
    let mut update = ProfileUpdate::grid(transform, pixels.width, pixels.height);
    if raster.nodata().is_none() {
        update.nodata = Some(Some(0.0));
    }
    Raster::new(raster.profile().merged(update), pixels.bands)
}

/// Burn `polygons` (map coordinates) into a `width × height` mask, given the
/// map → pixel transform. Row-major, `true` = inside.
pub fn rasterize_mask(
    polygons: &[Polygon<f64>],
    inverse: &GeoTransform,
    width: usize,
    height: usize,
) -> Vec<bool> {
    let mut mask = vec![false; width * height];
    let mut crossings = Vec::new();
    for polygon in polygons {
        let edges = pixel_edges(polygon, inverse);
        let (y_min, y_max) = edges
            .iter()
            .flat_map(|(p, q)| [p.y, q.y])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
                (lo.min(y), hi.max(y))
            });
        if edges.is_empty() || y_min >= y_max {
            continue;
        }
        let first_row = (y_min - 0.5).ceil().max(0.0) as usize;
        let last_row = ((y_max - 0.5).floor().max(-1.0) + 1.0).min(height as f64) as usize;

        for row in first_row..last_row {
            let yc = row as f64 + 0.5;
            crossings.clear();
            for (p, q) in &edges {
                if (p.y <= yc) != (q.y <= yc) {
                    crossings.push(p.x + (yc - p.y) * (q.x - p.x) / (q.y - p.y));
                }
            }
            crossings.sort_by(f64::total_cmp);
            for span in crossings.chunks_exact(2) {
                let first_col = (span[0] - 0.5).ceil().max(0.0);
                let end_col = (span[1] - 0.5).ceil().min(width as f64);
                if first_col >= end_col {
                    continue;
                }
                let row_start = row * width;
                for cell in &mut mask[row_start + first_col as usize..row_start + end_col as usize]
                {
                    *cell = true;
                }
            }
        }
    }
    mask
}

/// Every ring edge of `polygon`, in pixel space.
fn pixel_edges(polygon: &Polygon<f64>, inverse: &GeoTransform) -> Vec<(Coord<f64>, Coord<f64>)> {
    let to_pixel = |c: Coord<f64>| {
        let (x, y) = inverse.apply(c.x, c.y);
        Coord { x, y }
    };
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .flat_map(LineString::lines)
        .map(|line| (to_pixel(line.start), to_pixel(line.end)))
        .collect()
}

/// Smallest window holding every `true` cell, `None` for an empty mask.
pub fn mask_window(mask: &[bool], width: usize, height: usize) -> Option<Window> {
    let (mut col_min, mut col_max) = (usize::MAX, 0);
    let (mut row_min, mut row_max) = (usize::MAX, 0);
    for row in 0..height {
        let cells = &mask[row * width..(row + 1) * width];
        let Some(first) = cells.iter().position(|&m| m) else {
            continue;
        };
        let last = cells.iter().rposition(|&m| m).unwrap_or(first);
        col_min = col_min.min(first);
        col_max = col_max.max(last);
        row_min = row_min.min(row);
        row_max = row_max.max(row);
    }
    (row_min != usize::MAX).then(|| Window {
        col: col_min,
        row: row_min,
        width: col_max - col_min + 1,
        height: row_max - row_min + 1,
    })
}
