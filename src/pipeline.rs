//! File-to-file stages and the full clip → reproject → recompress chain.
//!
//! Each stage reads its input from disk, writes one derived GeoTIFF and
//! returns what it wrote, so the CLI can print a line per stage and the
//! chain can be tested end to end:
//!
//! ```text
//! scene.tif + aoi.geojson
//!     └─ clip        → clipped.tif
//!         └─ reproject   → clipped_<epsg>.tif
//!             └─ recompress  → compressed.tif
//! ```
//!
//! A failing stage stops the chain. Outputs already written by earlier
//! stages stay on disk; the failing stage itself leaves nothing behind.
//! The configured codec is checked against the source sample type before
//! the first stage runs, so that mismatch never leaves partial output.

use crate::boundary::{self, Boundary};
use crate::clip::clip_raster;
use crate::compress::{CompressionReport, recompress};
use crate::config::PipelineConfig;
use crate::crs::Crs;
use crate::error::{RasterError, Result};
use crate::geotiff::{self, codec};
use crate::naming::{self, Derived};
use crate::raster::Raster;
use crate::warp::reproject;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Paths and results of a full pipeline run.
#[derive(Debug)]
pub struct PipelineOutputs {
    pub clipped: PathBuf,
    pub reprojected: PathBuf,
    pub compressed: PathBuf,
    pub clipped_raster: Raster,
    pub reprojected_raster: Raster,
    pub report: CompressionReport,
}

/// Bring `boundary` into the raster's CRS when `reproject` is set and the
/// two differ. Otherwise it is returned unchanged and the clipper decides.
pub fn align_boundary(boundary: Boundary, raster: &Raster, reproject: bool) -> Result<Boundary> {
    match (reproject, raster.crs(), boundary.crs()) {
        (true, Some(target), Some(source)) if target != source => {
            debug!(from = %source, to = %target, "aligning boundary to raster CRS");
            boundary.to_crs(target)
        }
        _ => Ok(boundary),
    }
}

/// Clip the raster at `src` with the GeoJSON boundary at `boundary_path`
/// and write the result to `dst`.
pub fn clip_file(
    src: &Path,
    boundary_path: &Path,
    dst: &Path,
    config: &PipelineConfig,
) -> Result<Raster> {
    clip_opened(&Raster::open(src)?, boundary_path, dst, config)
}

fn clip_opened(
    raster: &Raster,
    boundary_path: &Path,
    dst: &Path,
    config: &PipelineConfig,
) -> Result<Raster> {
    let aoi = boundary::load(boundary_path)?;
    let aoi = align_boundary(aoi, raster, config.clip.reproject_boundary)?;
    let clipped = clip_raster(raster, &aoi, config.clip.crop)?;
    geotiff::write(dst, &clipped, &config.write_options())?;
    info!(dst = %dst.display(), width = clipped.width(), height = clipped.height(), "wrote clipped raster");
    Ok(clipped)
}

/// Reproject the raster at `src` into `dst_crs` and write it to `dst`.
pub fn reproject_file(src: &Path, dst: &Path, dst_crs: Crs, config: &PipelineConfig) -> Result<Raster> {
    let raster = Raster::open(src)?;
    let warped = reproject(&raster, dst_crs, &config.reproject.warp_options())?;
    geotiff::write(dst, &warped, &config.write_options())?;
    info!(dst = %dst.display(), crs = %dst_crs, "wrote reprojected raster");
    Ok(warped)
}

/// Run all three stages, writing their outputs into `out_dir` under the
/// default names.
pub fn run(
    src: &Path,
    boundary_path: &Path,
    out_dir: &Path,
    config: &PipelineConfig,
) -> Result<PipelineOutputs> {
    let raster = Raster::open(src)?;
    // Clipping and warping keep the sample type, so the last stage's codec
    // can be ruled out now.
    codec::check_supported(config.compress.codec, raster.dtype())?;

    std::fs::create_dir_all(out_dir).map_err(|e| RasterError::io("pipeline", out_dir, e))?;
    let dst_crs = config.reproject.target_crs;
    let clipped = naming::in_dir(out_dir, Derived::Clipped);
    let reprojected = naming::in_dir(out_dir, Derived::Reprojected(dst_crs));
    let compressed = naming::in_dir(out_dir, Derived::Compressed);

    let clipped_raster = clip_opened(&raster, boundary_path, &clipped, config)?;
    let reprojected_raster = reproject_file(&clipped, &reprojected, dst_crs, config)?;
    let report = recompress(
        &reprojected,
        &compressed,
        config.compress.codec,
        &config.write_options(),
    )?;

    Ok(PipelineOutputs {
        clipped,
        reprojected,
        compressed,
        clipped_raster,
        reprojected_raster,
        report,
    })
}
