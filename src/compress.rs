//! Recompress a GeoTIFF with a different codec.
//!
//! Pixels, grid, CRS and no-data are carried over untouched; only the
//! profile's `compress` field changes. Lossless codecs reproduce every sample
//! exactly. JPEG trades fidelity for size and only accepts 8-bit unsigned
//! samples, which is checked before any output file is created.

use crate::error::{RasterError, Result};
use crate::geotiff::{self, WriteOptions, codec};
use crate::profile::ProfileUpdate;
use crate::raster::Raster;
use crate::types::Codec;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Before/after file sizes of a recompression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompressionReport {
    pub codec: Codec,
    pub source_bytes: u64,
    pub output_bytes: u64,
}

impl CompressionReport {
    /// `output / source`; below 1.0 means the file shrank.
    pub fn ratio(&self) -> f64 {
        if self.source_bytes == 0 {
            return 1.0;
        }
        self.output_bytes as f64 / self.source_bytes as f64
    }
}

/// Read `src`, write it to `dst` with `codec`, and report both file sizes.
pub fn recompress(
    src: &Path,
    dst: &Path,
    codec: Codec,
    options: &WriteOptions,
) -> Result<CompressionReport> {
    let raster = Raster::open(src)?;
    codec::check_supported(codec, raster.dtype())?;
    let source_bytes = std::fs::metadata(src)
        .map_err(|e| RasterError::io("recompress", src, e))?
        .len();

    let recompressed = with_codec(raster, codec)?;
    let output_bytes = geotiff::write(dst, &recompressed, options)?;
    let report = CompressionReport {
        codec,
        source_bytes,
        output_bytes,
    };
    info!(
        src = %src.display(),
        dst = %dst.display(),
        %codec,
        source_bytes,
        output_bytes,
        "recompressed raster"
    );
    Ok(report)
}

/// The same raster, re-labelled to be written with `codec`.
pub fn with_codec(raster: Raster, codec: Codec) -> Result<Raster> {
    codec::check_supported(codec, raster.dtype())?;
    let (profile, bands) = raster.into_parts();
    let profile = profile.merged(ProfileUpdate {
        compress: Some(codec),
        ..Default::default()
    });
    Raster::new(profile, bands)
}
