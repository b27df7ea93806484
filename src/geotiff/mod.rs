//! GeoTIFF input and output.
//!
//! The only raster container this crate reads or writes. Split by concern:
//!
//! - [`reader`]: file → [`Raster`](crate::raster::Raster)
//! - [`writer`]: [`Raster`](crate::raster::Raster) → file, atomically
//! - [`geokeys`]: transform and CRS tags shared by both
//! - [`codec`]: per-strip compression (LZW, Deflate, PackBits, JPEG)

pub mod codec;
pub mod geokeys;
pub mod reader;
pub mod writer;

pub use reader::open;
pub use writer::write;

use serde::{Deserialize, Serialize};

/// Encoder settings that are not part of the raster profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Rows per strip; the last strip of each band may be shorter.
    pub rows_per_strip: usize,
    /// JPEG quality 1–100. Ignored by the other codecs.
    pub jpeg_quality: u8,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            rows_per_strip: 256,
            jpeg_quality: 75,
        }
    }
}
