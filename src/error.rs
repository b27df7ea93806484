//! Error taxonomy shared by every pipeline stage.
//!
//! Every error is terminal for the operation that raised it: there is no
//! retry policy. Variants that concern a file carry the operation name and
//! the path so a failure can be diagnosed from the message alone.

use crate::types::{Codec, SampleType};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("{operation}: file not found: {}", path.display())]
    MissingFile {
        operation: &'static str,
        path: PathBuf,
    },
    #[error("{operation}: cannot decode {}: {reason}", path.display())]
    UnreadableFormat {
        operation: &'static str,
        path: PathBuf,
        reason: String,
    },
    #[error("invalid geometry #{index}: {reason}")]
    InvalidGeometry { index: usize, reason: String },
    #[error("boundary CRS {boundary} does not match raster CRS {raster}")]
    CrsMismatch { raster: String, boundary: String },
    #[error("clip: boundary contains no geometries")]
    EmptyGeometry,
    #[error("clip: boundary does not overlap the raster")]
    NoOverlap,
    #[error("unsupported CRS: {0}")]
    UnsupportedCrs(String),
    #[error("degenerate transform: {0}")]
    DegenerateTransform(String),
    #[error("{codec} compression does not support {dtype} samples")]
    UnsupportedSampleType { codec: Codec, dtype: SampleType },
    #[error("invalid raster: {0}")]
    InvalidRaster(String),
    #[error("{operation}: failed to encode {}: {reason}", path.display())]
    Encode {
        operation: &'static str,
        path: PathBuf,
        reason: String,
    },
    #[error("{operation}: IO error on {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, RasterError>;

impl RasterError {
    /// Wrap an IO error, mapping `NotFound` to [`RasterError::MissingFile`].
    pub fn io(operation: &'static str, path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::MissingFile {
                operation,
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                operation,
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn unreadable(operation: &'static str, path: &Path, reason: impl Into<String>) -> Self {
        Self::UnreadableFormat {
            operation,
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn encode(operation: &'static str, path: &Path, reason: impl Into<String>) -> Self {
        Self::Encode {
            operation,
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}
