//! Default names for derived rasters.
//!
//! Every stage writes a fixed file name so a pipeline run leaves a
//! predictable set of outputs:
//!
//! - clip → `clipped.tif`
//! - reproject → `clipped_<epsg>.tif` (e.g. `clipped_4326.tif`)
//! - recompress → `compressed.tif`
//!
//! Single-stage commands place the file next to their input; `pipeline`
//! places all three in its output directory.

use crate::crs::Crs;
use std::path::{Path, PathBuf};

/// Which stage produced an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derived {
    Clipped,
    Reprojected(Crs),
    Compressed,
}

impl Derived {
    pub fn file_name(self) -> String {
        match self {
            Self::Clipped => "clipped.tif".to_string(),
            Self::Reprojected(crs) => format!("clipped_{}.tif", crs.epsg()),
            Self::Compressed => "compressed.tif".to_string(),
        }
    }
}

/// Output path in `dir`.
pub fn in_dir(dir: &Path, derived: Derived) -> PathBuf {
    dir.join(derived.file_name())
}

/// Output path next to `input`. A bare file name resolves against the
/// current directory.
pub fn next_to(input: &Path, derived: Derived) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    in_dir(dir, derived)
}
