//! Pipeline configuration.
//!
//! Handles loading, validating and merging `sat-raster.toml`. Stock defaults
//! are the base layer; a user file only needs the keys it wants to change,
//! and command-line flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [clip]
//! crop = true                  # Shrink output to the boundary's bounding box
//! reproject_boundary = false   # Move the boundary into the raster CRS first
//!
//! [reproject]
//! target_crs = "EPSG:4326"     # Any EPSG code, urn or OGC:CRS84 spelling
//! resampling = "nearest"       # nearest | bilinear | cubic
//! edge_samples = 21            # Points per edge when projecting the extent
//!
//! [compress]
//! codec = "jpeg"               # none | lzw | deflate | packbits | jpeg
//! quality = 75                 # JPEG quality (1-100)
//!
//! [output]
//! rows_per_strip = 256         # GeoTIFF strip height
//! ```
//!
//! ## Partial Configuration
//!
//! ```toml
//! # Only switch to bilinear resampling
//! [reproject]
//! resampling = "bilinear"
//! ```
//!
//! Unknown keys are rejected so typos surface as errors instead of being
//! silently ignored.

use crate::crs::Crs;
use crate::geotiff::WriteOptions;
use crate::types::Codec;
use crate::warp::{DEFAULT_EDGE_SAMPLES, Resampling, WarpOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "sat-raster.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub clip: ClipConfig,
    pub reproject: ReprojectConfig,
    pub compress: CompressConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClipConfig {
    /// Crop the output to the boundary's pixel bounding box. When false the
    /// output keeps the full raster grid with everything outside masked.
    pub crop: bool,
    /// Reproject boundary vertices into the raster CRS instead of failing
    /// with a CRS mismatch.
    pub reproject_boundary: bool,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            crop: true,
            reproject_boundary: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReprojectConfig {
    pub target_crs: Crs,
    pub resampling: Resampling,
    /// Points sampled along each edge of the source extent when computing
    /// the destination grid.
    pub edge_samples: usize,
}

impl Default for ReprojectConfig {
    fn default() -> Self {
        Self {
            target_crs: Crs::WGS84,
            resampling: Resampling::Nearest,
            edge_samples: DEFAULT_EDGE_SAMPLES,
        }
    }
}

impl ReprojectConfig {
    pub fn warp_options(&self) -> WarpOptions {
        WarpOptions {
            resampling: self.resampling,
            edge_samples: self.edge_samples,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressConfig {
    pub codec: Codec,
    /// JPEG quality (1 = worst, 100 = best). Ignored by lossless codecs.
    pub quality: u8,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            codec: Codec::Jpeg,
            quality: 75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub rows_per_strip: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            rows_per_strip: WriteOptions::default().rows_per_strip,
        }
    }
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.compress.quality) {
            return Err(ConfigError::Validation(
                "compress.quality must be 1-100".into(),
            ));
        }
        if self.reproject.edge_samples < 2 {
            return Err(ConfigError::Validation(
                "reproject.edge_samples must be at least 2".into(),
            ));
        }
        if self.output.rows_per_strip == 0 {
            return Err(ConfigError::Validation(
                "output.rows_per_strip must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Encoder settings for every file the pipeline writes.
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            rows_per_strip: self.output.rows_per_strip,
            jpeg_quality: self.compress.quality,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PipelineConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<PipelineConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load configuration.
///
/// An explicit `path` must exist. Without one, `sat-raster.toml` in the
/// current directory is used when present and stock defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let overlay = match path {
        Some(path) => Some(load_raw_config(path)?),
        None => {
            let default = Path::new(CONFIG_FILE);
            if default.exists() {
                Some(load_raw_config(default)?)
            } else {
                None
            }
        }
    };
    resolve_config(overlay)
}

fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Returns a fully-commented stock `sat-raster.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# sat-raster Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Command-line flags override them.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Clipping to a GeoJSON boundary
# ---------------------------------------------------------------------------
[clip]
# Shrink the output to the bounding box of the boundary's pixels.
# When false the output keeps the full raster grid, masked outside.
crop = true

# The boundary must be in the raster's CRS. Set to true to reproject its
# vertices into the raster CRS instead of failing.
reproject_boundary = false

# ---------------------------------------------------------------------------
# Reprojection
# ---------------------------------------------------------------------------
[reproject]
# Target coordinate reference system.
# Accepts "EPSG:4326", "4326", "urn:ogc:def:crs:EPSG::4326" or "OGC:CRS84".
target_crs = "EPSG:4326"

# Resampling kernel: "nearest", "bilinear" or "cubic".
# Nearest never invents values and suits classified imagery.
resampling = "nearest"

# Points sampled along each edge of the source extent when computing the
# destination grid. More points follow curved edges more closely.
edge_samples = 21

# ---------------------------------------------------------------------------
# Recompression
# ---------------------------------------------------------------------------
[compress]
# Codec: "none", "lzw", "deflate", "packbits" or "jpeg".
# JPEG is lossy and only accepts 8-bit unsigned imagery.
codec = "jpeg"

# JPEG quality (1 = worst, 100 = best).
quality = 75

# ---------------------------------------------------------------------------
# GeoTIFF output
# ---------------------------------------------------------------------------
[output]
# Rows per strip. Each band is written as its own run of strips.
rows_per_strip = 256
"##
}
