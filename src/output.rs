//! CLI output formatting for all pipeline stages.
//!
//! # Output Format
//!
//! ## Info
//!
//! ```text
//! visual.tif (1.2 MB)
//!     Bands: 3 [1, 2, 3]
//!     Type: uint8
//!     Size: 100 x 100 pixels
//!     Bounds: left 500000.000, bottom 3797000.000, right 503000.000, top 3800000.000
//!     Extent: 3000.000 x 3000.000 map units
//!     Resolution: 30.000 x 30.000 (square)
//!     CRS: EPSG:32611
//!     No-data: 0
//!     Compression: lzw
//!     Top left: (500000.000, 3800000.000)
//!     Bottom right: (502970.000, 3797030.000)
//!     Profile: {"driver":"GTiff",...}
//! ```
//!
//! ## Clip / Reproject
//!
//! ```text
//! Clipped → out/clipped.tif
//!     50 x 100 pixels, 3 bands, EPSG:32611
//! ```
//!
//! ## Recompress
//!
//! ```text
//! visual.tif → compressed.tif (jpeg)
//!     Before: 1.2 MB
//!     After: 310.4 kB (25.9% of original)
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::compress::CompressionReport;
use crate::raster::Raster;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn format_point((x, y): (f64, f64)) -> String {
    format!("({x:.3}, {y:.3})")
}

fn format_nodata(nodata: Option<f64>) -> String {
    match nodata {
        Some(v) if v.is_nan() => "nan".to_string(),
        Some(v) => v.to_string(),
        None => "none".to_string(),
    }
}

/// Human-readable file size in decimal units.
///
/// ```text
/// 1       → 1 Byte
/// 512     → 512 Bytes
/// 1_234   → 1.2 kB
/// 5_300_000 → 5.3 MB
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["kB", "MB", "GB", "TB", "PB", "EB"];
    if bytes == 1 {
        return "1 Byte".to_string();
    }
    if bytes < 1000 {
        return format!("{bytes} Bytes");
    }
    let value = bytes as f64;
    let mut unit = 1000.0;
    for suffix in UNITS {
        unit *= 1000.0;
        if value < unit {
            return format!("{:.1} {suffix}", 1000.0 * value / unit);
        }
    }
    format!("{:.1} EB", value / 1e18)
}

// ============================================================================
// Info
// ============================================================================

/// Format the description of an opened raster.
pub fn format_info(raster: &Raster, path: &Path, file_size: u64) -> Vec<String> {
    let i = indent(1);
    let bounds = raster.bounds();
    let res = raster.resolution();
    let (top_left, bottom_right) = raster.corner_coordinates();
    let indexes = raster
        .indexes()
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let crs = raster
        .crs()
        .map_or_else(|| "none".to_string(), |crs| crs.to_string());
    let square = if res.is_square() { "square" } else { "not square" };
    let profile = serde_json::to_string(raster.profile())
        .unwrap_or_else(|e| format!("<unserializable: {e}>"));

    vec![
        format!("{} ({})", display_name(path), format_size(file_size)),
        format!("{i}Bands: {} [{indexes}]", raster.count()),
        format!("{i}Type: {}", raster.dtype()),
        format!("{i}Size: {} x {} pixels", raster.width(), raster.height()),
        format!(
            "{i}Bounds: left {:.3}, bottom {:.3}, right {:.3}, top {:.3}",
            bounds.left, bounds.bottom, bounds.right, bounds.top
        ),
        format!(
            "{i}Extent: {:.3} x {:.3} map units",
            bounds.width(),
            bounds.height()
        ),
        format!("{i}Resolution: {:.3} x {:.3} ({square})", res.x, res.y),
        format!("{i}CRS: {crs}"),
        format!("{i}No-data: {}", format_nodata(raster.nodata())),
        format!("{i}Compression: {}", raster.profile().compress),
        format!("{i}Top left: {}", format_point(top_left)),
        format!("{i}Bottom right: {}", format_point(bottom_right)),
        format!("{i}Profile: {profile}"),
    ]
}

pub fn print_info(raster: &Raster, path: &Path, file_size: u64) {
    for line in format_info(raster, path, file_size) {
        println!("{}", line);
    }
}

// ============================================================================
// Clip / Reproject
// ============================================================================

/// Format a written raster: stage label, destination and new shape.
pub fn format_written(stage: &str, raster: &Raster, dst: &Path) -> Vec<String> {
    let crs = raster
        .crs()
        .map_or_else(|| "no CRS".to_string(), |crs| crs.to_string());
    let bands = match raster.count() {
        1 => "1 band".to_string(),
        n => format!("{n} bands"),
    };
    vec![
        format!("{stage} \u{2192} {}", dst.display()),
        format!(
            "{}{} x {} pixels, {bands}, {crs}",
            indent(1),
            raster.width(),
            raster.height()
        ),
    ]
}

pub fn print_written(stage: &str, raster: &Raster, dst: &Path) {
    for line in format_written(stage, raster, dst) {
        println!("{}", line);
    }
}

// ============================================================================
// Recompress
// ============================================================================

/// Format before/after sizes of a recompression.
pub fn format_compression_report(report: &CompressionReport, src: &Path, dst: &Path) -> Vec<String> {
    vec![
        format!(
            "{} \u{2192} {} ({})",
            display_name(src),
            display_name(dst),
            report.codec
        ),
        format!("{}Before: {}", indent(1), format_size(report.source_bytes)),
        format!(
            "{}After: {} ({:.1}% of original)",
            indent(1),
            format_size(report.output_bytes),
            report.ratio() * 100.0
        ),
    ]
}

pub fn print_compression_report(report: &CompressionReport, src: &Path, dst: &Path) {
    for line in format_compression_report(report, src, dst) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
