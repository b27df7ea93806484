//! # sat-raster
//!
//! Clip, reproject and recompress satellite GeoTIFF imagery. Everything is
//! pure Rust: no GDAL, no PROJ, no system libraries.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! A scene is reduced to an area of interest in three independent stages,
//! each reading one GeoTIFF and writing a derived one:
//!
//! ```text
//! 1. Clip        scene.tif + aoi.geojson  →  clipped.tif         (mask + crop)
//! 2. Reproject   clipped.tif              →  clipped_4326.tif    (warp to target CRS)
//! 3. Recompress  clipped_4326.tif         →  compressed.tif      (re-encode)
//! ```
//!
//! Each stage is also a pure function on in-memory values ([`clip::clip`],
//! [`warp::reproject`], [`compress::with_codec`]), so the pipeline logic is
//! tested without touching the filesystem. Derived rasters are new values;
//! a source [`Raster`] is never mutated.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`raster`] | Owned raster: profile + band arrays, bounds, resolution, corners |
//! | [`profile`] | Creation metadata and the sparse `ProfileUpdate` merge |
//! | [`affine`] | Pixel ↔ map affine transform |
//! | [`crs`] | EPSG-coded CRSs and point reprojection via `proj4rs` |
//! | [`geotiff`] | GeoTIFF reader, atomic writer, geokeys and strip codecs |
//! | [`boundary`] | GeoJSON area-of-interest loading and validation |
//! | [`clip`] | Polygon rasterization, masking and cropping |
//! | [`warp`] | Default destination grid and inverse-mapped resampling |
//! | [`compress`] | Codec change with before/after size report |
//! | [`pipeline`] | File-to-file stages and the full chain |
//! | [`config`] | `sat-raster.toml` loading, validation and merging |
//! | [`naming`] | Default output file names |
//! | [`output`] | CLI output formatting |
//! | [`types`] | Sample types, codecs, bounds |
//! | [`error`] | The `RasterError` taxonomy |
//!
//! # Design Decisions
//!
//! ## Samples as `f64`
//!
//! Bands are held as `f64` regardless of the on-disk sample type. Every
//! supported type (8–32 bit integers, 32/64 bit floats) fits exactly, so
//! kernels are written once. Values are cast back with saturation when
//! written.
//!
//! ## Band-Interleaved Output
//!
//! Files are written with one run of strips per band (`PlanarConfiguration
//! = 2`). JPEG strips are then plain grayscale JPEG streams, independent of
//! the band count and free of colour-space conversion.
//!
//! ## CRS Mismatch Is an Error
//!
//! A boundary in another CRS than its raster is rejected rather than silently
//! reprojected. Reprojection is opt-in (`--reproject-boundary`).

pub mod affine;
pub mod boundary;
pub mod clip;
pub mod compress;
pub mod config;
pub mod crs;
pub mod error;
pub mod geotiff;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod profile;
pub mod raster;
pub mod types;
pub mod warp;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use affine::GeoTransform;
pub use boundary::Boundary;
pub use clip::{clip, clip_raster};
pub use compress::{CompressionReport, recompress};
pub use crs::Crs;
pub use error::{RasterError, Result};
pub use profile::{Profile, ProfileUpdate};
pub use raster::Raster;
pub use types::{Bounds, Codec, SampleType};
pub use warp::{Resampling, WarpOptions, calculate_default_transform, reproject, resample};
