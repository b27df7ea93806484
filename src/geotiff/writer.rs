//! GeoTIFF encoding.
//!
//! Output is always band-separate (`PlanarConfiguration = 2`) strips,
//! compressed per strip with [`super::codec`], behind a single IFD built with
//! `tiff`'s low-level `DirectoryEncoder`. Every band is a plain grayscale
//! plane, so any band count and any codec (including JPEG) use one layout.
//!
//! Files are written atomically: the TIFF is assembled in memory, written to
//! a temporary file in the destination directory and renamed into place. A
//! failed write never leaves a partial file at the output path.

use super::WriteOptions;
use super::codec;
use super::geokeys::{self, TAG_GDAL_NODATA, TAG_GEO_KEY_DIRECTORY, TAG_MODEL_TRANSFORMATION};
use crate::error::{RasterError, Result};
use crate::raster::Raster;
use crate::types::SampleType;
use std::io::{Cursor, Write};
use std::path::Path;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

const OP: &str = "write raster";

/// Write `raster` to `path` using its profile's codec. Returns the number of
/// bytes written.
pub fn write(path: &Path, raster: &Raster, options: &WriteOptions) -> Result<u64> {
    codec::check_supported(raster.profile().compress, raster.dtype())?;
    let bytes = encode(raster, options).map_err(|reason| RasterError::encode(OP, path, reason))?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| RasterError::io(OP, parent, e))?;
    tmp.as_file_mut()
        .write_all(&bytes)
        .and_then(|_| tmp.as_file_mut().sync_all())
        .map_err(|e| RasterError::io(OP, path, e))?;
    tmp.persist(path)
        .map_err(|e| RasterError::io(OP, path, e.error))?;

    debug!(
        path = %path.display(),
        bytes = bytes.len(),
        compress = %raster.profile().compress,
        "wrote GeoTIFF"
    );
    Ok(bytes.len() as u64)
}

/// Assemble the complete TIFF file in memory.
pub fn encode(raster: &Raster, options: &WriteOptions) -> std::result::Result<Vec<u8>, String> {
    let profile = raster.profile();
    let (width, height, count) = (raster.width(), raster.height(), raster.count());
    let rows_per_strip = options.rows_per_strip.clamp(1, height);
    let strips_per_band = height.div_ceil(rows_per_strip);
    let tiff_err = |e: tiff::TiffError| e.to_string();
    let to_u32 = |v: usize, what: &str| {
        u32::try_from(v).map_err(|_| format!("{what} {v} exceeds classic TIFF limits"))
    };
    let count_u16 = u16::try_from(count).map_err(|_| format!("{count} bands is too many"))?;

    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buf).map_err(tiff_err)?;
        let mut dir = encoder.image_directory().map_err(tiff_err)?;

        let mut offsets = Vec::with_capacity(strips_per_band * count);
        let mut byte_counts = Vec::with_capacity(strips_per_band * count);
        for band in raster.bands() {
            for (strip, rows) in band.chunks(rows_per_strip * width).enumerate() {
                let raw = samples_to_bytes(profile.dtype, rows);
                let packed = codec::compress(
                    profile.compress,
                    &raw,
                    width,
                    rows.len() / width,
                    options.jpeg_quality,
                )
                .map_err(|e| format!("strip {strip}: {e}"))?;
                let offset = dir.write_data(packed.as_slice()).map_err(tiff_err)?;
                offsets.push(
                    u32::try_from(offset)
                        .map_err(|_| "output exceeds 4 GiB classic TIFF limit".to_string())?,
                );
                byte_counts.push(to_u32(packed.len(), "strip size")?);
            }
        }

        dir.write_tag(Tag::ImageWidth, to_u32(width, "width")?)
            .map_err(tiff_err)?;
        dir.write_tag(Tag::ImageLength, to_u32(height, "height")?)
            .map_err(tiff_err)?;
        let bits = vec![profile.dtype.bits(); count];
        dir.write_tag(Tag::BitsPerSample, bits.as_slice())
            .map_err(tiff_err)?;
        dir.write_tag(Tag::Compression, profile.compress.tiff_code())
            .map_err(tiff_err)?;
        // BlackIsZero: every plane is an independent grayscale band.
        dir.write_tag(Tag::PhotometricInterpretation, 1u16)
            .map_err(tiff_err)?;
        dir.write_tag(Tag::SamplesPerPixel, count_u16)
            .map_err(tiff_err)?;
        dir.write_tag(Tag::RowsPerStrip, to_u32(rows_per_strip, "rows per strip")?)
            .map_err(tiff_err)?;
        dir.write_tag(Tag::PlanarConfiguration, 2u16)
            .map_err(tiff_err)?;
        let formats = vec![profile.dtype.tiff_sample_format(); count];
        dir.write_tag(Tag::SampleFormat, formats.as_slice())
            .map_err(tiff_err)?;
        if count > 1 {
            let extra = vec![0u16; count - 1];
            dir.write_tag(Tag::ExtraSamples, extra.as_slice())
                .map_err(tiff_err)?;
        }
        dir.write_tag(Tag::StripOffsets, offsets.as_slice())
            .map_err(tiff_err)?;
        dir.write_tag(Tag::StripByteCounts, byte_counts.as_slice())
            .map_err(tiff_err)?;

        let transform = profile.transform;
        if let Some((scale, tiepoint)) = geokeys::scale_and_tiepoint(&transform) {
            dir.write_tag(Tag::ModelPixelScaleTag, &scale[..])
                .map_err(tiff_err)?;
            dir.write_tag(Tag::ModelTiepointTag, &tiepoint[..])
                .map_err(tiff_err)?;
        } else {
            let matrix = geokeys::model_transformation(&transform);
            dir.write_tag(Tag::Unknown(TAG_MODEL_TRANSFORMATION), &matrix[..])
                .map_err(tiff_err)?;
        }
        let keys = geokeys::build_key_directory(profile.crs);
        dir.write_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY), keys.as_slice())
            .map_err(tiff_err)?;
        if let Some(nodata) = profile.nodata {
            dir.write_tag(Tag::Unknown(TAG_GDAL_NODATA), format_nodata(nodata).as_str())
                .map_err(tiff_err)?;
        }

        dir.finish().map_err(tiff_err)?;
    }
    Ok(buf.into_inner())
}

/// GDAL's spelling of the sentinel: integers without a fraction, `nan`.
fn format_nodata(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Cast samples to `dtype` and lay them out little-endian.
fn samples_to_bytes(dtype: SampleType, samples: &[f64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * dtype.bytes());
    for &v in samples {
        let v = dtype.cast(v);
        match dtype {
            SampleType::U8 => out.push(v as u8),
            SampleType::I8 => out.extend((v as i8).to_le_bytes()),
            SampleType::U16 => out.extend((v as u16).to_le_bytes()),
            SampleType::I16 => out.extend((v as i16).to_le_bytes()),
            SampleType::U32 => out.extend((v as u32).to_le_bytes()),
            SampleType::I32 => out.extend((v as i32).to_le_bytes()),
            SampleType::F32 => out.extend((v as f32).to_le_bytes()),
            SampleType::F64 => out.extend(v.to_le_bytes()),
        }
    }
    out
}
