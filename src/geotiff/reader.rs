//! GeoTIFF decoding.
//!
//! Tag parsing and pixel-interleaved images go through `tiff::decoder`.
//! Band-separate (`PlanarConfiguration = 2`) strips, which is what
//! [`super::writer`] produces, are decompressed here with [`super::codec`]
//! so every codec this crate writes can also be read back.

use super::codec;
use super::geokeys::{self, TAG_GDAL_NODATA, TAG_GEO_KEY_DIRECTORY, TAG_MODEL_TRANSFORMATION};
use crate::affine::GeoTransform;
use crate::crs::Crs;
use crate::error::{RasterError, Result};
use crate::profile::{Driver, Profile};
use crate::raster::Raster;
use crate::types::{Codec, SampleType};
use std::io::Cursor;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::{debug, warn};

const OP: &str = "load raster";

type TiffReader<'a> = Decoder<Cursor<&'a [u8]>>;

pub fn open(path: &Path) -> Result<Raster> {
    let bytes = std::fs::read(path).map_err(|e| RasterError::io(OP, path, e))?;
    decode(&bytes, path)
}

/// Decode a whole GeoTIFF held in memory. `path` is only used in errors.
pub fn decode(bytes: &[u8], path: &Path) -> Result<Raster> {
    let unreadable = |reason: String| RasterError::unreadable(OP, path, reason);

    let little_endian = match bytes.get(..2) {
        Some(b"II") => true,
        Some(b"MM") => false,
        _ => return Err(unreadable("not a TIFF file".into())),
    };

    let mut decoder = Decoder::new(Cursor::new(bytes))
        .map_err(|e| unreadable(e.to_string()))?
        .with_limits(Limits::unlimited());

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| unreadable(e.to_string()))?;
    let (width, height) = (width as usize, height as usize);
    let count = (decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap_or(1) as usize).max(1);

    let bits = first_or(&mut decoder, Tag::BitsPerSample, 1);
    let sample_format = first_or(&mut decoder, Tag::SampleFormat, 1);
    let dtype = SampleType::from_tiff(sample_format as u16, bits as u16).ok_or_else(|| {
        unreadable(format!(
            "unsupported sample layout: {bits}-bit, SampleFormat {sample_format}"
        ))
    })?;

    let compression = decoder.get_tag_u32(Tag::Compression).unwrap_or(1);
    let compress = u16::try_from(compression)
        .ok()
        .and_then(Codec::from_tiff)
        .ok_or_else(|| unreadable(format!("unsupported compression scheme {compression}")))?;

    let transform = read_transform(&mut decoder).unwrap_or_else(|| {
        warn!(path = %path.display(), "no georeferencing tags, using identity transform");
        GeoTransform::identity()
    });
    let (crs, pixel_is_point) = read_crs(&mut decoder, path);
    let transform = if pixel_is_point {
        geokeys::point_to_area(transform)
    } else {
        transform
    };
    let nodata = read_nodata(&mut decoder);

    let planar = decoder.get_tag_u32(Tag::PlanarConfiguration).unwrap_or(1);
    let tiled = decoder.get_tag_u32(Tag::TileWidth).is_ok();
    let bands = match (planar, tiled) {
        (2, false) => {
            let layout = StripLayout {
                width,
                height,
                count,
                dtype,
                compress,
                little_endian,
            };
            read_band_separate(&mut decoder, bytes, &layout)
        }
        (2, true) if count > 1 => Err("tiled band-separate layout is not supported".into()),
        _ => read_interleaved(&mut decoder, width, height, count),
    }
    .map_err(unreadable)?;

    let profile = Profile {
        driver: Driver::GTiff,
        dtype,
        width,
        height,
        count,
        crs,
        transform,
        nodata,
        compress,
    };
    debug!(
        path = %path.display(),
        width, height, count,
        dtype = %dtype,
        compress = %compress,
        crs = ?crs,
        "decoded GeoTIFF"
    );
    Raster::new(profile, bands)
}

/// First value of a per-sample tag, `default` when absent.
fn first_or(decoder: &mut TiffReader<'_>, tag: Tag, default: u32) -> u32 {
    decoder
        .get_tag_u32_vec(tag)
        .ok()
        .and_then(|v| v.first().copied())
        .unwrap_or(default)
}

fn read_transform(decoder: &mut TiffReader<'_>) -> Option<GeoTransform> {
    let matrix = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TRANSFORMATION))
        .ok();
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok();
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok();
    geokeys::transform_from_tags(matrix.as_deref(), scale.as_deref(), tiepoint.as_deref())
}

fn read_crs(decoder: &mut TiffReader<'_>, path: &Path) -> (Option<Crs>, bool) {
    let Ok(directory) = decoder.get_tag_u32_vec(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY))
    else {
        return (None, false);
    };
    let keys = geokeys::parse_key_directory(&directory);
    if keys.has_user_defined_crs() {
        warn!(path = %path.display(), "user-defined CRS is not supported, treating as unset");
    }
    let crs = keys.epsg().and_then(|code| match Crs::from_epsg(code) {
        Ok(crs) => Some(crs),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring CRS");
            None
        }
    });
    (crs, keys.pixel_is_point)
}

/// GDAL stores the no-data sentinel as ASCII text.
fn read_nodata(decoder: &mut TiffReader<'_>) -> Option<f64> {
    let text = decoder
        .get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GDAL_NODATA))
        .ok()?;
    text.trim_matches(char::from(0)).trim().parse().ok()
}

fn read_interleaved(
    decoder: &mut TiffReader<'_>,
    width: usize,
    height: usize,
    count: usize,
) -> std::result::Result<Vec<Vec<f64>>, String> {
    let samples = samples_to_f64(decoder.read_image().map_err(|e| e.to_string())?);
    let pixels = width * height;
    if samples.len() != pixels * count {
        return Err(format!(
            "decoded {} samples, expected {pixels} pixels x {count} bands",
            samples.len()
        ));
    }
    let mut bands = vec![Vec::with_capacity(pixels); count];
    for pixel in samples.chunks_exact(count) {
        for (band, &value) in bands.iter_mut().zip(pixel) {
            band.push(value);
        }
    }
    Ok(bands)
}

fn samples_to_f64(result: DecodingResult) -> Vec<f64> {
    match result {
        DecodingResult::U8(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U16(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I8(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I16(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F16(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::F32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::F64(data) => data,
    }
}

struct StripLayout {
    width: usize,
    height: usize,
    count: usize,
    dtype: SampleType,
    compress: Codec,
    little_endian: bool,
}

fn read_band_separate(
    decoder: &mut TiffReader<'_>,
    bytes: &[u8],
    layout: &StripLayout,
) -> std::result::Result<Vec<Vec<f64>>, String> {
    let offsets = decoder
        .get_tag_u64_vec(Tag::StripOffsets)
        .map_err(|e| format!("StripOffsets: {e}"))?;
    let counts = decoder
        .get_tag_u64_vec(Tag::StripByteCounts)
        .map_err(|e| format!("StripByteCounts: {e}"))?;
    let rows_per_strip = (decoder
        .get_tag_u32(Tag::RowsPerStrip)
        .unwrap_or(layout.height as u32) as usize)
        .clamp(1, layout.height);
    let predictor = decoder.get_tag_u32(Tag::Predictor).unwrap_or(1);
    match predictor {
        1 => {}
        2 if !layout.dtype.is_float() => {}
        other => return Err(format!("predictor {other} is not supported for {}", layout.dtype)),
    }

    let strips_per_band = layout.height.div_ceil(rows_per_strip);
    let expected_strips = strips_per_band * layout.count;
    if offsets.len() < expected_strips || counts.len() < expected_strips {
        return Err(format!(
            "expected {expected_strips} strips, found {} offsets and {} byte counts",
            offsets.len(),
            counts.len()
        ));
    }

    let sample_bytes = layout.dtype.bytes();
    let mut bands = Vec::with_capacity(layout.count);
    for band in 0..layout.count {
        let mut samples = Vec::with_capacity(layout.width * layout.height);
        for strip in 0..strips_per_band {
            let index = band * strips_per_band + strip;
            let rows = rows_per_strip.min(layout.height - strip * rows_per_strip);
            let raw = strip_bytes(bytes, offsets[index], counts[index])
                .ok_or_else(|| format!("strip {index} lies outside the file"))?;
            let expected = layout.width * rows * sample_bytes;
            let mut decoded = codec::decompress(layout.compress, raw, expected)
                .map_err(|e| format!("strip {index}: {e}"))?;
            if predictor == 2 {
                codec::undo_horizontal_predictor(
                    &mut decoded,
                    layout.width,
                    sample_bytes,
                    layout.little_endian,
                );
            }
            samples.extend(
                decoded
                    .chunks_exact(sample_bytes)
                    .map(|raw| sample_from_bytes(layout.dtype, raw, layout.little_endian)),
            );
        }
        bands.push(samples);
    }
    Ok(bands)
}

/// The `len` bytes at `offset`, `None` when any part lies past the end.
fn strip_bytes(bytes: &[u8], offset: u64, len: u64) -> Option<&[u8]> {
    let start = usize::try_from(offset).ok()?;
    let end = start.checked_add(usize::try_from(len).ok()?)?;
    bytes.get(start..end)
}

fn sample_from_bytes(dtype: SampleType, raw: &[u8], little_endian: bool) -> f64 {
    macro_rules! num {
        ($t:ty, $n:literal) => {{
            let mut buf = [0u8; $n];
            buf.copy_from_slice(raw);
            if little_endian {
                <$t>::from_le_bytes(buf) as f64
            } else {
                <$t>::from_be_bytes(buf) as f64
            }
        }};
    }
    match dtype {
        SampleType::U8 => num!(u8, 1),
        SampleType::I8 => num!(i8, 1),
        SampleType::U16 => num!(u16, 2),
        SampleType::I16 => num!(i16, 2),
        SampleType::U32 => num!(u32, 4),
        SampleType::I32 => num!(i32, 4),
        SampleType::F32 => num!(f32, 4),
        SampleType::F64 => num!(f64, 8),
    }
}
