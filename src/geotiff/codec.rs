//! Strip codecs for band-separate GeoTIFFs.
//!
//! Each function works on one strip of one band: `width × rows` samples of a
//! single datatype. Errors are plain strings; the reader and writer wrap them
//! with the operation and path.
//!
//! | Codec    | Encode  | Decode   | Notes                                 |
//! |----------|---------|----------|---------------------------------------|
//! | LZW      | `tiff`  | `weezl`  | MSB bit order with the early change   |
//! | Deflate  | `tiff`  | `flate2` | zlib framing, TIFF codes 8 and 32946  |
//! | PackBits | `tiff`  | inline   | byte-oriented RLE                     |
//! | JPEG     | `image` | `image`  | one grayscale baseline JPEG per strip |
//!
//! Decoding stays here rather than in `tiff` because its chunk reader only
//! returns the first plane of a band-separate file.

use crate::error::{RasterError, Result};
use crate::types::{Codec, SampleType};
use flate2::read::ZlibDecoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use std::io::Read;
use tiff::encoder::compression::{CompressionAlgorithm, Deflate, Lzw, Packbits};

pub type CodecResult<T> = std::result::Result<T, String>;

/// Fail early when `codec` cannot store `dtype` samples.
///
/// Baseline JPEG only carries 8-bit unsigned samples.
pub fn check_supported(codec: Codec, dtype: SampleType) -> Result<()> {
    if codec.is_lossy() && dtype != SampleType::U8 {
        return Err(RasterError::UnsupportedSampleType { codec, dtype });
    }
    Ok(())
}

/// Compress one strip of raw little-endian sample bytes.
pub fn compress(
    codec: Codec,
    data: &[u8],
    width: usize,
    rows: usize,
    quality: u8,
) -> CodecResult<Vec<u8>> {
    match codec {
        Codec::None => Ok(data.to_vec()),
        Codec::Lzw => encode_with(Lzw, data).map_err(|e| format!("LZW encode failure: {e}")),
        Codec::Deflate => encode_with(Deflate::default(), data)
            .map_err(|e| format!("deflate encode failure: {e}")),
        Codec::PackBits => {
            encode_with(Packbits, data).map_err(|e| format!("PackBits encode failure: {e}"))
        }
        Codec::Jpeg => jpeg_encode(data, width, rows, quality),
    }
}

/// Decompress one strip. The result holds at least `expected` bytes or the
/// call fails; any excess is truncated.
pub fn decompress(
    codec: Codec,
    data: &[u8],
    expected: usize,
) -> CodecResult<Vec<u8>> {
    let mut bytes = match codec {
        Codec::None => data.to_vec(),
        Codec::Lzw => weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
            .decode(data)
            .map_err(|e| format!("LZW decode failure: {e}"))?,
        Codec::Deflate => {
            let mut decompressed = Vec::with_capacity(expected);
            ZlibDecoder::new(data)
                .read_to_end(&mut decompressed)
                .map_err(|e| format!("deflate decode failure: {e}"))?;
            decompressed
        }
        Codec::PackBits => packbits_decode(data, expected)?,
        Codec::Jpeg => image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map_err(|e| format!("JPEG decode error: {e}"))?
            .to_luma8()
            .into_raw(),
    };
    if bytes.len() < expected {
        return Err(format!(
            "strip decoded to {} bytes, expected {expected}",
            bytes.len()
        ));
    }
    bytes.truncate(expected);
    Ok(bytes)
}

fn jpeg_encode(data: &[u8], width: usize, rows: usize, quality: u8) -> CodecResult<Vec<u8>> {
    let (w, h) = match (u16::try_from(width), u16::try_from(rows)) {
        (Ok(w), Ok(h)) => (u32::from(w), u32::from(h)),
        _ => return Err(format!("{width}x{rows} strip exceeds JPEG dimension limits")),
    };
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .write_image(data, w, h, ExtendedColorType::L8)
        .map_err(|e| format!("JPEG encode error: {e}"))?;
    Ok(buf)
}

fn encode_with(mut algorithm: impl CompressionAlgorithm, data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(data.len() / 2);
    algorithm.write_to(&mut buf, data)?;
    Ok(buf)
}

fn packbits_decode(data: &[u8], expected: usize) -> CodecResult<Vec<u8>> {
    let mut out = Vec::with_capacity(expected);
    let mut i = 0;
    while i < data.len() && out.len() < expected {
        let header = data[i] as i8;
        i += 1;
        match header {
            0..=127 => {
                let len = header as usize + 1;
                let literal = data
                    .get(i..i + len)
                    .ok_or("PackBits literal runs past end of strip")?;
                out.extend_from_slice(literal);
                i += len;
            }
            -127..=-1 => {
                let byte = *data.get(i).ok_or("PackBits run missing its byte")?;
                out.extend(std::iter::repeat_n(byte, (1 - header as isize) as usize));
                i += 1;
            }
            -128 => {}
        }
    }
    Ok(out)
}

/// Undo TIFF predictor 2 (horizontal differencing) in place for one
/// single-sample-per-pixel strip of integer samples.
pub fn undo_horizontal_predictor(
    data: &mut [u8],
    width: usize,
    sample_bytes: usize,
    little_endian: bool,
) {
    let row_bytes = width * sample_bytes;
    if row_bytes == 0 {
        return;
    }
    let mask = if sample_bytes >= 8 {
        u64::MAX
    } else {
        (1u64 << (sample_bytes * 8)) - 1
    };
    for row in data.chunks_exact_mut(row_bytes) {
        let mut previous = read_uint(&row[..sample_bytes], little_endian);
        for sample in row.chunks_exact_mut(sample_bytes).skip(1) {
            let value = read_uint(sample, little_endian).wrapping_add(previous) & mask;
            write_uint(sample, value, little_endian);
            previous = value;
        }
    }
}

fn read_uint(bytes: &[u8], little_endian: bool) -> u64 {
    let fold = |acc: u64, &b: &u8| (acc << 8) | u64::from(b);
    if little_endian {
        bytes.iter().rev().fold(0, fold)
    } else {
        bytes.iter().fold(0, fold)
    }
}

fn write_uint(bytes: &mut [u8], value: u64, little_endian: bool) {
    let n = bytes.len();
    for (k, byte) in bytes.iter_mut().enumerate() {
        let shift = if little_endian { k } else { n - 1 - k } * 8;
        *byte = (value >> shift) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::noise;

    fn sample_strip() -> Vec<u8> {
        let mut data: Vec<u8> = noise(7, 300).into_iter().map(|v| v as u8).collect();
        data.extend(std::iter::repeat_n(42u8, 200));
        data
    }

    #[test]
    fn lossless_codecs_round_trip() {
        let data = sample_strip();
        for codec in [Codec::None, Codec::Lzw, Codec::Deflate, Codec::PackBits] {
            let packed = compress(codec, &data, 50, 10, 75).unwrap();
            let unpacked = decompress(codec, &packed, data.len()).unwrap();
            assert_eq!(unpacked, data, "{codec}");
        }
    }

    #[test]
    fn packbits_decodes_reference_stream() {
        // Worked example from the TIFF 6.0 PackBits section.
        let packed = [
            0xFE, 0xAA, 0x02, 0x80, 0x00, 0x2A, 0xFD, 0xAA, 0x03, 0x80, 0x00, 0x2A, 0x22, 0xF7,
            0xAA,
        ];
        let expected = [
            0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0xAA, 0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0x22,
            0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
        ];
        assert_eq!(packbits_decode(&packed, expected.len()).unwrap(), expected);
    }

    #[test]
    fn packbits_long_runs_round_trip() {
        let data = vec![9u8; 300];
        let packed = compress(Codec::PackBits, &data, 300, 1, 75).unwrap();
        assert!(packed.len() < 10, "{} bytes", packed.len());
        assert_eq!(decompress(Codec::PackBits, &packed, 300).unwrap(), data);
    }

    #[test]
    fn packbits_decodes_split_runs() {
        // 128 + 128 + 44 repeats of one byte.
        let packed = [0x81, 9, 0x81, 9, 0xD5, 9];
        assert_eq!(packbits_decode(&packed, 300).unwrap(), vec![9u8; 300]);
    }

    #[test]
    fn lzw_strip_starts_with_clear_code() {
        let packed = compress(Codec::Lzw, &sample_strip(), 50, 10, 75).unwrap();
        // 9-bit clear code 256, MSB first.
        assert_eq!(packed[0], 0x80);
    }

    #[test]
    fn deflate_strip_has_zlib_header() {
        let packed = compress(Codec::Deflate, &sample_strip(), 50, 10, 75).unwrap();
        assert_eq!(packed[0], 0x78);
    }

    #[test]
    fn packbits_truncated_literal_is_error() {
        assert!(packbits_decode(&[0x05, 1, 2], 6).is_err());
    }

    #[test]
    fn short_strip_is_error() {
        let packed = compress(Codec::Deflate, &[1, 2, 3], 3, 1, 75).unwrap();
        assert!(decompress(Codec::Deflate, &packed, 10).is_err());
    }

    #[test]
    fn jpeg_round_trip_is_close() {
        let data: Vec<u8> = (0..64 * 16).map(|i| (i % 64) as u8 * 2).collect();
        let packed = compress(Codec::Jpeg, &data, 64, 16, 95).unwrap();
        assert_eq!(&packed[..2], &[0xFF, 0xD8]);
        let unpacked = decompress(Codec::Jpeg, &packed, data.len()).unwrap();
        let max_err = data
            .iter()
            .zip(&unpacked)
            .map(|(&a, &b)| (i16::from(a) - i16::from(b)).abs())
            .max()
            .unwrap();
        assert!(max_err <= 12, "max error {max_err}");
    }

    #[test]
    fn jpeg_rejects_wide_samples() {
        assert!(check_supported(Codec::Jpeg, SampleType::U8).is_ok());
        assert!(matches!(
            check_supported(Codec::Jpeg, SampleType::U16),
            Err(RasterError::UnsupportedSampleType { .. })
        ));
        assert!(check_supported(Codec::Lzw, SampleType::F64).is_ok());
    }

    #[test]
    fn lossless_codecs_accept_every_sample_type() {
        for codec in [Codec::None, Codec::Lzw, Codec::Deflate, Codec::PackBits] {
            assert!(!codec.is_lossy());
            for dtype in [SampleType::U8, SampleType::I16, SampleType::U32, SampleType::F32] {
                assert!(check_supported(codec, dtype).is_ok(), "{codec} {dtype}");
            }
        }
    }

    #[test]
    fn predictor_undo_u8() {
        let mut row = vec![10u8, 1, 1, 255];
        undo_horizontal_predictor(&mut row, 4, 1, true);
        assert_eq!(row, vec![10, 11, 12, 11]);
    }

    #[test]
    fn predictor_undo_u16_both_byte_orders() {
        // Samples 1000, +5, -3 → 1000, 1005, 1002.
        let diffs: [u16; 3] = [1000, 5, 0u16.wrapping_sub(3)];
        let mut le: Vec<u8> = diffs.iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut be: Vec<u8> = diffs.iter().flat_map(|v| v.to_be_bytes()).collect();
        undo_horizontal_predictor(&mut le, 3, 2, true);
        undo_horizontal_predictor(&mut be, 3, 2, false);
        let expect = [1000u16, 1005, 1002];
        let le_out: Vec<u16> = le.chunks(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
        let be_out: Vec<u16> = be.chunks(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
        assert_eq!(le_out, expect);
        assert_eq!(be_out, expect);
    }
}
