//! Shared value types used across all pipeline stages.
//!
//! These types describe *what* a raster holds (sample datatype, on-disk
//! codec, spatial extent) and are serialized into the printed profile, so
//! their serde names double as the user-facing spelling in `sat-raster.toml`
//! and on the command line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric datatype of every sample in a raster.
///
/// All bands of a GeoTIFF share one datatype. In memory samples are held as
/// `f64`, which represents every variant here exactly; the datatype decides
/// how samples are cast back when written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl SampleType {
    pub fn bits(self) -> u16 {
        match self {
            Self::U8 | Self::I8 => 8,
            Self::U16 | Self::I16 => 16,
            Self::U32 | Self::I32 | Self::F32 => 32,
            Self::F64 => 64,
        }
    }

    pub fn bytes(self) -> usize {
        usize::from(self.bits() / 8)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// TIFF `SampleFormat` value: 1 = unsigned, 2 = signed, 3 = IEEE float.
    pub fn tiff_sample_format(self) -> u16 {
        match self {
            Self::U8 | Self::U16 | Self::U32 => 1,
            Self::I8 | Self::I16 | Self::I32 => 2,
            Self::F32 | Self::F64 => 3,
        }
    }

    /// Inverse of [`tiff_sample_format`](Self::tiff_sample_format) + [`bits`](Self::bits).
    pub fn from_tiff(sample_format: u16, bits: u16) -> Option<Self> {
        match (sample_format, bits) {
            (1, 8) => Some(Self::U8),
            (1, 16) => Some(Self::U16),
            (1, 32) => Some(Self::U32),
            (2, 8) => Some(Self::I8),
            (2, 16) => Some(Self::I16),
            (2, 32) => Some(Self::I32),
            (3, 32) => Some(Self::F32),
            (3, 64) => Some(Self::F64),
            _ => None,
        }
    }

    /// Cast an in-memory sample to this datatype's value range.
    ///
    /// Integers round to nearest and saturate at the type bounds; NaN becomes
    /// zero for integer types. The result is returned as `f64` so callers can
    /// compare against stored samples without another conversion.
    pub fn cast(self, value: f64) -> f64 {
        match self {
            Self::U8 => value.round() as u8 as f64,
            Self::I8 => value.round() as i8 as f64,
            Self::U16 => value.round() as u16 as f64,
            Self::I16 => value.round() as i16 as f64,
            Self::U32 => value.round() as u32 as f64,
            Self::I32 => value.round() as i32 as f64,
            Self::F32 => value as f32 as f64,
            Self::F64 => value,
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "uint8",
            Self::I8 => "int8",
            Self::U16 => "uint16",
            Self::I16 => "int16",
            Self::U32 => "uint32",
            Self::I32 => "int32",
            Self::F32 => "float32",
            Self::F64 => "float64",
        };
        f.write_str(name)
    }
}

/// On-disk compression codec of a GeoTIFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    #[default]
    None,
    Lzw,
    Deflate,
    PackBits,
    Jpeg,
}

impl Codec {
    /// TIFF `Compression` tag value.
    pub fn tiff_code(self) -> u16 {
        match self {
            Self::None => 1,
            Self::Lzw => 5,
            Self::Jpeg => 7,
            Self::Deflate => 8,
            Self::PackBits => 32773,
        }
    }

    pub fn from_tiff(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::None),
            5 => Some(Self::Lzw),
            7 => Some(Self::Jpeg),
            // 32946 is the pre-standard Deflate code still written by old tools.
            8 | 32946 => Some(Self::Deflate),
            32773 => Some(Self::PackBits),
            _ => None,
        }
    }

    /// Lossy codecs discard information; decoded samples differ from the input.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Lzw => "lzw",
            Self::Deflate => "deflate",
            Self::PackBits => "packbits",
            Self::Jpeg => "jpeg",
        };
        f.write_str(name)
    }
}

impl FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Self::None),
            "lzw" => Ok(Self::Lzw),
            "deflate" | "zip" => Ok(Self::Deflate),
            "packbits" => Ok(Self::PackBits),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            other => Err(format!("unknown codec '{other}'")),
        }
    }
}

/// Spatial extent in CRS units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }
}

/// Pixel size in CRS units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub x: f64,
    pub y: f64,
}

impl Resolution {
    pub fn is_square(&self) -> bool {
        self.x == self.y
    }
}
