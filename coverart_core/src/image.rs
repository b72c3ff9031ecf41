//! Decoded artwork held by the memory tier

use crate::error::{InternalError, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Container format detected from the leading bytes of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Unknown,
}

impl ImageFormat {
    /// Detect the format from magic bytes
    pub fn sniff(data: &[u8]) -> Self {
        match data {
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Self::Png,
            [0xFF, 0xD8, 0xFF, ..] => Self::Jpeg,
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Self::Gif,
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Self::Webp,
            _ => Self::Unknown,
        }
    }

    /// Conventional file extension for cover files
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Unknown => "bin",
        }
    }
}

/// Artwork ready to hand to a renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    data: Bytes,
    format: ImageFormat,
}

impl DecodedImage {
    pub fn new(data: Bytes, format: ImageFormat) -> Self {
        Self { data, format }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Approximate footprint used for memory-cache accounting
    pub fn byte_size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Turns raw artwork bytes into a [`DecodedImage`]
///
/// Front ends with a real rasterizer plug it in here; the pipeline only
/// needs the result to be cheap to clone.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, key: &str, data: Bytes) -> Result<DecodedImage>;
}

/// Keeps the encoded bytes and records the sniffed format
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughDecoder;

impl ImageDecoder for PassthroughDecoder {
    fn decode(&self, key: &str, data: Bytes) -> Result<DecodedImage> {
        if data.is_empty() {
            return Err(InternalError::decode(key, "empty payload").into());
        }
        let format = ImageFormat::sniff(&data);
        Ok(DecodedImage::new(data, format))
    }
}
