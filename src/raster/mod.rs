//! Raster side of the pipeline: pixel buffers and compressed page images.
//!
//! ```text
//! PixelBuffer --encode_png--> CompressedImage --(PdfSink::new_image)--> page
//! ```

mod encoder;
mod pixels;

pub use encoder::{decode, encode_jpeg, encode_png};
pub use pixels::PixelBuffer;

use crate::error::{Error, Result};
use std::io::Cursor;

/// Encoding of a [`CompressedImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StreamFormat {
    /// PNG (lossless)
    Png,
    /// Baseline JPEG
    Jpeg,
}

/// One page's full content as an encoded image stream.
///
/// Produced once per source and consumed once by the page compositor;
/// handing it to a sink moves it.
#[derive(Debug, PartialEq)]
pub struct CompressedImage {
    format: StreamFormat,
    width: u32,
    height: u32,
    data: bytes::Bytes,
}

impl CompressedImage {
    pub(crate) fn new(format: StreamFormat, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            format,
            width,
            height,
            data: bytes::Bytes::from(data),
        }
    }

    /// Wrap an already-encoded PNG or JPEG stream, sniffing format and size.
    pub fn from_encoded(data: Vec<u8>) -> Result<Self> {
        let reader = image::io::Reader::new(Cursor::new(&data))
            .with_guessed_format()
            .map_err(|e| Error::Encoding(format!("cannot sniff image stream: {}", e)))?;
        let format = match reader.format() {
            Some(image::ImageFormat::Png) => StreamFormat::Png,
            Some(image::ImageFormat::Jpeg) => StreamFormat::Jpeg,
            other => {
                return Err(Error::Encoding(format!(
                    "unsupported page image format: {:?}",
                    other
                )))
            },
        };
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| Error::Encoding(format!("cannot read image header: {}", e)))?;
        Ok(Self::new(format, width, height, data))
    }

    /// Stream encoding.
    pub fn format(&self) -> StreamFormat {
        self.format
    }

    /// Pixel width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Pixel height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume into a single-pass reader over the encoded bytes.
    pub fn into_reader(self) -> Cursor<bytes::Bytes> {
        Cursor::new(self.data)
    }
}
