//! Raster encoder: pixel buffers to compressed page images.
//!
//! The pipeline only uses the PNG path (lossless, best compression). The
//! JPEG path exists for callers that want smaller pages and can accept loss.

use super::{CompressedImage, PixelBuffer, StreamFormat};
use crate::error::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder};

/// Encode a pixel buffer as PNG.
///
/// Fails with [`Error::Encoding`] if the buffer has no pixels.
/// The input buffer is not modified.
pub fn encode_png(buffer: &PixelBuffer) -> Result<CompressedImage> {
    ensure_encodable(buffer)?;
    let (width, height) = buffer.dimensions();

    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive)
        .write_image(buffer.as_raw(), width, height, ColorType::Rgba8)
        .map_err(|e| Error::Encoding(format!("PNG encode failed: {}", e)))?;

    log::debug!("Encoded {}x{} buffer to {} PNG bytes", width, height, out.len());
    Ok(CompressedImage::new(StreamFormat::Png, width, height, out))
}

/// Encode a pixel buffer as baseline JPEG.
///
/// Alpha is dropped. `quality` must be in `1..=100`.
pub fn encode_jpeg(buffer: &PixelBuffer, quality: u8) -> Result<CompressedImage> {
    ensure_encodable(buffer)?;
    if !(1..=100).contains(&quality) {
        return Err(Error::Encoding(format!("JPEG quality {} outside 1..=100", quality)));
    }
    let (width, height) = buffer.dimensions();

    let rgb = image::DynamicImage::ImageRgba8(buffer.as_image().clone()).to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode(rgb.as_raw(), width, height, ColorType::Rgb8)
        .map_err(|e| Error::Encoding(format!("JPEG encode failed: {}", e)))?;

    Ok(CompressedImage::new(StreamFormat::Jpeg, width, height, out))
}

/// Decode a compressed page image back into RGBA pixels.
pub fn decode(image: &CompressedImage) -> Result<PixelBuffer> {
    let format = match image.format() {
        StreamFormat::Png => image::ImageFormat::Png,
        StreamFormat::Jpeg => image::ImageFormat::Jpeg,
    };
    let decoded = image::load_from_memory_with_format(image.as_bytes(), format)
        .map_err(|e| Error::Composition(format!("cannot decode {:?} stream: {}", image.format(), e)))?;
    Ok(PixelBuffer::from(decoded.to_rgba8()))
}

fn ensure_encodable(buffer: &PixelBuffer) -> Result<()> {
    if buffer.is_empty() {
        return Err(Error::Encoding(format!(
            "cannot encode empty {}x{} pixel buffer",
            buffer.width(),
            buffer.height()
        )));
    }
    Ok(())
}
