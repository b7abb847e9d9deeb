//! Image handling for PDF generation.
//!
//! Turns a [`CompressedImage`] into the pieces of an Image XObject
//! (PDF spec Section 8.9).
//!
//! # Supported Formats
//!
//! - **PNG**: decoded, then re-compressed with Flate; alpha becomes an SMask
//! - **JPEG**: pass-through embedding using the DCTDecode filter

use std::io::{Cursor, Write};

use crate::object::{Dict, Object};
use crate::raster::{CompressedImage, StreamFormat};
use crate::writer::ObjectSerializer;

/// Color space for image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// Grayscale (1 component per pixel)
    DeviceGray,
    /// RGB color (3 components per pixel)
    DeviceRGB,
    /// CMYK color (4 components per pixel), JPEG only
    DeviceCMYK,
}

impl ColorSpace {
    /// Get the PDF name for this color space.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRGB => "DeviceRGB",
            ColorSpace::DeviceCMYK => "DeviceCMYK",
        }
    }
}

/// Stream filter applied to the XObject data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFilter {
    /// zlib/deflate
    Flate,
    /// JPEG baseline, embedded as-is
    Dct,
}

/// Image XObject data ready to be written.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Color space
    pub color_space: ColorSpace,
    /// Filter for `data`
    pub filter: ImageFilter,
    /// Encoded image samples
    pub data: Vec<u8>,
    /// Flate-compressed alpha channel, if the source had any transparency
    pub soft_mask: Option<Vec<u8>>,
    /// CMYK samples stored inverted (Adobe APP14 JPEGs)
    pub inverted: bool,
}

impl ImageData {
    /// Prepare a compressed page image for embedding.
    pub fn from_compressed(image: CompressedImage) -> Result<Self, ImageError> {
        match image.format() {
            StreamFormat::Png => Self::from_png(image.as_bytes()),
            StreamFormat::Jpeg => Self::from_jpeg(image.into_reader().into_inner().to_vec()),
        }
    }

    /// Decode PNG data into Flate-compressed samples plus an optional soft mask.
    pub fn from_png(data: &[u8]) -> Result<Self, ImageError> {
        let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)
            .map_err(|e| ImageError::DecodeError(e.to_string()))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let pixel_count = (width as usize) * (height as usize);
        let mut rgb = Vec::with_capacity(pixel_count * 3);
        let mut alpha = Vec::with_capacity(pixel_count);
        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        let soft_mask = if alpha.iter().all(|&a| a == 0xFF) {
            None
        } else {
            Some(compress(&alpha)?)
        };

        Ok(Self {
            width,
            height,
            color_space: ColorSpace::DeviceRGB,
            filter: ImageFilter::Flate,
            data: compress(&rgb)?,
            soft_mask,
            inverted: false,
        })
    }

    /// Wrap JPEG data for DCTDecode pass-through.
    ///
    /// The color space comes from the frame header, since the decoder reports
    /// CMYK frames as converted RGB while the DCT data stays CMYK.
    pub fn from_jpeg(data: Vec<u8>) -> Result<Self, ImageError> {
        use image::ImageDecoder;

        let (width, height) = image::codecs::jpeg::JpegDecoder::new(Cursor::new(data.as_slice()))
            .map_err(|e| ImageError::DecodeError(e.to_string()))?
            .dimensions();

        let header = JpegHeader::parse(&data)
            .ok_or_else(|| ImageError::DecodeError("JPEG frame header not found".to_string()))?;
        let color_space = match header.components {
            1 => ColorSpace::DeviceGray,
            3 => ColorSpace::DeviceRGB,
            4 => ColorSpace::DeviceCMYK,
            n => {
                return Err(ImageError::DecodeError(format!(
                    "unsupported JPEG component count {}",
                    n
                )))
            },
        };
        if color_space == ColorSpace::DeviceCMYK {
            log::debug!("Embedding CMYK JPEG (adobe marker: {})", header.adobe);
        }

        Ok(Self {
            width,
            height,
            color_space,
            filter: ImageFilter::Dct,
            data,
            soft_mask: None,
            inverted: color_space == ColorSpace::DeviceCMYK && header.adobe,
        })
    }

    /// Build the Image XObject dictionary. `smask` points at the soft mask object.
    pub fn build_xobject_dict(&self, smask: Option<Object>) -> Dict {
        let filter = match self.filter {
            ImageFilter::Flate => "FlateDecode",
            ImageFilter::Dct => "DCTDecode",
        };
        let mut dict = ObjectSerializer::dict_map(vec![
            ("Type", ObjectSerializer::name("XObject")),
            ("Subtype", ObjectSerializer::name("Image")),
            ("Width", ObjectSerializer::integer(self.width as i64)),
            ("Height", ObjectSerializer::integer(self.height as i64)),
            ("ColorSpace", ObjectSerializer::name(self.color_space.pdf_name())),
            ("BitsPerComponent", ObjectSerializer::integer(8)),
            ("Filter", ObjectSerializer::name(filter)),
        ]);
        if let Some(smask) = smask {
            dict.insert("SMask".to_string(), smask);
        }
        if self.inverted {
            let decode = [1, 0, 1, 0, 1, 0, 1, 0].iter().map(|&v| Object::Integer(v)).collect();
            dict.insert("Decode".to_string(), Object::Array(decode));
        }
        dict
    }

    /// Build the soft mask (alpha channel) XObject dictionary, if any.
    pub fn build_soft_mask_dict(&self) -> Option<Dict> {
        self.soft_mask.as_ref().map(|_| {
            ObjectSerializer::dict_map(vec![
                ("Type", ObjectSerializer::name("XObject")),
                ("Subtype", ObjectSerializer::name("Image")),
                ("Width", ObjectSerializer::integer(self.width as i64)),
                ("Height", ObjectSerializer::integer(self.height as i64)),
                ("ColorSpace", ObjectSerializer::name("DeviceGray")),
                ("BitsPerComponent", ObjectSerializer::integer(8)),
                ("Filter", ObjectSerializer::name("FlateDecode")),
            ])
        })
    }
}

/// Image embedding error.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Failed to decode image
    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    /// Failed to compress image data
    #[error("Compression error: {0}")]
    CompressionError(String),

    /// IO error while writing the image
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the embedder needs from a JPEG's markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegHeader {
    /// Components in the first SOF frame
    components: u8,
    /// An Adobe APP14 segment precedes the frame
    adobe: bool,
}

impl JpegHeader {
    /// Walk the marker segments up to the first SOF.
    fn parse(data: &[u8]) -> Option<Self> {
        if !data.starts_with(&[0xFF, 0xD8]) {
            return None;
        }
        let mut adobe = false;
        let mut pos = 2;
        loop {
            while *data.get(pos)? != 0xFF {
                pos += 1;
            }
            while *data.get(pos)? == 0xFF {
                pos += 1;
            }
            let marker = *data.get(pos)?;
            pos += 1;
            if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
                continue;
            }
            if marker == 0xD9 || marker == 0xDA {
                return None;
            }

            let len = u16::from_be_bytes([*data.get(pos)?, *data.get(pos + 1)?]) as usize;
            let segment = data.get(pos + 2..pos + len)?;
            match marker {
                // SOF0..SOF15, minus DHT, JPG and DAC
                0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                    return Some(Self {
                        components: *segment.get(5)?,
                        adobe,
                    });
                },
                0xEE => adobe |= segment.starts_with(b"Adobe"),
                _ => {},
            }
            pos += len;
        }
    }
}

/// Flate-compress image samples.
fn compress(data: &[u8]) -> Result<Vec<u8>, ImageError> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| ImageError::CompressionError(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| ImageError::CompressionError(e.to_string()))
}
