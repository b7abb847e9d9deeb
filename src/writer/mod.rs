//! PDF writing: the concrete [`PdfSink`](crate::compositor::PdfSink).
//!
//! ## Architecture
//!
//! ```text
//! CompressedImage
//!     ↓
//! [ImageData] (PNG → Flate + SMask, JPEG → DCT pass-through)
//!     ↓
//! [ContentStreamBuilder] (q / cm / Do / Q per page)
//!     ↓
//! [PdfWriter] (streams objects, then page tree, xref and trailer)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! io::Write sink
//! ```
//!
//! ```ignore
//! use pagepress::compositor::PdfSink;
//! use pagepress::writer::{PdfWriter, PdfWriterConfig};
//!
//! let mut writer = PdfWriter::new(std::fs::File::create("out.pdf")?, PdfWriterConfig::default())?;
//! let page = writer.new_page(595.0, 842.0)?;
//! let image = writer.new_image(png)?;
//! writer.draw_on(&image, page)?;
//! writer.flush()?;
//! ```

mod content_stream;
mod image_handler;
mod object_serializer;
mod pdf_writer;

pub use content_stream::{ContentStreamBuilder, ContentStreamOp};
pub use image_handler::{ColorSpace, ImageData, ImageError, ImageFilter};
pub use object_serializer::ObjectSerializer;
pub use pdf_writer::{PdfWriter, PdfWriterConfig};
