// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::should_implement_trait)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # pagepress
//!
//! Turn rendered views and bitmaps into multi-page A4 PDF documents.
//!
//! ## Core Features
//!
//! - **Page sources**: view-backed pages rendered through the [`Renderable`]
//!   capability, or pre-rendered bitmaps encoded to PNG up front
//! - **Width-fit layout**: each image is scaled to the page width on an A4
//!   portrait or landscape page, one image per page, in submission order
//! - **Background assembly**: a dedicated worker thread renders, encodes and
//!   writes the document; the result comes back to the caller exactly once
//! - **Streaming writer**: PDF objects go straight to the output file, PNG
//!   pixels as Flate streams (alpha as a soft mask), JPEG as DCT pass-through
//!
//! ## Architecture
//!
//! ```text
//! PdfJob (caller thread)
//!     │  add_page / add_bitmap / add_encoded
//!     ▼
//! Vec<PageSource> ──start()──► pdf-assembly thread
//!                                  │ AssemblyPipeline::run
//!                                  ├─ render pending sources → encode_png
//!                                  ├─ PageCompositor (width-fit) → PdfSink
//!                                  └─ PdfWriter → file
//!     ◄── flume channel ── JobOutcome
//! poll()/wait() → ProgressIndicator::dismiss, JobListener::on_complete|on_error
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use pagepress::{JobConfig, JobOutcome, PageMode, PdfJob, PixelBuffer};
//!
//! # fn main() -> pagepress::Result<()> {
//! let config = JobConfig::new()
//!     .with_orientation(PageMode::Portrait)
//!     .with_file_name("receipt");
//! let mut job = PdfJob::new(config)?;
//! job.add_bitmap(&PixelBuffer::filled(800, 1200, [255, 255, 255, 255]))?;
//! job.start(None);
//! if let Some(outcome) = job.wait() {
//!     let path = outcome.into_result()?;
//!     println!("wrote {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

// Error handling
pub mod error;

// Configuration
pub mod config;

// PDF object model
pub mod object;

// Pixels and compressed page images
pub mod raster;

// Page sources and view rendering
pub mod source;

// Page layout
pub mod compositor;

// PDF writing
pub mod writer;

// Assembly run
pub mod pipeline;

// Job controller
pub mod job;

pub use compositor::{PageCompositor, PagePlacement, PdfSink};
pub use config::{DocumentMetadata, JobConfig, OutputPolicy, PageMode};
pub use error::{Error, ErrorKind, Result};
pub use job::{JobListener, JobOutcome, JobState, PdfJob, ProgressIndicator};
pub use pipeline::AssemblyPipeline;
pub use raster::{CompressedImage, PixelBuffer, StreamFormat};
pub use source::{
    render_view_once, MeasureSpec, PageSource, RenderContext, Renderable, View, ViewRenderer,
};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with("0."));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "pagepress");
    }
}
