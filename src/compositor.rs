//! Page compositor: one compressed image onto one fixed-size page.
//!
//! The image is scaled uniformly so its width matches the page width
//! (`scale = page_width / image_width`). Height is not fit separately, so a
//! tall image runs off the bottom and a wide one leaves blank space. The
//! image is drawn at the sink's default origin; nothing is centered.

use crate::config::PageMode;
use crate::error::{Error, Result};
use crate::raster::CompressedImage;

/// Handle for a page created by a [`PdfSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHandle(pub usize);

/// An image registered with a [`PdfSink`], ready to be scaled and drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceableImage {
    id: usize,
    width: u32,
    height: u32,
    scale: f32,
}

impl PlaceableImage {
    /// Create an unscaled image handle. `id` is sink-specific.
    pub fn new(id: usize, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            scale: 1.0,
        }
    }

    /// Sink-specific identifier.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Pixel width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Pixel height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Current uniform scale factor.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Multiply the scale factor.
    pub fn scale_by(&mut self, factor: f32) {
        self.scale *= factor;
    }

    /// Size on the page in points after scaling.
    pub fn display_size(&self) -> (f32, f32) {
        (self.width as f32 * self.scale, self.height as f32 * self.scale)
    }
}

/// Destination for composited pages.
///
/// [`PdfWriter`](crate::writer::PdfWriter) is the real implementation;
/// tests substitute a recording sink.
pub trait PdfSink {
    /// Start a new page of the given size in points.
    fn new_page(&mut self, width: f32, height: f32) -> Result<PageHandle>;

    /// Decode and register an image stream.
    fn new_image(&mut self, image: CompressedImage) -> Result<PlaceableImage>;

    /// Draw an image onto a page at the page's default origin.
    fn draw_on(&mut self, image: &PlaceableImage, page: PageHandle) -> Result<()>;

    /// Write out everything still buffered and finish the document.
    fn flush(&mut self) -> Result<()>;
}

/// Where and how large an image landed on its page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlacement {
    /// Page the image was drawn on
    pub page: PageHandle,
    /// Uniform scale applied to the image
    pub scale: f32,
    /// Width on the page in points
    pub display_width: f32,
    /// Height on the page in points
    pub display_height: f32,
}

/// Scale factor that makes an image exactly as wide as the page.
pub fn width_fit_scale(page_width: f32, image_width: u32) -> Result<f32> {
    if image_width == 0 {
        return Err(Error::Composition("image has zero width".to_string()));
    }
    Ok(page_width / image_width as f32)
}

/// Lays compressed images onto pages of a fixed [`PageMode`].
#[derive(Debug, Clone, Copy)]
pub struct PageCompositor {
    mode: PageMode,
}

impl PageCompositor {
    /// Create a compositor for the given orientation.
    pub fn new(mode: PageMode) -> Self {
        Self { mode }
    }

    /// Page orientation.
    pub fn mode(&self) -> PageMode {
        self.mode
    }

    /// Emit one page holding `image`, width-fit.
    pub fn composite<S: PdfSink + ?Sized>(
        &self,
        sink: &mut S,
        image: CompressedImage,
    ) -> Result<PagePlacement> {
        let (page_width, page_height) = self.mode.dimensions();
        let page = sink.new_page(page_width, page_height)?;
        let mut placed = sink.new_image(image)?;

        let scale = width_fit_scale(page_width, placed.width())?;
        placed.scale_by(scale);
        sink.draw_on(&placed, page)?;

        let (display_width, display_height) = placed.display_size();
        log::debug!(
            "Composited {}x{} image on page {} (scale {:.4}, {:.1}x{:.1}pt)",
            placed.width(),
            placed.height(),
            page.0,
            scale,
            display_width,
            display_height
        );

        Ok(PagePlacement {
            page,
            scale,
            display_width,
            display_height,
        })
    }
}
