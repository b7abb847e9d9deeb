//! Renderable page sources.
//!
//! A page is either *pending* (something that still has to be rasterized,
//! behind the [`Renderable`] capability) or *ready* (an already compressed
//! image). The UI toolkit that actually measures and draws views lives
//! outside this crate; [`ViewRenderer`] adapts any [`View`] to [`Renderable`].

mod view_renderer;

pub use view_renderer::{render_view_once, MeasureSpec, View, ViewRenderer};

use crate::error::Result;
use crate::raster::{CompressedImage, PixelBuffer};
use std::any::Any;

/// Application-supplied data attached to a renderer.
pub type Tag = Box<dyn Any + Send>;

/// Environment a renderer draws in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    density: f32,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self { density: 1.0 }
    }
}

impl RenderContext {
    /// Create a context with the given display density (pixels per dip).
    pub fn new(density: f32) -> Self {
        Self {
            density: if density > 0.0 { density } else { 1.0 },
        }
    }

    /// Display density.
    pub fn density(&self) -> f32 {
        self.density
    }

    /// Convert density-independent pixels to pixels, rounding to nearest.
    pub fn dip_to_pixels(&self, dip: f32) -> u32 {
        (dip * self.density + 0.5).max(0.0) as u32
    }

    /// Convert pixels to density-independent pixels, truncating.
    pub fn pixels_to_dip(&self, pixels: u32) -> u32 {
        ((pixels as f32 - 0.5) / self.density).max(0.0) as u32
    }
}

/// Something that can draw itself into a pixel buffer.
///
/// A `width` or `height` of 0 asks the renderer to size itself. The buffer
/// returned by [`render`](Renderable::render) stays owned by the renderer
/// until [`dispose_rendered`](Renderable::dispose_rendered) is called.
pub trait Renderable: Send {
    /// Attach the context to render in.
    fn attach_context(&mut self, ctx: &RenderContext);

    /// Render and return the resulting buffer.
    fn render(&mut self, width: u32, height: u32) -> Result<&PixelBuffer>;

    /// Release the last rendered buffer.
    fn dispose_rendered(&mut self);

    /// Application data, if any.
    fn tag(&self) -> Option<&(dyn Any + Send)>;

    /// Replace the application data.
    fn set_tag(&mut self, tag: Option<Tag>);
}

/// One entry in a job's ordered page list.
pub enum PageSource {
    /// Needs rendering before it can be composited
    Pending(Box<dyn Renderable>),
    /// Already compressed
    Ready(CompressedImage),
}

impl PageSource {
    /// True if the source still has to be rendered.
    pub fn is_pending(&self) -> bool {
        matches!(self, PageSource::Pending(_))
    }
}

impl std::fmt::Debug for PageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageSource::Pending(_) => f.write_str("Pending(..)"),
            PageSource::Ready(image) => f
                .debug_tuple("Ready")
                .field(&image.format())
                .field(&image.dimensions())
                .finish(),
        }
    }
}
