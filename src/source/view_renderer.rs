//! View-backed renderer.
//!
//! Drives the measure → layout → draw protocol of an external [`View`]:
//! an optional init hook runs first, then the view is measured with exact
//! or unspecified constraints, laid out at its measured size, and drawn
//! into a transparent RGBA buffer.

use super::{RenderContext, Renderable, Tag};
use crate::error::{Error, Result};
use crate::raster::PixelBuffer;
use std::any::Any;

/// Size constraint passed to [`View::measure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureSpec {
    /// The view must be exactly this many pixels
    Exactly(u32),
    /// The view may be as big as it needs to be
    Unspecified,
}

impl MeasureSpec {
    /// 0 means "let the view decide".
    pub fn from_requested(pixels: u32) -> Self {
        if pixels == 0 {
            MeasureSpec::Unspecified
        } else {
            MeasureSpec::Exactly(pixels)
        }
    }
}

/// The UI toolkit's view, as far as rendering is concerned.
pub trait View: Send {
    /// Compute the desired size under the given constraints.
    fn measure(&mut self, width: MeasureSpec, height: MeasureSpec);

    /// Size computed by the last `measure`.
    fn measured_size(&self) -> (u32, u32);

    /// Position children for the final size.
    fn layout(&mut self, _width: u32, _height: u32) {}

    /// Draw into `canvas`, which is exactly the laid-out size.
    fn draw(&self, canvas: &mut PixelBuffer);
}

type InitHook<V> = Box<dyn FnMut(&mut V, &RenderContext) + Send>;

/// [`Renderable`] over a [`View`].
pub struct ViewRenderer<V: View> {
    view: V,
    context: Option<RenderContext>,
    init: Option<InitHook<V>>,
    reuse_buffer: bool,
    buffer: Option<PixelBuffer>,
    tag: Option<Tag>,
}

impl<V: View> ViewRenderer<V> {
    /// Wrap a view. A context must be attached before rendering.
    pub fn new(view: V) -> Self {
        Self {
            view,
            context: None,
            init: None,
            reuse_buffer: false,
            buffer: None,
            tag: None,
        }
    }

    /// Attach a context up front.
    pub fn with_context(mut self, ctx: RenderContext) -> Self {
        self.context = Some(ctx);
        self
    }

    /// Run `init` on the view before every measurement (fill in text, bind data...).
    pub fn with_init(mut self, init: impl FnMut(&mut V, &RenderContext) + Send + 'static) -> Self {
        self.init = Some(Box::new(init));
        self
    }

    /// Keep the last buffer and redraw into it when the size is unchanged.
    pub fn with_buffer_reuse(mut self, reuse: bool) -> Self {
        self.reuse_buffer = reuse;
        self
    }

    /// Attach application data.
    pub fn with_tag(mut self, tag: impl Any + Send) -> Self {
        self.tag = Some(Box::new(tag));
        self
    }

    /// The wrapped view.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// The wrapped view, mutably.
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Last rendered buffer, if not yet disposed.
    pub fn rendered(&self) -> Option<&PixelBuffer> {
        self.buffer.as_ref()
    }

    /// Take ownership of the last rendered buffer.
    pub fn take_rendered(&mut self) -> Option<PixelBuffer> {
        self.buffer.take()
    }

    fn canvas_for(&mut self, width: u32, height: u32) -> PixelBuffer {
        match self.buffer.take() {
            Some(mut buffer) if self.reuse_buffer && buffer.dimensions() == (width, height) => {
                buffer.erase([0, 0, 0, 0]);
                buffer
            },
            _ => PixelBuffer::new(width, height),
        }
    }
}

impl<V: View> Renderable for ViewRenderer<V> {
    fn attach_context(&mut self, ctx: &RenderContext) {
        self.context = Some(*ctx);
    }

    fn render(&mut self, width: u32, height: u32) -> Result<&PixelBuffer> {
        let ctx = self
            .context
            .ok_or_else(|| Error::Render("no render context attached".to_string()))?;

        if let Some(init) = self.init.as_mut() {
            init(&mut self.view, &ctx);
        }

        self.view
            .measure(MeasureSpec::from_requested(width), MeasureSpec::from_requested(height));
        let (measured_width, measured_height) = self.view.measured_size();
        if measured_width == 0 || measured_height == 0 {
            return Err(Error::Render(format!(
                "view measured to {}x{}",
                measured_width, measured_height
            )));
        }
        self.view.layout(measured_width, measured_height);

        let mut canvas = self.canvas_for(measured_width, measured_height);
        self.view.draw(&mut canvas);
        Ok(self.buffer.insert(canvas))
    }

    fn dispose_rendered(&mut self) {
        self.buffer = None;
    }

    fn tag(&self) -> Option<&(dyn Any + Send)> {
        self.tag.as_deref()
    }

    fn set_tag(&mut self, tag: Option<Tag>) {
        self.tag = tag;
    }
}

/// Render a view once with a throwaway renderer and hand back the pixels.
pub fn render_view_once<V: View>(
    ctx: &RenderContext,
    view: V,
    width: u32,
    height: u32,
) -> Result<PixelBuffer> {
    let mut renderer = ViewRenderer::new(view).with_context(*ctx);
    renderer.render(width, height)?;
    renderer
        .take_rendered()
        .ok_or_else(|| Error::Render("renderer produced no buffer".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fills itself with one color; 120x80 when unconstrained.
    struct SolidView {
        color: [u8; 4],
        size: (u32, u32),
        measured_with: Vec<(MeasureSpec, MeasureSpec)>,
    }

    impl SolidView {
        fn new(color: [u8; 4]) -> Self {
            Self {
                color,
                size: (0, 0),
                measured_with: Vec::new(),
            }
        }
    }

    impl View for SolidView {
        fn measure(&mut self, width: MeasureSpec, height: MeasureSpec) {
            self.measured_with.push((width, height));
            let w = match width {
                MeasureSpec::Exactly(w) => w,
                MeasureSpec::Unspecified => 120,
            };
            let h = match height {
                MeasureSpec::Exactly(h) => h,
                MeasureSpec::Unspecified => 80,
            };
            self.size = (w, h);
        }

        fn measured_size(&self) -> (u32, u32) {
            self.size
        }

        fn draw(&self, canvas: &mut PixelBuffer) {
            let (w, h) = canvas.dimensions();
            canvas.fill_rect(0, 0, w, h, self.color);
        }
    }

    #[test]
    fn test_render_requires_context() {
        let mut renderer = ViewRenderer::new(SolidView::new([0, 0, 0, 255]));
        let err = renderer.render(10, 10).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Render);
    }

    #[test]
    fn test_zero_means_unspecified() {
        let mut renderer =
            ViewRenderer::new(SolidView::new([0, 0, 0, 255])).with_context(RenderContext::default());
        let buf = renderer.render(0, 50).unwrap();
        assert_eq!(buf.dimensions(), (120, 50));
        assert_eq!(
            renderer.view().measured_with,
            vec![(MeasureSpec::Unspecified, MeasureSpec::Exactly(50))]
        );
    }

    #[test]
    fn test_init_hook_runs_before_measure() {
        let mut renderer = ViewRenderer::new(SolidView::new([0, 0, 0, 255]))
            .with_context(RenderContext::default())
            .with_init(|view, _ctx| view.color = [255, 0, 0, 255]);
        let buf = renderer.render(4, 4).unwrap();
        assert_eq!(buf.pixel(0, 0), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_dispose_releases_buffer() {
        let mut renderer =
            ViewRenderer::new(SolidView::new([1, 1, 1, 255])).with_context(RenderContext::default());
        renderer.render(2, 2).unwrap();
        assert!(renderer.rendered().is_some());
        renderer.dispose_rendered();
        assert!(renderer.rendered().is_none());
    }

    #[test]
    fn test_buffer_reuse_clears_previous_content() {
        let mut renderer = ViewRenderer::new(SolidView::new([9, 9, 9, 255]))
            .with_context(RenderContext::default())
            .with_buffer_reuse(true);
        renderer.render(3, 3).unwrap();
        renderer.view_mut().color = [0, 0, 0, 0];
        let buf = renderer.render(3, 3).unwrap();
        assert_eq!(buf.pixel(1, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_tag_round_trip() {
        let mut renderer = ViewRenderer::new(SolidView::new([0; 4])).with_tag(42u32);
        assert_eq!(renderer.tag().and_then(|t| t.downcast_ref::<u32>()), Some(&42));
        renderer.set_tag(None);
        assert!(renderer.tag().is_none());
    }

    #[test]
    fn test_render_view_once() {
        let buf = render_view_once(&RenderContext::default(), SolidView::new([5, 5, 5, 255]), 7, 0)
            .unwrap();
        assert_eq!(buf.dimensions(), (7, 80));
    }

    #[test]
    fn test_zero_measured_size_is_render_error() {
        struct EmptyView;
        impl View for EmptyView {
            fn measure(&mut self, _: MeasureSpec, _: MeasureSpec) {}
            fn measured_size(&self) -> (u32, u32) {
                (0, 0)
            }
            fn draw(&self, _: &mut PixelBuffer) {}
        }

        let err = render_view_once(&RenderContext::default(), EmptyView, 0, 0).unwrap_err();
        assert!(err.to_string().contains("0x0"));
    }
}
