//! Document assembly: pending sources in, finished PDF file out.
//!
//! One run resolves the output path, opens the file, renders every pending
//! source to PNG, composites all pages in submission order and finishes the
//! document. With [`OutputPolicy::Incremental`] a failed run leaves whatever
//! was written so far on disk; [`OutputPolicy::Atomic`] writes to a `.part`
//! file that is renamed on success and removed on failure.

use crate::compositor::{PageCompositor, PagePlacement, PdfSink};
use crate::config::{JobConfig, OutputPolicy};
use crate::error::{Error, Result};
use crate::raster::{encode_png, CompressedImage};
use crate::source::{PageSource, RenderContext, Renderable};
use crate::writer::{PdfWriter, PdfWriterConfig};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Subdirectory of the platform data directory used when no save directory is configured.
pub const DEFAULT_SUBDIR: &str = "pagepress";

/// Output file name for `config`: the configured name, or `pdf_<unix millis>`,
/// always followed by `.pdf`.
pub fn resolve_file_name(config: &JobConfig) -> String {
    match config.file_name.as_deref() {
        Some(name) => format!("{}.pdf", name),
        None => format!("pdf_{}.pdf", chrono::Utc::now().timestamp_millis()),
    }
}

/// Platform data directory for generated documents, falling back to the temp dir.
pub fn default_output_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(DEFAULT_SUBDIR))
        .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_SUBDIR))
}

/// Directory the document goes into. The default directory is created on
/// demand; a configured one must already exist.
pub fn resolve_directory(config: &JobConfig) -> Result<PathBuf> {
    match &config.save_directory {
        Some(dir) => Ok(dir.clone()),
        None => {
            let dir = default_output_dir();
            fs::create_dir_all(&dir)?;
            Ok(dir)
        },
    }
}

/// Render one pending source to a PNG stream and release its pixels.
pub fn render_source(
    source: &mut dyn Renderable,
    ctx: &RenderContext,
    width: u32,
    height: u32,
) -> Result<CompressedImage> {
    source.attach_context(ctx);
    let encoded = {
        let pixels = source.render(width, height)?;
        encode_png(pixels)
    };
    source.dispose_rendered();
    encoded
}

/// Runs one assembly from an ordered source list.
#[derive(Debug, Clone)]
pub struct AssemblyPipeline {
    config: JobConfig,
    context: RenderContext,
}

impl AssemblyPipeline {
    /// Create a pipeline for `config`.
    pub fn new(config: JobConfig, context: RenderContext) -> Self {
        Self { config, context }
    }

    /// Configuration in use.
    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Build the document and return the path of the finished file.
    pub fn run(&self, sources: Vec<PageSource>) -> Result<PathBuf> {
        self.config.validate()?;

        let name = resolve_file_name(&self.config);
        let dir = resolve_directory(&self.config)?;
        let final_path = dir.join(&name);
        let write_path = match self.config.output_policy {
            OutputPolicy::Incremental => final_path.clone(),
            OutputPolicy::Atomic => dir.join(format!("{}.part", name)),
        };

        log::info!(
            "Assembling {} page(s) into {}",
            sources.len(),
            final_path.display()
        );

        let file = File::create(&write_path).map_err(|e| {
            log::error!("Could not open {}: {}", write_path.display(), e);
            Error::Io(e)
        })?;
        let mut part = match self.config.output_policy {
            OutputPolicy::Atomic => Some(PartFile::new(&write_path)),
            OutputPolicy::Incremental => None,
        };

        let written = self.write_document(file, sources).and_then(|pages| {
            if write_path != final_path {
                fs::rename(&write_path, &final_path)?;
            }
            Ok(pages)
        });

        match written {
            Ok(pages) => {
                if let Some(part) = part.as_mut() {
                    part.commit();
                }
                log::info!("Wrote {} page(s) to {}", pages, final_path.display());
                Ok(final_path)
            },
            Err(e) => {
                if part.is_none() {
                    log::warn!("Partial output left at {}", write_path.display());
                }
                log::error!("Assembly failed: {}", e);
                Err(e)
            },
        }
    }

    fn write_document(&self, file: File, sources: Vec<PageSource>) -> Result<usize> {
        let writer_config = PdfWriterConfig::from_metadata(&self.config.metadata, self.config.compress);
        let mut writer = PdfWriter::new(BufWriter::new(file), writer_config)?;

        let placements = self.assemble(&mut writer, sources)?;

        let file = writer
            .into_inner()
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        file.sync_all()?;
        Ok(placements.len())
    }

    /// Render pending sources, then composite every page into `sink` in
    /// submission order and finish it.
    pub fn assemble<S: PdfSink + ?Sized>(
        &self,
        sink: &mut S,
        sources: Vec<PageSource>,
    ) -> Result<Vec<PagePlacement>> {
        let (width, height) = (self.config.render_width, self.config.render_height);
        if (width == 0 || height == 0) && sources.iter().any(PageSource::is_pending) {
            log::warn!(
                "Render size {}x{} leaves views to size themselves; output may be inconsistent",
                width,
                height
            );
        }

        let mut ready = Vec::with_capacity(sources.len());
        for (index, source) in sources.into_iter().enumerate() {
            match source {
                PageSource::Ready(image) => ready.push(image),
                PageSource::Pending(mut renderer) => {
                    log::debug!("Rendering page {}", index + 1);
                    ready.push(render_source(renderer.as_mut(), &self.context, width, height)?);
                },
            }
        }

        let compositor = PageCompositor::new(self.config.orientation);
        let mut placements = Vec::with_capacity(ready.len());
        for image in ready {
            placements.push(compositor.composite(sink, image)?);
        }

        sink.flush()?;
        Ok(placements)
    }
}

/// An opened `.part` file that is removed when dropped, unless committed.
///
/// Removal also runs while unwinding from a panic in a render or write step.
struct PartFile<'a> {
    path: &'a Path,
    committed: bool,
}

impl<'a> PartFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn commit(&mut self) {
        self.committed = true;
    }
}

impl Drop for PartFile<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match fs::remove_file(self.path) {
            Ok(()) => log::debug!("Removed partial output {}", self.path.display()),
            Err(e) => log::warn!("Could not remove partial output {}: {}", self.path.display(), e),
        }
    }
}
