//! Job configuration.
//!
//! A [`JobConfig`] is built once (with the `with_*` setters) and handed to
//! [`PdfJob::new`](crate::job::PdfJob::new); the job never mutates it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A4 page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageMode {
    /// 595 x 842 points
    Portrait,
    /// 842 x 595 points
    #[default]
    Landscape,
}

impl PageMode {
    /// Nominal aspect ratio, `width / height`.
    pub fn aspect_ratio(&self) -> f32 {
        match self {
            PageMode::Portrait => 0.707,
            PageMode::Landscape => 1.41,
        }
    }

    /// Page dimensions in points (1 inch = 72 points).
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageMode::Portrait => (595.0, 842.0),
            PageMode::Landscape => (842.0, 595.0),
        }
    }

    /// Page width in points.
    pub fn width(&self) -> f32 {
        self.dimensions().0
    }

    /// Page height in points.
    pub fn height(&self) -> f32 {
        self.dimensions().1
    }
}

/// How the output file is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputPolicy {
    /// Stream pages straight into the final path. A failure part-way
    /// leaves a truncated file behind.
    #[default]
    Incremental,
    /// Write to `<name>.pdf.part`, rename on success, remove on failure.
    Atomic,
}

/// Metadata for the PDF Info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    /// Document title
    pub title: Option<String>,
    /// Document author
    pub author: Option<String>,
    /// Creator application
    pub creator: Option<String>,
}

/// Configuration for one [`PdfJob`](crate::job::PdfJob).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Page orientation
    pub orientation: PageMode,
    /// Render width in pixels for view-backed sources (0 = auto)
    pub render_width: u32,
    /// Render height in pixels for view-backed sources (0 = auto)
    pub render_height: u32,
    /// Output file name without extension (default: `pdf_<millis>`)
    pub file_name: Option<String>,
    /// Output directory (default: platform data directory)
    pub save_directory: Option<PathBuf>,
    /// Render view-backed sources inside `add_page` instead of on the worker
    pub render_on_caller_thread: bool,
    /// Progress indicator title
    pub progress_title: String,
    /// Progress indicator message
    pub progress_message: String,
    /// Info dictionary entries
    pub metadata: DocumentMetadata,
    /// How the output file is committed
    pub output_policy: OutputPolicy,
    /// Flate-compress page content streams
    pub compress: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            orientation: PageMode::Landscape,
            render_width: 0,
            render_height: 0,
            file_name: None,
            save_directory: None,
            render_on_caller_thread: false,
            progress_title: "Please wait".to_string(),
            progress_message: "Generating Pdf..".to_string(),
            metadata: DocumentMetadata {
                creator: Some("pagepress".to_string()),
                ..DocumentMetadata::default()
            },
            output_policy: OutputPolicy::Incremental,
            compress: true,
        }
    }
}

impl JobConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the page orientation.
    pub fn with_orientation(mut self, orientation: PageMode) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set render width and height in pixels (0 = auto).
    pub fn with_render_size(mut self, width: u32, height: u32) -> Self {
        self.render_width = width;
        self.render_height = height;
        self
    }

    /// Set the output file name. `.pdf` is always appended.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Set the output directory.
    pub fn with_save_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_directory = Some(dir.into());
        self
    }

    /// Render view-backed sources on the calling thread at `add_page` time.
    pub fn with_render_on_caller_thread(mut self, enabled: bool) -> Self {
        self.render_on_caller_thread = enabled;
        self
    }

    /// Set the progress indicator text.
    pub fn with_progress_text(mut self, title: impl Into<String>, message: impl Into<String>) -> Self {
        self.progress_title = title.into();
        self.progress_message = message.into();
        self
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = Some(title.into());
        self
    }

    /// Set the document author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.metadata.author = Some(author.into());
        self
    }

    /// Set the output commit policy.
    pub fn with_output_policy(mut self, policy: OutputPolicy) -> Self {
        self.output_policy = policy;
        self
    }

    /// Enable or disable content stream compression.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Check the configuration for values the pipeline cannot honor.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.file_name {
            if name.trim().is_empty() {
                return Err(Error::InvalidConfig("file name is empty".to_string()));
            }
            if name.contains(['/', '\\']) {
                return Err(Error::InvalidConfig(format!(
                    "file name '{}' must not contain path separators",
                    name
                )));
            }
        }
        Ok(())
    }
}
