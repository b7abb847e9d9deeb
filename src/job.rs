//! The document job: page accumulation, background assembly and result delivery.
//!
//! A [`PdfJob`] collects pages on the caller's thread, then [`start`](PdfJob::start)
//! moves them to a dedicated `pdf-assembly` thread running an
//! [`AssemblyPipeline`]. The worker reports back over a channel; the caller
//! drains it with [`poll`](PdfJob::poll), [`wait`](PdfJob::wait) or
//! [`wait_timeout`](PdfJob::wait_timeout), which is where the listener and
//! progress callbacks run. Exactly one of `on_complete` / `on_error` fires
//! per run, after which the job is idle and empty again.
//!
//! ```ignore
//! use pagepress::{JobConfig, PdfJob, PixelBuffer};
//!
//! let mut job = PdfJob::new(JobConfig::new().with_file_name("report"))?;
//! job.add_bitmap(&PixelBuffer::filled(800, 600, [255, 255, 255, 255]))?;
//! job.start(None);
//! if let Some(JobOutcome::Completed(path)) = job.wait() {
//!     println!("{}", path.display());
//! }
//! ```

use crate::config::JobConfig;
use crate::error::{Error, Result};
use crate::pipeline::{render_source, AssemblyPipeline};
use crate::raster::{encode_png, CompressedImage, PixelBuffer};
use crate::source::{PageSource, RenderContext, Renderable};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the background assembly thread.
pub const WORKER_THREAD_NAME: &str = "pdf-assembly";

/// Receives the result of a run.
pub trait JobListener {
    /// The document was written to `file`.
    fn on_complete(&mut self, file: &Path);

    /// The run failed.
    fn on_error(&mut self, error: &Error);
}

/// Modal "please wait" indicator shown while a run is in progress.
pub trait ProgressIndicator {
    /// Show with the configured title and message.
    fn show(&mut self, title: &str, message: &str);

    /// Hide.
    fn dismiss(&mut self);
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Accepting pages
    Idle,
    /// A run is in progress
    Working,
}

/// How a run ended.
#[derive(Debug)]
pub enum JobOutcome {
    /// Path of the finished document
    Completed(PathBuf),
    /// Terminal error
    Failed(Error),
}

impl JobOutcome {
    /// Path of the finished document, if the run succeeded.
    pub fn path(&self) -> Option<&Path> {
        match self {
            JobOutcome::Completed(path) => Some(path),
            JobOutcome::Failed(_) => None,
        }
    }

    /// Convert into a `Result`.
    pub fn into_result(self) -> Result<PathBuf> {
        match self {
            JobOutcome::Completed(path) => Ok(path),
            JobOutcome::Failed(e) => Err(e),
        }
    }
}

/// Builds one PDF at a time from queued pages.
pub struct PdfJob {
    config: JobConfig,
    context: RenderContext,
    sources: Vec<PageSource>,
    state: JobState,
    listener: Option<Box<dyn JobListener>>,
    progress: Option<Box<dyn ProgressIndicator>>,
    completion: Option<flume::Receiver<JobOutcome>>,
    file: Option<PathBuf>,
}

impl std::fmt::Debug for PdfJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfJob")
            .field("state", &self.state)
            .field("pages", &self.sources.len())
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

impl PdfJob {
    /// Create an idle job. Fails if the configuration is invalid.
    pub fn new(config: JobConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            context: RenderContext::default(),
            sources: Vec::new(),
            state: JobState::Idle,
            listener: None,
            progress: None,
            completion: None,
            file: None,
        })
    }

    /// Use `context` when rendering view-backed pages.
    pub fn with_render_context(mut self, context: RenderContext) -> Self {
        self.context = context;
        self
    }

    /// Register the result listener.
    pub fn with_listener(mut self, listener: impl JobListener + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Replace the result listener.
    pub fn set_listener(&mut self, listener: Option<Box<dyn JobListener>>) {
        self.listener = listener;
    }

    /// Configuration in use.
    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        self.state
    }

    /// True while a run is in progress.
    pub fn is_working(&self) -> bool {
        self.state == JobState::Working
    }

    /// Number of queued pages.
    pub fn page_count(&self) -> usize {
        self.sources.len()
    }

    /// Output of the last successful run. Cleared when a new run starts.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_working() {
            return Err(Error::JobInProgress);
        }
        Ok(())
    }

    /// Queue a view-backed page.
    ///
    /// With `render_on_caller_thread` the page is rendered and encoded here
    /// and any render error is returned immediately.
    pub fn add_page(&mut self, page: impl Renderable + 'static) -> Result<()> {
        self.add_renderer(Box::new(page))
    }

    /// Queue a boxed view-backed page.
    pub fn add_renderer(&mut self, mut page: Box<dyn Renderable>) -> Result<()> {
        self.ensure_idle()?;
        if self.config.render_on_caller_thread {
            let image = render_source(
                page.as_mut(),
                &self.context,
                self.config.render_width,
                self.config.render_height,
            )?;
            self.sources.push(PageSource::Ready(image));
        } else {
            self.sources.push(PageSource::Pending(page));
        }
        Ok(())
    }

    /// Queue a pre-rendered bitmap. It is encoded now; the caller keeps the buffer.
    pub fn add_bitmap(&mut self, bitmap: &PixelBuffer) -> Result<()> {
        self.ensure_idle()?;
        let image = encode_png(bitmap)?;
        self.sources.push(PageSource::Ready(image));
        Ok(())
    }

    /// Queue an already compressed image.
    pub fn add_encoded(&mut self, image: CompressedImage) -> Result<()> {
        self.ensure_idle()?;
        self.sources.push(PageSource::Ready(image));
        Ok(())
    }

    /// Drop every queued page.
    pub fn clear_pages(&mut self) {
        self.sources.clear();
    }

    /// Start assembling the queued pages in the background.
    ///
    /// Returns `false` and does nothing if a run is already in progress.
    pub fn start(&mut self, progress: Option<Box<dyn ProgressIndicator>>) -> bool {
        if self.is_working() {
            log::debug!("start() ignored: a run is already in progress");
            return false;
        }

        if let Some(mut indicator) = progress {
            indicator.show(&self.config.progress_title, &self.config.progress_message);
            self.progress = Some(indicator);
        }

        self.state = JobState::Working;
        self.file = None;

        let sources = std::mem::take(&mut self.sources);
        log::info!("Starting PDF job with {} page(s)", sources.len());
        let pipeline = AssemblyPipeline::new(self.config.clone(), self.context);
        let (tx, rx) = flume::bounded(1);
        let worker_tx = tx.clone();

        let spawned = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let outcome = match panic::catch_unwind(AssertUnwindSafe(|| pipeline.run(sources))) {
                    Ok(Ok(path)) => JobOutcome::Completed(path),
                    Ok(Err(e)) => JobOutcome::Failed(e),
                    Err(payload) => JobOutcome::Failed(Error::WorkerPanicked(panic_message(&*payload))),
                };
                let _ = worker_tx.send(outcome);
            });

        if let Err(e) = spawned {
            log::error!("Failed to spawn {} thread: {}", WORKER_THREAD_NAME, e);
            let _ = tx.send(JobOutcome::Failed(Error::Io(e)));
        }

        self.completion = Some(rx);
        true
    }

    /// Deliver the result if the run has finished. Never blocks.
    pub fn poll(&mut self) -> Option<JobOutcome> {
        let received = match self.completion.as_ref()?.try_recv() {
            Ok(outcome) => outcome,
            Err(flume::TryRecvError::Empty) => return None,
            Err(flume::TryRecvError::Disconnected) => worker_vanished(),
        };
        self.finish(received)
    }

    /// Block until the run finishes and deliver the result.
    ///
    /// Returns `None` if no run is in progress.
    pub fn wait(&mut self) -> Option<JobOutcome> {
        let received = self
            .completion
            .as_ref()?
            .recv()
            .unwrap_or_else(|_| worker_vanished());
        self.finish(received)
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<JobOutcome> {
        let received = match self.completion.as_ref()?.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(flume::RecvTimeoutError::Timeout) => return None,
            Err(flume::RecvTimeoutError::Disconnected) => worker_vanished(),
        };
        self.finish(received)
    }

    fn finish(&mut self, outcome: JobOutcome) -> Option<JobOutcome> {
        if let Some(mut indicator) = self.progress.take() {
            indicator.dismiss();
        }

        match &outcome {
            JobOutcome::Completed(path) => {
                self.file = Some(path.clone());
                if let Some(listener) = self.listener.as_mut() {
                    listener.on_complete(path);
                }
            },
            JobOutcome::Failed(e) => {
                if let Some(listener) = self.listener.as_mut() {
                    listener.on_error(e);
                }
            },
        }

        self.sources.clear();
        self.completion = None;
        self.state = JobState::Idle;
        Some(outcome)
    }

    /// Release the listener and progress indicator and drop queued pages.
    ///
    /// Safe to call at any time, more than once. A run in progress keeps
    /// going but its result is delivered to nobody.
    pub fn dispose(&mut self) {
        if let Some(mut indicator) = self.progress.take() {
            indicator.dismiss();
        }
        self.listener = None;
        self.sources.clear();
    }
}

impl Drop for PdfJob {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn worker_vanished() -> JobOutcome {
    JobOutcome::Failed(Error::WorkerPanicked(
        "worker exited without reporting a result".to_string(),
    ))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MeasureSpec, View, ViewRenderer};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Events(Vec<String>);

    struct Recorder(Rc<RefCell<Events>>);

    impl JobListener for Recorder {
        fn on_complete(&mut self, file: &Path) {
            self.0.borrow_mut().0.push(format!("complete:{}", file.display()));
        }

        fn on_error(&mut self, error: &Error) {
            self.0.borrow_mut().0.push(format!("error:{:?}", error.kind()));
        }
    }

    struct Dialog(Rc<RefCell<Events>>);

    impl ProgressIndicator for Dialog {
        fn show(&mut self, title: &str, message: &str) {
            self.0.borrow_mut().0.push(format!("show:{}:{}", title, message));
        }

        fn dismiss(&mut self) {
            self.0.borrow_mut().0.push("dismiss".to_string());
        }
    }

    struct Square(u32);

    impl View for Square {
        fn measure(&mut self, _: MeasureSpec, _: MeasureSpec) {}
        fn measured_size(&self) -> (u32, u32) {
            (self.0, self.0)
        }
        fn draw(&self, canvas: &mut PixelBuffer) {
            canvas.erase([0, 128, 0, 255]);
        }
    }

    fn job_in(dir: &Path) -> PdfJob {
        PdfJob::new(JobConfig::new().with_save_directory(dir).with_file_name("out")).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = PdfJob::new(JobConfig::new().with_file_name("a/b")).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_wait_without_run_is_none() {
        let mut job = PdfJob::new(JobConfig::new()).unwrap();
        assert!(job.wait().is_none());
        assert!(job.poll().is_none());
        assert_eq!(job.state(), JobState::Idle);
    }

    #[test]
    fn test_callbacks_run_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let events = Rc::new(RefCell::new(Events::default()));
        let mut job = job_in(dir.path()).with_listener(Recorder(events.clone()));
        job.add_bitmap(&PixelBuffer::filled(8, 4, [255, 0, 0, 255])).unwrap();

        assert!(job.start(Some(Box::new(Dialog(events.clone())))));
        assert!(job.is_working());
        let outcome = job.wait().unwrap();

        let expected = dir.path().join("out.pdf");
        assert_eq!(outcome.path(), Some(expected.as_path()));
        assert_eq!(
            events.borrow().0,
            vec![
                "show:Please wait:Generating Pdf..".to_string(),
                "dismiss".to_string(),
                format!("complete:{}", expected.display()),
            ]
        );
        assert_eq!(job.file(), Some(expected.as_path()));
        assert_eq!(job.page_count(), 0);
        assert!(!job.is_working());
    }

    #[test]
    fn test_add_while_working_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job_in(dir.path());
        job.add_bitmap(&PixelBuffer::filled(2, 2, [0, 0, 0, 255])).unwrap();
        job.start(None);

        let err = job.add_bitmap(&PixelBuffer::filled(2, 2, [0, 0, 0, 255])).unwrap_err();
        assert!(matches!(err, Error::JobInProgress));
        assert!(!job.start(None));

        job.wait().unwrap().into_result().unwrap();
        assert_eq!(job.page_count(), 0);
    }

    #[test]
    fn test_render_on_caller_thread_surfaces_render_errors() {
        let mut job = PdfJob::new(JobConfig::new().with_render_on_caller_thread(true)).unwrap();
        let err = job.add_page(ViewRenderer::new(Square(0))).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
        assert_eq!(job.page_count(), 0);

        job.add_page(ViewRenderer::new(Square(5))).unwrap();
        assert_eq!(job.page_count(), 1);
    }

    #[test]
    fn test_clear_pages() {
        let mut job = PdfJob::new(JobConfig::new()).unwrap();
        job.add_page(ViewRenderer::new(Square(3))).unwrap();
        job.add_bitmap(&PixelBuffer::filled(1, 1, [0, 0, 0, 255])).unwrap();
        assert_eq!(job.page_count(), 2);
        job.clear_pages();
        assert_eq!(job.page_count(), 0);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let events = Rc::new(RefCell::new(Events::default()));
        let mut job = PdfJob::new(JobConfig::new())
            .unwrap()
            .with_listener(Recorder(events.clone()));
        job.add_bitmap(&PixelBuffer::filled(1, 1, [0, 0, 0, 255])).unwrap();
        job.dispose();
        job.dispose();
        assert_eq!(job.page_count(), 0);
        assert!(events.borrow().0.is_empty());
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&"bang".to_string()), "bang");
        assert_eq!(panic_message(&5u8), "unknown panic payload");
    }
}
