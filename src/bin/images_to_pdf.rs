//! Assemble image files into a PDF
//!
//! Each input image becomes one width-fit A4 page, in command-line order.
//!
//! Usage:
//!   cargo run --release --bin images_to_pdf -- page1.png page2.jpg
//!   cargo run --release --bin images_to_pdf -- --portrait --name scans --output-dir out/ *.png
//!   cargo run --release --bin images_to_pdf -- --config job.json page.png

use pagepress::{JobConfig, JobListener, PageMode, PdfJob, PixelBuffer, ProgressIndicator};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

struct CliArgs {
    config_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    name: Option<String>,
    portrait: bool,
    inputs: Vec<PathBuf>,
}

impl CliArgs {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut parsed = Self {
            config_path: None,
            output_dir: None,
            name: None,
            portrait: false,
            inputs: Vec::new(),
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--config" => {
                    i += 1;
                    if i < args.len() {
                        parsed.config_path = Some(PathBuf::from(&args[i]));
                    }
                },
                "--output-dir" => {
                    i += 1;
                    if i < args.len() {
                        parsed.output_dir = Some(PathBuf::from(&args[i]));
                    }
                },
                "--name" => {
                    i += 1;
                    if i < args.len() {
                        parsed.name = Some(args[i].clone());
                    }
                },
                "--portrait" => {
                    parsed.portrait = true;
                },
                other => parsed.inputs.push(PathBuf::from(other)),
            }
            i += 1;
        }

        parsed
    }

    fn job_config(&self) -> pagepress::Result<JobConfig> {
        let mut config = match &self.config_path {
            Some(path) => JobConfig::from_json_file(path)?,
            None => JobConfig::new(),
        };
        if let Some(dir) = &self.output_dir {
            config = config.with_save_directory(dir);
        }
        if let Some(name) = &self.name {
            config = config.with_file_name(name);
        }
        if self.portrait {
            config = config.with_orientation(PageMode::Portrait);
        }
        Ok(config)
    }
}

struct Report;

impl JobListener for Report {
    fn on_complete(&mut self, file: &Path) {
        println!("✓ {}", file.display());
    }

    fn on_error(&mut self, error: &pagepress::Error) {
        eprintln!("✗ {}", error);
    }
}

struct Spinner {
    started: Option<Instant>,
}

impl ProgressIndicator for Spinner {
    fn show(&mut self, title: &str, message: &str) {
        self.started = Some(Instant::now());
        eprintln!("{} - {}", title, message);
    }

    fn dismiss(&mut self) {
        if let Some(started) = self.started.take() {
            eprintln!("Done in {:.2}s", started.elapsed().as_secs_f64());
        }
    }
}

fn load_page(path: &Path) -> pagepress::Result<PixelBuffer> {
    let image = image::open(path)
        .map_err(|e| pagepress::Error::Encoding(format!("{}: {}", path.display(), e)))?;
    Ok(PixelBuffer::from(image.to_rgba8()))
}

fn run(args: &CliArgs) -> pagepress::Result<bool> {
    let mut job = PdfJob::new(args.job_config()?)?.with_listener(Report);

    for input in &args.inputs {
        let page = load_page(input)?;
        log::debug!("Loaded {} ({}x{})", input.display(), page.width(), page.height());
        job.add_bitmap(&page)?;
    }

    job.start(Some(Box::new(Spinner { started: None })));
    Ok(matches!(job.wait(), Some(outcome) if outcome.path().is_some()))
}

fn main() -> ExitCode {
    env_logger::init();

    let args = CliArgs::from_args();
    if args.inputs.is_empty() {
        eprintln!(
            "Usage: images_to_pdf [--config job.json] [--output-dir DIR] [--name NAME] [--portrait] IMAGE..."
        );
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}
