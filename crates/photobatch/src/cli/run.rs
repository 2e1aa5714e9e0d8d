//! The `photobatch run` command: resize, re-encode and rename a folder.

use clap::{Args, ValueEnum};
use photobatch_core::{
    BatchEvent, BatchRequest, BatchResult, BoundingBox, Config, Photobatch, ReportFormat,
    ReportWriter,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Folder containing the images to process
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output folder (defaults to `<INPUT>/output`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum output width in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: Option<u32>,

    /// Maximum output height in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: Option<u32>,

    /// JPEG quality (1-100)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Drop ICC profile and EXIF data from the output files
    #[arg(long, overrides_with = "keep_metadata")]
    pub strip_metadata: bool,

    /// Keep ICC profile and EXIF data even if the config strips them
    #[arg(long, overrides_with = "strip_metadata")]
    pub keep_metadata: bool,

    /// Only process images directly inside INPUT
    #[arg(long, overrides_with = "recursive")]
    pub no_recursive: bool,

    /// Descend into subfolders even if the config disables it
    #[arg(long, overrides_with = "no_recursive")]
    pub recursive: bool,

    /// Write a machine-readable report of the batch to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value = "json")]
    pub report_format: ReportFileFormat,
}

/// Supported report formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReportFileFormat {
    /// Single JSON document
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl From<ReportFileFormat> for ReportFormat {
    fn from(format: ReportFileFormat) -> Self {
        match format {
            ReportFileFormat::Json => ReportFormat::Json,
            ReportFileFormat::Jsonl => ReportFormat::JsonLines,
        }
    }
}

impl RunArgs {
    /// Merge command-line overrides over the configured defaults.
    fn to_request(&self, config: &Config) -> BatchRequest {
        let mut request = BatchRequest::from_config(config, &self.input);
        request.output_dir = self.output.clone();
        request.bounding_box = BoundingBox::new(
            self.width.unwrap_or(config.resize.max_width),
            self.height.unwrap_or(config.resize.max_height),
        );
        if let Some(quality) = self.quality {
            request.quality = quality;
        }
        if self.strip_metadata || self.keep_metadata {
            request.strip_metadata = self.strip_metadata;
        }
        if self.recursive || self.no_recursive {
            request.recursive = self.recursive;
        }
        request
    }
}

/// Execute the run command.
///
/// Only configuration problems produce an error; failed images are listed in
/// the summary and the report.
pub async fn execute(args: RunArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let request = args.to_request(&config);
    let photobatch = Photobatch::new(config);

    let batch = photobatch.prepare(request).await?;
    let settings = batch.settings().clone();
    tracing::info!(
        "Resizing into {} at quality {} ({})",
        settings.bounding_box(),
        settings.quality(),
        if settings.strip_metadata() {
            "stripping metadata"
        } else {
            "keeping metadata"
        }
    );

    if batch.is_empty() {
        eprintln!(
            "No supported images found in {}",
            settings.input_dir().display()
        );
        return Ok(());
    }

    let total = batch.len() as u64;
    let progress = create_progress_bar(total);
    let start_time = Instant::now();

    let mut handle = batch.spawn();
    let mut cancel_requested = false;
    loop {
        tokio::select! {
            event = handle.events.recv() => match event {
                Some(BatchEvent::Progress { processed, .. }) => {
                    progress.set_position(processed as u64);
                    let elapsed = start_time.elapsed().as_secs_f64();
                    if elapsed > 0.0 {
                        progress.set_message(format!("{:.1} img/sec", processed as f64 / elapsed));
                    }
                }
                Some(BatchEvent::ItemFailed(failure)) => {
                    tracing::debug!("Item failed: {:?}", failure.source_path);
                }
                Some(BatchEvent::Completed { output_dir, .. }) => {
                    tracing::debug!("Batch completed into {:?}", output_dir);
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !cancel_requested => {
                cancel_requested = true;
                handle.cancel.cancel();
                progress.set_message("cancelling after current image...");
            }
        }
    }
    let result = handle.join.await?;
    progress.finish_and_clear();

    if let Some(path) = &args.report {
        write_report(path, &result, args.report_format.into())?;
        tracing::info!("Report written to {:?}", path);
    }

    print_summary(&result, settings.output_dir(), start_time.elapsed());
    Ok(())
}

fn write_report(path: &Path, result: &BatchResult, format: ReportFormat) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = ReportWriter::new(BufWriter::new(file), format, true);
    writer.write_result(result)?;
    writer.flush()?;
    Ok(())
}

/// Create a progress bar for batch processing.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary after batch processing.
fn print_summary(result: &BatchResult, output_dir: &Path, elapsed: Duration) {
    let rate = if elapsed.as_secs_f64() > 0.0 {
        result.processed as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Discovered:   {:>8}", result.total);
    eprintln!("    Written:      {:>8}", result.succeeded);
    if result.failed() > 0 {
        eprintln!("    Failed:       {:>8}", result.failed());
    }
    if result.cancelled {
        eprintln!(
            "    Not started:  {:>8}  (cancelled)",
            result.total - result.processed
        );
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ====================================");
    eprintln!("    Output: {}", output_dir.display());

    if !result.failures.is_empty() {
        eprintln!();
        eprintln!("  Failed images:");
        for failure in &result.failures {
            eprintln!(
                "    {} [{}]: {}",
                failure.source_path.display(),
                failure.stage,
                failure.message
            );
        }
    }
    eprintln!();
}
