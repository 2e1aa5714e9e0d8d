//! Photobatch Core - batch resize, re-encode and rename for photo folders.
//!
//! Every supported image under an input folder is decoded, re-oriented,
//! fitted into a bounding box (never upscaled), re-encoded as JPEG and
//! written under a date-based name:
//!
//! ```text
//! Discover → Decode → Resolve date → Transform → Encode → Name → Write
//! ```
//!
//! Output files are called `{folder}_{YYYYMMDD}_{NNN}.jpg`, where the date
//! comes from embedded capture time, the file's modification time, or
//! today, in that order.
//!
//! # Usage
//!
//! ```rust,ignore
//! use photobatch_core::{BatchRequest, Config, Photobatch};
//!
//! #[tokio::main]
//! async fn main() -> photobatch_core::Result<()> {
//!     let config = Config::load()?;
//!     let request = BatchRequest::from_config(&config, "./Trip");
//!     let batch = Photobatch::new(config).prepare(request).await?;
//!
//!     let result = batch.run().await;
//!     println!("{} written, {} failed", result.succeeded, result.failed());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, PhotobatchError, PipelineError, PipelineResult, Result};
pub use output::{ReportFormat, ReportWriter};
pub use pipeline::{BatchHandle, BatchRunner, CancelFlag, DiscoveredFile, EventSink};
pub use types::{
    BatchEvent, BatchRequest, BatchResult, BatchSettings, BoundingBox, EmbeddedMetadata,
    ItemFailure, ItemStage,
};

use pipeline::FileDiscovery;
use std::path::PathBuf;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Photobatch processor - the main entry point for batch processing.
pub struct Photobatch {
    config: Config,
}

impl Photobatch {
    /// Create a new Photobatch instance with the given configuration.
    pub fn new(config: Config) -> Self {
        tracing::debug!("Initializing Photobatch v{}", VERSION);
        Self { config }
    }

    /// Create a new Photobatch instance from the config file, or defaults.
    pub fn with_defaults() -> Result<Self> {
        let config = Config::load()?;
        Ok(Self::new(config))
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validate `request`, create the output directory and discover inputs.
    ///
    /// Configuration problems fail here, before any file is touched. An
    /// input folder without images is not an error; check
    /// [`PreparedBatch::is_empty`].
    pub async fn prepare(&self, request: BatchRequest) -> Result<PreparedBatch> {
        let settings = BatchSettings::new(request, &self.config)?;
        tokio::fs::create_dir_all(settings.output_dir()).await?;

        // Compare against the resolved path so the walk can prune it
        let output_dir = settings
            .output_dir()
            .canonicalize()
            .unwrap_or_else(|_| settings.output_dir().to_path_buf());
        let discovery =
            FileDiscovery::new(self.config.processing.clone()).excluding(output_dir);
        let files = discovery.discover(settings.input_dir(), settings.recursive())?;

        if files.is_empty() {
            tracing::warn!("No supported images found in {:?}", settings.input_dir());
        } else {
            tracing::info!(
                "Found {} image(s) ({:.1} MB) in {:?}",
                files.len(),
                FileDiscovery::total_size(&files) as f64 / (1024.0 * 1024.0),
                settings.input_dir()
            );
        }

        Ok(PreparedBatch {
            runner: BatchRunner::new(settings, &self.config),
            files,
        })
    }
}

/// A validated batch with its discovered inputs, ready to run.
pub struct PreparedBatch {
    runner: BatchRunner,
    files: Vec<DiscoveredFile>,
}

impl PreparedBatch {
    /// No supported images were found.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn files(&self) -> &[DiscoveredFile] {
        &self.files
    }

    pub fn settings(&self) -> &BatchSettings {
        self.runner.settings()
    }

    /// Flag that stops the batch between items once set.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.runner.cancel_flag()
    }

    /// Run to completion without an observer.
    pub async fn run(self) -> BatchResult {
        self.run_with(EventSink::disconnected()).await
    }

    /// Run to completion, reporting to `events`.
    pub async fn run_with(self, events: impl Into<EventSink>) -> BatchResult {
        let paths = self.paths();
        self.runner.run(&paths, events).await
    }

    /// Run on a background task.
    pub fn spawn(self) -> BatchHandle {
        let paths = self.paths();
        self.runner.spawn(paths)
    }

    fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}
