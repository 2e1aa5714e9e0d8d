//! Core data types shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{check_bounding_box, check_quality, Config};
use crate::error::ConfigError;

/// Maximum output size; images are never upscaled to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Maximum width in pixels
    pub width: u32,
    /// Maximum height in pixels
    pub height: u32,
}

impl BoundingBox {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Unvalidated batch parameters, as collected by a front end.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Folder to scan for images
    pub input_dir: PathBuf,
    /// Destination folder; defaults to `<input_dir>/<output.dir_name>`
    pub output_dir: Option<PathBuf>,
    pub bounding_box: BoundingBox,
    /// JPEG quality (1-100)
    pub quality: u8,
    pub strip_metadata: bool,
    pub recursive: bool,
}

impl BatchRequest {
    /// Build a request for `input_dir` using the defaults from `config`.
    pub fn from_config(config: &Config, input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: None,
            bounding_box: BoundingBox::new(config.resize.max_width, config.resize.max_height),
            quality: config.output.quality,
            strip_metadata: config.output.strip_metadata,
            recursive: config.processing.recursive,
        }
    }
}

/// Validated, immutable parameters for one batch.
///
/// Only constructible through [`BatchSettings::new`], so a value of this
/// type always has an existing input directory, a positive bounding box and
/// a quality in range.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    input_dir: PathBuf,
    output_dir: PathBuf,
    parent_label: String,
    bounding_box: BoundingBox,
    quality: u8,
    strip_metadata: bool,
    recursive: bool,
    extension: String,
}

impl BatchSettings {
    /// Validate a request against the configuration.
    ///
    /// Fails with [`ConfigError::ValidationError`] when the input directory
    /// is missing or not a directory, or a numeric parameter is out of range.
    pub fn new(request: BatchRequest, config: &Config) -> Result<Self, ConfigError> {
        let input_dir = crate::config::expand_path(&request.input_dir);
        if !input_dir.is_dir() {
            return Err(ConfigError::ValidationError(format!(
                "input directory does not exist or is not a directory: {}",
                input_dir.display()
            )));
        }
        let input_dir = input_dir.canonicalize().map_err(|e| {
            ConfigError::ValidationError(format!(
                "cannot resolve input directory {}: {e}",
                input_dir.display()
            ))
        })?;

        check_bounding_box(request.bounding_box.width, request.bounding_box.height)?;
        check_quality(request.quality)?;

        let parent_label = input_dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "input directory has no usable name: {}",
                    input_dir.display()
                ))
            })?;

        let output_dir = match request.output_dir {
            Some(dir) => absolutize(&crate::config::expand_path(&dir))?,
            None => input_dir.join(&config.output.dir_name),
        };

        Ok(Self {
            input_dir,
            output_dir,
            parent_label,
            bounding_box: request.bounding_box,
            quality: request.quality,
            strip_metadata: request.strip_metadata,
            recursive: request.recursive,
            extension: config.output.extension.clone(),
        })
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Name of the input folder, used as the output filename prefix.
    pub fn parent_label(&self) -> &str {
        &self.parent_label
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn strip_metadata(&self) -> bool {
        self.strip_metadata
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }

    /// Output file extension, including the leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

fn absolutize(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir().map_err(|e| {
            ConfigError::ValidationError(format!("cannot resolve {}: {e}", path.display()))
        })?;
        Ok(cwd.join(path))
    }
}

/// Embedded metadata read from a source file.
///
/// A fixed set of named fields rather than an open tag map; every field is
/// optional because real collections are missing some or all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedMetadata {
    /// Raw capture time, usually `YYYY:MM:DD HH:MM:SS`
    pub captured_at: Option<String>,
    /// EXIF orientation (1-8)
    pub orientation: Option<u32>,
    /// ICC color profile, verbatim
    pub icc_profile: Option<Vec<u8>>,
    /// EXIF block (TIFF structure, without the `Exif\0\0` prefix)
    pub exif: Option<Vec<u8>>,
}

impl EmbeddedMetadata {
    /// True when nothing was found.
    pub fn is_empty(&self) -> bool {
        self.captured_at.is_none()
            && self.orientation.is_none()
            && self.icc_profile.is_none()
            && self.exif.is_none()
    }
}

/// Lifecycle of a single item in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStage {
    Pending,
    Decoding,
    Decoded,
    DateResolved,
    Transformed,
    Encoded,
    Named,
    Written,
}

impl fmt::Display for ItemStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemStage::Pending => "pending",
            ItemStage::Decoding => "decoding",
            ItemStage::Decoded => "decoded",
            ItemStage::DateResolved => "date-resolved",
            ItemStage::Transformed => "transformed",
            ItemStage::Encoded => "encoded",
            ItemStage::Named => "named",
            ItemStage::Written => "written",
        };
        f.write_str(name)
    }
}

/// One item that could not be processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Source file that failed
    pub source_path: PathBuf,
    /// State the item was in when it failed
    pub stage: ItemStage,
    /// Human-readable reason
    pub message: String,
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    /// Number of files discovered
    pub total: usize,
    /// Number of files attempted (successes and failures)
    pub processed: usize,
    /// Number of output files written
    pub succeeded: usize,
    /// Failed items in processing order
    pub failures: Vec<ItemFailure>,
    /// Written output files in processing order
    pub outputs: Vec<PathBuf>,
    /// Batch stopped early on request
    #[serde(default)]
    pub cancelled: bool,
}

impl BatchResult {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub(crate) fn record_success(&mut self, output: PathBuf) {
        self.processed += 1;
        self.succeeded += 1;
        self.outputs.push(output);
    }

    pub(crate) fn record_failure(&mut self, failure: ItemFailure) {
        self.processed += 1;
        self.failures.push(failure);
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// All discovered items were attempted and none failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.processed == self.total
    }
}

/// Notifications sent from the batch worker to its observer.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Emitted after every item, successful or not.
    Progress { processed: usize, total: usize },
    /// Emitted when an item fails, before the matching `Progress`.
    ItemFailed(ItemFailure),
    /// Emitted once when the batch ends.
    Completed {
        result: BatchResult,
        output_dir: PathBuf,
    },
}
