//! Batch orchestration: decode, date, transform, encode, name and write
//! each discovered file in order, isolating per-item failures.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{Config, PipelineConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{BatchEvent, BatchResult, BatchSettings, ItemFailure, ItemStage};

use super::channel::{bounded_channel, EventSink};
use super::date::DateResolver;
use super::decode::{format_to_string, ImageDecoder};
use super::encode::JpegEncoder;
use super::metadata::normalize_orientation;
use super::naming::Namer;
use super::transform::Transformer;

/// Attempts at claiming a fresh name when another writer keeps winning.
const MAX_NAME_ATTEMPTS: usize = 16;

/// Shared request to stop a running batch after the current item.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A batch running on a background task.
pub struct BatchHandle {
    /// Progress, failure and completion events, in order
    pub events: mpsc::Receiver<BatchEvent>,
    /// Stops the batch between items
    pub cancel: CancelFlag,
    /// Resolves to the final result
    pub join: JoinHandle<BatchResult>,
}

/// Runs one batch, item by item.
pub struct BatchRunner {
    settings: BatchSettings,
    decoder: ImageDecoder,
    transformer: Transformer,
    encoder: JpegEncoder,
    pipeline: PipelineConfig,
    cancel: CancelFlag,
}

impl BatchRunner {
    /// Create a runner for validated settings.
    pub fn new(settings: BatchSettings, config: &Config) -> Self {
        Self {
            decoder: ImageDecoder::new(config.limits.clone()),
            transformer: Transformer::new(settings.bounding_box()),
            encoder: JpegEncoder::new(settings.quality(), settings.strip_metadata()),
            pipeline: config.pipeline.clone(),
            cancel: CancelFlag::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Flag checked between items; cancelling it stops the batch early.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Process `files` sequentially, reporting to `events`.
    ///
    /// Never fails as a whole: item errors are recorded in the result and the
    /// loop moves on. A closed event channel does not stop the batch.
    pub async fn run(&self, files: &[PathBuf], events: impl Into<EventSink>) -> BatchResult {
        let mut events = events.into();
        let total = files.len();
        let mut result = BatchResult::new(total);
        let mut namer = Namer::new();
        let output_dir = self.settings.output_dir().to_path_buf();
        let start = Instant::now();

        tracing::info!(
            "Processing {} file(s) from {:?} into {:?}",
            total,
            self.settings.input_dir(),
            output_dir
        );
        if let Err(e) = tokio::fs::create_dir_all(&output_dir).await {
            tracing::error!("Cannot create output directory {:?}: {}", output_dir, e);
        }

        for path in files {
            if self.cancel.is_cancelled() {
                tracing::warn!(
                    "Batch cancelled after {} of {} file(s)",
                    result.processed,
                    total
                );
                result.cancelled = true;
                break;
            }

            let mut stage = ItemStage::Pending;
            match self.process_item(path, &mut namer, &mut stage).await {
                Ok(output) => {
                    tracing::debug!("Wrote {:?} -> {:?}", path, output);
                    result.record_success(output);
                }
                Err(e) => {
                    tracing::warn!("Failed to process {:?} ({}): {}", path, stage, e);
                    let failure = ItemFailure {
                        source_path: path.clone(),
                        stage,
                        message: e.to_string(),
                    };
                    events.send(BatchEvent::ItemFailed(failure.clone())).await;
                    result.record_failure(failure);
                }
            }

            events
                .send(BatchEvent::Progress {
                    processed: result.processed,
                    total,
                })
                .await;
        }

        tracing::info!(
            "Batch finished in {:.1}s: {} succeeded, {} failed",
            start.elapsed().as_secs_f64(),
            result.succeeded,
            result.failed()
        );

        events
            .send(BatchEvent::Completed {
                result: result.clone(),
                output_dir,
            })
            .await;
        result
    }

    /// Run the batch on a tokio task and return a handle to observe or
    /// cancel it.
    pub fn spawn(self, files: Vec<PathBuf>) -> BatchHandle {
        let (tx, rx) = bounded_channel(&self.pipeline);
        let cancel = self.cancel_flag();
        let join = tokio::spawn(async move { self.run(&files, tx).await });
        BatchHandle {
            events: rx,
            cancel,
            join,
        }
    }

    /// One file through every stage. `stage` always holds the last stage
    /// reached, so a failure can report where it happened.
    async fn process_item(
        &self,
        path: &Path,
        namer: &mut Namer,
        stage: &mut ItemStage,
    ) -> PipelineResult<PathBuf> {
        let item_start = Instant::now();
        tracing::debug!("Processing: {:?}", path);

        *stage = ItemStage::Decoding;
        let decoded = self.decoder.decode(path).await?;
        *stage = ItemStage::Decoded;
        tracing::trace!(
            "  Decode: {:?} ({}x{} {})",
            item_start.elapsed(),
            decoded.width,
            decoded.height,
            format_to_string(decoded.format)
        );

        let metadata = decoded.metadata;
        let date = DateResolver::resolve(metadata.captured_at.as_deref(), path);
        *stage = ItemStage::DateResolved;
        tracing::trace!("  Date: {} ({:?})", date.date, date.source);

        let transformer = self.transformer;
        let orientation = metadata.orientation;
        let image = decoded.image;
        let transformed =
            tokio::task::spawn_blocking(move || transformer.transform(image, orientation))
                .await
                .map_err(|e| PipelineError::Transform {
                    path: path.to_path_buf(),
                    message: format!("Task join error: {}", e),
                })?;
        *stage = ItemStage::Transformed;

        let encoder = self.encoder;
        let icc = metadata.icc_profile;
        let exif = metadata.exif.map(normalize_orientation);
        let source = path.to_path_buf();
        let bytes = tokio::task::spawn_blocking(move || {
            encoder.encode(&transformed, icc.as_deref(), exif.as_deref(), &source)
        })
        .await
        .map_err(|e| PipelineError::Encode {
            path: path.to_path_buf(),
            message: format!("Task join error: {}", e),
        })??;
        *stage = ItemStage::Encoded;

        let stem = Namer::stem(self.settings.parent_label(), &date);
        let output = self.write_new(path, &stem, &bytes, stage).await?;
        *stage = ItemStage::Written;

        let day_total = namer.record(&date.day_key());
        tracing::debug!(
            "Processed {:?} in {:?} ({} image(s) for {})",
            path,
            item_start.elapsed(),
            day_total,
            date.day_key()
        );
        Ok(output)
    }

    /// Claim the first free name for `stem` and write `bytes` to it without
    /// ever replacing an existing file.
    async fn write_new(
        &self,
        source: &Path,
        stem: &str,
        bytes: &[u8],
        stage: &mut ItemStage,
    ) -> PipelineResult<PathBuf> {
        let output_dir = self.settings.output_dir();
        for _ in 0..MAX_NAME_ATTEMPTS {
            let candidate = Namer::next_available_name(output_dir, stem, self.settings.extension());
            *stage = ItemStage::Named;

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::debug!("{:?} was taken concurrently, probing again", candidate);
                    continue;
                }
                Err(e) => {
                    return Err(PipelineError::Write {
                        path: candidate,
                        source: e,
                    })
                }
            };

            let written = async {
                file.write_all(bytes).await?;
                file.flush().await
            }
            .await;
            if let Err(e) = written {
                // Do not leave a truncated image behind
                drop(file);
                if let Err(rm) = tokio::fs::remove_file(&candidate).await {
                    tracing::debug!("Could not remove partial {:?}: {}", candidate, rm);
                }
                return Err(PipelineError::Write {
                    path: candidate,
                    source: e,
                });
            }
            return Ok(candidate);
        }

        Err(PipelineError::Naming {
            path: source.to_path_buf(),
            message: format!(
                "every probed name for {stem}* was taken by another writer ({MAX_NAME_ATTEMPTS} attempts)"
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BatchRequest, BoundingBox};
    use image::{DynamicImage, GenericImageView, ImageFormat};

    fn write_png(path: &Path, w: u32, h: u32) {
        DynamicImage::new_rgb8(w, h)
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    fn runner_for(input: &Path) -> BatchRunner {
        let config = Config::default();
        let mut request = BatchRequest::from_config(&config, input);
        request.bounding_box = BoundingBox::new(100, 100);
        let settings = BatchSettings::new(request, &config).unwrap();
        BatchRunner::new(settings, &config)
    }

    #[tokio::test]
    async fn test_run_writes_named_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("Album");
        std::fs::create_dir(&input).unwrap();
        let a = input.join("a.png");
        let b = input.join("b.png");
        write_png(&a, 400, 200);
        write_png(&b, 50, 50);

        let runner = runner_for(&input);
        let result = runner.run(&[a, b], EventSink::disconnected()).await;

        assert_eq!(result.total, 2);
        assert_eq!(result.succeeded, 2);
        assert!(result.is_clean());
        for output in &result.outputs {
            let name = output.file_name().unwrap().to_string_lossy();
            assert!(name.starts_with("Album_"), "{name}");
            assert!(name.ends_with(".jpg"), "{name}");
        }

        let first = image::open(&result.outputs[0]).unwrap();
        assert_eq!(first.dimensions(), (100, 50));
        let second = image::open(&result.outputs[1]).unwrap();
        assert_eq!(second.dimensions(), (50, 50));
    }

    #[tokio::test]
    async fn test_failure_is_recorded_with_stage() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        let bad = dir.path().join("bad.png");
        write_png(&good, 10, 10);
        std::fs::write(&bad, b"not a png").unwrap();

        let runner = runner_for(dir.path());
        let (tx, mut rx) = mpsc::channel(16);
        let result = runner.run(&[bad.clone(), good], tx).await;

        assert_eq!(result.processed, 2);
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].source_path, bad);
        assert_eq!(result.failures[0].stage, ItemStage::Decoding);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert!(matches!(events[0], BatchEvent::ItemFailed(_)));
        assert!(matches!(
            events[1],
            BatchEvent::Progress {
                processed: 1,
                total: 2
            }
        ));
        assert!(matches!(
            events.last(),
            Some(BatchEvent::Completed { result, .. }) if result.succeeded == 1
        ));
    }

    #[tokio::test]
    async fn test_existing_outputs_are_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.png");
        write_png(&src, 10, 10);

        let runner = runner_for(dir.path());
        let first = runner.run(&[src.clone()], EventSink::disconnected()).await;
        let second = runner.run(&[src], EventSink::disconnected()).await;

        assert_eq!(first.succeeded, 1);
        assert_eq!(second.succeeded, 1);
        assert_ne!(first.outputs[0], second.outputs[0]);
        assert!(first.outputs[0].exists());
        assert!(second.outputs[0].exists());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_processes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.png");
        write_png(&src, 10, 10);

        let runner = runner_for(dir.path());
        runner.cancel_flag().cancel();
        let result = runner.run(&[src], EventSink::disconnected()).await;

        assert!(result.cancelled);
        assert_eq!(result.processed, 0);
        assert!(result.outputs.is_empty());
    }

    #[tokio::test]
    async fn test_spawn_delivers_completion() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.png");
        write_png(&src, 10, 10);

        let mut handle = runner_for(dir.path()).spawn(vec![src]);
        let mut completed = false;
        while let Some(event) = handle.events.recv().await {
            if let BatchEvent::Completed { result, .. } = event {
                assert_eq!(result.succeeded, 1);
                completed = true;
            }
        }
        assert!(completed);
        assert_eq!(handle.join.await.unwrap().succeeded, 1);
    }
}
