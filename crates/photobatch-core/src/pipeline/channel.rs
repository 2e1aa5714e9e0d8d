//! Bounded event channel between the batch worker and its observer.

use tokio::sync::mpsc;

use crate::config::PipelineConfig;
use crate::types::BatchEvent;

/// Create a bounded channel pair with the configured buffer size.
///
/// When the buffer is full the worker waits, so a slow observer throttles
/// the batch instead of letting events pile up in memory.
pub fn bounded_channel<T>(config: &PipelineConfig) -> (mpsc::Sender<T>, mpsc::Receiver<T>) {
    mpsc::channel(config.buffer_size.max(1))
}

/// Sender side used by the batch runner.
///
/// Sends never fail from the runner's point of view: once the observer has
/// gone away events are silently dropped and the batch keeps going.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<mpsc::Sender<BatchEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<BatchEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that discards everything.
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    pub async fn send(&mut self, event: BatchEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(event).await.is_err() {
            tracing::debug!("Event receiver dropped; continuing without progress reporting");
            self.tx = None;
        }
    }
}

impl From<mpsc::Sender<BatchEvent>> for EventSink {
    fn from(tx: mpsc::Sender<BatchEvent>) -> Self {
        EventSink::new(tx)
    }
}
