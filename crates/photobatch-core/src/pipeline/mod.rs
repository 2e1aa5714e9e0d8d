//! Image processing pipeline components.
//!
//! This module contains all the stages of the batch pipeline:
//! - **discovery**: Find image files in directories
//! - **decode**: Load and decode images from various formats
//! - **metadata**: Read capture time, orientation, ICC and EXIF blocks
//! - **date**: Resolve a capture date with fallbacks
//! - **transform**: Re-orient, convert to RGB and fit into the bounding box
//! - **encode**: Baseline JPEG encoding with metadata pass-through
//! - **naming**: Collision-free output filenames
//! - **runner**: Orchestrates the full batch
//! - **channel**: Bounded event channel to the observer

pub mod channel;
pub mod date;
pub mod decode;
pub mod discovery;
pub mod encode;
pub mod metadata;
pub mod naming;
pub mod runner;
pub mod transform;

// Re-exports for convenient access
pub use channel::EventSink;
pub use date::{DateResolver, DateSource, ResolvedDate};
pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use encode::JpegEncoder;
pub use metadata::MetadataExtractor;
pub use naming::Namer;
pub use runner::{BatchHandle, BatchRunner, CancelFlag};
pub use transform::{fit_dimensions, Transformer};
