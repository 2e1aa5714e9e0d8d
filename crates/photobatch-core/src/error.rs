//! Error types for the Photobatch pipeline.
//!
//! Configuration problems are fatal and surface before a batch starts.
//! Pipeline errors are per-item: the batch runner records them and moves on.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Photobatch operations.
#[derive(Error, Debug)]
pub enum PhotobatchError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration or batch parameters are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Per-item pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Resizing or color conversion failed
    #[error("Transform failed for {path}: {message}")]
    Transform { path: PathBuf, message: String },

    /// JPEG encoding or metadata re-attachment failed
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// No free output name could be claimed
    #[error("Could not allocate an output name for {path}: {message}")]
    Naming { path: PathBuf, message: String },

    /// Writing the output file failed
    #[error("Write failed for {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Photobatch results.
pub type Result<T> = std::result::Result<T, PhotobatchError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_mentions_path() {
        let err = PipelineError::Decode {
            path: PathBuf::from("/photos/broken.jpg"),
            message: "unexpected EOF".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("broken.jpg"));
        assert!(msg.contains("unexpected EOF"));
    }

    #[test]
    fn test_config_error_wraps_into_top_level() {
        let err: PhotobatchError = ConfigError::ValidationError("quality".into()).into();
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
