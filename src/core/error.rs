//! Error types for rastermill.
//!
//! Uses thiserror for structured errors with context. The split follows the
//! failure taxonomy of a batch run:
//! - Task stream problems are recoverable and only ever logged
//! - Raster load/save failures are fatal and abort the whole run
//! - Worker panics surface at the join point that observed them

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for rastermill.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Task stream error: {0}")]
    Task(#[from] TaskError),

    #[error("Failed to load raster from '{}': {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to save raster to '{}': {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Raster geometry error: {0}")]
    Geometry(String),

    #[error("{0} thread panicked")]
    WorkerPanicked(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Errors produced while decoding the task stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("Malformed task record #{index}: {reason}")]
    Malformed { index: usize, reason: String },

    #[error("Task stream is unreadable: {0}")]
    Stream(String),
}

impl EditorError {
    /// Whether this error aborts the whole run.
    ///
    /// Task stream errors are handled inside the source and never reach a
    /// worker; everything else observed by a worker is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EditorError::Task(_))
    }

    /// Path of the raster involved, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            EditorError::Load { path, .. } | EditorError::Save { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for rastermill operations.
pub type EditorResult<T> = Result<T, EditorError>;
