//! Slide pipeline errors.

use std::path::PathBuf;

/// Errors from staging, rasterizing and serving slides.
#[derive(Debug, thiserror::Error)]
pub enum SlideError {
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Upload is not a PDF.
    #[error("only PDF files are allowed: {0}")]
    NotPdf(String),

    /// Session id is empty, too long, or contains path characters.
    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),

    /// Requested file is not a `slide-N.png` name.
    #[error("invalid slide file name: {0:?}")]
    InvalidSlideName(String),

    /// The rasterizer exited unsuccessfully.
    #[error("rasterizer exited with {status}: {stderr}")]
    Rasterize {
        /// Exit status as reported by the OS.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// The rasterizer binary could not be launched.
    #[error("rasterizer {command:?} not available: {source}")]
    ToolMissing {
        /// Command that was attempted.
        command: PathBuf,
        /// Launch error.
        source: std::io::Error,
    },
}

/// Convenience alias.
pub type Result<T, E = SlideError> = std::result::Result<T, E>;
