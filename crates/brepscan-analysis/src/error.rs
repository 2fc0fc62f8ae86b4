//! Errors that abort an analysis.
//!
//! Per-face and per-edge problems never show up here; they are logged and
//! replaced by conservative fallbacks. Only a kernel that cannot produce a
//! usable solid, or a bad configuration, is fatal.

use brepscan_kernel::KernelError;
use thiserror::Error;

/// Fatal analysis errors.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The solid has no faces.
    #[error("solid has no faces")]
    EmptySolid,

    /// The solid's bounding box is empty or not finite.
    #[error("solid has no usable bounding box")]
    DegenerateBounds,

    /// A whole-solid kernel query failed.
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    /// Configuration could not be parsed or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for analysis.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
