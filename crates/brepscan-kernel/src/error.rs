use thiserror::Error;

use crate::{EdgeId, FaceId};

/// Error type for kernel queries.
#[derive(Debug, Clone, Error)]
pub enum KernelError {
    /// The kernel could not produce a usable solid.
    #[error("invalid solid: {0}")]
    InvalidSolid(String),

    /// A face handle the kernel does not know.
    #[error("unknown face {0}")]
    UnknownFace(FaceId),

    /// An edge handle the kernel does not know.
    #[error("unknown edge {0}")]
    UnknownEdge(EdgeId),

    /// The kernel does not support this query for the given entity.
    #[error("unsupported query: {0}")]
    Unsupported(String),

    /// A query ran but failed numerically.
    #[error("query failed: {0}")]
    Query(String),
}

/// Result type for kernel queries.
pub type KernelResult<T> = Result<T, KernelError>;
