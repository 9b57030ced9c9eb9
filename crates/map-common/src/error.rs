//! Error types for map-tiler operations.

use thiserror::Error;

/// Result type alias using TilerError.
pub type TilerResult<T> = Result<T, TilerError>;

/// Primary error type for tile pyramid operations.
///
/// The four variants are deliberately coarse so callers can pick a policy
/// per kind: correct the input, abort on corruption, degrade on missing
/// metadata, or retry on storage failure.
#[derive(Debug, Error)]
pub enum TilerError {
    /// Caller-correctable input problem (bad tile size, empty raster).
    /// Raised before any write happens.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A stored payload does not match its declared shape or type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The raster carries no world coordinate system.
    #[error("missing metadata: {0}")]
    MissingMetadata(String),

    /// Transient storage failure; safe to retry, never leaves a
    /// partially visible pyramid.
    #[error("storage error: {0}")]
    Storage(String),
}

impl TilerError {
    /// Create an InvalidInput error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a DataCorruption error.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::DataCorruption(msg.into())
    }

    /// Create a MissingMetadata error.
    pub fn missing_metadata(msg: impl Into<String>) -> Self {
        Self::MissingMetadata(msg.into())
    }

    /// Create a Storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether the caller may retry the failed operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TilerError::Storage(_))
    }
}

impl From<std::io::Error> for TilerError {
    fn from(err: std::io::Error) -> Self {
        TilerError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for TilerError {
    fn from(err: serde_json::Error) -> Self {
        TilerError::DataCorruption(format!("JSON error: {}", err))
    }
}
