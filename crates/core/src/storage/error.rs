//! Storage error types.

use thiserror::Error;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// MIME type not allowed for the prefix.
    #[error("file type '{mime_type}' is not allowed; allowed types: {}", .allowed.join(", "))]
    InvalidMimeType {
        /// The rejected MIME type.
        mime_type: String,
        /// MIME types the prefix accepts.
        allowed: Vec<String>,
    },

    /// File size exceeds the prefix limit.
    #[error("file size {size} bytes exceeds the {max_mb}MB limit")]
    FileTooLarge {
        /// Actual file size.
        size: u64,
        /// Limit in whole megabytes.
        max_mb: u64,
    },

    /// Zero-byte upload.
    #[error("file is empty")]
    EmptyFile,

    /// File name failed validation.
    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    /// Unknown storage prefix.
    #[error("unknown storage prefix: {0}")]
    UnknownPrefix(String),

    /// Operation not supported by the backend (e.g. presigning in memory).
    #[error("operation not supported by storage backend: {0}")]
    Unsupported(String),

    /// Storage backend configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Transport or provider failure.
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Create an invalid MIME type error.
    #[must_use]
    pub fn invalid_mime_type(mime_type: impl Into<String>, allowed: &[&str]) -> Self {
        Self::InvalidMimeType {
            mime_type: mime_type.into(),
            allowed: allowed.iter().map(ToString::to_string).collect(),
        }
    }

    /// Create a file too large error from a byte limit.
    #[must_use]
    pub fn file_too_large(size: u64, max_bytes: u64) -> Self {
        Self::FileTooLarge {
            size,
            max_mb: bytes_to_rounded_mb(max_bytes),
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an operation error.
    #[must_use]
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Whether the error was raised by request validation, before any I/O.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidMimeType { .. }
                | Self::FileTooLarge { .. }
                | Self::EmptyFile
                | Self::InvalidFileName(_)
        )
    }
}

fn bytes_to_rounded_mb(bytes: u64) -> u64 {
    const MB: u64 = 1024 * 1024;
    (bytes + MB / 2) / MB
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::Unsupported => Self::Unsupported(err.to_string()),
            opendal::ErrorKind::ConfigInvalid => Self::Configuration(err.to_string()),
            _ => Self::Operation(err.to_string()),
        }
    }
}
