//! Profile image error types.

use thiserror::Error;

use crate::storage::StorageError;

/// Profile image import errors.
#[derive(Debug, Error)]
pub enum ProfileImageError {
    /// The fetched resource is not an image.
    #[error("invalid content type: not an image")]
    NotAnImage,

    /// Image format without a known extension.
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    /// The remote image could not be fetched.
    #[error("failed to fetch image: {0}")]
    Fetch(String),

    /// Policy or storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProfileImageError {
    /// Create a fetch error.
    #[must_use]
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Whether the error is caused by the submitted image rather than by
    /// infrastructure.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        match self {
            Self::NotAnImage | Self::UnsupportedType(_) => true,
            Self::Storage(err) => err.is_validation(),
            Self::Fetch(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(ProfileImageError::NotAnImage.is_validation());
        assert!(ProfileImageError::UnsupportedType("image/gif".into()).is_validation());
        assert!(ProfileImageError::from(StorageError::file_too_large(6, 5)).is_validation());
        assert!(!ProfileImageError::fetch("404 Not Found").is_validation());
        assert!(!ProfileImageError::from(StorageError::operation("timeout")).is_validation());
    }

    #[test]
    fn test_storage_message_is_transparent() {
        let err = ProfileImageError::from(StorageError::EmptyFile);
        assert_eq!(err.to_string(), "file is empty");
    }
}
