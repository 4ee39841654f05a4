//! Logical storage areas and their upload policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::StorageError;

const MB: u64 = 1024 * 1024;

const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Upload policy of one logical storage area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixConfig {
    /// Prefix name, also the first key segment.
    pub name: &'static str,
    /// Maximum object size in bytes (inclusive).
    pub max_file_size: u64,
    /// Accepted `Content-Type` values.
    pub allowed_mime_types: &'static [&'static str],
    /// Whether objects are served from the public base URL.
    pub is_public: bool,
}

impl PrefixConfig {
    /// Check if a MIME type is allowed.
    #[must_use]
    pub fn is_mime_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.contains(&mime_type)
    }

    /// Validate a file against this policy. The type is checked before the
    /// size.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMimeType` or `FileTooLarge`.
    pub fn validate_file(&self, mime_type: &str, size: u64) -> Result<(), StorageError> {
        if !self.is_mime_type_allowed(mime_type) {
            return Err(StorageError::invalid_mime_type(
                mime_type,
                self.allowed_mime_types,
            ));
        }

        if size > self.max_file_size {
            return Err(StorageError::file_too_large(size, self.max_file_size));
        }

        Ok(())
    }
}

const AVATARS: PrefixConfig = PrefixConfig {
    name: "avatars",
    max_file_size: 5 * MB,
    allowed_mime_types: IMAGE_MIME_TYPES,
    is_public: true,
};

const DIARIES: PrefixConfig = PrefixConfig {
    name: "diaries",
    max_file_size: 5 * MB,
    allowed_mime_types: IMAGE_MIME_TYPES,
    is_public: true,
};

/// Statically known storage areas.
///
/// Adding an area means adding a variant here; every table keyed by prefix
/// matches exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoragePrefix {
    /// Profile images, one retained per user.
    Avatars,
    /// Images attached to diary entries.
    Diaries,
}

impl StoragePrefix {
    /// Every prefix, in declaration order.
    pub const ALL: [Self; 2] = [Self::Avatars, Self::Diaries];

    /// Key segment for this prefix.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.config().name
    }

    /// Upload policy for this prefix.
    #[must_use]
    pub const fn config(&self) -> &'static PrefixConfig {
        match self {
            Self::Avatars => &AVATARS,
            Self::Diaries => &DIARIES,
        }
    }

    /// Parse from the key segment.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|prefix| prefix.as_str() == s)
    }
}

impl fmt::Display for StoragePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoragePrefix {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| StorageError::UnknownPrefix(s.to_string()))
    }
}
