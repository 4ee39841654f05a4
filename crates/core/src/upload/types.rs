//! Upload request and response types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::StoragePrefix;

/// Input for generating a presigned upload URL.
///
/// `user_id` comes from an already authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenerateUploadUrlInput {
    /// Owner of the upload; first path segment.
    pub user_id: String,
    /// Original file name, used for the extension only.
    pub file_name: String,
    /// Declared MIME type.
    pub file_type: String,
    /// Declared size in bytes.
    pub file_size: u64,
    /// Target storage area.
    pub prefix: StoragePrefix,
}

/// Presigned upload URL plus the future public URL of the object.
#[derive(Debug, Clone, Serialize)]
pub struct UploadUrlResult {
    /// Presigned PUT URL.
    pub url: String,
    /// Headers the uploader must send.
    pub headers: HashMap<String, String>,
    /// Public URL of the object once uploaded.
    pub public_url: String,
    /// URL expiry.
    pub expires_at: DateTime<Utc>,
    /// Path relative to the prefix.
    pub path: String,
}
