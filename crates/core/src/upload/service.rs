//! Upload URL generation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::rules::validate_diary_image;
use super::types::{GenerateUploadUrlInput, UploadUrlResult};
use crate::storage::{
    DEFAULT_SIGNED_URL_TTL, ObjectBackend, StoragePrefix, StorageRegistry, StorageResult,
};

const DEFAULT_EXTENSION: &str = "jpg";

/// Issues presigned upload URLs for image uploads.
pub struct ImageUploadService<B: ObjectBackend> {
    storage: Arc<StorageRegistry<B>>,
    signed_url_ttl: Duration,
}

impl<B: ObjectBackend> ImageUploadService<B> {
    /// Create a service with the default URL lifetime.
    #[must_use]
    pub fn new(storage: Arc<StorageRegistry<B>>) -> Self {
        Self {
            storage,
            signed_url_ttl: DEFAULT_SIGNED_URL_TTL,
        }
    }

    /// Override the presigned URL lifetime.
    #[must_use]
    pub const fn with_signed_url_ttl(mut self, ttl: Duration) -> Self {
        self.signed_url_ttl = ttl;
        self
    }

    /// Generate a presigned upload URL for `input.prefix`.
    ///
    /// The MIME type is checked before the size. The object path is
    /// `{user_id}/{millis}-{random}.{ext}`.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any I/O, or a storage error if
    /// signing fails.
    pub async fn generate_upload_url(
        &self,
        input: GenerateUploadUrlInput,
    ) -> StorageResult<UploadUrlResult> {
        input
            .prefix
            .config()
            .validate_file(&input.file_type, input.file_size)?;

        let path = object_path(&input.user_id, &input.file_name);
        let storage = self.storage.get(input.prefix);

        let signed = storage
            .create_signed_upload_url(&path, &input.file_type, Some(self.signed_url_ttl))
            .await?;
        let public_url = storage.get_public_url(&signed.path);

        info!(
            user_id = %input.user_id,
            prefix = %input.prefix,
            path = %signed.path,
            "issued signed upload url"
        );

        Ok(UploadUrlResult {
            url: signed.url,
            headers: signed.headers,
            public_url,
            expires_at: signed.expires_at,
            path: signed.path,
        })
    }

    /// Generate an upload URL for a diary image owned by `user_id`.
    ///
    /// Applies the diary file-name rules, then delegates with the `diaries`
    /// prefix. `input.user_id` and `input.prefix` are overridden.
    ///
    /// # Errors
    ///
    /// Returns a validation error or a storage error.
    pub async fn generate_diary_image_upload_url(
        &self,
        input: GenerateUploadUrlInput,
        user_id: &str,
    ) -> StorageResult<UploadUrlResult> {
        validate_diary_image(&input.file_name, input.file_size)?;
        debug!(user_id = %user_id, file_name = %input.file_name, "diary image upload requested");

        self.generate_upload_url(GenerateUploadUrlInput {
            user_id: user_id.to_string(),
            prefix: StoragePrefix::Diaries,
            ..input
        })
        .await
    }
}

/// Unique path for a new object of `user_id`.
fn object_path(user_id: &str, file_name: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let random = Uuid::new_v4().simple().to_string();
    let extension = file_extension(file_name);

    format!("{user_id}/{millis}-{}.{extension}", &random[..8])
}

/// Lowercased extension of `file_name`, or `jpg` if it has none usable.
fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map_or_else(|| DEFAULT_EXTENSION.to_string(), str::to_ascii_lowercase)
}
