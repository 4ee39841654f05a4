//! Profile image import and retention.

use bytes::Bytes;
use chrono::Utc;
use tracing::{error, info};

use super::error::ProfileImageError;
use super::worker::CleanupQueue;
use crate::storage::{ListOptions, ObjectBackend, StorageResult, UnifiedStorage};

/// How many of a user's avatars retention looks at.
pub const RETENTION_LIST_LIMIT: usize = 100;

/// Extension for a supported image MIME type.
#[must_use]
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Delete every avatar of `user_id` except the newest.
///
/// Lists at most [`RETENTION_LIST_LIMIT`] objects newest first. With zero or
/// one object nothing is deleted and no delete request is sent; otherwise all
/// but the first are removed in one batch. Returns the number deleted.
///
/// # Errors
///
/// Returns the listing or batch delete error.
pub async fn delete_old_profile_images<B: ObjectBackend>(
    avatars: &UnifiedStorage<B>,
    user_id: &str,
) -> StorageResult<usize> {
    let files = avatars
        .list(Some(user_id), ListOptions::newest_first(RETENTION_LIST_LIMIT))
        .await?;

    if files.len() <= 1 {
        return Ok(0);
    }

    let stale: Vec<String> = files.into_iter().skip(1).map(|file| file.path).collect();
    info!(user_id = %user_id, count = stale.len(), "deleting old profile images");

    let removed = avatars.remove(&stale).await?;
    Ok(removed.len())
}

/// Stores imported profile images in `avatars`.
pub struct ProfileImageService<B: ObjectBackend> {
    avatars: UnifiedStorage<B>,
    cleanup: CleanupQueue,
}

impl<B: ObjectBackend> ProfileImageService<B> {
    /// Create a service writing to `avatars` and queueing cleanup on
    /// `cleanup`.
    #[must_use]
    pub fn new(avatars: UnifiedStorage<B>, cleanup: CleanupQueue) -> Self {
        Self { avatars, cleanup }
    }

    /// Store `body` as the new profile image of `user_id` and return its
    /// public URL.
    ///
    /// The object is written to `{user_id}/profile-{millis}.{ext}`. On
    /// success, older images are cleaned up in the background.
    ///
    /// # Errors
    ///
    /// Returns `NotAnImage`, `UnsupportedType`, a size violation or a storage
    /// failure. Every error is logged with the user id.
    pub async fn upload_profile_image(
        &self,
        user_id: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<String, ProfileImageError> {
        match self.store(user_id, body, content_type).await {
            Ok(url) => {
                self.cleanup.enqueue(user_id);
                Ok(url)
            }
            Err(err) => {
                error!(
                    user_id = %user_id,
                    content_type = %content_type,
                    error = %err,
                    "failed to upload profile image"
                );
                Err(err)
            }
        }
    }

    async fn store(
        &self,
        user_id: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<String, ProfileImageError> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if !mime.starts_with("image/") {
            return Err(ProfileImageError::NotAnImage);
        }

        let extension =
            image_extension(&mime).ok_or_else(|| ProfileImageError::UnsupportedType(mime.clone()))?;

        self.avatars
            .prefix()
            .config()
            .validate_file(&mime, u64::try_from(body.len()).unwrap_or(u64::MAX))?;

        let path = format!(
            "{user_id}/profile-{}.{extension}",
            Utc::now().timestamp_millis()
        );
        let uploaded = self.avatars.upload(&path, body, Some(&mime)).await?;

        info!(user_id = %user_id, path = %uploaded.path, "stored profile image");
        Ok(self.avatars.get_public_url(&uploaded.path))
    }
}
