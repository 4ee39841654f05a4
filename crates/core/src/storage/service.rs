//! Unified storage client bound to one storage prefix.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::backend::ObjectBackend;
use super::config::StorageSettings;
use super::error::{StorageError, StorageResult};
use super::prefix::StoragePrefix;

/// Default lifetime of a presigned upload URL.
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(600);

/// Longest accepted presigned URL lifetime.
pub const MAX_SIGNED_URL_TTL: Duration =
    Duration::from_secs(kiroku_shared::MAX_SIGNED_URL_TTL_SECS);

/// Default page size of [`UnifiedStorage::list`].
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Result of a server-side upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedObject {
    /// Logical path inside the prefix.
    pub path: String,
}

/// Presigned upload URL handed to the client. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SignedUploadPayload {
    /// Presigned PUT URL.
    pub url: String,
    /// Headers the uploader must send.
    pub headers: HashMap<String, String>,
    /// Logical path inside the prefix.
    pub path: String,
    /// Expiry of the URL.
    pub expires_at: DateTime<Utc>,
}

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageListItem {
    /// Last path segment.
    pub name: String,
    /// Path relative to the prefix.
    pub path: String,
    /// Creation time. S3 only reports the last modification.
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Sort direction by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    Desc,
}

/// Options for [`UnifiedStorage::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// Maximum number of items.
    pub limit: usize,
    /// Optional ordering by creation time.
    pub sort_by: Option<SortOrder>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            sort_by: None,
        }
    }
}

impl ListOptions {
    /// Newest first, with the given limit.
    #[must_use]
    pub const fn newest_first(limit: usize) -> Self {
        Self {
            limit,
            sort_by: Some(SortOrder::Desc),
        }
    }
}

/// Backend-agnostic storage client for one prefix.
///
/// Paths are relative to the prefix; the client maps them to object keys
/// through the shared [`StorageSettings`]. Every fallible operation returns a
/// [`StorageResult`].
pub struct UnifiedStorage<B: ObjectBackend> {
    prefix: StoragePrefix,
    settings: Arc<StorageSettings>,
    backend: Arc<B>,
}

impl<B: ObjectBackend> Clone for UnifiedStorage<B> {
    fn clone(&self) -> Self {
        Self {
            prefix: self.prefix,
            settings: Arc::clone(&self.settings),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: ObjectBackend> std::fmt::Debug for UnifiedStorage<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiedStorage")
            .field("prefix", &self.prefix)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<B: ObjectBackend> UnifiedStorage<B> {
    /// Create a client for `prefix`.
    #[must_use]
    pub fn new(prefix: StoragePrefix, settings: Arc<StorageSettings>, backend: Arc<B>) -> Self {
        Self {
            prefix,
            settings,
            backend,
        }
    }

    /// Prefix this client writes to.
    #[must_use]
    pub const fn prefix(&self) -> StoragePrefix {
        self.prefix
    }

    /// Upload an in-memory body to `path`. Overwrites silently.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend rejects the write.
    pub async fn upload(
        &self,
        path: &str,
        body: impl Into<Bytes>,
        content_type: Option<&str>,
    ) -> StorageResult<UploadedObject> {
        let key = self.settings.resolve_object_key(self.prefix, path);
        let body = body.into();

        debug!(prefix = %self.prefix, key = %key, size = body.len(), "uploading object");
        self.backend.put_object(&key, body, content_type).await?;

        Ok(UploadedObject {
            path: path.to_string(),
        })
    }

    /// Presign a PUT of `path`.
    ///
    /// `expires_in` defaults to [`DEFAULT_SIGNED_URL_TTL`]. The object is not
    /// checked for existence; the last upload wins.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `expires_in` is zero or longer than
    /// [`MAX_SIGNED_URL_TTL`], and a storage error if signing fails or the
    /// backend cannot presign.
    pub async fn create_signed_upload_url(
        &self,
        path: &str,
        content_type: &str,
        expires_in: Option<Duration>,
    ) -> StorageResult<SignedUploadPayload> {
        let ttl = expires_in.unwrap_or(DEFAULT_SIGNED_URL_TTL);
        if ttl.is_zero() || ttl > MAX_SIGNED_URL_TTL {
            return Err(StorageError::configuration(format!(
                "signed URL lifetime must be between 1s and {}s, got {}s",
                MAX_SIGNED_URL_TTL.as_secs(),
                ttl.as_secs()
            )));
        }
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| StorageError::configuration("signed URL expiry out of range"))?;

        let key = self.settings.resolve_object_key(self.prefix, path);

        let url = self.backend.presign_put(&key, content_type, ttl).await?;

        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), content_type.to_string());

        Ok(SignedUploadPayload {
            url,
            headers,
            path: path.to_string(),
            expires_at,
        })
    }

    /// Public URL of `path`. No network access.
    #[must_use]
    pub fn get_public_url(&self, path: &str) -> String {
        self.settings.build_public_url(self.prefix, path)
    }

    /// List objects under `path` (the whole prefix when `None`).
    ///
    /// Returns at most `options.limit` items from a single backend page.
    /// Directory markers are skipped; sorting applies to the returned page.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the listing fails.
    pub async fn list(
        &self,
        path: Option<&str>,
        options: ListOptions,
    ) -> StorageResult<Vec<StorageListItem>> {
        let list_prefix = self.settings.resolve_list_prefix(self.prefix, path);
        let base = self.settings.resolve_object_key(self.prefix, "");

        let entries = self
            .backend
            .list_objects(&list_prefix, options.limit)
            .await?;

        let mut items: Vec<StorageListItem> = entries
            .into_iter()
            .filter(|entry| !entry.key.ends_with('/'))
            .filter_map(|entry| {
                let relative = entry.key.strip_prefix(&base)?;
                if relative.is_empty() {
                    return None;
                }

                let name = relative.rsplit('/').next().unwrap_or(relative).to_string();
                Some(StorageListItem {
                    name,
                    path: relative.to_string(),
                    created_at: entry.last_modified,
                    updated_at: entry.last_modified,
                })
            })
            .take(options.limit)
            .collect();

        match options.sort_by {
            Some(SortOrder::Asc) => items.sort_by_key(|item| item.created_at),
            Some(SortOrder::Desc) => {
                items.sort_by_key(|item| std::cmp::Reverse(item.created_at));
            }
            None => {}
        }

        Ok(items)
    }

    /// Delete `paths` in one batch request.
    ///
    /// Returns the removed paths. An empty input issues no request.
    ///
    /// # Errors
    ///
    /// Returns one storage error for the whole batch.
    pub async fn remove(&self, paths: &[String]) -> StorageResult<Vec<String>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = paths
            .iter()
            .map(|path| self.settings.resolve_object_key(self.prefix, path))
            .collect();

        debug!(prefix = %self.prefix, count = keys.len(), "removing objects");
        self.backend.delete_objects(&keys).await?;

        Ok(paths.to_vec())
    }
}

/// Storage clients for every prefix, built once at startup.
pub struct StorageRegistry<B: ObjectBackend> {
    settings: Arc<StorageSettings>,
    avatars: UnifiedStorage<B>,
    diaries: UnifiedStorage<B>,
}

impl<B: ObjectBackend> StorageRegistry<B> {
    /// Build one client per prefix over a shared backend.
    #[must_use]
    pub fn new(settings: Arc<StorageSettings>, backend: Arc<B>) -> Self {
        let client =
            |prefix| UnifiedStorage::new(prefix, Arc::clone(&settings), Arc::clone(&backend));

        Self {
            avatars: client(StoragePrefix::Avatars),
            diaries: client(StoragePrefix::Diaries),
            settings,
        }
    }

    /// Client for `prefix`.
    #[must_use]
    pub const fn get(&self, prefix: StoragePrefix) -> &UnifiedStorage<B> {
        match prefix {
            StoragePrefix::Avatars => &self.avatars,
            StoragePrefix::Diaries => &self.diaries,
        }
    }

    /// Shared settings.
    #[must_use]
    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryBackend;
    use chrono::TimeZone;

    fn storage(prefix: StoragePrefix) -> (UnifiedStorage<MemoryBackend>, Arc<MemoryBackend>) {
        let settings = Arc::new(StorageSettings::minio(
            "http://127.0.0.1:9000",
            "app",
            "minioadmin",
            "minioadmin",
            None,
        ));
        let backend = Arc::new(MemoryBackend::new());
        (
            UnifiedStorage::new(prefix, settings, Arc::clone(&backend)),
            backend,
        )
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_upload_writes_prefixed_key() {
        let (storage, backend) = storage(StoragePrefix::Avatars);

        let uploaded = storage
            .upload("u1/profile-1.png", b"png".to_vec(), Some("image/png"))
            .await
            .unwrap();

        assert_eq!(uploaded.path, "u1/profile-1.png");
        assert_eq!(backend.keys(), vec!["avatars/u1/profile-1.png"]);
        assert_eq!(
            backend.content_type("avatars/u1/profile-1.png").as_deref(),
            Some("image/png")
        );
    }

    #[tokio::test]
    async fn test_signed_upload_url_payload() {
        let (storage, _) = storage(StoragePrefix::Diaries);

        let before = Utc::now();
        let payload = storage
            .create_signed_upload_url("u1/a.png", "image/png", None)
            .await
            .unwrap();

        assert_eq!(payload.path, "u1/a.png");
        assert!(payload.url.contains("diaries/u1/a.png"));
        assert_eq!(
            payload.headers.get("Content-Type").map(String::as_str),
            Some("image/png")
        );
        let ttl = payload.expires_at - before;
        assert!(ttl >= chrono::Duration::seconds(599));
        assert!(ttl <= chrono::Duration::seconds(601));
    }

    #[tokio::test]
    async fn test_signed_upload_url_custom_ttl() {
        let (storage, _) = storage(StoragePrefix::Diaries);

        let payload = storage
            .create_signed_upload_url("u1/a.png", "image/png", Some(Duration::from_secs(60)))
            .await
            .unwrap();

        assert!(payload.expires_at - Utc::now() <= chrono::Duration::seconds(60));
    }

    #[tokio::test]
    async fn test_signed_upload_url_rejects_out_of_range_ttl() {
        let (storage, _) = storage(StoragePrefix::Diaries);

        for ttl in [
            Duration::ZERO,
            MAX_SIGNED_URL_TTL + Duration::from_secs(1),
            Duration::from_secs(u64::MAX),
        ] {
            let err = storage
                .create_signed_upload_url("u/a.png", "image/png", Some(ttl))
                .await
                .unwrap_err();
            assert!(matches!(err, StorageError::Configuration(_)));
        }

        let payload = storage
            .create_signed_upload_url("u/a.png", "image/png", Some(MAX_SIGNED_URL_TTL))
            .await
            .unwrap();
        assert!(payload.expires_at > Utc::now() + chrono::Duration::days(6));
    }

    #[tokio::test]
    async fn test_expires_at_serializes_as_rfc3339() {
        let (storage, _) = storage(StoragePrefix::Diaries);
        let payload = storage
            .create_signed_upload_url("u1/a.png", "image/png", None)
            .await
            .unwrap();

        let json = serde_json::to_value(&payload).unwrap();
        let raw = json["expires_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(raw).is_ok());
    }

    #[test]
    fn test_get_public_url() {
        let (storage, _) = storage(StoragePrefix::Avatars);
        assert_eq!(
            storage.get_public_url("u1/a.png"),
            "http://127.0.0.1:9000/app/avatars/u1/a.png"
        );
    }

    #[tokio::test]
    async fn test_list_strips_base_and_skips_markers() {
        let (storage, backend) = storage(StoragePrefix::Avatars);
        backend.insert("avatars/u1/", at(0));
        backend.insert("avatars/u1/a.png", at(1));
        backend.insert("avatars/u1/b.png", at(2));
        backend.insert("avatars/u2/c.png", at(3));
        backend.insert("diaries/u1/d.png", at(4));

        let items = storage
            .list(Some("u1"), ListOptions::default())
            .await
            .unwrap();

        let paths: Vec<_> = items.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["u1/a.png", "u1/b.png"]);
        assert_eq!(items[0].name, "a.png");
        assert_eq!(items[0].created_at, Some(at(1)));
        assert_eq!(items[0].updated_at, Some(at(1)));
    }

    #[tokio::test]
    async fn test_list_whole_prefix() {
        let (storage, backend) = storage(StoragePrefix::Avatars);
        backend.insert("avatars/u1/a.png", at(1));
        backend.insert("avatars/u2/c.png", at(3));

        let items = storage.list(None, ListOptions::default()).await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_list_sorts_by_creation_time() {
        let (storage, backend) = storage(StoragePrefix::Avatars);
        backend.insert("avatars/u1/a.png", at(5));
        backend.insert("avatars/u1/b.png", at(9));
        backend.insert("avatars/u1/c.png", at(1));

        let desc = storage
            .list(Some("u1"), ListOptions::newest_first(100))
            .await
            .unwrap();
        let names: Vec<_> = desc.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["b.png", "a.png", "c.png"]);

        let asc = storage
            .list(
                Some("u1"),
                ListOptions {
                    limit: 100,
                    sort_by: Some(SortOrder::Asc),
                },
            )
            .await
            .unwrap();
        let names: Vec<_> = asc.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["c.png", "a.png", "b.png"]);
    }

    #[tokio::test]
    async fn test_list_respects_limit() {
        let (storage, backend) = storage(StoragePrefix::Diaries);
        for i in 0..5 {
            backend.insert(&format!("diaries/u1/{i}.png"), at(i));
        }

        let items = storage
            .list(
                Some("u1"),
                ListOptions {
                    limit: 3,
                    sort_by: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_remove_is_one_batch() {
        let (storage, backend) = storage(StoragePrefix::Avatars);
        backend.insert("avatars/u1/a.png", at(1));
        backend.insert("avatars/u1/b.png", at(2));

        let removed = storage
            .remove(&["u1/a.png".to_string(), "u1/b.png".to_string()])
            .await
            .unwrap();

        assert_eq!(removed, vec!["u1/a.png", "u1/b.png"]);
        assert_eq!(
            backend.delete_calls(),
            vec![vec!["avatars/u1/a.png".to_string(), "avatars/u1/b.png".to_string()]]
        );
        assert!(backend.keys().is_empty());
    }

    #[tokio::test]
    async fn test_remove_empty_issues_no_request() {
        let (storage, backend) = storage(StoragePrefix::Avatars);
        let removed = storage.remove(&[]).await.unwrap();

        assert!(removed.is_empty());
        assert!(backend.delete_calls().is_empty());
    }

    #[tokio::test]
    async fn test_remove_failure_is_single_error() {
        let (storage, backend) = storage(StoragePrefix::Avatars);
        backend.insert("avatars/u1/a.png", at(1));
        backend.fail_deletes();

        let err = storage.remove(&["u1/a.png".to_string()]).await.unwrap_err();
        assert!(matches!(err, crate::storage::StorageError::Operation(_)));
        assert_eq!(backend.keys(), vec!["avatars/u1/a.png"]);
    }

    #[test]
    fn test_registry_dispatches_by_prefix() {
        let settings = Arc::new(StorageSettings::minio("http://m:9000", "app", "a", "s", None));
        let registry = StorageRegistry::new(settings, Arc::new(MemoryBackend::new()));

        for prefix in StoragePrefix::ALL {
            assert_eq!(registry.get(prefix).prefix(), prefix);
        }
        assert_eq!(registry.settings().public_base_url(), "http://m:9000/app");
    }
}
