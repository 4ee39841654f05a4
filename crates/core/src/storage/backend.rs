//! Object store backends.
//!
//! `ObjectBackend` is the seam between the unified storage client and the
//! wire protocol. Production uses [`OpendalBackend`] configured for MinIO or
//! R2 from [`StorageSettings`]; tests substitute an in-memory backend.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::TryStreamExt;
use opendal::{Operator, services};

use super::config::StorageSettings;
use super::error::{StorageError, StorageResult};
use super::prefix::StoragePrefix;

/// One object returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Full object key.
    pub key: String,
    /// Last modification time reported by the provider.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Bucket-bound object store operations used by the storage client.
///
/// Keys are full object keys (prefix included). Implementations must be
/// thread-safe; the client shares them behind an `Arc`.
pub trait ObjectBackend: Send + Sync + 'static {
    /// Store `body` under `key`, overwriting any existing object.
    fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> impl Future<Output = StorageResult<()>> + Send;

    /// Presign a PUT of `key` valid for `ttl`. The uploader must send the
    /// same `Content-Type`.
    fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> impl Future<Output = StorageResult<String>> + Send;

    /// List at most `limit` objects whose key starts with `prefix`, from a
    /// single page. No continuation.
    fn list_objects(
        &self,
        prefix: &str,
        limit: usize,
    ) -> impl Future<Output = StorageResult<Vec<ObjectEntry>>> + Send;

    /// Delete every key in one batch request.
    fn delete_objects(&self, keys: &[String]) -> impl Future<Output = StorageResult<()>> + Send;
}

/// S3-compatible backend on Apache OpenDAL.
#[derive(Debug, Clone)]
pub struct OpendalBackend {
    operator: Operator,
}

impl OpendalBackend {
    /// Build an S3 operator for the configured MinIO or R2 endpoint.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the operator cannot be built.
    pub fn from_settings(settings: &StorageSettings) -> StorageResult<Self> {
        // Path-style addressing is the OpenDAL default; MinIO needs it and
        // R2 accepts it. All prefixes share the bucket.
        let builder = services::S3::default()
            .endpoint(settings.endpoint())
            .bucket(settings.resolve_bucket_name(StoragePrefix::Avatars))
            .access_key_id(settings.access_key_id())
            .secret_access_key(settings.secret_access_key())
            .region(settings.region())
            .disable_config_load()
            .disable_ec2_metadata();

        let operator = Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish();

        Ok(Self { operator })
    }

    /// Wrap an existing operator.
    #[must_use]
    pub fn from_operator(operator: Operator) -> Self {
        Self { operator }
    }

    /// In-process operator without presign support.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the operator cannot be built.
    pub fn in_memory() -> StorageResult<Self> {
        let operator = Operator::new(services::Memory::default())
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish();

        Ok(Self::from_operator(operator))
    }
}

impl ObjectBackend for OpendalBackend {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> StorageResult<()> {
        let mut write = self.operator.write_with(key, body);
        if let Some(content_type) = content_type {
            write = write.content_type(content_type);
        }

        write.await.map(|_| ()).map_err(StorageError::from)
    }

    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> StorageResult<String> {
        let presigned = self
            .operator
            .presign_write_with(key, ttl)
            .content_type(content_type)
            .await
            .map_err(StorageError::from)?;

        Ok(presigned.uri().to_string())
    }

    async fn list_objects(&self, prefix: &str, limit: usize) -> StorageResult<Vec<ObjectEntry>> {
        let mut lister = self
            .operator
            .lister_with(prefix)
            .recursive(true)
            .limit(limit)
            .await
            .map_err(StorageError::from)?;

        let mut entries = Vec::new();
        while entries.len() < limit {
            let Some(entry) = lister.try_next().await.map_err(StorageError::from)? else {
                break;
            };

            let last_modified = entry
                .metadata()
                .last_modified()
                .and_then(|ts| parse_timestamp(&ts.to_string()));

            entries.push(ObjectEntry {
                key: entry.path().to_string(),
                last_modified,
            });
        }

        Ok(entries)
    }

    async fn delete_objects(&self, keys: &[String]) -> StorageResult<()> {
        self.operator
            .delete_iter(keys.iter().cloned())
            .await
            .map_err(StorageError::from)
    }
}

/// Parse a provider timestamp rendered either as RFC 3339 or as
/// `YYYY-MM-DD HH:MM:SS[.f] UTC`.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    let naive = raw.strip_suffix(" UTC").unwrap_or(raw);
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|ts| ts.and_utc())
}
