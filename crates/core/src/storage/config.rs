//! Storage settings: backend selection, key layout and public URLs.

use kiroku_shared::StorageEnv;

use super::error::StorageError;
use super::prefix::StoragePrefix;

/// Active object storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Self-hosted MinIO (local development).
    Minio,
    /// Cloudflare R2.
    R2,
}

impl StorageMode {
    /// Mode name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Minio => "minio",
            Self::R2 => "r2",
        }
    }
}

/// Resolved, immutable storage settings.
///
/// Built once at startup and shared by handle. All areas live in one bucket;
/// the prefix only changes the first key segment.
#[derive(Clone)]
pub struct StorageSettings {
    mode: StorageMode,
    endpoint: String,
    bucket: String,
    region: String,
    access_key_id: String,
    secret_access_key: String,
    public_base_url: String,
}

impl std::fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSettings")
            .field("mode", &self.mode)
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key_id", &"[hidden]")
            .field("secret_access_key", &"[hidden]")
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

impl StorageSettings {
    /// Region used for MinIO request signing.
    pub const MINIO_REGION: &'static str = "us-east-1";
    /// Region used for R2 request signing.
    pub const R2_REGION: &'static str = "auto";

    /// Resolve settings from the raw environment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Configuration` when `USE_R2` is set and any
    /// R2 value is missing or empty. This is meant to abort startup.
    pub fn resolve(env: &StorageEnv) -> Result<Self, StorageError> {
        if !env.use_r2 {
            return Ok(Self::minio(
                &env.minio_endpoint,
                &env.minio_bucket,
                &env.minio_access_key,
                &env.minio_secret_key,
                env.minio_public_base_url.as_deref(),
            ));
        }

        let account_id = require(env.r2_account_id.as_deref(), "R2_ACCOUNT_ID")?;
        let bucket = require(env.r2_bucket.as_deref(), "R2_BUCKET")?;
        let access_key_id = require(env.r2_access_key_id.as_deref(), "R2_ACCESS_KEY_ID")?;
        let secret_access_key =
            require(env.r2_secret_access_key.as_deref(), "R2_SECRET_ACCESS_KEY")?;
        let public_base_url = require(env.r2_public_base_url.as_deref(), "R2_PUBLIC_BASE_URL")?;

        Ok(Self::r2(
            account_id,
            bucket,
            access_key_id,
            secret_access_key,
            public_base_url,
        ))
    }

    /// MinIO settings. The public base URL defaults to `{endpoint}/{bucket}`.
    #[must_use]
    pub fn minio(
        endpoint: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str,
        public_base_url: Option<&str>,
    ) -> Self {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let public_base_url = public_base_url
            .filter(|url| !url.is_empty())
            .map_or_else(|| format!("{endpoint}/{bucket}"), ToString::to_string);

        Self {
            mode: StorageMode::Minio,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            endpoint,
            bucket: bucket.to_string(),
            region: Self::MINIO_REGION.to_string(),
            access_key_id: access_key.to_string(),
            secret_access_key: secret_key.to_string(),
        }
    }

    /// Cloudflare R2 settings for an account.
    #[must_use]
    pub fn r2(
        account_id: &str,
        bucket: &str,
        access_key_id: &str,
        secret_access_key: &str,
        public_base_url: &str,
    ) -> Self {
        Self {
            mode: StorageMode::R2,
            endpoint: format!("https://{account_id}.r2.cloudflarestorage.com"),
            bucket: bucket.to_string(),
            region: Self::R2_REGION.to_string(),
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Active backend.
    #[must_use]
    pub const fn mode(&self) -> StorageMode {
        self.mode
    }

    /// S3 endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Signing region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Access key ID.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Secret access key.
    #[must_use]
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Public base URL, without trailing slash.
    #[must_use]
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    /// Bucket holding objects of `prefix`. The same shared bucket for every
    /// prefix in a given mode.
    #[must_use]
    pub fn resolve_bucket_name(&self, _prefix: StoragePrefix) -> &str {
        &self.bucket
    }

    /// Object key of `relative_path` inside `prefix`.
    ///
    /// Leading slashes of `relative_path` are dropped; an empty path yields
    /// `"{prefix}/"`.
    #[must_use]
    pub fn resolve_object_key(&self, prefix: StoragePrefix, relative_path: &str) -> String {
        join_object_key(prefix.as_str(), relative_path)
    }

    /// Listing prefix for an optional sub-directory of `prefix`. Always ends
    /// with `/`.
    #[must_use]
    pub fn resolve_list_prefix(&self, prefix: StoragePrefix, path: Option<&str>) -> String {
        let normalized = path.map_or("", |p| p.trim_matches('/'));

        if normalized.is_empty() {
            return self.resolve_object_key(prefix, "");
        }

        self.resolve_object_key(prefix, &format!("{normalized}/"))
    }

    /// Public URL of `relative_path` inside `prefix`. No network access.
    #[must_use]
    pub fn build_public_url(&self, prefix: StoragePrefix, relative_path: &str) -> String {
        let key = self.resolve_object_key(prefix, relative_path);
        let object_path = key.strip_suffix('/').unwrap_or(&key);
        join_url(&self.public_base_url, object_path)
    }
}

fn require<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, StorageError> {
    value.filter(|v| !v.is_empty()).ok_or_else(|| {
        StorageError::configuration(format!(
            "environment variable {name} is required when USE_R2=true"
        ))
    })
}

fn join_object_key(prefix: &str, key: &str) -> String {
    let trimmed = key.trim_start_matches('/');
    if trimmed.is_empty() {
        return format!("{prefix}/");
    }
    format!("{prefix}/{trimmed}")
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
