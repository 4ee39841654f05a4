//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// JWT configuration shared with the auth service.
    pub jwt: JwtConfig,
    /// Upload configuration.
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// JWT configuration.
#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret key shared with the session issuer.
    pub secret: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[hidden]")
            .finish()
    }
}

/// Longest lifetime S3 signature version 4 allows for a presigned URL.
pub const MAX_SIGNED_URL_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Upload configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Lifetime of presigned upload URLs in seconds.
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            signed_url_ttl_secs: default_signed_url_ttl(),
        }
    }
}

fn default_signed_url_ttl() -> u64 {
    600 // 10 minutes
}

impl UploadConfig {
    /// Checks that the presigned URL lifetime is within `1..=604800`
    /// seconds.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the offending value.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if (1..=MAX_SIGNED_URL_TTL_SECS).contains(&self.signed_url_ttl_secs) {
            Ok(())
        } else {
            Err(config::ConfigError::Message(format!(
                "upload.signed_url_ttl_secs must be between 1 and {MAX_SIGNED_URL_TTL_SECS}, got {}",
                self.signed_url_ttl_secs
            )))
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("KIROKU").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.upload.validate()?;
        Ok(config)
    }
}

/// Raw object storage environment.
///
/// Read verbatim from the flat `USE_R2` / `MINIO_*` / `R2_*` variables.
/// Nothing is validated here; the storage settings resolver decides which
/// values are required for the selected backend.
#[derive(Clone, Deserialize)]
pub struct StorageEnv {
    /// Selects Cloudflare R2 instead of MinIO.
    #[serde(default)]
    pub use_r2: bool,
    /// MinIO endpoint URL.
    #[serde(default = "default_minio_endpoint")]
    pub minio_endpoint: String,
    /// MinIO bucket name.
    #[serde(default = "default_minio_bucket")]
    pub minio_bucket: String,
    /// MinIO access key.
    #[serde(default = "default_minio_credential")]
    pub minio_access_key: String,
    /// MinIO secret key.
    #[serde(default = "default_minio_credential")]
    pub minio_secret_key: String,
    /// Public base URL for MinIO objects.
    #[serde(default)]
    pub minio_public_base_url: Option<String>,
    /// Cloudflare account ID.
    #[serde(default)]
    pub r2_account_id: Option<String>,
    /// R2 access key ID.
    #[serde(default)]
    pub r2_access_key_id: Option<String>,
    /// R2 secret access key.
    #[serde(default)]
    pub r2_secret_access_key: Option<String>,
    /// R2 bucket name.
    #[serde(default)]
    pub r2_bucket: Option<String>,
    /// Public base URL for R2 objects (custom domain or r2.dev).
    #[serde(default)]
    pub r2_public_base_url: Option<String>,
}

fn default_minio_endpoint() -> String {
    "http://127.0.0.1:9000".to_string()
}

fn default_minio_bucket() -> String {
    "app".to_string()
}

fn default_minio_credential() -> String {
    "minioadmin".to_string()
}

impl Default for StorageEnv {
    fn default() -> Self {
        Self {
            use_r2: false,
            minio_endpoint: default_minio_endpoint(),
            minio_bucket: default_minio_bucket(),
            minio_access_key: default_minio_credential(),
            minio_secret_key: default_minio_credential(),
            minio_public_base_url: None,
            r2_account_id: None,
            r2_access_key_id: None,
            r2_secret_access_key: None,
            r2_bucket: None,
            r2_public_base_url: None,
        }
    }
}

impl std::fmt::Debug for StorageEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEnv")
            .field("use_r2", &self.use_r2)
            .field("minio_endpoint", &self.minio_endpoint)
            .field("minio_bucket", &self.minio_bucket)
            .field("minio_public_base_url", &self.minio_public_base_url)
            .field("r2_account_id", &self.r2_account_id)
            .field("r2_bucket", &self.r2_bucket)
            .field("r2_public_base_url", &self.r2_public_base_url)
            .finish_non_exhaustive()
    }
}

impl StorageEnv {
    /// Reads the storage variables from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be converted to its field type
    /// (for example `USE_R2=maybe`).
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()
    }
}
