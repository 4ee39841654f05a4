//! Unified object storage over MinIO and Cloudflare R2.
//!
//! ```text
//! StorageEnv ──resolve──▶ StorageSettings ──┐
//!                                            ├──▶ StorageRegistry ──get(prefix)──▶ UnifiedStorage
//! OpendalBackend (S3 wire protocol) ─────────┘
//! ```
//!
//! All prefixes share one bucket; the prefix is the first key segment and
//! carries the upload policy (size limit, MIME types).

mod backend;
mod config;
mod error;
mod prefix;
mod service;

#[cfg(test)]
mod props;

pub use backend::{ObjectBackend, ObjectEntry, OpendalBackend};
pub use config::{StorageMode, StorageSettings};
pub use error::{StorageError, StorageResult};
pub use prefix::{PrefixConfig, StoragePrefix};
pub use service::{
    DEFAULT_LIST_LIMIT, DEFAULT_SIGNED_URL_TTL, ListOptions, MAX_SIGNED_URL_TTL,
    SignedUploadPayload, SortOrder, StorageListItem, StorageRegistry, UnifiedStorage,
    UploadedObject,
};
