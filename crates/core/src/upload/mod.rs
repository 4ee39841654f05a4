//! Image upload orchestration.
//!
//! Validates a requested upload against the prefix policy, picks a unique
//! per-user object path and hands back a presigned PUT URL together with the
//! public URL the object will have once uploaded.

mod rules;
mod service;
mod types;

pub use rules::{MAX_FILE_NAME_LENGTH, validate_diary_image};
pub use service::ImageUploadService;
pub use types::{GenerateUploadUrlInput, UploadUrlResult};
