//! Profile images: import into `avatars` and retention of the newest one.
//!
//! After a successful import the user id is queued for cleanup. The cleanup
//! worker lists the user's avatars newest first and deletes all but the
//! first. Cleanup failures are logged and never reach the caller.

mod error;
mod service;
mod worker;

pub use error::ProfileImageError;
pub use service::{
    ProfileImageService, RETENTION_LIST_LIMIT, delete_old_profile_images, image_extension,
};
pub use worker::{CleanupQueue, spawn_cleanup_worker};
