//! Domain rules for diary image uploads.

use crate::storage::{StorageError, StorageResult};

/// Longest accepted file name, in characters.
pub const MAX_FILE_NAME_LENGTH: usize = 255;

const FORBIDDEN_FILE_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Check the file name and reject empty files.
///
/// MIME type and size limit are checked afterwards against the prefix
/// policy.
///
/// # Errors
///
/// Returns `InvalidFileName` or `EmptyFile`.
pub fn validate_diary_image(file_name: &str, file_size: u64) -> StorageResult<()> {
    if file_name.is_empty() {
        return Err(StorageError::InvalidFileName(
            "file name must not be empty".to_string(),
        ));
    }

    if file_name.chars().count() > MAX_FILE_NAME_LENGTH {
        return Err(StorageError::InvalidFileName(format!(
            "file name must be at most {MAX_FILE_NAME_LENGTH} characters"
        )));
    }

    if file_name.contains(FORBIDDEN_FILE_NAME_CHARS) {
        return Err(StorageError::InvalidFileName(
            "file name contains forbidden characters".to_string(),
        ));
    }

    if file_size == 0 {
        return Err(StorageError::EmptyFile);
    }

    Ok(())
}
