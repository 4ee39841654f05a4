//! Diary image upload route.

use axum::{Json, Router, extract::State, routing::post};

use super::uploads::SignedUrlRequest;
use crate::{AppState, error::ApiError, middleware::AuthUser};
use kiroku_core::storage::StoragePrefix;
use kiroku_core::upload::{GenerateUploadUrlInput, UploadUrlResult};

/// Creates the diary routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/diary/images/signed-url", post(create_diary_image_url))
}

/// POST `/diary/images/signed-url`
/// Issue a presigned upload URL for a diary image.
async fn create_diary_image_url(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<SignedUrlRequest>,
) -> Result<Json<UploadUrlResult>, ApiError> {
    let input = GenerateUploadUrlInput {
        user_id: auth.user_id().to_string(),
        file_name: payload.file_name,
        file_type: payload.file_type,
        file_size: payload.file_size,
        prefix: StoragePrefix::Diaries,
    };

    let result = state
        .uploads
        .generate_diary_image_upload_url(input, auth.user_id())
        .await?;

    Ok(Json(result))
}
