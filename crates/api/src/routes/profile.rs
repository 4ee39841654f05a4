//! Profile image import route.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{AppState, error::ApiError, middleware::AuthUser};
use kiroku_shared::AppError;

/// Creates the profile routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/profile/image", post(import_profile_image))
}

/// Request body for importing a profile image.
#[derive(Debug, Deserialize)]
pub struct ImportProfileImageRequest {
    /// Remote image URL, e.g. the identity provider's avatar.
    pub image_url: String,
}

/// Imported profile image.
#[derive(Debug, Serialize)]
pub struct ImportProfileImageResponse {
    /// Public URL of the stored image.
    pub url: String,
}

/// POST `/profile/image`
/// Download a remote image and store it as the caller's profile image.
///
/// Older profile images are removed in the background.
async fn import_profile_image(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ImportProfileImageRequest>,
) -> Result<Json<ImportProfileImageResponse>, ApiError> {
    let url = state
        .image_fetcher
        .parse_url(&payload.image_url)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let image = state.image_fetcher.fetch(url).await.inspect_err(|e| {
        warn!(
            user_id = %auth.user_id(),
            image_url = %payload.image_url,
            error = %e,
            "failed to fetch profile image"
        );
    })?;

    let url = state
        .profile_images
        .upload_profile_image(auth.user_id(), image.body, &image.content_type)
        .await?;

    info!(user_id = %auth.user_id(), "profile image imported");
    Ok(Json(ImportProfileImageResponse { url }))
}
