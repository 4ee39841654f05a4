//! Upload URL and listing routes for any storage prefix.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppState, error::ApiError, middleware::AuthUser};
use kiroku_core::storage::{DEFAULT_LIST_LIMIT, ListOptions, SortOrder, StoragePrefix};
use kiroku_core::upload::{GenerateUploadUrlInput, UploadUrlResult};

/// Creates the upload routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/uploads/{prefix}/signed-url", post(create_signed_url))
        .route("/uploads/{prefix}", get(list_uploads))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for a presigned upload URL.
#[derive(Debug, Deserialize)]
pub struct SignedUrlRequest {
    /// Original file name.
    pub file_name: String,
    /// MIME type of the file.
    pub file_type: String,
    /// File size in bytes.
    pub file_size: u64,
}

/// Query parameters for listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Page size, at most 100.
    pub limit: Option<usize>,
    /// `asc` or `desc` by creation time.
    pub order: Option<SortOrder>,
}

/// One listed object.
#[derive(Debug, Serialize)]
pub struct ListItemResponse {
    /// File name.
    pub name: String,
    /// Path relative to the prefix.
    pub path: String,
    /// Public URL.
    pub public_url: String,
    /// Creation time, if reported.
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time, if reported.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Listing response.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    /// Objects of the caller, single page.
    pub items: Vec<ListItemResponse>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/uploads/{prefix}/signed-url`
/// Issue a presigned upload URL in the caller's folder of `prefix`.
async fn create_signed_url(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(prefix): Path<String>,
    Json(payload): Json<SignedUrlRequest>,
) -> Result<Json<UploadUrlResult>, ApiError> {
    let prefix: StoragePrefix = prefix.parse()?;

    let result = state
        .uploads
        .generate_upload_url(GenerateUploadUrlInput {
            user_id: auth.user_id().to_string(),
            file_name: payload.file_name,
            file_type: payload.file_type,
            file_size: payload.file_size,
            prefix,
        })
        .await?;

    Ok(Json(result))
}

/// GET `/uploads/{prefix}`
/// List the caller's own objects in `prefix`.
async fn list_uploads(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(prefix): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let prefix: StoragePrefix = prefix.parse()?;
    let storage = state.storage.get(prefix);

    let options = ListOptions {
        limit: query
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, DEFAULT_LIST_LIMIT),
        sort_by: query.order,
    };

    let items = storage.list(Some(auth.user_id()), options).await?;
    info!(user_id = %auth.user_id(), prefix = %prefix, count = items.len(), "listed uploads");

    let items = items
        .into_iter()
        .map(|item| ListItemResponse {
            public_url: storage.get_public_url(&item.path),
            name: item.name,
            path: item.path,
            created_at: item.created_at,
            updated_at: item.updated_at,
        })
        .collect();

    Ok(Json(ListResponse { items }))
}
