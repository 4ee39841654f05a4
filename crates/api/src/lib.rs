//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Upload URL, listing and profile image routes
//! - Bearer session authentication middleware
//! - Mapping of domain errors to JSON error responses
//! - The remote image fetcher used by profile image import

pub mod error;
pub mod fetch;
pub mod middleware;
pub mod routes;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use kiroku_core::profile::{CleanupQueue, ProfileImageService};
use kiroku_core::storage::{OpendalBackend, StoragePrefix, StorageRegistry};
use kiroku_core::upload::ImageUploadService;
use kiroku_shared::{JwtService, UploadConfig};

pub use error::ApiError;
pub use fetch::ImageFetcher;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// JWT service for session validation.
    pub jwt_service: Arc<JwtService>,
    /// Storage clients per prefix.
    pub storage: Arc<StorageRegistry<OpendalBackend>>,
    /// Presigned upload URL generation.
    pub uploads: Arc<ImageUploadService<OpendalBackend>>,
    /// Profile image import.
    pub profile_images: Arc<ProfileImageService<OpendalBackend>>,
    /// HTTP client for remote profile images.
    pub image_fetcher: ImageFetcher,
}

impl AppState {
    /// Wire the services over a shared storage registry.
    #[must_use]
    pub fn new(
        jwt_service: JwtService,
        storage: Arc<StorageRegistry<OpendalBackend>>,
        cleanup: CleanupQueue,
        image_fetcher: ImageFetcher,
        upload: &UploadConfig,
    ) -> Self {
        let uploads = ImageUploadService::new(Arc::clone(&storage)).with_signed_url_ttl(
            std::time::Duration::from_secs(upload.signed_url_ttl_secs),
        );
        let profile_images =
            ProfileImageService::new(storage.get(StoragePrefix::Avatars).clone(), cleanup);

        Self {
            jwt_service: Arc::new(jwt_service),
            storage,
            uploads: Arc::new(uploads),
            profile_images: Arc::new(profile_images),
            image_fetcher,
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
