//! Mapping of domain errors to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use kiroku_core::profile::ProfileImageError;
use kiroku_core::storage::StorageError;
use kiroku_shared::AppError;

/// Handler error rendered as `{"error": code, "message": text}`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// Wrapped application error.
    #[must_use]
    pub const fn inner(&self) -> &AppError {
        &self.0
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        let app = match err {
            e if e.is_validation() => AppError::Validation(message),
            StorageError::UnknownPrefix(_) => AppError::NotFound(message),
            StorageError::Unsupported(_) => AppError::NotSupported(message),
            StorageError::Configuration(_) => AppError::Internal(message),
            _ => AppError::ExternalService(message),
        };
        Self(app)
    }
}

impl From<ProfileImageError> for ApiError {
    fn from(err: ProfileImageError) -> Self {
        match err {
            ProfileImageError::Storage(storage) => storage.into(),
            // Upstream details stay in the logs.
            ProfileImageError::Fetch(_) => Self(AppError::ExternalService(
                "failed to fetch remote image".to_string(),
            )),
            ProfileImageError::NotAnImage | ProfileImageError::UnsupportedType(_) => {
                Self(AppError::Validation(err.to_string()))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "request failed");
        }

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": self.0.message(),
            })),
        )
            .into_response()
    }
}
