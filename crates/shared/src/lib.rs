//! Shared configuration, errors, and session types for Kiroku.
//!
//! This crate provides common pieces used across all other crates:
//! - Application configuration and the raw object storage environment
//! - Application-wide error types
//! - Session claims and JWT validation

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;

pub use auth::Claims;
pub use config::{AppConfig, JwtConfig, MAX_SIGNED_URL_TTL_SECS, StorageEnv, UploadConfig};
pub use error::AppError;
pub use jwt::{JwtError, JwtService};
