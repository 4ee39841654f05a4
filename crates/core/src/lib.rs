//! Core storage logic for Kiroku.
//!
//! This crate has no web dependencies. It resolves the object storage
//! settings, exposes one storage client per prefix over an S3-compatible
//! backend, and implements the image upload and profile image retention
//! flows on top of it.
//!
//! # Modules
//!
//! - `storage` - Settings resolver, prefix policy, unified storage client
//! - `upload` - Presigned upload URL generation
//! - `profile` - Profile image import, retention and cleanup worker

pub mod profile;
pub mod storage;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;
