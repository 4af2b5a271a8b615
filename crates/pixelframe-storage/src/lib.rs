//! Pixelframe Storage Library
//!
//! This crate provides the storage abstraction the upload pipeline writes
//! accepted files through, with implementations for S3 and the local
//! filesystem.
//!
//! # Storage key format
//!
//! Every upload is addressed by the short-lived credentials handed out by the
//! token service. Keys take the form `{path}/{uuid}`, where `path` is the
//! prefix named in those credentials and `uuid` is freshly generated per file.
//! Key generation is centralized in the `keys` module so all backends stay
//! consistent.

pub mod credentials;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use credentials::{AccessCredentials, UploadCredentials};
pub use factory::create_storage;
pub use keys::generate_object_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use pixelframe_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ProgressFn, Storage, StorageError, StorageResult, UploadProgress};
