//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::credentials::UploadCredentials;
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Bytes transferred so far out of the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl UploadProgress {
    /// Whole percentage transferred, floored. An empty body counts as complete.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.loaded.min(self.total) * 100) / self.total) as u8
    }
}

/// Callback invoked as an upload advances. Must not block.
pub type ProgressFn = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait.
/// The upload pipeline writes every accepted file through it without
/// knowing where the bytes end up.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload `data` to the destination named in `credentials` under a fresh
    /// `{path}/{uuid}` key and return the object's location URL.
    ///
    /// `content_type` is stored with the object where the backend supports
    /// it. `progress` is called zero or more times while the transfer runs;
    /// how often depends on the backend's write granularity.
    async fn upload(
        &self,
        credentials: &UploadCredentials,
        content_type: &str,
        data: Bytes,
        progress: ProgressFn,
    ) -> StorageResult<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
