use crate::credentials::UploadCredentials;
use crate::keys::generate_object_key;
use crate::traits::{ProgressFn, Storage, StorageError, StorageResult, UploadProgress};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Bytes written between progress reports.
const WRITE_CHUNK_SIZE: usize = 256 * 1024;

/// Local filesystem storage implementation
///
/// Objects land in `{base_path}/{bucket}/{key}` and are addressed as
/// `{base_url}/{bucket}/{key}`. Useful for development and tests where no
/// bucket is available; the access keys in the credentials are ignored.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/pixelframe")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:3000/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert bucket and key to a filesystem path, refusing anything that
    /// could escape the base directory.
    fn key_to_path(&self, bucket: &str, storage_key: &str) -> StorageResult<PathBuf> {
        for part in [bucket, storage_key] {
            if part.is_empty()
                || part.contains("..")
                || part.starts_with('/')
                || part.contains('\\')
            {
                return Err(StorageError::InvalidKey(format!(
                    "Storage key contains invalid characters: {}",
                    part
                )));
            }
        }

        Ok(self.base_path.join(bucket).join(storage_key))
    }

    /// Generate public URL for file
    fn generate_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.base_url.trim_end_matches('/'), bucket, key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(
        &self,
        credentials: &UploadCredentials,
        content_type: &str,
        data: Bytes,
        progress: ProgressFn,
    ) -> StorageResult<String> {
        let key = generate_object_key(&credentials.path);
        let bucket = credentials.bucket_name.as_str();
        let path = self.key_to_path(bucket, &key)?;
        let total = data.len() as u64;

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let mut loaded = 0u64;
        for chunk in data.chunks(WRITE_CHUNK_SIZE) {
            file.write_all(chunk).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to write file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            loaded += chunk.len() as u64;
            progress(UploadProgress { loaded, total });
        }

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let url = self.generate_url(bucket, &key);

        // Plain files carry no metadata, so the content type is only logged.
        tracing::info!(
            key = %key,
            path = %path.display(),
            content_type = %content_type,
            size_bytes = total,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(url)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
