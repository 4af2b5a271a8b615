use crate::credentials::UploadCredentials;
use crate::keys::generate_object_key;
use crate::traits::{ProgressFn, Storage, StorageError, StorageResult, UploadProgress};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{
    Attribute, Attributes, MultipartUpload, ObjectStore, PutMultipartOptions, PutOptions,
    PutPayload,
};
use std::ops::Range;

/// Part size for multipart uploads, the S3 minimum for all but the last part.
/// Bodies up to this size go in one request and report progress once, when
/// the request completes.
const PART_SIZE: usize = 5 * 1024 * 1024;

/// Object attributes carrying the file's MIME type.
fn content_attributes(content_type: &str) -> Attributes {
    let mut attributes = Attributes::new();
    if !content_type.is_empty() {
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
    }
    attributes
}

/// Byte ranges of the multipart parts for a body of `len` bytes.
fn part_ranges(len: usize) -> Vec<Range<usize>> {
    (0..len)
        .step_by(PART_SIZE)
        .map(|start| start..(start + PART_SIZE).min(len))
        .collect()
}

/// S3 storage implementation
///
/// Unlike a server-side store, the bucket, region and keys are not fixed:
/// each upload brings its own short-lived credentials, so a client is built
/// per upload.
#[derive(Clone, Default)]
pub struct S3Storage {
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub fn new(endpoint_url: Option<String>) -> Self {
        S3Storage { endpoint_url }
    }

    fn build_store(&self, credentials: &UploadCredentials) -> StorageResult<AmazonS3> {
        let access = &credentials.credentials;
        let mut builder = AmazonS3Builder::new()
            .with_region(credentials.region.clone())
            .with_bucket_name(credentials.bucket_name.clone())
            .with_access_key_id(access.access_key_id.clone())
            .with_secret_access_key(access.secret_access_key.clone());

        if let Some(ref token) = access.session_token {
            builder = builder.with_token(token.clone());
        }

        if let Some(ref endpoint) = self.endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))
    }

    /// Generate public URL for S3 object
    ///
    /// For AWS S3, uses the standard format: https://{bucket}.s3.{region}.amazonaws.com/{key}
    /// For S3-compatible providers, uses path-style: {endpoint}/{bucket}/{key}
    fn generate_url(&self, bucket: &str, region: &str, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, bucket, key)
        } else {
            format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key)
        }
    }

    async fn put_parts(
        store: &AmazonS3,
        location: &Path,
        content_type: &str,
        data: Bytes,
        progress: &ProgressFn,
    ) -> object_store::Result<()> {
        let total = data.len() as u64;

        if data.len() <= PART_SIZE {
            let opts = PutOptions::from(content_attributes(content_type));
            store
                .put_opts(location, PutPayload::from(data), opts)
                .await?;
            progress(UploadProgress {
                loaded: total,
                total,
            });
            return Ok(());
        }

        let opts = PutMultipartOptions::from(content_attributes(content_type));
        let mut upload = store.put_multipart_opts(location, opts).await?;
        let mut loaded = 0u64;

        for range in part_ranges(data.len()) {
            let part_len = range.len() as u64;
            if let Err(e) = upload.put_part(PutPayload::from(data.slice(range))).await {
                if let Err(abort_err) = upload.abort().await {
                    tracing::warn!(error = %abort_err, "Failed to abort multipart upload");
                }
                return Err(e);
            }
            loaded += part_len;
            progress(UploadProgress { loaded, total });
        }

        upload.complete().await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(
        &self,
        credentials: &UploadCredentials,
        content_type: &str,
        data: Bytes,
        progress: ProgressFn,
    ) -> StorageResult<String> {
        let store = self.build_store(credentials)?;
        let key = generate_object_key(&credentials.path);
        let location = Path::from(key.clone());
        let size = data.len() as u64;
        let bucket = credentials.bucket_name.as_str();

        let start = std::time::Instant::now();

        Self::put_parts(&store, &location, content_type, data, &progress)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        let url = self.generate_url(bucket, &credentials.region, &key);

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(url)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
