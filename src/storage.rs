use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::ApiError;

// 1. Upload Policy
/// UploadPolicy
///
/// Limits applied to every uploaded image before anything reaches the object store.
#[derive(Clone, Debug)]
pub struct UploadPolicy {
    /// Lowercase extensions without the leading dot.
    pub allowed_extensions: Vec<String>,
    pub max_file_bytes: usize,
    /// Per-request limits of `POST /api/upload/multiple`.
    pub max_files: usize,
    pub max_total_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_extensions: ["png", "jpg", "jpeg", "gif", "webp"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_file_bytes: 16 * 1024 * 1024,
            max_files: 10,
            max_total_bytes: 100 * 1024 * 1024,
        }
    }
}

impl UploadPolicy {
    /// Returns the lowercased extension when the file is acceptable.
    pub fn validate(&self, filename: &str, size: usize) -> Result<String, ApiError> {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| ApiError::validation(format!("File {filename:?} has no extension")))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ApiError::validation(format!(
                "File type .{extension} is not allowed; allowed types: {}",
                self.allowed_extensions.join(", ")
            )));
        }
        if size == 0 {
            return Err(ApiError::validation(format!("File {filename:?} is empty")));
        }
        if size > self.max_file_bytes {
            return Err(ApiError::validation(format!(
                "File {filename:?} exceeds the {} byte limit",
                self.max_file_bytes
            )));
        }
        Ok(extension)
    }

    /// Upper bound for a request body carrying `max_files` files, with room for multipart
    /// framing.
    pub fn request_body_limit(&self) -> usize {
        self.max_total_bytes.max(self.max_file_bytes) + 1024 * 1024
    }
}

/// object_key
///
/// `uploads/images/<sanitized stem>_<8 hex chars>.<ext>`. The stem keeps only ASCII
/// alphanumerics, `-` and `_`, which also strips any path components.
pub fn object_key(filename: &str, extension: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = base.rsplit_once('.').map(|(s, _)| s).unwrap_or(base);
    let mut sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        sanitized = "image".to_string();
    }
    let suffix = &Uuid::new_v4().simple().to_string()[..8];
    format!("uploads/images/{sanitized}_{suffix}.{extension}")
}

/// The public URL of a stored object.
pub fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

/// Inverse of `public_url`: the object key, if `url` points into our bucket.
pub fn key_from_url(base: &str, url: &str) -> Option<String> {
    let prefix = format!("{}/", base.trim_end_matches('/'));
    url.strip_prefix(&prefix)
        .filter(|key| key.starts_with("uploads/"))
        .map(str::to_string)
}

// 2. Blob store contract
/// StorageService
///
/// The blob store contract. `S3StorageClient` talks to S3/MinIO; `MockStorageService`
/// keeps objects in memory for tests.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if missing. Used in `Env::Local` for MinIO.
    async fn ensure_bucket_exists(&self);

    async fn store(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), String>;

    async fn delete(&self, key: &str) -> Result<(), String>;
}

// 3. S3 / MinIO client
/// S3StorageClient
///
/// `force_path_style(true)` is required for MinIO.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            // Usually "already owned by you".
            tracing::debug!("create_bucket {}: {:?}", self.bucket_name, e);
        }
    }

    async fn store(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), String> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), String> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

// 4. In-memory store
/// MockStorageService
///
/// Keeps stored objects in a shared map so tests can assert on what was written or deleted.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, every operation fails.
    pub should_fail: bool,
    pub objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn store(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), String> {
        if self.should_fail {
            return Err("mock storage: simulated failure".to_string());
        }
        let mut objects = self.objects.lock().map_err(|e| e.to_string())?;
        objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), String> {
        if self.should_fail {
            return Err("mock storage: simulated failure".to_string());
        }
        let mut objects = self.objects.lock().map_err(|e| e.to_string())?;
        objects.remove(key);
        Ok(())
    }
}

/// StorageState
///
/// The shared handle to the blob store held by `AppState`.
pub type StorageState = Arc<dyn StorageService>;
