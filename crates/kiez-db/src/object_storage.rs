//! Object storage for item images and thumbnails.
//!
//! Uploaded originals live in the `item-images` bucket, generated
//! renditions in `item-thumbnails`. Downloads go through signed URLs so
//! the storage service can be fronted publicly; the filesystem backend
//! serves original bytes for transform requests, since resizing is the
//! storage service's concern, not ours.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use kiez_core::defaults::SIGNED_URL_TTL;
use kiez_core::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Bucket holding uploaded originals.
pub const IMAGES_BUCKET: &str = "item-images";

/// Bucket holding generated thumbnail renditions.
pub const THUMBNAILS_BUCKET: &str = "item-thumbnails";

/// Raw byte storage, pluggable per deployment.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data to the specified path.
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Read data from the specified path.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete data at the specified path.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check if data exists at the specified path.
    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Filesystem storage backend. Paths are `{base}/{bucket}/{key}`.
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Join a caller-supplied path under the base directory. Keys come
    /// from URLs and client uploads, so only plain relative components
    /// are accepted; `..`, `.`, and absolute paths never reach the
    /// filesystem.
    fn full_path(&self, path: &str) -> Result<PathBuf> {
        let rel = std::path::Path::new(path);
        let plain = !path.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, std::path::Component::Normal(_)));
        if !plain {
            return Err(Error::Validation(format!("invalid storage path: {path}")));
        }
        Ok(self.base_path.join(rel))
    }

    /// Full write-read-delete round trip at startup, to catch filesystem
    /// issues (overlayfs quirks, permission errors, missing directories)
    /// before the first upload does.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join(".health-check");
        let test_file = test_dir.join("test.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await; // Best-effort cleanup

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path)?;
        debug!(
            storage_path = %path,
            full_path = %full_path.display(),
            size = data.len(),
            "object_storage: write"
        );

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "object_storage: create_dir_all failed");
                e
            })?;
        }

        // Atomic write: temp file + rename
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "object_storage: File::create failed");
            e
        })?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "object_storage: rename failed");
            e
        })?;

        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(path)?;
        Ok(fs::read(full_path).await?)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path)?;
        if fs::try_exists(&full_path).await? {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full_path = self.full_path(path)?;
        Ok(fs::try_exists(full_path).await?)
    }
}

/// Resize parameters carried on a download URL. The filesystem backend
/// ignores them and serves original bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transform {
    pub width: u32,
    pub quality: u32,
}

/// Bucket-aware facade over a [`StorageBackend`], with public and signed
/// URL generation.
#[derive(Clone)]
pub struct ObjectStore {
    backend: Arc<dyn StorageBackend>,
    public_base_url: String,
    signing_key: Vec<u8>,
}

impl ObjectStore {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        public_base_url: impl Into<String>,
        signing_key: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            backend,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            signing_key: signing_key.into(),
        }
    }

    pub async fn upload(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()> {
        self.backend.write(&format!("{bucket}/{key}"), data).await
    }

    pub async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.backend.read(&format!("{bucket}/{key}")).await
    }

    pub async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.backend.delete(&format!("{bucket}/{key}")).await
    }

    pub async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        self.backend.exists(&format!("{bucket}/{key}")).await
    }

    /// Stable public URL for an object (no expiry, no transform).
    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/storage/{}/{}", self.public_base_url, bucket, key)
    }

    /// Signed URL valid for [`SIGNED_URL_TTL`], optionally carrying resize
    /// parameters. Only the path and expiry are signed; transforms do not
    /// change what the caller may access.
    pub fn signed_url(&self, bucket: &str, key: &str, transform: Option<Transform>) -> String {
        self.signed_url_with_ttl(bucket, key, transform, SIGNED_URL_TTL)
    }

    pub fn signed_url_with_ttl(
        &self,
        bucket: &str,
        key: &str,
        transform: Option<Transform>,
        ttl: Duration,
    ) -> String {
        let expires = Utc::now().timestamp() + ttl.as_secs() as i64;
        let signature = self.sign(bucket, key, expires);
        let mut url = format!(
            "{}/storage/{}/{}?expires={}&signature={}",
            self.public_base_url, bucket, key, expires, signature
        );
        if let Some(t) = transform {
            url.push_str(&format!("&width={}&quality={}", t.width, t.quality));
        }
        url
    }

    /// Check a presented signature against the path and expiry. The
    /// comparison goes through `Mac::verify_slice`, which is constant
    /// time.
    pub fn verify(&self, bucket: &str, key: &str, expires: i64, signature: &str) -> Result<()> {
        if expires < Utc::now().timestamp() {
            return Err(Error::Unauthorized("signed URL has expired".into()));
        }
        let presented = hex::decode(signature)
            .map_err(|_| Error::Unauthorized("invalid URL signature".into()))?;
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .expect("HMAC accepts any key length");
        mac.update(format!("{bucket}/{key}:{expires}").as_bytes());
        mac.verify_slice(&presented)
            .map_err(|_| Error::Unauthorized("invalid URL signature".into()))
    }

    fn sign(&self, bucket: &str, key: &str, expires: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .expect("HMAC accepts any key length");
        mac.update(format!("{bucket}/{key}:{expires}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Sniff the content type of stored bytes, defaulting to JPEG.
    pub fn content_type(data: &[u8]) -> &'static str {
        infer::get(data).map(|k| k.mime_type()).unwrap_or("image/jpeg")
    }
}

/// Split a public or signed storage URL back into bucket and key.
/// Query parameters are dropped.
pub fn parse_storage_url(url: &str) -> Option<(String, String)> {
    let marker = "/storage/";
    let idx = url.find(marker)?;
    let after = &url[idx + marker.len()..];
    let after = after.split('?').next().unwrap_or(after);
    let (bucket, key) = after.split_once('/')?;
    if bucket.is_empty() || key.is_empty() {
        return None;
    }
    Some((bucket.to_string(), key.to_string()))
}

/// Key of a thumbnail rendition: `{key}_thumb_{size}.{ext}` next to the
/// original's key, in the thumbnails bucket.
pub fn thumbnail_key(original_key: &str, size: u32) -> String {
    match original_key.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_thumb_{size}.{ext}"),
        None => format!("{original_key}_thumb_{size}"),
    }
}
