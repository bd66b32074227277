//! Media upload gateway
//!
//! Generic attachments go to S3-compatible object storage under a dated key;
//! legacy image uploads go to the ImgBB image host.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub mod imgbb;
pub mod s3;

pub use imgbb::ImgBbClient;
pub use s3::S3Storage;

/// Upload ceiling for object storage
pub const MAX_FILE_SIZE: usize = 100 * 1024 * 1024;

/// Upload ceiling for the image host
pub const MAX_IMAGE_SIZE: usize = 32 * 1024 * 1024;

/// Content type used when nothing better is known
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Object storage backend
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> anyhow::Result<()>;

    /// Public URL of a stored key
    fn public_url(&self, key: &str) -> String;
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File exceeds the maximum size of {} MB", .0 / (1024 * 1024))]
    TooLarge(usize),

    #[error("File is empty")]
    Empty,

    #[error("Missing multipart field '{0}'")]
    MissingField(&'static str),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{0}")]
    Storage(String),
}

/// Broad category of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    File,
}

impl MediaKind {
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.starts_with("image/") {
            MediaKind::Image
        } else if content_type.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::File
        }
    }
}

/// Response for an object storage upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub filename: String,
}

/// Response for an image host upload
#[derive(Debug, Clone, Serialize)]
pub struct ImageUploadResult {
    pub url: String,
}

/// Routes uploads to the configured backends
#[derive(Clone, Default)]
pub struct MediaGateway {
    store: Option<Arc<dyn ObjectStore>>,
    image_host: Option<Arc<ImgBbClient>>,
}

impl MediaGateway {
    pub fn new(store: Option<Arc<dyn ObjectStore>>, image_host: Option<ImgBbClient>) -> Self {
        Self {
            store,
            image_host: image_host.map(Arc::new),
        }
    }

    /// Store a file in object storage
    pub async fn upload_file(
        &self,
        filename: &str,
        declared_type: Option<&str>,
        data: Vec<u8>,
    ) -> Result<UploadResult, UploadError> {
        check_size(data.len(), MAX_FILE_SIZE)?;

        let store = self
            .store
            .as_ref()
            .ok_or(UploadError::NotConfigured("Object storage"))?;

        let content_type = resolve_content_type(declared_type, filename);
        let key = storage_key(filename, Utc::now());
        let size = data.len();

        store
            .put(&key, data, &content_type)
            .await
            .map_err(|e| UploadError::Storage(format!("Failed to store {}: {}", key, e)))?;

        info!("Stored upload {} ({} bytes, {})", key, size, content_type);

        Ok(UploadResult {
            url: store.public_url(&key),
            kind: MediaKind::from_content_type(&content_type),
            filename: filename.to_string(),
        })
    }

    /// Send an image to the image host
    pub async fn upload_image(&self, data: Vec<u8>) -> Result<ImageUploadResult, UploadError> {
        check_size(data.len(), MAX_IMAGE_SIZE)?;

        let host = self
            .image_host
            .as_ref()
            .ok_or(UploadError::NotConfigured("Image hosting"))?;

        let url = host
            .upload(&data)
            .await
            .map_err(|e| UploadError::Storage(format!("Image host upload failed: {}", e)))?;

        Ok(ImageUploadResult { url })
    }
}

fn check_size(size: usize, limit: usize) -> Result<(), UploadError> {
    if size == 0 {
        return Err(UploadError::Empty);
    }

    if size > limit {
        return Err(UploadError::TooLarge(limit));
    }

    Ok(())
}

/// Object key of the form `YYYY/MM/DD/<uuid><.ext>`
pub fn storage_key(filename: &str, now: DateTime<Utc>) -> String {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    format!("{}/{}{}", now.format("%Y/%m/%d"), Uuid::new_v4(), extension)
}

/// Use the declared content type unless it is missing or generic
pub fn resolve_content_type(declared: Option<&str>, filename: &str) -> String {
    match declared.map(str::trim) {
        Some(declared) if !declared.is_empty() && declared != OCTET_STREAM => {
            declared.to_string()
        }
        _ => detect_content_type(filename).to_string(),
    }
}

/// Content type inferred from the file extension
pub fn detect_content_type(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "zip" => "application/zip",
        "rar" => "application/vnd.rar",
        "txt" => "text/plain",
        _ => OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        objects: Mutex<Vec<(String, String, usize)>>,
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> anyhow::Result<()> {
            self.objects
                .lock()
                .unwrap()
                .push((key.to_string(), content_type.to_string(), data.len()));
            Ok(())
        }

        fn public_url(&self, key: &str) -> String {
            format!("https://cdn.example.com/{}", key)
        }
    }

    struct FailingStore;

    #[async_trait]
    impl ObjectStore for FailingStore {
        async fn put(&self, _key: &str, _data: Vec<u8>, _content_type: &str) -> anyhow::Result<()> {
            anyhow::bail!("access denied")
        }

        fn public_url(&self, key: &str) -> String {
            key.to_string()
        }
    }

    #[test]
    fn test_storage_key_layout() {
        let now = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();

        let key = storage_key("screenshot.PNG", now);
        assert!(key.starts_with("2024/03/07/"));
        assert!(key.ends_with(".PNG"));
        assert_eq!(key.len(), "2024/03/07/".len() + 36 + ".PNG".len());

        let bare = storage_key("README", now);
        assert_eq!(bare.len(), "2024/03/07/".len() + 36);
    }

    #[test]
    fn test_content_type_resolution() {
        assert_eq!(detect_content_type("clip.MP4"), "video/mp4");
        assert_eq!(detect_content_type("archive.tar.gz"), OCTET_STREAM);
        assert_eq!(resolve_content_type(Some("image/heic"), "a.heic"), "image/heic");
        assert_eq!(resolve_content_type(Some(OCTET_STREAM), "a.pdf"), "application/pdf");
        assert_eq!(resolve_content_type(None, "a.webp"), "image/webp");
    }

    #[test]
    fn test_media_kind() {
        assert_eq!(MediaKind::from_content_type("image/png"), MediaKind::Image);
        assert_eq!(MediaKind::from_content_type("video/webm"), MediaKind::Video);
        assert_eq!(MediaKind::from_content_type("application/pdf"), MediaKind::File);
    }

    #[tokio::test]
    async fn test_upload_file_to_store() {
        let store = Arc::new(MemoryStore::default());
        let gateway = MediaGateway::new(Some(store.clone()), None);

        let result = gateway
            .upload_file("bug.png", Some(OCTET_STREAM), vec![1, 2, 3])
            .await
            .unwrap();

        assert_eq!(result.kind, MediaKind::Image);
        assert_eq!(result.filename, "bug.png");
        assert!(result.url.starts_with("https://cdn.example.com/"));

        let objects = store.objects.lock().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].1, "image/png");
        assert_eq!(objects[0].2, 3);
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        let gateway = MediaGateway::new(Some(Arc::new(MemoryStore::default())), None);
        assert!(matches!(
            gateway.upload_file("empty.txt", None, vec![]).await,
            Err(UploadError::Empty)
        ));

        let unconfigured = MediaGateway::default();
        assert!(matches!(
            unconfigured.upload_file("a.txt", None, vec![1]).await,
            Err(UploadError::NotConfigured(_))
        ));
        assert!(matches!(
            unconfigured.upload_image(vec![1]).await,
            Err(UploadError::NotConfigured(_))
        ));

        let failing = MediaGateway::new(Some(Arc::new(FailingStore)), None);
        assert!(matches!(
            failing.upload_file("a.txt", None, vec![1]).await,
            Err(UploadError::Storage(_))
        ));
    }

    #[test]
    fn test_size_limits() {
        assert!(check_size(MAX_IMAGE_SIZE, MAX_IMAGE_SIZE).is_ok());
        assert!(matches!(
            check_size(MAX_IMAGE_SIZE + 1, MAX_IMAGE_SIZE),
            Err(UploadError::TooLarge(_))
        ));
        assert_eq!(
            UploadError::TooLarge(MAX_FILE_SIZE).to_string(),
            "File exceeds the maximum size of 100 MB"
        );
    }
}
