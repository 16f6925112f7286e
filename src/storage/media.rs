//! Media storage on local disk
//!
//! Handles validation and writing of uploaded images.
//! Files are served back by the router under `/uploads`.

use std::path::{Path, PathBuf};

use crate::config::StorageConfig;
use crate::data::EntityId;
use crate::error::AppError;
use crate::metrics::{MEDIA_BYTES_UPLOADED, MEDIA_UPLOADS_TOTAL};

/// URL path uploaded files are served from
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Accepted image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    /// Detect the image kind from the declared content type and file name
    ///
    /// Both must agree on one of the accepted formats.
    ///
    /// # Errors
    /// `Validation` for any other content type or extension
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>) -> Result<Self, AppError> {
        let rejected = || AppError::Validation("Only images are allowed".to_string());

        let by_mime = match content_type.map(|value| value.trim().to_ascii_lowercase()) {
            Some(mime) if mime == "image/jpeg" || mime == "image/jpg" => Self::Jpeg,
            Some(mime) if mime == "image/png" => Self::Png,
            Some(mime) if mime == "image/gif" => Self::Gif,
            _ => return Err(rejected()),
        };

        let extension = file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(rejected)?;
        let by_extension = match extension.as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            _ => return Err(rejected()),
        };

        if by_mime != by_extension {
            return Err(rejected());
        }
        Ok(by_mime)
    }

    /// File extension written to disk
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }
}

/// Media storage service
///
/// Writes images into the uploads directory and returns their public path.
pub struct MediaStorage {
    /// Directory files are written to
    root: PathBuf,
    /// Maximum accepted file size in bytes
    max_bytes: usize,
}

impl MediaStorage {
    /// Create new media storage
    ///
    /// Creates the uploads directory if it doesn't exist.
    pub async fn new(config: &StorageConfig) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(&config.uploads_dir)
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to create uploads directory {}: {}",
                    config.uploads_dir.display(),
                    e
                ))
            })?;

        Ok(Self {
            root: config.uploads_dir.clone(),
            max_bytes: config.max_upload_bytes,
        })
    }

    /// Directory uploaded files live in
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maximum accepted file size in bytes
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Store an image
    ///
    /// # Arguments
    /// * `prefix` - File name prefix, e.g. "post" or "comment"
    /// * `kind` - Validated image kind
    /// * `data` - File contents
    ///
    /// # Returns
    /// Public path such as "/uploads/post-01H....png"
    pub async fn store(
        &self,
        prefix: &str,
        kind: ImageKind,
        data: &[u8],
    ) -> Result<String, AppError> {
        if data.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        if data.len() > self.max_bytes {
            return Err(AppError::Validation(format!(
                "File too large (max {} bytes)",
                self.max_bytes
            )));
        }

        let file_name = format!(
            "{}-{}.{}",
            prefix,
            EntityId::new().0.to_ascii_lowercase(),
            kind.extension()
        );
        let path = self.root.join(&file_name);

        tokio::fs::write(&path, data).await.map_err(|e| {
            AppError::Storage(format!("Failed to write {}: {}", path.display(), e))
        })?;

        MEDIA_UPLOADS_TOTAL.inc();
        MEDIA_BYTES_UPLOADED.inc_by(data.len() as f64);
        tracing::debug!(file = %file_name, bytes = data.len(), "Stored upload");

        Ok(format!("{}/{}", UPLOADS_URL_PREFIX, file_name))
    }

    /// Delete a stored image by its public path
    ///
    /// Missing files are ignored.
    pub async fn delete(&self, public_path: &str) -> Result<(), AppError> {
        let Some(file_name) = public_path
            .strip_prefix(UPLOADS_URL_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && !name.contains('/') && !name.contains(".."))
        else {
            return Ok(());
        };

        match tokio::fs::remove_file(self.root.join(file_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to delete {}: {}",
                file_name, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn storage(max_bytes: usize) -> (MediaStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig {
            uploads_dir: temp_dir.path().join("uploads"),
            max_upload_bytes: max_bytes,
        };
        (MediaStorage::new(&config).await.unwrap(), temp_dir)
    }

    #[test]
    fn detect_requires_matching_image_type_and_extension() {
        assert_eq!(
            ImageKind::detect(Some("image/png"), Some("cat.PNG")).unwrap(),
            ImageKind::Png
        );
        assert_eq!(
            ImageKind::detect(Some("image/jpeg"), Some("cat.jpeg")).unwrap(),
            ImageKind::Jpeg
        );

        for (mime, name) in [
            (Some("image/png"), Some("cat.gif")),
            (Some("image/webp"), Some("cat.webp")),
            (Some("text/plain"), Some("notes.png")),
            (Some("image/png"), None),
            (None, Some("cat.png")),
        ] {
            assert!(
                matches!(ImageKind::detect(mime, name), Err(AppError::Validation(_))),
                "{mime:?} {name:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn store_writes_file_under_prefix() {
        let (storage, _temp_dir) = storage(1024).await;

        let path = storage.store("post", ImageKind::Gif, b"GIF89a").await.unwrap();
        assert!(path.starts_with("/uploads/post-"));
        assert!(path.ends_with(".gif"));

        let file_name = path.trim_start_matches("/uploads/");
        let written = tokio::fs::read(storage.root().join(file_name)).await.unwrap();
        assert_eq!(written, b"GIF89a");

        storage.delete(&path).await.unwrap();
        assert!(!storage.root().join(file_name).exists());
    }

    #[tokio::test]
    async fn store_rejects_oversized_files() {
        let (storage, _temp_dir) = storage(4).await;

        let result = storage.store("comment", ImageKind::Png, b"too large").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
