//! Object storage for catalog item images.
//!
//! The catalog only needs two operations: upload bytes and get back a public
//! URL plus a handle for later deletion. The default implementation keeps
//! files under a local media directory served by the HTTP layer; a hosted
//! object store slots in behind the same trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Errors from image storage operations.
#[derive(Debug, Error)]
pub enum ImageStoreError {
    /// The uploaded content type is not an accepted image format.
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    /// The storage handle is not one this store issued.
    #[error("invalid image reference: {0}")]
    InvalidReference(String),

    /// Underlying storage failure.
    #[error("image storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// A stored image: where clients fetch it and the handle to delete it.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub url: String,
    pub public_id: String,
}

/// Object storage port for item images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store `bytes` and return its public URL and deletion handle.
    async fn upload(&self, bytes: &[u8], content_type: &str)
    -> Result<StoredImage, ImageStoreError>;

    /// Delete a previously uploaded image.
    async fn delete(&self, public_id: &str) -> Result<(), ImageStoreError>;
}

/// Accepted upload formats and their file extensions.
fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Filesystem-backed image store.
///
/// Files land in `root` under a generated name; the server exposes that
/// directory at `public_base` (e.g. `/media`).
pub struct FsImageStore {
    root: PathBuf,
    public_base: String,
}

impl FsImageStore {
    /// Create the store, ensuring `root` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn create(
        root: impl Into<PathBuf>,
        public_base: impl Into<String>,
    ) -> Result<Self, ImageStoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            public_base: public_base.into().trim_end_matches('/').to_owned(),
        })
    }

    /// Resolve a public id to its path, rejecting anything that could step
    /// outside the media root.
    fn path_for(&self, public_id: &str) -> Result<PathBuf, ImageStoreError> {
        let valid = !public_id.is_empty()
            && Path::new(public_id)
                .components()
                .all(|c| matches!(c, std::path::Component::Normal(_)))
            && !public_id.contains(['/', '\\']);
        if !valid {
            return Err(ImageStoreError::InvalidReference(public_id.to_owned()));
        }
        Ok(self.root.join(public_id))
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn upload(
        &self,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredImage, ImageStoreError> {
        let ext = extension_for(content_type)
            .ok_or_else(|| ImageStoreError::UnsupportedType(content_type.to_owned()))?;

        let public_id = format!("{}.{ext}", Uuid::new_v4());
        let path = self.path_for(&public_id)?;
        tokio::fs::write(&path, bytes).await?;

        Ok(StoredImage {
            url: format!("{}/{public_id}", self.public_base),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), ImageStoreError> {
        let path = self.path_for(public_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // Deleting an already-gone image is not an error
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn store(dir: &TempDir) -> FsImageStore {
        FsImageStore::create(dir.path(), "/media").await.unwrap()
    }

    #[tokio::test]
    async fn test_upload_writes_file_and_builds_url() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let stored = store.upload(b"png-bytes", "image/png").await.unwrap();

        assert!(stored.public_id.ends_with(".png"));
        assert_eq!(stored.url, format!("/media/{}", stored.public_id));
        let on_disk = std::fs::read(dir.path().join(&stored.public_id)).unwrap();
        assert_eq!(on_disk, b"png-bytes");
    }

    #[tokio::test]
    async fn test_upload_rejects_unknown_content_type() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        assert!(matches!(
            store.upload(b"...", "application/pdf").await,
            Err(ImageStoreError::UnsupportedType(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_file_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let stored = store.upload(b"bytes", "image/jpeg").await.unwrap();
        store.delete(&stored.public_id).await.unwrap();
        assert!(!dir.path().join(&stored.public_id).exists());

        // Second delete is a no-op
        store.delete(&stored.public_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        assert!(matches!(
            store.delete("../outside.png").await,
            Err(ImageStoreError::InvalidReference(_))
        ));
        assert!(matches!(
            store.delete("a/b.png").await,
            Err(ImageStoreError::InvalidReference(_))
        ));
    }
}
