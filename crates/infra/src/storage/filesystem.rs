//! Filesystem-based object storage.
//!
//! Objects are plain files directly under the base directory, named by key.
//! Something else (a static file server, a CDN origin) is expected to serve
//! that directory at `public_url`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{ObjectStorage, StorageError, check_key, strip_base};

pub struct FilesystemObjectStorage {
    base_path: PathBuf,
    public_url: String,
}

impl FilesystemObjectStorage {
    /// Creates the base directory if it doesn't exist.
    pub async fn new(base_path: impl AsRef<Path>, public_url: impl Into<String>) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).await?;
        Ok(Self {
            base_path,
            public_url: public_url.into(),
        })
    }

    fn path_for_key(&self, key: &str) -> Result<PathBuf, StorageError> {
        check_key(key)?;
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl ObjectStorage for FilesystemObjectStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        let path = self.path_for_key(key)?;

        // temp file + rename so readers never see a partial object
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &bytes)
            .await
            .map_err(|e| StorageError::Upload(format!("{}: {e}", temp_path.display())))?;
        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| StorageError::Upload(format!("{}: {e}", path.display())))?;

        debug!(key, size = bytes.len(), content_type, "stored object");
        Ok(format!("{}/{key}", self.public_url.trim_end_matches('/')))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for_key(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Delete(format!("{}: {e}", path.display()))),
        }
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        strip_base(&self.public_url, url).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_temp_storage() -> (FilesystemObjectStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FilesystemObjectStorage::new(temp_dir.path(), "http://localhost:8080/images")
            .await
            .unwrap();
        (storage, temp_dir)
    }

    #[tokio::test]
    async fn test_put_writes_file_and_returns_url() {
        let (storage, temp) = create_temp_storage().await;

        let url = storage.put("123_abc", b"image".to_vec(), "image/png").await.unwrap();

        assert_eq!(url, "http://localhost:8080/images/123_abc");
        assert_eq!(std::fs::read(temp.path().join("123_abc")).unwrap(), b"image");
        assert!(!temp.path().join("123_abc.tmp").exists());
    }

    #[tokio::test]
    async fn test_delete_removes_file_and_tolerates_missing() {
        let (storage, temp) = create_temp_storage().await;
        let url = storage.put("123_abc", b"image".to_vec(), "image/png").await.unwrap();

        let key = storage.key_for_url(&url).unwrap();
        storage.delete(&key).await.unwrap();
        assert!(!temp.path().join("123_abc").exists());

        storage.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_path_traversal_is_rejected() {
        let (storage, _temp) = create_temp_storage().await;
        let err = storage.put("../escape", b"x".to_vec(), "image/png").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
