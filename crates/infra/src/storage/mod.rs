//! Object storage for variant images.
//!
//! ## Backends
//!
//! - `InMemoryObjectStorage` - tests/dev
//! - `FilesystemObjectStorage` - local directory served under a public base URL
//! - `S3ObjectStorage` (feature: s3) - Amazon S3 or an S3-compatible service
//!
//! Uploads are not coordinated with database writes: an object uploaded for a
//! write that later fails stays in storage.

mod filesystem;
mod image;
mod memory;
#[cfg(feature = "s3")]
mod s3;

pub use filesystem::FilesystemObjectStorage;
pub use image::{DEFAULT_IMAGE_TYPE, ImageUpload, decode_image, image_key};
pub use memory::{InMemoryObjectStorage, StoredObject};
#[cfg(feature = "s3")]
pub use s3::S3ObjectStorage;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    Upload(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Blob store addressed by key, publishing each object at a URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key` and return the object's public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError>;

    /// Remove the object stored under `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Recover the key from a URL previously returned by `put`.
    fn key_for_url(&self, url: &str) -> Option<String>;
}

/// Keys become path segments and URL suffixes; keep them flat and printable.
fn check_key(key: &str) -> Result<(), StorageError> {
    let flat = !key.is_empty()
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if flat {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

fn strip_base<'a>(base_url: &str, url: &'a str) -> Option<&'a str> {
    url.strip_prefix(base_url.trim_end_matches('/'))?
        .strip_prefix('/')
        .filter(|key| !key.is_empty())
}
