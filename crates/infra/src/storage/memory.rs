use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{ObjectStorage, StorageError, check_key, strip_base};

/// In-memory object storage for tests/dev.
#[derive(Debug)]
pub struct InMemoryObjectStorage {
    base_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl InMemoryObjectStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().ok()?.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        match self.objects.read() {
            Ok(objects) => objects.keys().cloned().collect(),
            Err(_) => vec![],
        }
    }
}

impl Default for InMemoryObjectStorage {
    fn default() -> Self {
        Self::new("memory://images")
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        check_key(key)?;
        let mut objects = self
            .objects
            .write()
            .map_err(|_| StorageError::Upload("storage lock poisoned".to_string()))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("{}/{key}", self.base_url.trim_end_matches('/')))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        check_key(key)?;
        let mut objects = self
            .objects
            .write()
            .map_err(|_| StorageError::Delete("storage lock poisoned".to_string()))?;
        objects.remove(key);
        Ok(())
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        strip_base(&self.base_url, url).map(str::to_string)
    }
}
