//! InMemoryBlobStore - process-local blob container.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::BlobError;
use crate::ports::BlobStore;

/// InMemoryBlobStore keeps every blob in a `HashMap` behind one async mutex.
///
/// `put_if_absent` checks and inserts under the same lock, so it has the
/// same exactly-one-winner semantics as a real create-only upload.
/// `delete_if_unchanged` compares and removes under that lock as well.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all stored blobs, sorted.
    pub async fn blob_names(&self) -> Vec<String> {
        let blobs = self.blobs.lock().await;
        let mut names: Vec<String> = blobs.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.blobs.lock().await.contains_key(name)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn create_container(&self) -> Result<(), BlobError> {
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>, BlobError> {
        self.blobs
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(name.to_string()))
    }

    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<(), BlobError> {
        self.blobs.lock().await.insert(name.to_string(), bytes);
        Ok(())
    }

    async fn put_if_absent(&self, name: &str, bytes: Vec<u8>) -> Result<(), BlobError> {
        match self.blobs.lock().await.entry(name.to_string()) {
            Entry::Occupied(_) => Err(BlobError::AlreadyExists(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(bytes);
                Ok(())
            }
        }
    }

    async fn delete(&self, name: &str) -> Result<(), BlobError> {
        self.blobs
            .lock()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(name.to_string()))
    }

    async fn delete_if_unchanged(&self, name: &str, expected: &[u8]) -> Result<bool, BlobError> {
        match self.blobs.lock().await.entry(name.to_string()) {
            Entry::Vacant(_) => Err(BlobError::NotFound(name.to_string())),
            Entry::Occupied(slot) if slot.get().as_slice() == expected => {
                slot.remove();
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn put_get_delete() {
        let store = InMemoryBlobStore::new();
        store.put("a.json", b"[]".to_vec()).await.unwrap();
        assert_eq!(store.get("a.json").await.unwrap(), b"[]");

        store.put("a.json", b"[1]".to_vec()).await.unwrap();
        assert_eq!(store.get("a.json").await.unwrap(), b"[1]");

        store.delete("a.json").await.unwrap();
        assert!(matches!(store.get("a.json").await, Err(BlobError::NotFound(_))));
        assert!(matches!(store.delete("a.json").await, Err(BlobError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_if_unchanged_compares_contents() {
        let store = InMemoryBlobStore::new();
        store.put("lock", b"old".to_vec()).await.unwrap();

        assert!(!store.delete_if_unchanged("lock", b"other").await.unwrap());
        assert!(store.contains("lock").await);

        assert!(store.delete_if_unchanged("lock", b"old").await.unwrap());
        assert!(!store.contains("lock").await);
        assert!(matches!(
            store.delete_if_unchanged("lock", b"old").await,
            Err(BlobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn put_if_absent_has_exactly_one_winner() {
        let store = Arc::new(InMemoryBlobStore::new());
        let mut handles = Vec::new();
        for i in 0..16u8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.put_if_absent("lock", vec![i]).await.is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.blob_names().await, vec!["lock".to_string()]);
    }
}
