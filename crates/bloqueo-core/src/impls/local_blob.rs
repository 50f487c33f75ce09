//! LocalBlobStore - a directory acting as the blob container.
//!
//! One file per blob. Overwrites go through a temp file and a rename so a
//! reader never observes a half-written collection; create-if-absent relies
//! on `create_new`, which the OS performs atomically.
//!
//! `delete_if_unchanged` first renames the blob aside, so only one caller can
//! claim a given file, then compares. A blob that turns out to hold other
//! contents is linked back under its name unless a new blob already took it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use ulid::Ulid;

use crate::domain::BlobError;
use crate::ports::BlobStore;

pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Blob names must be a single, non-hidden path segment.
    fn path_for(&self, name: &str) -> Result<PathBuf, BlobError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && !name.contains('\0');
        if !valid {
            return Err(BlobError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn create_container(&self) -> Result<(), BlobError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| BlobError::from_io(&self.root.display().to_string(), e))
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.path_for(name)?;
        fs::read(&path).await.map_err(|e| BlobError::from_io(name, e))
    }

    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<(), BlobError> {
        let path = self.path_for(name)?;
        let tmp = self.root.join(format!(".{name}.{}.tmp", Ulid::new()));
        if let Err(e) = fs::write(&tmp, &bytes).await {
            return Err(BlobError::from_io(name, e));
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(BlobError::from_io(name, e));
        }
        Ok(())
    }

    async fn put_if_absent(&self, name: &str, bytes: Vec<u8>) -> Result<(), BlobError> {
        let path = self.path_for(name)?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| BlobError::from_io(name, e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| BlobError::from_io(name, e))?;
        file.flush().await.map_err(|e| BlobError::from_io(name, e))
    }

    async fn delete(&self, name: &str) -> Result<(), BlobError> {
        let path = self.path_for(name)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| BlobError::from_io(name, e))
    }

    async fn delete_if_unchanged(&self, name: &str, expected: &[u8]) -> Result<bool, BlobError> {
        let path = self.path_for(name)?;
        let claimed = self.root.join(format!(".{name}.{}.claimed", Ulid::new()));
        fs::rename(&path, &claimed)
            .await
            .map_err(|e| BlobError::from_io(name, e))?;

        let contents = fs::read(&claimed).await;
        if matches!(&contents, Ok(bytes) if bytes.as_slice() == expected) {
            fs::remove_file(&claimed)
                .await
                .map_err(|e| BlobError::from_io(name, e))?;
            return Ok(true);
        }

        // Not ours to delete: put it back. AlreadyExists means a newer blob
        // was created meanwhile and the claimed copy is stale.
        let restored = fs::hard_link(&claimed, &path).await;
        let _ = fs::remove_file(&claimed).await;
        match (contents, restored) {
            (Err(e), _) => Err(BlobError::from_io(name, e)),
            (Ok(_), Ok(())) => Ok(false),
            (Ok(_), Err(e)) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            (Ok(_), Err(e)) => Err(BlobError::from_io(name, e)),
        }
    }
}
