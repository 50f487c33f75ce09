//! BlobStore port - the remote blob container.
//!
//! Blobs are opaque byte payloads addressed by name. Two write modes exist:
//! unconditional overwrite, and atomic create-if-absent. The latter is what
//! the advisory lock is built on.

use async_trait::async_trait;

use crate::domain::BlobError;

/// BlobStore wraps one blob container.
///
/// # Contract
/// - `get` / `delete` on a missing blob fail with [`BlobError::NotFound`]
/// - `put` replaces the whole blob; last writer wins
/// - `put_if_absent` fails with [`BlobError::AlreadyExists`] if the blob exists,
///   and exactly one of several concurrent callers succeeds
/// - `delete_if_unchanged` deletes only while the blob still holds exactly
///   `expected`; `Ok(false)` when the contents differ
/// - `create_container` is idempotent
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn create_container(&self) -> Result<(), BlobError>;

    async fn get(&self, name: &str) -> Result<Vec<u8>, BlobError>;

    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<(), BlobError>;

    async fn put_if_absent(&self, name: &str, bytes: Vec<u8>) -> Result<(), BlobError>;

    async fn delete(&self, name: &str) -> Result<(), BlobError>;

    async fn delete_if_unchanged(&self, name: &str, expected: &[u8]) -> Result<bool, BlobError>;
}
