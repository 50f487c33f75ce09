//! BlobLock - advisory mutual exclusion on a single blob.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ulid::Ulid;

use crate::domain::BlobError;
use crate::domain::cache::deserialize_utc;
use crate::ports::{BlobStore, Clock};

pub const LOCK_BLOB_NAME: &str = "function_lock.json";

/// Advisory payload; only the blob's existence is authoritative.
///
/// `owner` makes every acquisition's bytes unique, so a stale lock can be
/// told apart from a fresh one taken at the same instant.
#[derive(Debug, Serialize, Deserialize)]
struct LockPayload {
    locked: bool,
    #[serde(deserialize_with = "deserialize_utc")]
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<String>,
}

/// BlobLock is held while its blob exists.
///
/// - acquire = create-if-absent, never blocks, never errors
/// - release = unconditional delete, safe to call twice
/// - no ownership token: any caller can release any holder's lock
///
/// Without a lease a holder that dies keeps the lock forever and every later
/// `acquire` returns `false` until the blob is removed by hand. With a lease,
/// a lock whose payload timestamp is older than the lease is broken on the
/// next `acquire`. Breaking deletes only the exact payload that was judged
/// stale, so of several concurrent breakers at most one takes the lock.
pub struct BlobLock {
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    name: String,
    lease: Option<Duration>,
}

impl BlobLock {
    pub fn new(blobs: Arc<dyn BlobStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            blobs,
            clock,
            name: LOCK_BLOB_NAME.to_string(),
            lease: None,
        }
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = Some(lease);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Try to take the lock. `false` means "held elsewhere, try later".
    pub async fn acquire(&self) -> bool {
        match self.try_create().await {
            Ok(()) => true,
            Err(BlobError::AlreadyExists(_)) => self.break_if_stale().await,
            Err(err) => {
                debug!(lock = %self.name, error = %err, "lock acquisition failed");
                false
            }
        }
    }

    /// Delete the lock blob. Errors (including "already absent") are logged only.
    pub async fn release(&self) {
        if let Err(err) = self.blobs.delete(&self.name).await {
            warn!(lock = %self.name, error = %err, "failed to release lock");
        }
    }

    /// Run `critical` while holding the lock; `None` if it could not be taken.
    ///
    /// The lock is released once `critical` completes, whatever it returns.
    /// If `critical` panics or the future is dropped midway, the release is
    /// handed to the runtime instead.
    pub async fn with_lock<F, Fut, T>(&self, critical: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !self.acquire().await {
            return None;
        }
        let guard = ReleaseOnDrop {
            blobs: Some(Arc::clone(&self.blobs)),
            name: self.name.clone(),
        };
        let out = critical().await;
        guard.disarm();
        self.release().await;
        Some(out)
    }

    async fn try_create(&self) -> Result<(), BlobError> {
        let payload = LockPayload {
            locked: true,
            timestamp: self.clock.now(),
            owner: Some(Ulid::new().to_string()),
        };
        let body = serde_json::to_vec(&payload).unwrap_or_else(|_| b"{\"locked\":true}".to_vec());
        self.blobs.put_if_absent(&self.name, body).await
    }

    async fn break_if_stale(&self) -> bool {
        let Some(lease) = self.lease else {
            return false;
        };
        let observed = match self.blobs.get(&self.name).await {
            Ok(bytes) => bytes,
            // Released in between; one more attempt.
            Err(BlobError::NotFound(_)) => return self.try_create().await.is_ok(),
            Err(_) => return false,
        };
        let held_since = match serde_json::from_slice::<LockPayload>(&observed) {
            Ok(payload) => payload.timestamp,
            // Unknown payload: staleness cannot be proven.
            Err(_) => return false,
        };

        if self.clock.now() - held_since <= lease {
            return false;
        }

        warn!(lock = %self.name, held_since = %held_since, "breaking lock past its lease");
        match self.blobs.delete_if_unchanged(&self.name, &observed).await {
            Ok(true) | Err(BlobError::NotFound(_)) => self.try_create().await.is_ok(),
            Ok(false) => {
                debug!(lock = %self.name, "lock changed hands while breaking it");
                false
            }
            Err(err) => {
                debug!(lock = %self.name, error = %err, "failed to break stale lock");
                false
            }
        }
    }
}

/// Releases the lock from `Drop` unless disarmed.
struct ReleaseOnDrop {
    blobs: Option<Arc<dyn BlobStore>>,
    name: String,
}

impl ReleaseOnDrop {
    fn disarm(mut self) {
        self.blobs = None;
    }
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        let Some(blobs) = self.blobs.take() else {
            return;
        };
        let name = std::mem::take(&mut self.name);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(err) = blobs.delete(&name).await {
                        warn!(lock = %name, error = %err, "failed to release abandoned lock");
                    }
                });
            }
            Err(_) => warn!(lock = %name, "no runtime to release abandoned lock"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryBlobStore;
    use crate::ports::FixedClock;
    use async_trait::async_trait;
    use chrono::TimeZone;

    /// Hands control back to the scheduler after every read, so two
    /// acquirers joined on one task interleave between read and delete.
    struct YieldAfterGet(InMemoryBlobStore);

    #[async_trait]
    impl BlobStore for YieldAfterGet {
        async fn create_container(&self) -> Result<(), BlobError> {
            self.0.create_container().await
        }

        async fn get(&self, name: &str) -> Result<Vec<u8>, BlobError> {
            let out = self.0.get(name).await;
            tokio::task::yield_now().await;
            out
        }

        async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<(), BlobError> {
            self.0.put(name, bytes).await
        }

        async fn put_if_absent(&self, name: &str, bytes: Vec<u8>) -> Result<(), BlobError> {
            self.0.put_if_absent(name, bytes).await
        }

        async fn delete(&self, name: &str) -> Result<(), BlobError> {
            self.0.delete(name).await
        }

        async fn delete_if_unchanged(&self, name: &str, expected: &[u8]) -> Result<bool, BlobError> {
            self.0.delete_if_unchanged(name, expected).await
        }
    }

    fn fixture() -> (Arc<InMemoryBlobStore>, FixedClock, BlobLock) {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        let lock = BlobLock::new(blobs.clone(), Arc::new(clock.clone()));
        (blobs, clock, lock)
    }

    #[tokio::test]
    async fn second_acquire_fails_until_release() {
        let (_, _, lock) = fixture();
        assert!(lock.acquire().await);
        assert!(!lock.acquire().await);

        lock.release().await;
        assert!(lock.acquire().await);
    }

    #[tokio::test]
    async fn release_is_safe_when_not_held() {
        let (blobs, _, lock) = fixture();
        lock.release().await;
        lock.release().await;
        assert!(!blobs.contains(LOCK_BLOB_NAME).await);
    }

    #[tokio::test]
    async fn lock_blob_carries_advisory_timestamp() {
        let (blobs, _, lock) = fixture();
        assert!(lock.acquire().await);

        let raw: serde_json::Value =
            serde_json::from_slice(&blobs.get(LOCK_BLOB_NAME).await.unwrap()).unwrap();
        assert_eq!(raw["locked"], true);
        assert!(raw["timestamp"].as_str().unwrap().starts_with("2024-01-01T12:00:00"));
    }

    #[tokio::test]
    async fn abandoned_lock_stalls_forever_without_lease() {
        let (_, clock, lock) = fixture();
        assert!(lock.acquire().await);

        clock.advance(Duration::days(7));
        assert!(!lock.acquire().await);
    }

    #[tokio::test]
    async fn lease_breaks_stale_lock() {
        let (_, clock, lock) = fixture();
        let lock = lock.with_lease(Duration::minutes(5));
        assert!(lock.acquire().await);

        clock.advance(Duration::minutes(4));
        assert!(!lock.acquire().await);

        clock.advance(Duration::minutes(2));
        assert!(lock.acquire().await);
    }

    #[tokio::test]
    async fn concurrent_breakers_of_a_stale_lock_have_one_winner() {
        let blobs: Arc<dyn BlobStore> = Arc::new(YieldAfterGet(InMemoryBlobStore::new()));
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        let clock_handle: Arc<dyn Clock> = Arc::new(clock.clone());
        let lease = Duration::minutes(5);
        let holder = BlobLock::new(blobs.clone(), clock_handle.clone()).with_lease(lease);
        let a = BlobLock::new(blobs.clone(), clock_handle.clone()).with_lease(lease);
        let b = BlobLock::new(blobs.clone(), clock_handle).with_lease(lease);

        assert!(holder.acquire().await);
        clock.advance(Duration::minutes(10));

        let (got_a, got_b) = tokio::join!(a.acquire(), b.acquire());
        assert!(got_a ^ got_b, "a={got_a} b={got_b}");
        assert!(blobs.get(LOCK_BLOB_NAME).await.is_ok());
    }

    #[tokio::test]
    async fn lease_breaks_lock_written_with_naive_timestamp() {
        let (blobs, _, lock) = fixture();
        let lock = lock.with_lease(Duration::minutes(5));
        let legacy = br#"{"locked": true, "timestamp": "2024-01-01 11:00:00.123456"}"#;
        blobs.put(LOCK_BLOB_NAME, legacy.to_vec()).await.unwrap();

        assert!(lock.acquire().await);
        assert_ne!(blobs.get(LOCK_BLOB_NAME).await.unwrap(), legacy.to_vec());
    }

    async fn save_that_panics() -> u8 {
        panic!("save exploded")
    }

    #[tokio::test]
    async fn with_lock_releases_after_panic() {
        let (blobs, _, lock) = fixture();
        let lock = Arc::new(lock);

        let task = tokio::spawn({
            let lock = Arc::clone(&lock);
            async move { lock.with_lock(save_that_panics).await }
        });
        assert!(task.await.unwrap_err().is_panic());

        for _ in 0..10 {
            if !blobs.contains(LOCK_BLOB_NAME).await {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!blobs.contains(LOCK_BLOB_NAME).await);
        assert!(lock.acquire().await);
    }

    #[tokio::test]
    async fn with_lock_releases_after_error() {
        let (blobs, _, lock) = fixture();
        let out: Option<Result<(), &str>> = lock.with_lock(|| async { Err("save failed") }).await;

        assert_eq!(out, Some(Err("save failed")));
        assert!(!blobs.contains(LOCK_BLOB_NAME).await);
    }

    #[tokio::test]
    async fn with_lock_skips_work_under_contention() {
        let (_, _, lock) = fixture();
        assert!(lock.acquire().await);

        let out = lock.with_lock(|| async { "ran" }).await;
        assert!(out.is_none());
    }
}
