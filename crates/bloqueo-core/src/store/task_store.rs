//! TaskStore - JSON-array-per-blob collection of task records.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{BlobError, BloqueoError, CollectionKey, Task, TaskStatus, Tid};
use crate::ports::BlobStore;

use super::to_pretty_json;

/// TaskStore reads and rewrites whole task collections.
///
/// # Concurrency
/// Every mutation is load → modify → save with no concurrency token, so two
/// writers racing on the same collection can lose one change (last writer
/// wins). This is accepted; the advisory lock is not used here.
///
/// # Failure modes
/// Reads fail soft: a missing or unreadable collection is empty. Writes do
/// not: `add` / `update` / `delete` refuse to touch a collection blob that
/// exists but cannot be decoded, so one bad record never gets the whole
/// collection overwritten.
#[derive(Clone)]
pub struct TaskStore {
    blobs: Arc<dyn BlobStore>,
}

impl TaskStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// All records of a collection.
    ///
    /// Fails soft: a missing blob or unparsable JSON yields an empty
    /// collection and a warning, never an error.
    pub async fn load_all(&self, key: &CollectionKey) -> Vec<Task> {
        match self.try_load_all(key).await {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!(key = %key, error = %err, "failed to load task collection; treating as empty");
                Vec::new()
            }
        }
    }

    /// Strict load for read-modify-write paths: only a missing blob is empty.
    async fn try_load_all(&self, key: &CollectionKey) -> Result<Vec<Task>, BloqueoError> {
        match self.blobs.get(key.as_str()).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(BlobError::NotFound(_)) => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Overwrite the collection blob with `tasks`. No merge.
    pub async fn save_all(&self, key: &CollectionKey, tasks: &[Task]) -> Result<(), BloqueoError> {
        let body = to_pretty_json(tasks)?;
        self.blobs.put(key.as_str(), body).await?;
        debug!(key = %key, count = tasks.len(), "task collection saved");
        Ok(())
    }

    pub async fn add(&self, task: Task, key: &CollectionKey) -> Result<(), BloqueoError> {
        let mut tasks = self.try_load_all(key).await?;
        tasks.push(task);
        self.save_all(key, &tasks).await
    }

    /// Lookup with legacy fallbacks, see [`find_task`].
    pub async fn get(&self, tid: &Tid, key: &CollectionKey) -> Option<Task> {
        let tasks = self.load_all(key).await;
        find_task(&tasks, tid).cloned()
    }

    /// Exact `tid` match only.
    pub async fn find_exact(&self, tid: &Tid, key: &CollectionKey) -> Option<Task> {
        self.load_all(key)
            .await
            .into_iter()
            .find(|task| task.tid == *tid)
    }

    /// Replace the first record whose `tid` equals `task.tid`.
    ///
    /// Returns `false` and leaves the collection untouched when no record
    /// matches; callers are expected to check existence first.
    pub async fn update(&self, task: &Task, key: &CollectionKey) -> Result<bool, BloqueoError> {
        let mut tasks = self.try_load_all(key).await?;
        let Some(slot) = tasks.iter_mut().find(|t| t.tid == task.tid) else {
            debug!(key = %key, tid = %task.tid, "update matched no record");
            return Ok(false);
        };
        *slot = task.clone();
        self.save_all(key, &tasks).await?;
        Ok(true)
    }

    /// Remove every record with this `tid`. Returns whether anything was removed.
    pub async fn delete(&self, tid: &Tid, key: &CollectionKey) -> Result<bool, BloqueoError> {
        let mut tasks = self.try_load_all(key).await?;
        let before = tasks.len();
        tasks.retain(|task| task.tid != *tid);
        if tasks.len() == before {
            return Ok(false);
        }
        self.save_all(key, &tasks).await?;
        Ok(true)
    }

    pub async fn pending(&self, key: &CollectionKey) -> Vec<Task> {
        self.load_all(key)
            .await
            .into_iter()
            .filter(|task| task.status == TaskStatus::Pending)
            .collect()
    }
}

/// Resolve `tid` against a collection.
///
/// 1. first record whose `tid` or `historical_tids` contains it
/// 2. otherwise, if `tid` has at least two `-`-delimited segments, the first
///    record whose legacy `current_tid` equals the first segment and whose
///    `cliente` equals the second
///
/// Step 2 serves records whose identifier changed after creation. Nothing in
/// the current creation path writes `current_tid` / `cliente`, so it is only
/// reachable for legacy data, and two domains could collide on it.
pub fn find_task<'a>(tasks: &'a [Task], tid: &Tid) -> Option<&'a Task> {
    if let Some(task) = tasks.iter().find(|task| task.answers_to(tid)) {
        return Some(task);
    }

    let (base_tid, cliente) = tid.leading_segments()?;
    tasks.iter().find(|task| {
        task.current_tid.as_deref() == Some(base_tid) && task.cliente.as_deref() == Some(cliente)
    })
}
