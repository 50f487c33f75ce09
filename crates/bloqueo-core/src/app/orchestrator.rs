//! Orchestrator - the logic behind the HTTP endpoints.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{
    BloqueoError, CacheEntry, CollectionKey, CreateTaskRequest, Task, TaskStatus, TaskStatusView,
    Tid, Vdom,
};
use crate::ports::{Clock, IdGenerator};
use crate::store::{FinalStatusCache, TaskStore};

/// Orchestrator owns the task lifecycle.
///
/// # State machine
/// `pending -> executed`, `pending -> failed`. Terminal statuses are not
/// guarded against further updates; the store overwrites blindly.
pub struct Orchestrator {
    tasks: TaskStore,
    cache: FinalStatusCache,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl Orchestrator {
    pub fn new(
        tasks: TaskStore,
        cache: FinalStatusCache,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tasks,
            cache,
            ids,
            clock,
        }
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn cache(&self) -> &FinalStatusCache {
        &self.cache
    }

    /// Validate the request, mint a tid and append the task to its domain.
    pub async fn create_task(&self, request: CreateTaskRequest) -> Result<Task, BloqueoError> {
        let request = request.validate()?;
        let tid = self.ids.generate_tid(&request.vdom);
        let task = Task::pending(tid, request, self.clock.now());
        let key = CollectionKey::for_vdom(&task.vdom);

        self.tasks.add(task.clone(), &key).await?;
        info!(tid = %task.tid, vdom = %task.vdom, action = %task.action, key = %key, "task added");
        Ok(task)
    }

    /// `{tid, status}` of the record whose tid matches exactly.
    pub async fn status(&self, tid: &Tid) -> Result<Option<TaskStatusView>, BloqueoError> {
        let key = CollectionKey::for_vdom(&tid.vdom()?);
        Ok(self
            .tasks
            .find_exact(tid, &key)
            .await
            .map(|task| task.status_view()))
    }

    /// Move a task to `status` and stamp `updated_at`.
    ///
    /// The task is resolved with legacy fallbacks, so `tid` may be a
    /// historical identifier; the response echoes the tid as requested.
    /// Terminal outcomes are also recorded in the final-status cache; a
    /// failure there is logged and does not fail the update.
    pub async fn update_status(
        &self,
        tid: &Tid,
        status: TaskStatus,
    ) -> Result<TaskStatusView, BloqueoError> {
        let key = CollectionKey::for_vdom(&tid.vdom()?);
        let mut task = self
            .tasks
            .get(tid, &key)
            .await
            .ok_or_else(|| BloqueoError::NotFound(tid.to_string()))?;

        let previous = task.status;
        task.transition(status, self.clock.now());
        self.tasks.update(&task, &key).await?;
        info!(tid = %task.tid, from = %previous, to = %status, "task status updated");

        if status.is_terminal() {
            let cliente = task.cliente.as_deref().unwrap_or(task.vdom.as_str());
            if let Err(err) = self.cache.set_final(&task.tid, status, cliente).await {
                warn!(tid = %task.tid, error = %err, "failed to record final status");
            }
        }

        Ok(TaskStatusView {
            tid: tid.clone(),
            status,
        })
    }

    /// Pending tasks of one domain, for the polling agent.
    pub async fn pending_tasks(&self, vdom: &Vdom) -> Vec<Task> {
        self.tasks.pending(&CollectionKey::for_vdom(vdom)).await
    }

    /// Live cached terminal outcome of `tid`.
    pub async fn final_status(&self, tid: &Tid) -> Option<CacheEntry> {
        self.cache.get(tid).await
    }

    /// Remove a task record. Returns whether it existed.
    pub async fn delete_task(&self, tid: &Tid) -> Result<bool, BloqueoError> {
        let key = CollectionKey::for_vdom(&tid.vdom()?);
        let removed = self.tasks.delete(tid, &key).await?;
        if removed {
            info!(tid = %tid, key = %key, "task deleted");
        }
        Ok(removed)
    }

    pub async fn sweep_final_cache(&self) -> Result<usize, BloqueoError> {
        self.cache.sweep_expired().await
    }
}
