//! Task repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Task, TaskStatus};

/// Filter criteria for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub agent_id: Option<String>,
    pub limit: Option<usize>,
}

/// Repository interface for Task persistence.
///
/// All status-mutating operations are compare-and-set on `version` so the
/// Assigner, Executor, and Sweeper can race against the same row without a
/// shared lock: a write against a stale `version` affects zero rows rather
/// than clobbering a concurrent writer.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: &Task) -> DomainResult<()>;
    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>>;
    async fn delete(&self, id: Uuid) -> DomainResult<()>;
    async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>>;

    /// Next pending task in priority/FIFO order (spec: `priority DESC, created_at ASC`).
    async fn get_ready_tasks(&self, limit: usize) -> DomainResult<Vec<Task>>;

    /// CAS update of the whole row keyed on `id` + `version`; bumps `version`.
    /// Returns `Ok(None)` (not an error) when the row's current version no
    /// longer matches `task.version` — the caller decides whether to retry.
    async fn update_cas(&self, task: &Task) -> DomainResult<Option<Task>>;

    /// Atomically claim a `pending` task for `agent_id`, transitioning it to
    /// `assigned`. Returns `Ok(None)` if another caller claimed it first.
    async fn claim_pending(&self, task_id: Uuid, agent_id: &str) -> DomainResult<Option<Task>>;

    async fn count_by_status(&self) -> DomainResult<std::collections::HashMap<TaskStatus, u64>>;
}
