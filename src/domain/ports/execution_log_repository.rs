//! Execution log repository port (append-only).

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::ExecutionLogEntry;

#[async_trait]
pub trait ExecutionLogRepository: Send + Sync {
    /// Append one entry. Callers are responsible for assigning a `step` that
    /// is one greater than the highest existing step for `task_id`.
    async fn append(&self, entry: &ExecutionLogEntry) -> DomainResult<()>;

    async fn list_for_task(&self, task_id: Uuid) -> DomainResult<Vec<ExecutionLogEntry>>;

    async fn next_step(&self, task_id: Uuid) -> DomainResult<u32>;
}
