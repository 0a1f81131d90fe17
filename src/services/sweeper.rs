//! Sweeper: background loop that reclaims tasks stuck in `assigned` or
//! `in_progress` past the configured wall-clock timeout.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tokio::time::interval;
use tracing::{info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Task, TaskStatus};
use crate::domain::ports::{AgentRepository, TaskFilter, TaskRepository};
use crate::services::event_bus::{EventBus, EventPayload};
use crate::services::resource_pool::ResourcePool;

const RECENT_RECOVERIES_CAPACITY: usize = 50;

pub struct Sweeper {
    task_repo: Arc<dyn TaskRepository>,
    agent_repo: Arc<dyn AgentRepository>,
    resource_pool: Arc<ResourcePool>,
    event_bus: Arc<EventBus>,
    timeout: chrono::Duration,
    recent_recoveries: RwLock<VecDeque<uuid::Uuid>>,
}

impl Sweeper {
    #[must_use]
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        agent_repo: Arc<dyn AgentRepository>,
        resource_pool: Arc<ResourcePool>,
        event_bus: Arc<EventBus>,
        timeout: Duration,
    ) -> Self {
        Self {
            task_repo,
            agent_repo,
            resource_pool,
            event_bus,
            timeout: chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::minutes(10)),
            recent_recoveries: RwLock::new(VecDeque::with_capacity(RECENT_RECOVERIES_CAPACITY)),
        }
    }

    /// Spawn the periodic sweep loop; returns a handle that exits once
    /// `shutdown` fires or is dropped.
    pub fn spawn(self: Arc<Self>, period: Duration, mut shutdown: broadcast::Receiver<()>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = self.sweep_once().await {
                            warn!(error = %err, "sweep pass failed");
                        }
                    }
                    _ = shutdown.recv() => {
                        info!("sweeper shutting down");
                        return;
                    }
                }
            }
        })
    }

    /// Run one sweep pass over stuck tasks. Public so it can be called
    /// directly in tests or a manual admin trigger, outside the timer loop.
    pub async fn sweep_once(&self) -> DomainResult<usize> {
        let mut reclaimed = 0;
        for status in [TaskStatus::Assigned, TaskStatus::InProgress] {
            let stuck = self.task_repo.list(TaskFilter { status: Some(status), agent_id: None, limit: None }).await?;
            for task in stuck {
                if Utc::now() - task.updated_at > self.timeout {
                    self.reclaim(task).await?;
                    reclaimed += 1;
                }
            }
        }
        Ok(reclaimed)
    }

    async fn reclaim(&self, mut task: Task) -> DomainResult<()> {
        task.transition_to(TaskStatus::Aborted)?;
        task.error_category = Some("timeout".to_string());
        task.error_message = Some(format!("task exceeded {}s timeout", self.timeout.num_seconds()));
        task.completed_at = Some(Utc::now());
        let agent_id = task.assigned_agent_id.clone();

        let task = match self.task_repo.update_cas(&task).await? {
            Some(updated) => updated,
            None => return Err(DomainError::OptimisticLockConflict { task_id: task.id, expected_version: task.version }),
        };

        self.resource_pool.release("local", task.id).await;
        self.resource_pool.release("premium_cloud", task.id).await;

        if let Some(agent_id) = agent_id {
            if let Ok(Some(mut agent)) = self.agent_repo.get(&agent_id).await {
                agent.release();
                agent.tasks_failed += 1;
                if let Err(err) = self.agent_repo.upsert(&agent).await {
                    tracing::error!(agent_id = %agent_id, task_id = %task.id, error = %err, "failed to persist agent release after reclaim");
                }
            }
        }

        self.event_bus.publish(EventPayload::TaskTimeout { task_id: task.id }).await;

        let mut recent = self.recent_recoveries.write().await;
        if recent.len() == RECENT_RECOVERIES_CAPACITY {
            recent.pop_front();
        }
        recent.push_back(task.id);
        Ok(())
    }

    #[must_use]
    pub async fn recent_recoveries(&self) -> Vec<uuid::Uuid> {
        self.recent_recoveries.read().await.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Agent, AgentKind, TaskType};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use uuid::Uuid;

    struct FakeTaskRepo(StdMutex<HashMap<Uuid, Task>>);
    #[async_trait]
    impl TaskRepository for FakeTaskRepo {
        async fn create(&self, task: &Task) -> DomainResult<()> {
            self.0.lock().unwrap().insert(task.id, task.clone());
            Ok(())
        }
        async fn get(&self, id: Uuid) -> DomainResult<Option<Task>> {
            Ok(self.0.lock().unwrap().get(&id).cloned())
        }
        async fn delete(&self, id: Uuid) -> DomainResult<()> {
            self.0.lock().unwrap().remove(&id);
            Ok(())
        }
        async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .values()
                .filter(|t| filter.status.is_none_or(|s| t.status == s))
                .cloned()
                .collect())
        }
        async fn get_ready_tasks(&self, _limit: usize) -> DomainResult<Vec<Task>> {
            Ok(vec![])
        }
        async fn update_cas(&self, task: &Task) -> DomainResult<Option<Task>> {
            let mut map = self.0.lock().unwrap();
            let mut updated = task.clone();
            updated.version += 1;
            map.insert(updated.id, updated.clone());
            Ok(Some(updated))
        }
        async fn claim_pending(&self, _task_id: Uuid, _agent_id: &str) -> DomainResult<Option<Task>> {
            Ok(None)
        }
        async fn count_by_status(&self) -> DomainResult<HashMap<TaskStatus, u64>> {
            Ok(HashMap::new())
        }
    }

    struct FakeAgentRepo;
    #[async_trait]
    impl AgentRepository for FakeAgentRepo {
        async fn upsert(&self, _agent: &Agent) -> DomainResult<()> {
            Ok(())
        }
        async fn get(&self, id: &str) -> DomainResult<Option<Agent>> {
            Ok(Some(Agent::new(id.to_string(), AgentKind::Coder)))
        }
        async fn list(&self) -> DomainResult<Vec<Agent>> {
            Ok(vec![])
        }
        async fn list_idle_by_kind(&self, _kind: AgentKind) -> DomainResult<Vec<Agent>> {
            Ok(vec![])
        }
        async fn reset_all(&self) -> DomainResult<()> {
            Ok(())
        }
    }

    fn stuck_task() -> Task {
        let mut t = Task::new("t", "d", TaskType::Code);
        t.status = TaskStatus::InProgress;
        t.assigned_agent_id = Some("coder-1".to_string());
        t.updated_at = Utc::now() - chrono::Duration::hours(1);
        t
    }

    #[tokio::test]
    async fn stuck_task_past_timeout_is_aborted_and_recorded() {
        let repo = Arc::new(FakeTaskRepo(StdMutex::new(HashMap::new())));
        let task = stuck_task();
        let task_id = task.id;
        repo.create(&task).await.unwrap();

        let sweeper = Sweeper::new(
            repo.clone(),
            Arc::new(FakeAgentRepo),
            Arc::new(ResourcePool::with_defaults(1, 2)),
            Arc::new(EventBus::default()),
            Duration::from_secs(60),
        );

        let reclaimed = sweeper.sweep_once().await.unwrap();
        assert_eq!(reclaimed, 1);
        let updated = repo.get(task_id).await.unwrap().unwrap();
        assert_eq!(updated.status, TaskStatus::Aborted);
        assert_eq!(updated.error_category.as_deref(), Some("timeout"));
        assert_eq!(sweeper.recent_recoveries().await, vec![task_id]);
    }

    #[tokio::test]
    async fn fresh_task_within_timeout_is_left_alone() {
        let repo = Arc::new(FakeTaskRepo(StdMutex::new(HashMap::new())));
        let mut task = stuck_task();
        task.updated_at = Utc::now();
        repo.create(&task).await.unwrap();

        let sweeper = Sweeper::new(
            repo.clone(),
            Arc::new(FakeAgentRepo),
            Arc::new(ResourcePool::with_defaults(1, 2)),
            Arc::new(EventBus::default()),
            Duration::from_secs(600),
        );

        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
    }
}
