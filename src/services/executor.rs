//! Executor: drives one task through a single attempt against the Agent
//! Runtime contract, recording its trace and classifying the terminal
//! outcome.

use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{instrument, warn};

use crate::domain::errors::{DomainResult, OrchestratorError};
use crate::domain::models::{Agent, Task, TaskStatus};
use crate::domain::ports::{
    AgentRepository, AgentRuntime, ExecutionLogRepository, RuntimeRequest, TaskRepository,
};
use crate::services::budget_guard::BudgetGuard;
use crate::services::cost_calculator::Tier;
use crate::services::event_bus::{EventBus, EventPayload};
use crate::services::loop_detector::{LoopDetector, Verdict};
use crate::services::resource_pool::ResourcePool;

const VALIDATION_TIMEOUT: Duration = Duration::from_secs(15);
const VALIDATION_OUTPUT_CAP: usize = 64 * 1024;

pub struct Executor {
    task_repo: Arc<dyn TaskRepository>,
    agent_repo: Arc<dyn AgentRepository>,
    log_repo: Arc<dyn ExecutionLogRepository>,
    runtime: Arc<dyn AgentRuntime>,
    resource_pool: Arc<ResourcePool>,
    budget_guard: Arc<BudgetGuard>,
    event_bus: Arc<EventBus>,
}

enum Outcome {
    Completed(serde_json::Value),
    Retry(OrchestratorError),
    Terminal(OrchestratorError),
    Aborted(OrchestratorError),
}

impl Executor {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        agent_repo: Arc<dyn AgentRepository>,
        log_repo: Arc<dyn ExecutionLogRepository>,
        runtime: Arc<dyn AgentRuntime>,
        resource_pool: Arc<ResourcePool>,
        budget_guard: Arc<BudgetGuard>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            task_repo,
            agent_repo,
            log_repo,
            runtime,
            resource_pool,
            budget_guard,
            event_bus,
        }
    }

    /// Run one attempt of an already-`assigned` task to completion.
    #[instrument(skip(self), fields(task_id = %task.id), err)]
    pub async fn run(&self, mut task: Task, agent_id: &str, tier: Tier, resource_class: &str) -> DomainResult<Task> {
        task.transition_to(TaskStatus::InProgress)?;
        task.assigned_agent_id = Some(agent_id.to_string());
        task.assigned_at = Some(chrono::Utc::now());
        task = self.cas_update(task).await?;
        self.event_bus
            .publish(EventPayload::TaskUpdated { task_id: task.id, status: TaskStatus::InProgress.as_str().to_string() })
            .await;

        let outcome = self.drive(&task, agent_id, tier).await;

        task = match outcome {
            Outcome::Completed(result) => {
                task.transition_to(TaskStatus::Completed)?;
                task.result = Some(result);
                task.completed_at = Some(chrono::Utc::now());
                task.error_message = None;
                task.error_category = None;
                task
            }
            Outcome::Retry(err) => {
                task.error_message = Some(err.to_string());
                task.error_category = Some(err.category().to_string());
                task.current_iteration += 1;
                if task.retries_exhausted() {
                    task.transition_to(TaskStatus::Failed)?;
                    task.completed_at = Some(chrono::Utc::now());
                } else {
                    task.transition_to(TaskStatus::Pending)?;
                    task.assigned_agent_id = None;
                }
                task
            }
            Outcome::Terminal(err) => {
                task.transition_to(TaskStatus::Failed)?;
                task.error_message = Some(err.to_string());
                task.error_category = Some(err.category().to_string());
                task.completed_at = Some(chrono::Utc::now());
                task
            }
            Outcome::Aborted(err) => {
                task.transition_to(TaskStatus::Aborted)?;
                task.error_message = Some(err.to_string());
                task.error_category = Some(err.category().to_string());
                task.completed_at = Some(chrono::Utc::now());
                task
            }
        };

        task = self.cas_update(task).await?;
        self.resource_pool.release(resource_class, task.id).await;
        self.release_agent(agent_id, task.status).await;

        self.event_bus
            .publish(EventPayload::TaskCompleted { task_id: task.id, status: task.status.as_str().to_string() })
            .await;
        Ok(task)
    }

    async fn cas_update(&self, task: Task) -> DomainResult<Task> {
        match self.task_repo.update_cas(&task).await? {
            Some(updated) => Ok(updated),
            None => Err(crate::domain::errors::DomainError::OptimisticLockConflict {
                task_id: task.id,
                expected_version: task.version,
            }),
        }
    }

    async fn release_agent(&self, agent_id: &str, final_status: TaskStatus) {
        if let Ok(Some(mut agent)) = self.agent_repo.get(agent_id).await {
            record_outcome(&mut agent, final_status);
            if let Err(err) = self.agent_repo.upsert(&agent).await {
                tracing::error!(agent_id = %agent_id, error = %err, "failed to persist agent release");
            }
        }
    }

    async fn drive(&self, task: &Task, agent_id: &str, tier: Tier) -> Outcome {
        let request = RuntimeRequest {
            task_id: task.id,
            agent_id: agent_id.to_string(),
            task_description: format!("{}\n\n{}", task.title, task.description),
            expected_output: None,
            use_premium: matches!(tier, Tier::Mid | Tier::Premium),
            model: None,
            max_iterations: task.max_iterations,
        };

        let (tx, mut rx) = mpsc::channel(32);
        let mut detector = LoopDetector::new();
        let mut aborted: Option<OrchestratorError> = None;

        let run = self.runtime.execute(request, tx);
        tokio::pin!(run);

        let response = loop {
            tokio::select! {
                biased;
                event = rx.recv() => {
                    let Some(event) = event else { continue };
                    let verdict = detector.check_and_record(&event.action, &event.input);
                    self.budget_guard.record_usage(event.input_tokens, event.output_tokens, &event.model_used).await;
                    let next_step = self.log_repo.next_step(task.id).await.unwrap_or(event.step);
                    let mut entry = crate::domain::models::ExecutionLogEntry::new(
                        task.id, next_step, &event.action, &event.input, &event.observation, &event.model_used,
                    );
                    entry.duration_ms = event.duration_ms;
                    entry.input_tokens = event.input_tokens;
                    entry.output_tokens = event.output_tokens;
                    entry.is_loop_detected = !matches!(verdict, Verdict::Ok);
                    let _ = self.log_repo.append(&entry).await;
                    self.event_bus
                        .publish(EventPayload::ToolCalled {
                            task_id: task.id,
                            step: next_step,
                            action: event.action.clone(),
                            is_loop_detected: entry.is_loop_detected,
                        })
                        .await;
                    if !matches!(verdict, Verdict::Ok) {
                        self.event_bus
                            .publish(EventPayload::LoopDetected { task_id: task.id, verdict: verdict.as_str().to_string() })
                            .await;
                    }
                    if matches!(verdict, Verdict::Abort) && aborted.is_none() {
                        aborted = Some(OrchestratorError::Loop {
                            verdict: verdict.as_str().to_string(),
                            reason: "global tool-call cap exceeded".to_string(),
                        });
                    }
                }
                result = &mut run => {
                    break result;
                }
            }
        };

        if let Some(err) = aborted {
            return Outcome::Aborted(err);
        }

        let response = match response {
            Ok(response) => response,
            Err(transport_err) => return Outcome::Retry(OrchestratorError::Transport(transport_err)),
        };

        if !response.success {
            use crate::domain::ports::RuntimeOutputStatus;
            let reason = response.output.failure_reason.clone().unwrap_or_default();
            return match response.output.status {
                RuntimeOutputStatus::HardFailure | RuntimeOutputStatus::Uncertain => {
                    Outcome::Retry(OrchestratorError::Internal(reason))
                }
                RuntimeOutputStatus::Success | RuntimeOutputStatus::SoftFailure => {
                    Outcome::Retry(OrchestratorError::Validation(reason))
                }
            };
        }

        match self.run_validation(task).await {
            Ok(true) | Ok(false) if task.validation_command.is_none() => {
                Outcome::Completed(serde_json::to_value(&response.output).unwrap_or_default())
            }
            Ok(true) => Outcome::Completed(serde_json::to_value(&response.output).unwrap_or_default()),
            Ok(false) => Outcome::Retry(OrchestratorError::Validation("validation command exited non-zero".to_string())),
            Err(err) => Outcome::Retry(err),
        }
    }

    /// Run `task.validation_command` if set, bounding wall time and output.
    /// Absent a validation command, this is vacuously a pass.
    async fn run_validation(&self, task: &Task) -> Result<bool, OrchestratorError> {
        let Some(command) = &task.validation_command else {
            return Ok(true);
        };

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OrchestratorError::Internal(format!("failed to spawn validation command: {e}")))?;

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();

        let wait = async {
            let status = child.wait().await?;
            let mut out = Vec::new();
            let mut err = Vec::new();
            if let Some(s) = stdout.as_mut() {
                let _ = read_capped(s, &mut out).await;
            }
            if let Some(s) = stderr.as_mut() {
                let _ = read_capped(s, &mut err).await;
            }
            Ok::<_, io::Error>(status)
        };

        match timeout(VALIDATION_TIMEOUT, wait).await {
            Ok(Ok(status)) => Ok(status.success()),
            Ok(Err(e)) => Err(OrchestratorError::Internal(format!("validation command I/O error: {e}"))),
            Err(_) => {
                warn!(task_id = %task.id, "validation command timed out");
                Err(OrchestratorError::Timeout)
            }
        }
    }
}

async fn read_capped(reader: &mut (impl tokio::io::AsyncRead + Unpin), out: &mut Vec<u8>) -> io::Result<()> {
    let mut buf = [0u8; 4096];
    loop {
        if out.len() >= VALIDATION_OUTPUT_CAP {
            return Ok(());
        }
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        out.extend_from_slice(&buf[..n]);
    }
}

fn record_outcome(agent: &mut Agent, final_status: TaskStatus) {
    match final_status {
        TaskStatus::Completed => agent.tasks_completed += 1,
        TaskStatus::Failed | TaskStatus::Aborted | TaskStatus::NeedsHuman => agent.tasks_failed += 1,
        TaskStatus::Pending | TaskStatus::Assigned | TaskStatus::InProgress => {}
    }
    agent.release();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{TaskType};
    use crate::domain::ports::{RuntimeMetrics, RuntimeOutput, RuntimeOutputStatus, RuntimeResponse, ToolCallEvent};
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
        async fn list(&self, _filter: crate::domain::ports::TaskFilter) -> DomainResult<Vec<Task>> {
            Ok(self.0.lock().unwrap().values().cloned().collect())
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
            Ok(Some(Agent::new(id.to_string(), crate::domain::models::AgentKind::Coder)))
        }
        async fn list(&self) -> DomainResult<Vec<Agent>> {
            Ok(vec![])
        }
        async fn list_idle_by_kind(&self, _kind: crate::domain::models::AgentKind) -> DomainResult<Vec<Agent>> {
            Ok(vec![])
        }
        async fn reset_all(&self) -> DomainResult<()> {
            Ok(())
        }
    }

    struct FakeLogRepo;
    #[async_trait]
    impl ExecutionLogRepository for FakeLogRepo {
        async fn append(&self, _entry: &crate::domain::models::ExecutionLogEntry) -> DomainResult<()> {
            Ok(())
        }
        async fn list_for_task(&self, _task_id: Uuid) -> DomainResult<Vec<crate::domain::models::ExecutionLogEntry>> {
            Ok(vec![])
        }
        async fn next_step(&self, _task_id: Uuid) -> DomainResult<u32> {
            Ok(1)
        }
    }

    struct SucceedingRuntime;
    #[async_trait]
    impl AgentRuntime for SucceedingRuntime {
        async fn execute(&self, _request: RuntimeRequest, events: mpsc::Sender<ToolCallEvent>) -> Result<RuntimeResponse, String> {
            let _ = events
                .send(ToolCallEvent {
                    step: 1,
                    action: "write_file".to_string(),
                    input: "main.rs".to_string(),
                    observation: "ok".to_string(),
                    duration_ms: 10,
                    model_used: "claude-haiku".to_string(),
                    input_tokens: 100,
                    output_tokens: 100,
                })
                .await;
            Ok(RuntimeResponse {
                success: true,
                output: RuntimeOutput {
                    status: RuntimeOutputStatus::Success,
                    confidence: 0.9,
                    files_created: vec!["main.rs".to_string()],
                    commands_executed: vec![],
                    actual_output: Some("done".to_string()),
                    failure_reason: None,
                    suggestions: vec![],
                },
                metrics: RuntimeMetrics { input_tokens: 100, output_tokens: 100, model_used: "claude-haiku".to_string(), wall_ms: 10 },
            })
        }
    }

    struct TransportFailingRuntime;
    #[async_trait]
    impl AgentRuntime for TransportFailingRuntime {
        async fn execute(&self, _request: RuntimeRequest, _events: mpsc::Sender<ToolCallEvent>) -> Result<RuntimeResponse, String> {
            Err("connection reset".to_string())
        }
    }

    fn make_executor(runtime: Arc<dyn AgentRuntime>) -> (Executor, Arc<FakeTaskRepo>) {
        let task_repo = Arc::new(FakeTaskRepo(StdMutex::new(HashMap::new())));
        let executor = Executor::new(
            task_repo.clone(),
            Arc::new(FakeAgentRepo),
            Arc::new(FakeLogRepo),
            runtime,
            Arc::new(ResourcePool::with_defaults(1, 2)),
            Arc::new(BudgetGuard::new(Default::default())),
            Arc::new(EventBus::default()),
        );
        (executor, task_repo)
    }

    /// The queue hands the executor a task it has already claimed, so every
    /// task entering `Executor::run` is `Assigned`, never bare `Pending`.
    fn assigned_task() -> Task {
        let mut task = Task::new("t", "d", TaskType::Code);
        task.status = TaskStatus::Assigned;
        task
    }

    #[tokio::test]
    async fn successful_run_without_validation_completes() {
        let (executor, _repo) = make_executor(Arc::new(SucceedingRuntime));
        let task = assigned_task();
        let result = executor.run(task, "coder-1", Tier::Free, "local").await.unwrap();
        assert_eq!(result.status, TaskStatus::Completed);
        assert!(result.result.is_some());
    }

    #[tokio::test]
    async fn transport_failure_retries_until_exhausted() {
        let (executor, _repo) = make_executor(Arc::new(TransportFailingRuntime));
        let mut task = assigned_task();
        task.max_iterations = 1;
        let result = executor.run(task, "coder-1", Tier::Free, "local").await.unwrap();
        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(result.error_category.as_deref(), Some("transport"));
    }

    #[tokio::test]
    async fn transport_failure_returns_to_pending_while_retries_remain() {
        let (executor, _repo) = make_executor(Arc::new(TransportFailingRuntime));
        let mut task = assigned_task();
        task.max_iterations = 3;
        let result = executor.run(task, "coder-1", Tier::Free, "local").await.unwrap();
        assert_eq!(result.status, TaskStatus::Pending);
        assert_eq!(result.current_iteration, 1);
    }

    #[tokio::test]
    async fn validation_command_failure_is_retried_as_validation_category() {
        let (executor, _repo) = make_executor(Arc::new(SucceedingRuntime));
        let mut task = assigned_task();
        task.validation_command = Some("exit 1".to_string());
        task.max_iterations = 1;
        let result = executor.run(task, "coder-1", Tier::Free, "local").await.unwrap();
        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(result.error_category.as_deref(), Some("validation"));
    }

    #[tokio::test]
    async fn validation_command_success_completes() {
        let (executor, _repo) = make_executor(Arc::new(SucceedingRuntime));
        let mut task = assigned_task();
        task.validation_command = Some("exit 0".to_string());
        let result = executor.run(task, "coder-1", Tier::Free, "local").await.unwrap();
        assert_eq!(result.status, TaskStatus::Completed);
    }
}
