//! Orchestrator: wires the Assigner, Executor, Sweeper, and Review Trigger
//! into the background control loop (spec §5): one Assigner loop, N
//! concurrent Executors (one per claimed task), one Sweeper, sharing a
//! resource pool, budget guard, and event bus.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{error, info, instrument};

use crate::domain::errors::DomainResult;
use crate::domain::models::{CodeReview, Config, ReviewStatus, Task, TaskType};
use crate::domain::ports::{AgentRepository, AgentRuntime, CodeReviewRepository, ExecutionLogRepository, TaskRepository};
use crate::services::budget_guard::{BudgetGuard, BudgetGuardConfig};
use crate::services::event_bus::{EventBus, EventPayload};
use crate::services::executor::Executor;
use crate::services::queue::{Assigner, ClaimedAssignment};
use crate::services::resource_pool::ResourcePool;
use crate::services::review_trigger::{ReviewTrigger, ReviewTriggerConfig};
use crate::services::sweeper::Sweeper;

/// How many ready tasks the Assigner considers on each tick.
const ASSIGN_BATCH_SIZE: usize = 10;
/// How often the Assigner looks for ready tasks.
const ASSIGN_INTERVAL: Duration = Duration::from_secs(1);

pub struct Orchestrator {
    assigner: Arc<Assigner>,
    executor: Arc<Executor>,
    sweeper: Arc<Sweeper>,
    review_trigger: Arc<ReviewTrigger>,
    task_repo: Arc<dyn TaskRepository>,
    review_repo: Arc<dyn CodeReviewRepository>,
    event_bus: Arc<EventBus>,
    sweep_interval: Duration,
}

impl Orchestrator {
    /// Assemble the control loop's services from shared repositories, an
    /// Agent Runtime connector, and the validated configuration tree.
    #[must_use]
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        agent_repo: Arc<dyn AgentRepository>,
        log_repo: Arc<dyn ExecutionLogRepository>,
        review_repo: Arc<dyn CodeReviewRepository>,
        runtime: Arc<dyn AgentRuntime>,
        config: &Config,
    ) -> Self {
        let event_bus = Arc::new(EventBus::default());
        let resource_pool = Arc::new(ResourcePool::with_defaults(config.local_slots, config.premium_slots));
        let budget_guard = Arc::new(
            BudgetGuard::new(BudgetGuardConfig {
                daily_limit_cents: config.daily_budget_cents,
                warning_threshold: config.budget_warning_threshold,
                enabled: true,
            })
            .with_event_bus(Arc::clone(&event_bus)),
        );

        let assigner = Arc::new(Assigner::new(
            Arc::clone(&task_repo),
            Arc::clone(&agent_repo),
            Arc::clone(&resource_pool),
            Arc::clone(&budget_guard),
            Arc::clone(&event_bus),
        ));
        let executor = Arc::new(Executor::new(
            Arc::clone(&task_repo),
            Arc::clone(&agent_repo),
            log_repo,
            runtime,
            Arc::clone(&resource_pool),
            budget_guard,
            Arc::clone(&event_bus),
        ));
        let sweeper = Arc::new(Sweeper::new(
            Arc::clone(&task_repo),
            agent_repo,
            resource_pool,
            Arc::clone(&event_bus),
            Duration::from_millis(config.task_timeout_ms),
        ));
        let review_trigger = Arc::new(ReviewTrigger::new(ReviewTriggerConfig {
            enabled: config.enable_reviews,
            min_complexity: config.review_min_complexity,
        }));

        Self {
            assigner,
            executor,
            sweeper,
            review_trigger,
            task_repo,
            review_repo,
            event_bus,
            sweep_interval: Duration::from_millis(config.sweeper_interval_ms),
        }
    }

    /// Drive the control loop until `shutdown` fires. The Sweeper runs as
    /// its own periodic task alongside the Assigner's tick loop; each
    /// claimed task is handed to its own concurrent Executor run.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> DomainResult<()> {
        let sweeper_handle = Arc::clone(&self.sweeper).spawn(self.sweep_interval, shutdown.resubscribe());
        let mut ticker = interval(ASSIGN_INTERVAL);
        info!(
            sweep_interval_ms = self.sweep_interval.as_millis() as u64,
            "orchestrator started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    Arc::clone(&self).tick_once().await;
                }
                _ = shutdown.recv() => {
                    info!("orchestrator shutting down");
                    break;
                }
            }
        }

        let _ = sweeper_handle.await;
        Ok(())
    }

    async fn tick_once(self: Arc<Self>) {
        match self.assigner.tick(ASSIGN_BATCH_SIZE).await {
            Ok(claims) => {
                for claim in claims {
                    let this = Arc::clone(&self);
                    tokio::spawn(async move { this.run_claim(claim).await });
                }
            }
            Err(err) => error!(error = %err, "assigner tick failed"),
        }
    }

    #[instrument(skip(self, claim), fields(task_id = %claim.task.id))]
    async fn run_claim(self: Arc<Self>, claim: ClaimedAssignment) {
        let ClaimedAssignment { task, agent_id, tier, resource_class } = claim;
        match self.executor.run(task, &agent_id, tier, resource_class).await {
            Ok(task) => self.handle_completed(task).await,
            Err(err) => error!(error = %err, "executor run failed"),
        }
    }

    /// Post-completion hook: review tasks finalize the `CodeReview` they
    /// back; ordinary tasks may spawn one (spec §4.11).
    async fn handle_completed(&self, task: Task) {
        if task.task_type == TaskType::Review {
            self.finalize_review(&task).await;
            return;
        }

        if !self.review_trigger.should_review(&task) {
            return;
        }

        match self.review_repo.get_for_task(task.id).await {
            Ok(Some(_)) => {}
            Ok(None) => self.enqueue_review(&task).await,
            Err(err) => error!(task_id = %task.id, error = %err, "failed to check for an existing review"),
        }
    }

    async fn enqueue_review(&self, task: &Task) {
        let review_task = self.review_trigger.build_review_task(task);
        if let Err(err) = self.task_repo.create(&review_task).await {
            error!(task_id = %task.id, error = %err, "failed to enqueue review task");
            return;
        }

        let mut review = CodeReview::pending(task.id);
        review.review_task_id = Some(review_task.id);
        if let Err(err) = self.review_repo.create(&review).await {
            error!(task_id = %task.id, error = %err, "failed to persist pending code review");
            return;
        }

        self.event_bus.publish(EventPayload::TaskCreated { task_id: review_task.id }).await;
    }

    async fn finalize_review(&self, review_task: &Task) {
        let Some(reviewed_task_id) = review_task.parent_task_id else {
            return;
        };
        if !matches!(review_task.status, crate::domain::models::TaskStatus::Completed) {
            // A failed or aborted review task leaves the CodeReview pending
            // for manual follow-up rather than scoring the original task.
            return;
        }

        // `finalize` computes a fresh-minted CodeReview keyed only by
        // `reviewed_task_id`; graft its verdict onto the pending record
        // `enqueue_review` already persisted, preserving that record's id.
        let mut record = match self.review_repo.get_for_task(reviewed_task_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                error!(task_id = %reviewed_task_id, "review task completed but no pending code review record exists");
                return;
            }
            Err(err) => {
                error!(task_id = %reviewed_task_id, error = %err, "failed to load pending code review");
                return;
            }
        };
        let verdict = self.review_trigger.finalize(reviewed_task_id, review_task);
        record.quality_score = verdict.quality_score;
        record.findings = verdict.findings;
        record.status = verdict.status;
        record.completed_at = verdict.completed_at;
        if let Err(err) = self.review_repo.update(&record).await {
            error!(task_id = %reviewed_task_id, error = %err, "failed to persist review verdict");
            return;
        }

        self.event_bus
            .publish(EventPayload::CodeReviewCompleted {
                task_id: reviewed_task_id,
                approved: matches!(verdict.status, ReviewStatus::Approved),
            })
            .await;
    }
}
