//! Queue / Assigner: matches pending tasks to idle executor slots.

use std::sync::Arc;
use tracing::instrument;

use crate::domain::models::{AgentKind, Task, TaskStatus};
use crate::domain::ports::{AgentRepository, TaskRepository};
use crate::services::budget_guard::BudgetGuard;
use crate::services::cost_calculator::Tier;
use crate::services::event_bus::{EventBus, EventPayload};
use crate::services::resource_pool::ResourcePool;
use crate::services::router::{IdleAgent, Router};

/// A task the Assigner has just moved `pending -> assigned`, ready to hand
/// off to an Executor.
#[derive(Debug, Clone)]
pub struct ClaimedAssignment {
    pub task: Task,
    pub agent_id: String,
    pub tier: Tier,
    pub resource_class: &'static str,
}

pub struct Assigner {
    task_repo: Arc<dyn TaskRepository>,
    agent_repo: Arc<dyn AgentRepository>,
    resource_pool: Arc<ResourcePool>,
    budget_guard: Arc<BudgetGuard>,
    event_bus: Arc<EventBus>,
}

fn tier_class(tier: crate::services::cost_calculator::Tier) -> &'static str {
    use crate::services::cost_calculator::Tier;
    match tier {
        Tier::Free => "local",
        Tier::Cheap | Tier::Mid | Tier::Premium => "premium_cloud",
    }
}

impl Assigner {
    #[must_use]
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        agent_repo: Arc<dyn AgentRepository>,
        resource_pool: Arc<ResourcePool>,
        budget_guard: Arc<BudgetGuard>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            task_repo,
            agent_repo,
            resource_pool,
            budget_guard,
            event_bus,
        }
    }

    async fn idle_agents(&self) -> Vec<IdleAgent> {
        let mut idle = Vec::new();
        for kind in [AgentKind::Coder, AgentKind::Qa, AgentKind::Cto] {
            if let Ok(agents) = self.agent_repo.list_idle_by_kind(kind).await {
                idle.extend(agents.into_iter().map(|a| IdleAgent { id: a.id, kind: a.kind }));
            }
        }
        idle
    }

    /// Process one batch of ready tasks, returning the ones successfully
    /// claimed so the caller can hand each off to an Executor.
    #[instrument(skip(self), err)]
    pub async fn tick(&self, batch_size: usize) -> crate::domain::errors::DomainResult<Vec<ClaimedAssignment>> {
        let candidates = self.task_repo.get_ready_tasks(batch_size).await?;
        let mut assigned = Vec::new();

        for task in candidates {
            if let Some(claim) = self.assign_one(&task).await? {
                assigned.push(claim);
            }
        }
        Ok(assigned)
    }

    async fn assign_one(&self, task: &Task) -> crate::domain::errors::DomainResult<Option<ClaimedAssignment>> {
        let idle = self.idle_agents().await;
        let required_kind = task.required_agent.as_deref().and_then(parse_kind);
        let decision = Router::route(required_kind, task.complexity, task.current_iteration, &idle);

        if self.budget_guard.is_blocked_for_tier(decision.tier).await && !decision.escalate_to_human {
            // Budget blocks this tier at route time only; leave pending for a
            // cheaper route on the next tick rather than failing the task.
            return Ok(None);
        }

        if decision.escalate_to_human {
            let mut updated = task.clone();
            updated.transition_to(TaskStatus::NeedsHuman)?;
            self.task_repo.update_cas(&updated).await?;
            self.event_bus
                .publish(EventPayload::TaskUpdated {
                    task_id: task.id,
                    status: TaskStatus::NeedsHuman.as_str().to_string(),
                })
                .await;
            return Ok(None);
        }

        if decision.no_capacity {
            return Ok(None);
        }

        let Some(agent_id) = decision.agent_id.clone() else {
            return Ok(None);
        };

        let resource_class = tier_class(decision.tier);
        if !self.resource_pool.try_acquire(resource_class, task.id).await {
            return Ok(None);
        }

        let Some(claimed) = self.task_repo.claim_pending(task.id, &agent_id).await? else {
            self.resource_pool.release(resource_class, task.id).await;
            return Ok(None);
        };

        if let Ok(Some(mut agent)) = self.agent_repo.get(&agent_id).await {
            agent.assign(claimed.id);
            if let Err(err) = self.agent_repo.upsert(&agent).await {
                tracing::error!(agent_id = %agent_id, task_id = %claimed.id, error = %err, "failed to persist agent assignment");
            }
        }

        self.event_bus
            .publish(EventPayload::TaskAssigned { task_id: claimed.id, agent_id: agent_id.clone() })
            .await;
        Ok(Some(ClaimedAssignment { task: claimed, agent_id, tier: decision.tier, resource_class }))
    }
}

fn parse_kind(s: &str) -> Option<AgentKind> {
    match s {
        "coder" => Some(AgentKind::Coder),
        "qa" => Some(AgentKind::Qa),
        "cto" => Some(AgentKind::Cto),
        _ => None,
    }
}
