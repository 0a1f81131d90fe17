//! Agent repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Agent, AgentKind};

/// Repository interface for Agent persistence.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn upsert(&self, agent: &Agent) -> DomainResult<()>;
    async fn get(&self, id: &str) -> DomainResult<Option<Agent>>;
    async fn list(&self) -> DomainResult<Vec<Agent>>;

    /// Idle agents of the given kind, for Router candidate selection.
    async fn list_idle_by_kind(&self, kind: AgentKind) -> DomainResult<Vec<Agent>>;

    /// Force every agent to `idle` with no current task (admin operation).
    async fn reset_all(&self) -> DomainResult<()>;
}
