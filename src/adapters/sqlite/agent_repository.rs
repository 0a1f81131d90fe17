//! SQLite implementation of the AgentRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Agent, AgentKind, AgentStatus};
use crate::domain::ports::AgentRepository;

#[derive(Clone)]
pub struct SqliteAgentRepository {
    pool: SqlitePool,
}

impl SqliteAgentRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentRepository for SqliteAgentRepository {
    async fn upsert(&self, agent: &Agent) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO agents (id, kind, status, current_task_id, tasks_completed, tasks_failed)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   kind = excluded.kind, status = excluded.status,
                   current_task_id = excluded.current_task_id,
                   tasks_completed = excluded.tasks_completed,
                   tasks_failed = excluded.tasks_failed"#,
        )
        .bind(&agent.id)
        .bind(agent.kind.as_str())
        .bind(status_str(agent.status))
        .bind(agent.current_task_id.map(|id| id.to_string()))
        .bind(agent.tasks_completed as i64)
        .bind(agent.tasks_failed as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &str) -> DomainResult<Option<Agent>> {
        let row: Option<AgentRow> = sqlx::query_as("SELECT * FROM agents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> DomainResult<Vec<Agent>> {
        let rows: Vec<AgentRow> = sqlx::query_as("SELECT * FROM agents ORDER BY id").fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_idle_by_kind(&self, kind: AgentKind) -> DomainResult<Vec<Agent>> {
        let rows: Vec<AgentRow> = sqlx::query_as("SELECT * FROM agents WHERE kind = ? AND status = 'idle' ORDER BY id")
            .bind(kind.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn reset_all(&self) -> DomainResult<()> {
        sqlx::query("UPDATE agents SET status = 'idle', current_task_id = NULL")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

const fn status_str(status: AgentStatus) -> &'static str {
    match status {
        AgentStatus::Idle => "idle",
        AgentStatus::Busy => "busy",
        AgentStatus::Paused => "paused",
        AgentStatus::Offline => "offline",
    }
}

fn parse_kind(s: &str) -> DomainResult<AgentKind> {
    match s {
        "coder" => Ok(AgentKind::Coder),
        "qa" => Ok(AgentKind::Qa),
        "cto" => Ok(AgentKind::Cto),
        other => Err(DomainError::Serialization(format!("unknown agent kind: {other}"))),
    }
}

fn parse_status(s: &str) -> DomainResult<AgentStatus> {
    match s {
        "idle" => Ok(AgentStatus::Idle),
        "busy" => Ok(AgentStatus::Busy),
        "paused" => Ok(AgentStatus::Paused),
        "offline" => Ok(AgentStatus::Offline),
        other => Err(DomainError::Serialization(format!("unknown agent status: {other}"))),
    }
}

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: String,
    kind: String,
    status: String,
    current_task_id: Option<String>,
    tasks_completed: i64,
    tasks_failed: i64,
}

impl TryFrom<AgentRow> for Agent {
    type Error = DomainError;

    fn try_from(row: AgentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            kind: parse_kind(&row.kind)?,
            status: parse_status(&row.status)?,
            current_task_id: super::parse_optional_uuid(row.current_task_id)?,
            tasks_completed: row.tasks_completed as u64,
            tasks_failed: row.tasks_failed as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup_test_repo() -> SqliteAgentRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteAgentRepository::new(pool)
    }

    #[tokio::test]
    async fn upsert_and_get_round_trips() {
        let repo = setup_test_repo().await;
        let agent = Agent::new("coder-1".into(), AgentKind::Coder);

        repo.upsert(&agent).await.unwrap();

        let retrieved = repo.get("coder-1").await.unwrap().unwrap();
        assert_eq!(retrieved.status, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn list_idle_by_kind_excludes_busy() {
        let repo = setup_test_repo().await;
        let idle = Agent::new("coder-1".into(), AgentKind::Coder);
        let mut busy = Agent::new("coder-2".into(), AgentKind::Coder);
        busy.assign(Uuid::new_v4());

        repo.upsert(&idle).await.unwrap();
        repo.upsert(&busy).await.unwrap();

        let idle_agents = repo.list_idle_by_kind(AgentKind::Coder).await.unwrap();
        assert_eq!(idle_agents.len(), 1);
        assert_eq!(idle_agents[0].id, "coder-1");
    }

    #[tokio::test]
    async fn reset_all_clears_assignments() {
        let repo = setup_test_repo().await;
        let mut busy = Agent::new("coder-1".into(), AgentKind::Coder);
        busy.assign(Uuid::new_v4());
        repo.upsert(&busy).await.unwrap();

        repo.reset_all().await.unwrap();

        let reset = repo.get("coder-1").await.unwrap().unwrap();
        assert_eq!(reset.status, AgentStatus::Idle);
        assert!(reset.current_task_id.is_none());
    }
}
