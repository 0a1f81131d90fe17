//! SQLite implementation of the ExecutionLogRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::ExecutionLogEntry;
use crate::domain::ports::ExecutionLogRepository;

#[derive(Clone)]
pub struct SqliteExecutionLogRepository {
    pool: SqlitePool,
}

impl SqliteExecutionLogRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExecutionLogRepository for SqliteExecutionLogRepository {
    async fn append(&self, entry: &ExecutionLogEntry) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO execution_log (id, task_id, step, action, input, observation,
               duration_ms, model_used, input_tokens, output_tokens, is_loop_detected, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(entry.id.to_string())
        .bind(entry.task_id.to_string())
        .bind(entry.step as i64)
        .bind(&entry.action)
        .bind(&entry.input)
        .bind(&entry.observation)
        .bind(entry.duration_ms as i64)
        .bind(&entry.model_used)
        .bind(entry.input_tokens as i64)
        .bind(entry.output_tokens as i64)
        .bind(i32::from(entry.is_loop_detected))
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_task(&self, task_id: Uuid) -> DomainResult<Vec<ExecutionLogEntry>> {
        let rows: Vec<LogRow> = sqlx::query_as("SELECT * FROM execution_log WHERE task_id = ? ORDER BY step ASC")
            .bind(task_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn next_step(&self, task_id: Uuid) -> DomainResult<u32> {
        let row: (Option<i64>,) =
            sqlx::query_as("SELECT MAX(step) FROM execution_log WHERE task_id = ?")
                .bind(task_id.to_string())
                .fetch_one(&self.pool)
                .await?;

        Ok(row.0.map_or(1, |max| max as u32 + 1))
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: String,
    task_id: String,
    step: i64,
    action: String,
    input: String,
    observation: String,
    duration_ms: i64,
    model_used: String,
    input_tokens: i64,
    output_tokens: i64,
    is_loop_detected: i64,
    created_at: String,
}

impl TryFrom<LogRow> for ExecutionLogEntry {
    type Error = crate::domain::errors::DomainError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: super::parse_uuid(&row.id)?,
            task_id: super::parse_uuid(&row.task_id)?,
            step: row.step as u32,
            action: row.action,
            input: row.input,
            observation: row.observation,
            duration_ms: row.duration_ms as u64,
            model_used: row.model_used,
            input_tokens: row.input_tokens as u64,
            output_tokens: row.output_tokens as u64,
            is_loop_detected: row.is_loop_detected != 0,
            created_at: super::parse_datetime(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::{Task, TaskType};
    use crate::domain::ports::TaskRepository;

    async fn setup() -> (SqliteExecutionLogRepository, Uuid) {
        let pool = create_migrated_test_pool().await.unwrap();
        let task_repo = crate::adapters::sqlite::SqliteTaskRepository::new(pool.clone());
        let task = Task::new("t", "d", TaskType::Code);
        task_repo.create(&task).await.unwrap();
        (SqliteExecutionLogRepository::new(pool), task.id)
    }

    #[tokio::test]
    async fn append_and_list_preserves_order() {
        let (repo, task_id) = setup().await;

        repo.append(&ExecutionLogEntry::new(task_id, 1, "shell_run", "ls", "a.txt", "haiku"))
            .await
            .unwrap();
        repo.append(&ExecutionLogEntry::new(task_id, 2, "shell_run", "cat a.txt", "hi", "haiku"))
            .await
            .unwrap();

        let entries = repo.list_for_task(task_id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].step, 1);
        assert_eq!(entries[1].step, 2);
    }

    #[tokio::test]
    async fn next_step_starts_at_one_and_increments() {
        let (repo, task_id) = setup().await;
        assert_eq!(repo.next_step(task_id).await.unwrap(), 1);

        repo.append(&ExecutionLogEntry::new(task_id, 1, "shell_run", "ls", "a.txt", "haiku"))
            .await
            .unwrap();

        assert_eq!(repo.next_step(task_id).await.unwrap(), 2);
    }
}
