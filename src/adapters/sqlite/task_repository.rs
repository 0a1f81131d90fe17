//! SQLite implementation of the TaskRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ComplexitySource, Task, TaskStatus, TaskType};
use crate::domain::ports::{TaskFilter, TaskRepository};

#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn create(&self, task: &Task) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO tasks (id, title, description, task_type, priority, required_agent,
               max_iterations, parent_task_id, complexity, complexity_source, complexity_reasoning,
               status, assigned_agent_id, assigned_at, completed_at, current_iteration, result,
               error_message, error_category, validation_command, created_at, updated_at, version)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(task.id.to_string())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.task_type.as_str())
        .bind(i32::from(task.priority))
        .bind(&task.required_agent)
        .bind(task.max_iterations as i64)
        .bind(task.parent_task_id.map(|id| id.to_string()))
        .bind(task.complexity)
        .bind(task.complexity_source.as_str())
        .bind(&task.complexity_reasoning)
        .bind(task.status.as_str())
        .bind(&task.assigned_agent_id)
        .bind(task.assigned_at.map(|t| t.to_rfc3339()))
        .bind(task.completed_at.map(|t| t.to_rfc3339()))
        .bind(task.current_iteration as i64)
        .bind(task.result.as_ref().map(ToString::to_string))
        .bind(&task.error_message)
        .bind(&task.error_category)
        .bind(&task.validation_command)
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .bind(task.version as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::TaskNotFound(id));
        }

        Ok(())
    }

    async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>> {
        let mut query = String::from("SELECT * FROM tasks WHERE 1=1");
        let mut status_binding = None;
        let mut agent_binding = None;

        if let Some(status) = filter.status {
            query.push_str(" AND status = ?");
            status_binding = Some(status.as_str().to_string());
        }
        if let Some(agent_id) = &filter.agent_id {
            query.push_str(" AND assigned_agent_id = ?");
            agent_binding = Some(agent_id.clone());
        }
        query.push_str(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        let mut q = sqlx::query_as::<_, TaskRow>(&query);
        if let Some(s) = &status_binding {
            q = q.bind(s);
        }
        if let Some(a) = &agent_binding {
            q = q.bind(a);
        }

        let rows: Vec<TaskRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn get_ready_tasks(&self, limit: usize) -> DomainResult<Vec<Task>> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            "SELECT * FROM tasks WHERE status = 'pending' ORDER BY priority DESC, created_at ASC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_cas(&self, task: &Task) -> DomainResult<Option<Task>> {
        let new_version = task.version + 1;
        let result = sqlx::query(
            r#"UPDATE tasks SET title = ?, description = ?, task_type = ?, priority = ?,
               required_agent = ?, max_iterations = ?, parent_task_id = ?, complexity = ?,
               complexity_source = ?, complexity_reasoning = ?, status = ?, assigned_agent_id = ?,
               assigned_at = ?, completed_at = ?, current_iteration = ?, result = ?,
               error_message = ?, error_category = ?, validation_command = ?, updated_at = ?,
               version = ?
               WHERE id = ? AND version = ?"#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.task_type.as_str())
        .bind(i32::from(task.priority))
        .bind(&task.required_agent)
        .bind(task.max_iterations as i64)
        .bind(task.parent_task_id.map(|id| id.to_string()))
        .bind(task.complexity)
        .bind(task.complexity_source.as_str())
        .bind(&task.complexity_reasoning)
        .bind(task.status.as_str())
        .bind(&task.assigned_agent_id)
        .bind(task.assigned_at.map(|t| t.to_rfc3339()))
        .bind(task.completed_at.map(|t| t.to_rfc3339()))
        .bind(task.current_iteration as i64)
        .bind(task.result.as_ref().map(ToString::to_string))
        .bind(&task.error_message)
        .bind(&task.error_category)
        .bind(&task.validation_command)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(new_version as i64)
        .bind(task.id.to_string())
        .bind(task.version as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(task.id).await
    }

    async fn claim_pending(&self, task_id: Uuid, agent_id: &str) -> DomainResult<Option<Task>> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"UPDATE tasks
               SET status = 'assigned', assigned_agent_id = ?, assigned_at = ?,
                   version = version + 1, updated_at = ?
               WHERE id = ? AND status = 'pending'"#,
        )
        .bind(agent_id)
        .bind(&now)
        .bind(&now)
        .bind(task_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(task_id).await
    }

    async fn count_by_status(&self) -> DomainResult<HashMap<TaskStatus, u64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT status, COUNT(*) FROM tasks GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = HashMap::new();
        for (status_str, count) in rows {
            if let Ok(status) = TaskStatus::from_str(&status_str) {
                counts.insert(status, count as u64);
            }
        }
        Ok(counts)
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    title: String,
    description: String,
    task_type: String,
    priority: i32,
    required_agent: Option<String>,
    max_iterations: i64,
    parent_task_id: Option<String>,
    complexity: f64,
    complexity_source: String,
    complexity_reasoning: String,
    status: String,
    assigned_agent_id: Option<String>,
    assigned_at: Option<String>,
    completed_at: Option<String>,
    current_iteration: i64,
    result: Option<String>,
    error_message: Option<String>,
    error_category: Option<String>,
    validation_command: Option<String>,
    created_at: String,
    updated_at: String,
    version: i64,
}

impl TryFrom<TaskRow> for Task {
    type Error = DomainError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let id = super::parse_uuid(&row.id)?;
        let parent_task_id = super::parse_optional_uuid(row.parent_task_id)?;

        let task_type = parse_task_type(&row.task_type)?;
        let status = row
            .status
            .parse::<TaskStatus>()
            .map_err(DomainError::Serialization)?;
        let complexity_source = parse_complexity_source(&row.complexity_source)?;

        let assigned_at = super::parse_optional_datetime(row.assigned_at)?;
        let completed_at = super::parse_optional_datetime(row.completed_at)?;
        let created_at = super::parse_datetime(&row.created_at)?;
        let updated_at = super::parse_datetime(&row.updated_at)?;

        let result = row
            .result
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e: serde_json::Error| DomainError::Serialization(e.to_string()))?;

        Ok(Self {
            id,
            title: row.title,
            description: row.description,
            task_type,
            priority: row.priority as u8,
            required_agent: row.required_agent,
            max_iterations: row.max_iterations as u32,
            parent_task_id,
            complexity: row.complexity,
            complexity_source,
            complexity_reasoning: row.complexity_reasoning,
            status,
            assigned_agent_id: row.assigned_agent_id,
            assigned_at,
            completed_at,
            current_iteration: row.current_iteration as u32,
            result,
            error_message: row.error_message,
            error_category: row.error_category,
            validation_command: row.validation_command,
            created_at,
            updated_at,
            version: row.version as u64,
        })
    }
}

fn parse_task_type(s: &str) -> DomainResult<TaskType> {
    match s {
        "code" => Ok(TaskType::Code),
        "test" => Ok(TaskType::Test),
        "review" => Ok(TaskType::Review),
        "refactor" => Ok(TaskType::Refactor),
        "debug" => Ok(TaskType::Debug),
        "decomposition" => Ok(TaskType::Decomposition),
        other => Err(DomainError::Serialization(format!("unknown task_type: {other}"))),
    }
}

fn parse_complexity_source(s: &str) -> DomainResult<ComplexitySource> {
    match s {
        "router" => Ok(ComplexitySource::Router),
        "haiku" => Ok(ComplexitySource::Haiku),
        "dual" => Ok(ComplexitySource::Dual),
        "override" => Ok(ComplexitySource::Override),
        other => Err(DomainError::Serialization(format!("unknown complexity_source: {other}"))),
    }
}
