//! Task CLI commands.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::output::{output, truncate, CommandOutput};
use crate::cli::types::TaskCommands;
use crate::domain::models::{Task, TaskType};
use crate::domain::ports::{TaskFilter, TaskRepository};

#[derive(Debug, serde::Serialize)]
pub struct TaskOutput {
    pub id: String,
    pub title: String,
    pub status: String,
    pub priority: u8,
    pub required_agent: Option<String>,
    pub complexity: f64,
    pub current_iteration: u32,
    pub max_iterations: u32,
}

impl From<&Task> for TaskOutput {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            title: task.title.clone(),
            status: task.status.as_str().to_string(),
            priority: task.priority,
            required_agent: task.required_agent.clone(),
            complexity: task.complexity,
            current_iteration: task.current_iteration,
            max_iterations: task.max_iterations,
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TaskListOutput {
    pub tasks: Vec<TaskOutput>,
    pub total: usize,
}

impl CommandOutput for TaskListOutput {
    fn to_human(&self) -> String {
        if self.tasks.is_empty() {
            return "No tasks found.".to_string();
        }

        let mut lines = vec![format!("Found {} task(s):\n", self.total)];
        lines.push(format!(
            "{:<36} {:<25} {:<12} {:<8}",
            "ID", "TITLE", "STATUS", "PRIORITY"
        ));
        lines.push("-".repeat(85));

        for task in &self.tasks {
            lines.push(format!(
                "{:<36} {:<25} {:<12} {:<8}",
                task.id,
                truncate(&task.title, 23),
                task.status,
                task.priority
            ));
        }

        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TaskDetailOutput {
    pub task: TaskOutput,
    pub description: String,
    pub complexity_reasoning: String,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl CommandOutput for TaskDetailOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Task: {}", self.task.title),
            format!("ID: {}", self.task.id),
            format!("Status: {}", self.task.status),
            format!("Priority: {}", self.task.priority),
            format!("Complexity: {:.2} ({})", self.task.complexity, self.complexity_reasoning),
        ];

        if let Some(agent) = &self.task.required_agent {
            lines.push(format!("Required agent: {agent}"));
        }

        lines.push(format!("Description: {}", self.description));
        lines.push(format!("Iteration: {}/{}", self.task.current_iteration, self.task.max_iterations));

        if let Some(err) = &self.error_message {
            lines.push(format!("Error: {err}"));
        }

        lines.push(format!("\nCreated: {}", self.created_at));
        lines.push(format!("Updated: {}", self.updated_at));

        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TaskActionOutput {
    pub success: bool,
    pub message: String,
    pub task: Option<TaskOutput>,
}

impl CommandOutput for TaskActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TaskStatusOutput {
    pub pending: u64,
    pub assigned: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub failed: u64,
    pub aborted: u64,
    pub needs_human: u64,
    pub total: u64,
}

impl CommandOutput for TaskStatusOutput {
    fn to_human(&self) -> String {
        [
            "Task Status Summary:".to_string(),
            format!("  Pending:      {}", self.pending),
            format!("  Assigned:     {}", self.assigned),
            format!("  In progress:  {}", self.in_progress),
            format!("  Completed:    {}", self.completed),
            format!("  Failed:       {}", self.failed),
            format!("  Aborted:      {}", self.aborted),
            format!("  Needs human:  {}", self.needs_human),
            "  -----------".to_string(),
            format!("  Total:        {}", self.total),
        ]
        .join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn parse_task_type(s: &str) -> Result<TaskType> {
    match s {
        "code" => Ok(TaskType::Code),
        "test" => Ok(TaskType::Test),
        "review" => Ok(TaskType::Review),
        "refactor" => Ok(TaskType::Refactor),
        "debug" => Ok(TaskType::Debug),
        "decomposition" => Ok(TaskType::Decomposition),
        other => anyhow::bail!("invalid task type: {other}"),
    }
}

pub async fn execute(task_repo: Arc<dyn TaskRepository>, command: TaskCommands, json_mode: bool) -> Result<()> {
    match command {
        TaskCommands::Submit { title, description, task_type, priority, required_agent, max_iterations } => {
            let task_type = parse_task_type(&task_type)?;
            let mut task = Task::new(title, description, task_type);
            task.priority = priority;
            task.required_agent = required_agent;
            task.max_iterations = max_iterations;

            task_repo.create(&task).await.context("failed to persist task")?;

            let out = TaskActionOutput {
                success: true,
                message: format!("Task submitted: {} (status: {})", task.id, task.status.as_str()),
                task: Some(TaskOutput::from(&task)),
            };
            output(&out, json_mode);
        }

        TaskCommands::List { status, limit } => {
            let filter = TaskFilter {
                status: status.as_deref().and_then(|s| s.parse().ok()),
                agent_id: None,
                limit: Some(limit),
            };
            let tasks = task_repo.list(filter).await.context("failed to list tasks")?;

            let out = TaskListOutput {
                total: tasks.len(),
                tasks: tasks.iter().map(TaskOutput::from).collect(),
            };
            output(&out, json_mode);
        }

        TaskCommands::Show { task_id } => {
            let id = task_id.parse().context("invalid task id")?;
            let task = task_repo
                .get(id)
                .await
                .context("failed to load task")?
                .ok_or_else(|| anyhow::anyhow!("task not found: {task_id}"))?;

            let out = TaskDetailOutput {
                task: TaskOutput::from(&task),
                description: task.description.clone(),
                complexity_reasoning: task.complexity_reasoning.clone(),
                error_message: task.error_message.clone(),
                created_at: task.created_at.to_rfc3339(),
                updated_at: task.updated_at.to_rfc3339(),
            };
            output(&out, json_mode);
        }

        TaskCommands::Status => {
            let counts = task_repo.count_by_status().await.context("failed to count tasks")?;

            use crate::domain::models::TaskStatus;
            let get = |s: TaskStatus| *counts.get(&s).unwrap_or(&0);
            let out = TaskStatusOutput {
                pending: get(TaskStatus::Pending),
                assigned: get(TaskStatus::Assigned),
                in_progress: get(TaskStatus::InProgress),
                completed: get(TaskStatus::Completed),
                failed: get(TaskStatus::Failed),
                aborted: get(TaskStatus::Aborted),
                needs_human: get(TaskStatus::NeedsHuman),
                total: counts.values().sum(),
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
