//! The `Task` aggregate: the unit of work the kernel schedules and executes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Code,
    Test,
    Review,
    Refactor,
    Debug,
    Decomposition,
}

impl TaskType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Test => "test",
            Self::Review => "review",
            Self::Refactor => "refactor",
            Self::Debug => "debug",
            Self::Decomposition => "decomposition",
        }
    }
}

/// Lifecycle state of a `Task`.
///
/// Only the Executor, Sweeper, and the completion API may move a task into
/// a terminal state; from a terminal state it never leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Failed,
    Aborted,
    NeedsHuman,
}

impl TaskStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
            Self::NeedsHuman => "needs_human",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Aborted | Self::NeedsHuman
        )
    }

    /// Whether `self -> to` is a legal transition in the task FSM.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Assigned)
                | (Self::Pending, Self::NeedsHuman)
                | (Self::Assigned, Self::InProgress)
                | (Self::Assigned, Self::Aborted)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
                | (Self::InProgress, Self::Aborted)
                | (Self::InProgress, Self::NeedsHuman)
                | (Self::InProgress, Self::Pending)
                | (Self::Failed, Self::Pending)
        )
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "assigned" => Ok(Self::Assigned),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "aborted" => Ok(Self::Aborted),
            "needs_human" => Ok(Self::NeedsHuman),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// Where a task's `complexity` score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexitySource {
    Router,
    Haiku,
    Dual,
    Override,
}

impl ComplexitySource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Router => "router",
            Self::Haiku => "haiku",
            Self::Dual => "dual",
            Self::Override => "override",
        }
    }
}

/// A unit of work submitted to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub task_type: TaskType,
    /// 0..=10
    pub priority: u8,
    pub required_agent: Option<String>,
    pub max_iterations: u32,
    pub parent_task_id: Option<Uuid>,

    pub complexity: f64,
    pub complexity_source: ComplexitySource,
    pub complexity_reasoning: String,

    pub status: TaskStatus,

    pub assigned_agent_id: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    pub current_iteration: u32,

    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub error_category: Option<String>,

    pub validation_command: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency fencing token; bumped on every persisted mutation.
    pub version: u64,
}

impl Task {
    /// Construct a new, unassessed, unrouted task in `Pending` state.
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>, task_type: TaskType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            task_type,
            priority: 5,
            required_agent: None,
            max_iterations: 3,
            parent_task_id: None,
            complexity: 1.0,
            complexity_source: ComplexitySource::Router,
            complexity_reasoning: String::new(),
            status: TaskStatus::Pending,
            assigned_agent_id: None,
            assigned_at: None,
            completed_at: None,
            current_iteration: 0,
            result: None,
            error_message: None,
            error_category: None,
            validation_command: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Whether `current_iteration` has reached or exceeded `max_iterations`.
    #[must_use]
    pub const fn retries_exhausted(&self) -> bool {
        self.current_iteration >= self.max_iterations
    }

    /// Move `self.status` to `to`, rejecting transitions the FSM disallows.
    pub fn transition_to(&mut self, to: TaskStatus) -> Result<(), crate::domain::errors::DomainError> {
        if !self.status.can_transition_to(to) {
            return Err(crate::domain::errors::DomainError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        self.status = to;
        Ok(())
    }
}
