//! Append-only per-task execution trace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One tool-call observation within a task's run, ordered by `step`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub id: Uuid,
    pub task_id: Uuid,
    /// Monotonically increasing within a task, starting at 1.
    pub step: u32,
    pub action: String,
    pub input: String,
    pub observation: String,
    pub duration_ms: u64,
    pub model_used: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub is_loop_detected: bool,
    pub created_at: DateTime<Utc>,
}

impl ExecutionLogEntry {
    #[must_use]
    pub fn new(
        task_id: Uuid,
        step: u32,
        action: impl Into<String>,
        input: impl Into<String>,
        observation: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            step,
            action: action.into(),
            input: input.into(),
            observation: observation.into(),
            duration_ms: 0,
            model_used: model_used.into(),
            input_tokens: 0,
            output_tokens: 0,
            is_loop_detected: false,
            created_at: Utc::now(),
        }
    }
}
