//! Domain errors for the orchestration kernel.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur while manipulating kernel state.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("optimistic lock conflict on task {task_id} (expected version {expected_version})")]
    OptimisticLockConflict { task_id: Uuid, expected_version: u64 },

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl DomainError {
    /// Whether retrying the same operation immediately has a chance of succeeding.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::OptimisticLockConflict { .. } | Self::Database(_))
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Top-level error taxonomy (see the error-handling design), used to classify
/// terminal task failures and to drive retry policy at each layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimit { retry_after_secs: u64 },

    #[error("budget exceeded for tier {tier}")]
    Budget { tier: String },

    #[error("validation command failed: {0}")]
    Validation(String),

    #[error("loop detector {verdict}: {reason}")]
    Loop { verdict: String, reason: String },

    #[error("task exceeded wall-clock timeout")]
    Timeout,

    #[error("state conflict: {0}")]
    StateConflict(String),

    #[error("bad input: {0}")]
    BadInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// The `error_category` string persisted on a terminal `Task`.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::RateLimit { .. } => "rate_limit",
            Self::Budget { .. } => "budget",
            Self::Validation(_) => "validation",
            Self::Loop { .. } => "loop",
            Self::Timeout => "timeout",
            Self::StateConflict(_) => "state_conflict",
            Self::BadInput(_) => "bad_input",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether this category should surface directly without local recovery.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::BadInput(_) | Self::Internal(_))
    }
}
