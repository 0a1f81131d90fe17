//! Domain ports (interfaces) the orchestration kernel depends on.

pub mod agent_repository;
pub mod agent_runtime;
pub mod code_review_repository;
pub mod execution_log_repository;
pub mod task_repository;

pub use agent_repository::AgentRepository;
pub use agent_runtime::{
    AgentRuntime, RuntimeMetrics, RuntimeOutput, RuntimeOutputStatus, RuntimeRequest, RuntimeResponse,
    ToolCallEvent,
};
pub use code_review_repository::CodeReviewRepository;
pub use execution_log_repository::ExecutionLogRepository;
pub use task_repository::{TaskFilter, TaskRepository};
