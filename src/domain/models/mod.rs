//! Domain models: pure entities and value types, framework-agnostic.

pub mod agent;
pub mod budget;
pub mod code_review;
pub mod config;
pub mod execution_log;
pub mod resource_pool;
pub mod task;

pub use agent::{Agent, AgentKind, AgentStatus};
pub use budget::BudgetStatus;
pub use code_review::{CodeReview, Finding, ReviewStatus, Severity};
pub use config::{Config, ConfigError, DatabaseConfig, LogFormat, LoggingConfig};
pub use execution_log::ExecutionLogEntry;
pub use resource_pool::{ClassStatus, ResourcePoolStatus};
pub use task::{ComplexitySource, Task, TaskStatus, TaskType};
