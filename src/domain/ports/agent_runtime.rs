//! Agent Runtime contract — out of scope to implement (spec §6.3); this
//! module only specifies the interface the Executor drives.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Request handed to the external agent runtime for one task attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeRequest {
    pub task_id: Uuid,
    pub agent_id: String,
    pub task_description: String,
    pub expected_output: Option<String>,
    pub use_premium: bool,
    pub model: Option<String>,
    pub max_iterations: u32,
}

/// One tool-call observation streamed back during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallEvent {
    pub step: u32,
    pub action: String,
    pub input: String,
    pub observation: String,
    pub duration_ms: u64,
    pub model_used: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeOutputStatus {
    Success,
    SoftFailure,
    HardFailure,
    Uncertain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeOutput {
    pub status: RuntimeOutputStatus,
    pub confidence: f64,
    pub files_created: Vec<String>,
    pub commands_executed: Vec<String>,
    pub actual_output: Option<String>,
    pub failure_reason: Option<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeMetrics {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub model_used: String,
    pub wall_ms: u64,
}

/// Terminal payload returned once the runtime completes (or transport-fails).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeResponse {
    pub success: bool,
    pub output: RuntimeOutput,
    pub metrics: RuntimeMetrics,
}

/// The Agent Runtime contract: a sub-process or RPC endpoint that drives one
/// task through a tool-use loop, streaming `ToolCallEvent`s as it goes.
///
/// This crate does not implement a runtime; it drives whatever implements
/// this trait (see `adapters::agent_runtime::mock` for the test double).
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Execute one task attempt to completion, forwarding each tool-call
    /// event on `events` as it occurs. Dropping the receiving end does not
    /// cancel the run; use `cancel` for that.
    async fn execute(
        &self,
        request: RuntimeRequest,
        events: mpsc::Sender<ToolCallEvent>,
    ) -> Result<RuntimeResponse, String>;
}
