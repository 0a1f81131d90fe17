//! Mock agent runtime for testing and local development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use crate::domain::ports::{
    AgentRuntime, RuntimeMetrics, RuntimeOutput, RuntimeOutputStatus, RuntimeRequest, RuntimeResponse, ToolCallEvent,
};

/// Canned response configuration for one task attempt.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: RuntimeOutputStatus,
    pub actual_output: Option<String>,
    pub failure_reason: Option<String>,
    pub events: Vec<ToolCallEvent>,
    pub transport_error: Option<String>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: RuntimeOutputStatus::Success,
            actual_output: Some("mock task completed".to_string()),
            failure_reason: None,
            events: vec![ToolCallEvent {
                step: 1,
                action: "shell_run".to_string(),
                input: "echo done".to_string(),
                observation: "done".to_string(),
                duration_ms: 10,
                model_used: "haiku".to_string(),
                input_tokens: 50,
                output_tokens: 10,
            }],
            transport_error: None,
        }
    }
}

impl MockResponse {
    #[must_use]
    pub fn success(output: impl Into<String>) -> Self {
        Self { actual_output: Some(output.into()), ..Self::default() }
    }

    #[must_use]
    pub fn hard_failure(reason: impl Into<String>) -> Self {
        Self {
            status: RuntimeOutputStatus::HardFailure,
            actual_output: None,
            failure_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn transport_failure(reason: impl Into<String>) -> Self {
        Self { transport_error: Some(reason.into()), ..Self::default() }
    }
}

/// Deterministic `AgentRuntime` double: replays a canned response per task
/// rather than driving a real tool-use loop.
pub struct MockAgentRuntime {
    default_response: MockResponse,
    overrides: Arc<RwLock<HashMap<uuid::Uuid, MockResponse>>>,
}

impl MockAgentRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self { default_response: MockResponse::default(), overrides: Arc::new(RwLock::new(HashMap::new())) }
    }

    #[must_use]
    pub fn with_default_response(response: MockResponse) -> Self {
        Self { default_response: response, overrides: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub async fn set_response_for_task(&self, task_id: uuid::Uuid, response: MockResponse) {
        self.overrides.write().await.insert(task_id, response);
    }

    async fn response_for(&self, task_id: uuid::Uuid) -> MockResponse {
        self.overrides.read().await.get(&task_id).cloned().unwrap_or_else(|| self.default_response.clone())
    }
}

impl Default for MockAgentRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentRuntime for MockAgentRuntime {
    async fn execute(
        &self,
        request: RuntimeRequest,
        events: mpsc::Sender<ToolCallEvent>,
    ) -> Result<RuntimeResponse, String> {
        let response = self.response_for(request.task_id).await;

        if let Some(reason) = response.transport_error {
            return Err(reason);
        }

        for event in &response.events {
            let _ = events.send(event.clone()).await;
        }

        let total_input: u64 = response.events.iter().map(|e| e.input_tokens).sum();
        let total_output: u64 = response.events.iter().map(|e| e.output_tokens).sum();

        Ok(RuntimeResponse {
            success: matches!(response.status, RuntimeOutputStatus::Success | RuntimeOutputStatus::SoftFailure),
            output: RuntimeOutput {
                status: response.status,
                confidence: if matches!(response.status, RuntimeOutputStatus::Success) { 1.0 } else { 0.0 },
                files_created: Vec::new(),
                commands_executed: response.events.iter().map(|e| e.input.clone()).collect(),
                actual_output: response.actual_output,
                failure_reason: response.failure_reason,
                suggestions: Vec::new(),
            },
            metrics: RuntimeMetrics {
                input_tokens: total_input,
                output_tokens: total_output,
                model_used: request.model.unwrap_or_else(|| "haiku".to_string()),
                wall_ms: response.events.iter().map(|e| e.duration_ms).sum(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn request(task_id: Uuid) -> RuntimeRequest {
        RuntimeRequest {
            task_id,
            agent_id: "coder-1".to_string(),
            task_description: "do the thing".to_string(),
            expected_output: None,
            use_premium: false,
            model: None,
            max_iterations: 3,
        }
    }

    #[tokio::test]
    async fn default_response_succeeds_and_streams_one_event() {
        let runtime = MockAgentRuntime::new();
        let (tx, mut rx) = mpsc::channel(8);

        let response = runtime.execute(request(Uuid::new_v4()), tx).await.unwrap();
        assert!(response.success);
        assert_eq!(response.output.actual_output.as_deref(), Some("mock task completed"));
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn transport_failure_is_returned_as_err() {
        let runtime = MockAgentRuntime::with_default_response(MockResponse::transport_failure("connection reset"));
        let (tx, _rx) = mpsc::channel(8);

        let result = runtime.execute(request(Uuid::new_v4()), tx).await;
        assert_eq!(result.unwrap_err(), "connection reset");
    }

    #[tokio::test]
    async fn per_task_override_takes_precedence_over_default() {
        let runtime = MockAgentRuntime::new();
        let task_id = Uuid::new_v4();
        runtime.set_response_for_task(task_id, MockResponse::hard_failure("bad input")).await;

        let (tx, _rx) = mpsc::channel(8);
        let response = runtime.execute(request(task_id), tx).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.output.failure_reason.as_deref(), Some("bad input"));
    }
}
