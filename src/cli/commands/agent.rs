//! Agent CLI commands.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Agent;
use crate::domain::ports::AgentRepository;

#[derive(Debug, serde::Serialize)]
pub struct AgentOutput {
    pub id: String,
    pub kind: String,
    pub status: String,
    pub current_task_id: Option<String>,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
}

impl From<&Agent> for AgentOutput {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id.clone(),
            kind: agent.kind.as_str().to_string(),
            status: format!("{:?}", agent.status).to_lowercase(),
            current_task_id: agent.current_task_id.map(|id| id.to_string()),
            tasks_completed: agent.tasks_completed,
            tasks_failed: agent.tasks_failed,
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct AgentListOutput {
    pub agents: Vec<AgentOutput>,
    pub total: usize,
}

impl CommandOutput for AgentListOutput {
    fn to_human(&self) -> String {
        if self.agents.is_empty() {
            return "No agents registered.".to_string();
        }

        let mut lines = vec![format!("Found {} agent(s):\n", self.total)];
        lines.push(format!(
            "{:<16} {:<8} {:<8} {:<10} {:<10}",
            "ID", "KIND", "STATUS", "COMPLETED", "FAILED"
        ));
        lines.push("-".repeat(60));

        for agent in &self.agents {
            lines.push(format!(
                "{:<16} {:<8} {:<8} {:<10} {:<10}",
                agent.id, agent.kind, agent.status, agent.tasks_completed, agent.tasks_failed
            ));
        }

        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute_list(agent_repo: Arc<dyn AgentRepository>, json_mode: bool) -> Result<()> {
    let agents = agent_repo.list().await.context("failed to list agents")?;

    let out = AgentListOutput {
        total: agents.len(),
        agents: agents.iter().map(AgentOutput::from).collect(),
    };
    output(&out, json_mode);

    Ok(())
}
