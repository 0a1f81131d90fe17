//! Operator CLI entry point for the orchestration kernel.

use std::sync::Arc;

use agentkernel::adapters::agent_runtime::MockAgentRuntime;
use agentkernel::adapters::sqlite::{
    initialize_database, SqliteAgentRepository, SqliteCodeReviewRepository, SqliteExecutionLogRepository,
    SqliteTaskRepository,
};
use agentkernel::cli::{commands::agent, commands::task, AgentCommands, Cli, Commands};
use agentkernel::domain::ports::{AgentRepository, AgentRuntime, CodeReviewRepository, ExecutionLogRepository, TaskRepository};
use agentkernel::infrastructure::config::ConfigLoader;
use agentkernel::infrastructure::logging::LoggerImpl;
use agentkernel::services::Orchestrator;
use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load().context("failed to load configuration")?;
    let _logger = LoggerImpl::init(&config.logging).context("failed to initialize logger")?;

    let pool = initialize_database(&config.database)
        .await
        .context("failed to initialize database")?;

    let task_repo: Arc<dyn TaskRepository> = Arc::new(SqliteTaskRepository::new(pool.clone()));
    let agent_repo: Arc<dyn AgentRepository> = Arc::new(SqliteAgentRepository::new(pool.clone()));

    match cli.command {
        Commands::Task(task_cmd) => {
            task::execute(task_repo, task_cmd, cli.json).await?;
        }
        Commands::Agent(AgentCommands::List) => {
            agent::execute_list(agent_repo, cli.json).await?;
        }
        Commands::Run => {
            let log_repo: Arc<dyn ExecutionLogRepository> = Arc::new(SqliteExecutionLogRepository::new(pool.clone()));
            let review_repo: Arc<dyn CodeReviewRepository> = Arc::new(SqliteCodeReviewRepository::new(pool));
            let runtime: Arc<dyn AgentRuntime> = Arc::new(MockAgentRuntime::new());

            let orchestrator =
                Arc::new(Orchestrator::new(task_repo, agent_repo, log_repo, review_repo, runtime, &config));

            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
            let orchestrator_handle = tokio::spawn(orchestrator.run(shutdown_rx));

            tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(());

            orchestrator_handle.await.context("orchestrator task panicked")??;
        }
    }

    Ok(())
}
