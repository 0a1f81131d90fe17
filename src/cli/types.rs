//! CLI type definitions: clap command structures for the operator CLI.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "agentkernel")]
#[command(about = "Cost-optimized orchestration kernel for AI coding agents", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Task queue management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Agent registry inspection
    #[command(subcommand)]
    Agent(AgentCommands),

    /// Run the orchestrator's control loop (Assigner, Executor, Sweeper,
    /// Review Trigger) until interrupted.
    Run,
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Submit a new task to the queue
    Submit {
        /// Short task title
        title: String,

        /// Full task description/prompt
        description: String,

        /// Task type (code, test, review, refactor, debug, decomposition)
        #[arg(short = 't', long, default_value = "code")]
        task_type: String,

        /// Priority (0-10, higher = more urgent)
        #[arg(short, long, default_value = "5")]
        priority: u8,

        /// Require a specific agent kind (coder, qa, cto)
        #[arg(short, long)]
        required_agent: Option<String>,

        /// Maximum execution iterations before escalating
        #[arg(short, long, default_value = "3")]
        max_iterations: u32,
    },

    /// List tasks in the queue
    List {
        /// Filter by status (pending, assigned, in_progress, completed, failed, aborted, needs_human)
        #[arg(short, long)]
        status: Option<String>,

        /// Maximum number of tasks to display
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show details for a specific task
    Show {
        /// Task ID (full UUID)
        task_id: String,
    },

    /// Show queue status counts by task state
    Status,
}

#[derive(Subcommand)]
pub enum AgentCommands {
    /// List registered agents and their current status
    List,
}
