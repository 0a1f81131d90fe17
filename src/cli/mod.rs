//! CLI interface module: thin operator CLI for local task/agent inspection.
//!
//! Not the orchestrator's own control loop — a debugging/ops surface over
//! the same repositories the services operate on.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{AgentCommands, Cli, Commands, TaskCommands};
