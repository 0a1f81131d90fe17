//! Cost-optimized orchestration kernel for AI coding agents.
//!
//! Queues tasks, routes them to the cheapest capable agent tier, guards a
//! daily spend budget, detects runaway tool-call loops, and gates completed
//! work behind an automated code review.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;
