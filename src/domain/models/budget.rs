//! Value types describing Budget Guard state (non-persistent, in-memory).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Point-in-time view of the Budget Guard, returned by `snapshot()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub daily_limit_cents: u64,
    pub daily_spent_cents: u64,
    pub all_time_spent_cents: u64,
    pub warning_threshold: f64,
    pub is_warning: bool,
    pub is_over_budget: bool,
    pub next_reset_at: DateTime<Utc>,
    pub spent_by_model_cents: HashMap<String, u64>,
    pub task_count: u64,
}
