//! Value types describing Resource Pool state (non-persistent, in-memory).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Snapshot of a single backend class's slot usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassStatus {
    pub max_slots: usize,
    pub active_task_ids: Vec<Uuid>,
}

/// Snapshot of the whole pool, one entry per backend class.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResourcePoolStatus {
    pub classes: HashMap<String, ClassStatus>,
}
