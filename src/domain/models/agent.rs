//! The `Agent` aggregate: one executor instance of a given kind.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role an agent plays, which drives the tier it routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Coder,
    Qa,
    Cto,
}

impl AgentKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coder => "coder",
            Self::Qa => "qa",
            Self::Cto => "cto",
        }
    }
}

/// Availability state of an `Agent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Busy,
    Paused,
    Offline,
}

/// One executor instance: a long-lived identity that picks up tasks of its `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub kind: AgentKind,
    pub status: AgentStatus,
    pub current_task_id: Option<Uuid>,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
}

impl Agent {
    #[must_use]
    pub const fn new(id: String, kind: AgentKind) -> Self {
        Self {
            id,
            kind,
            status: AgentStatus::Idle,
            current_task_id: None,
            tasks_completed: 0,
            tasks_failed: 0,
        }
    }

    /// `current_task_id ≠ null ⇔ status = busy`.
    #[must_use]
    pub const fn invariant_holds(&self) -> bool {
        matches!(
            (self.current_task_id.is_some(), matches!(self.status, AgentStatus::Busy)),
            (true, true) | (false, false)
        )
    }

    pub fn assign(&mut self, task_id: Uuid) {
        self.current_task_id = Some(task_id);
        self.status = AgentStatus::Busy;
    }

    pub fn release(&mut self) {
        self.current_task_id = None;
        self.status = AgentStatus::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_agent_is_idle_and_consistent() {
        let a = Agent::new("coder-1".into(), AgentKind::Coder);
        assert_eq!(a.status, AgentStatus::Idle);
        assert!(a.invariant_holds());
    }

    #[test]
    fn assign_then_release_round_trips_invariant() {
        let mut a = Agent::new("qa-1".into(), AgentKind::Qa);
        let task_id = Uuid::new_v4();
        a.assign(task_id);
        assert_eq!(a.status, AgentStatus::Busy);
        assert_eq!(a.current_task_id, Some(task_id));
        assert!(a.invariant_holds());

        a.release();
        assert_eq!(a.status, AgentStatus::Idle);
        assert_eq!(a.current_task_id, None);
        assert!(a.invariant_holds());
    }
}
