//! Post-completion code review records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    NeedsFixes,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub category: String,
    pub description: String,
    pub suggestion: Option<String>,
}

/// The outcome of a peer-review pass over a completed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeReview {
    pub id: Uuid,
    pub task_id: Uuid,
    pub review_task_id: Option<Uuid>,
    /// 0..=10
    pub quality_score: f64,
    pub findings: Vec<Finding>,
    pub status: ReviewStatus,
    pub cost_tokens: u64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CodeReview {
    #[must_use]
    pub fn pending(task_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            review_task_id: None,
            quality_score: 0.0,
            findings: Vec::new(),
            status: ReviewStatus::Pending,
            cost_tokens: 0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Apply a judge verdict: clamp the score, and derive `approved` unless the
    /// judge already committed to one via `status`.
    pub fn apply_verdict(&mut self, quality_score: f64, findings: Vec<Finding>) {
        self.quality_score = quality_score.clamp(0.0, 10.0);
        let has_blocking = findings
            .iter()
            .any(|f| matches!(f.severity, Severity::Critical | Severity::High));
        self.findings = findings;
        self.status = if self.quality_score >= 7.0 && !has_blocking {
            ReviewStatus::Approved
        } else {
            ReviewStatus::NeedsFixes
        };
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_score_no_blocking_findings_is_approved() {
        let mut r = CodeReview::pending(Uuid::new_v4());
        r.apply_verdict(8.0, vec![]);
        assert_eq!(r.status, ReviewStatus::Approved);
    }

    #[test]
    fn high_score_with_critical_finding_needs_fixes() {
        let mut r = CodeReview::pending(Uuid::new_v4());
        r.apply_verdict(
            9.0,
            vec![Finding {
                severity: Severity::Critical,
                category: "security".into(),
                description: "sql injection".into(),
                suggestion: None,
            }],
        );
        assert_eq!(r.status, ReviewStatus::NeedsFixes);
    }

    #[test]
    fn score_is_clamped() {
        let mut r = CodeReview::pending(Uuid::new_v4());
        r.apply_verdict(15.0, vec![]);
        assert_eq!(r.quality_score, 10.0);
    }
}
