//! Code-review gating: spawns an internal review task for completed work
//! above a complexity threshold, then turns its verdict into a `CodeReview`.

use serde::Deserialize;
use uuid::Uuid;

use crate::domain::models::{CodeReview, Finding, Severity, Task, TaskStatus, TaskType};

#[derive(Debug, Clone)]
pub struct ReviewTriggerConfig {
    pub enabled: bool,
    pub min_complexity: f64,
}

pub struct ReviewTrigger {
    config: ReviewTriggerConfig,
}

const SKIPPED_TYPES: &[TaskType] = &[TaskType::Review, TaskType::Decomposition, TaskType::Debug];

impl ReviewTrigger {
    #[must_use]
    pub const fn new(config: ReviewTriggerConfig) -> Self {
        Self { config }
    }

    /// Whether a just-completed task should be gated behind a review.
    #[must_use]
    pub fn should_review(&self, task: &Task) -> bool {
        self.config.enabled
            && task.status == TaskStatus::Completed
            && !SKIPPED_TYPES.contains(&task.task_type)
            && task.complexity >= self.config.min_complexity
    }

    /// Build the internal review task for `task`. Caller persists and enqueues it.
    #[must_use]
    pub fn build_review_task(&self, task: &Task) -> Task {
        // Review tasks always route premium (Router::route_review); a fixed
        // high complexity keeps them out of the low-complexity fast path.
        let mut review = Task::new(
            format!("Review: {}", task.title),
            format!(
                "Review the implementation of task {} and return a JSON verdict with \
                 `quality_score` (0-10) and `findings` (array of {{severity, category, \
                 description, suggestion}}).\n\nOriginal task:\n{}",
                task.id, task.description
            ),
            TaskType::Review,
        );
        review.parent_task_id = Some(task.id);
        review.required_agent = Some("cto".to_string());
        review.complexity = 8.0;
        review
    }

    /// Turn a completed review task's result into a `CodeReview` verdict for
    /// the task it reviewed.
    #[must_use]
    pub fn finalize(&self, reviewed_task_id: Uuid, review_task: &Task) -> CodeReview {
        let mut review = CodeReview::pending(reviewed_task_id);
        review.review_task_id = Some(review_task.id);

        let Some(raw) = review_task
            .result
            .as_ref()
            .and_then(|v| v.get("actual_output"))
            .and_then(|v| v.as_str())
        else {
            review.apply_verdict(0.0, vec![]);
            return review;
        };

        match parse_review_response(raw) {
            Some(parsed) => review.apply_verdict(parsed.quality_score, parsed.findings()),
            None => review.apply_verdict(0.0, vec![]),
        }
        review
    }
}

#[derive(Debug, Deserialize)]
struct RawFinding {
    severity: String,
    category: String,
    description: String,
    #[serde(default)]
    suggestion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewResponse {
    quality_score: f64,
    #[serde(default)]
    findings: Vec<RawFinding>,
}

impl ReviewResponse {
    fn findings(self) -> Vec<Finding> {
        self.findings
            .into_iter()
            .map(|f| Finding {
                severity: parse_severity(&f.severity),
                category: f.category,
                description: f.description,
                suggestion: f.suggestion,
            })
            .collect()
    }
}

fn parse_severity(s: &str) -> Severity {
    match s.to_lowercase().as_str() {
        "critical" => Severity::Critical,
        "high" => Severity::High,
        "medium" => Severity::Medium,
        _ => Severity::Low,
    }
}

/// Tolerantly parse a review verdict out of free-form LLM text, same
/// markdown-fence-and-brace-scan strategy as the complexity judge.
fn parse_review_response(raw: &str) -> Option<ReviewResponse> {
    let stripped = raw.replace("```json", "```");
    let stripped = stripped.trim();
    let without_fences = stripped.trim_start_matches("```").trim_end_matches("```");

    let start = without_fences.find('{')?;
    let mut depth = 0usize;
    let mut end = None;
    for (i, c) in without_fences[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(start + i + 1);
                    break;
                }
            }
            _ => {}
        }
    }
    let end = end?;
    serde_json::from_str(&without_fences[start..end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(min_complexity: f64) -> ReviewTrigger {
        ReviewTrigger::new(ReviewTriggerConfig { enabled: true, min_complexity })
    }

    #[test]
    fn low_complexity_completed_task_is_skipped() {
        let t = trigger(3.0);
        let mut task = Task::new("t", "d", TaskType::Code);
        task.status = TaskStatus::Completed;
        task.complexity = 2.0;
        assert!(!t.should_review(&task));
    }

    #[test]
    fn review_type_tasks_are_never_re_reviewed() {
        let t = trigger(3.0);
        let mut task = Task::new("t", "d", TaskType::Review);
        task.status = TaskStatus::Completed;
        task.complexity = 9.0;
        assert!(!t.should_review(&task));
    }

    #[test]
    fn high_complexity_completed_code_task_triggers_review() {
        let t = trigger(3.0);
        let mut task = Task::new("t", "d", TaskType::Code);
        task.status = TaskStatus::Completed;
        task.complexity = 5.0;
        assert!(t.should_review(&task));
    }

    #[test]
    fn disabled_trigger_never_fires() {
        let t = ReviewTrigger::new(ReviewTriggerConfig { enabled: false, min_complexity: 0.0 });
        let mut task = Task::new("t", "d", TaskType::Code);
        task.status = TaskStatus::Completed;
        task.complexity = 10.0;
        assert!(!t.should_review(&task));
    }

    #[test]
    fn finalize_parses_verdict_and_links_review_task() {
        let t = trigger(3.0);
        let reviewed_id = Uuid::new_v4();
        let mut review_task = Task::new("Review: t", "d", TaskType::Review);
        review_task.result = Some(serde_json::json!({
            "actual_output": "```json\n{\"quality_score\": 8.5, \"findings\": []}\n```"
        }));
        let review = t.finalize(reviewed_id, &review_task);
        assert_eq!(review.task_id, reviewed_id);
        assert_eq!(review.review_task_id, Some(review_task.id));
        assert_eq!(review.quality_score, 8.5);
    }

    #[test]
    fn finalize_with_unparseable_output_scores_zero() {
        let t = trigger(3.0);
        let mut review_task = Task::new("Review: t", "d", TaskType::Review);
        review_task.result = Some(serde_json::json!({ "actual_output": "not json" }));
        let review = t.finalize(Uuid::new_v4(), &review_task);
        assert_eq!(review.quality_score, 0.0);
    }
}
