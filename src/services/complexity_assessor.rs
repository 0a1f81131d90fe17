//! Dual complexity scoring: a deterministic heuristic, optionally
//! reconciled with a cheap judge LLM's opinion.

use serde::Deserialize;

use crate::domain::models::{ComplexitySource, TaskType};

const HIGH_SIGNAL_KEYWORDS: &[&str] = &[
    "multi-file",
    "architecture",
    "design",
    "refactor",
    "integrate",
    "api",
    "database",
];
const MEDIUM_KEYWORDS: &[&str] = &["test", "verify", "validate", "debug", "fix", "update"];
const LOW_KEYWORDS: &[&str] = &["create", "add", "simple", "basic"];

#[derive(Debug, Clone)]
pub struct ComplexityAssessment {
    pub complexity: f64,
    pub source: ComplexitySource,
    pub reasoning: String,
}

/// Router heuristic (spec §4.5). Pure function of the task's static fields.
#[must_use]
pub fn heuristic_score(
    title: &str,
    description: &str,
    task_type: TaskType,
    priority: u8,
    current_iteration: u32,
) -> (f64, String) {
    let text = format!("{title} {description}").to_lowercase();
    let mut score = 0.0;
    let mut reasons = Vec::new();

    let numbered_steps = count_numbered_steps(description);
    if numbered_steps > 0 {
        score += 0.5 * numbered_steps as f64;
        reasons.push(format!("{numbered_steps} numbered step(s) (+{:.1})", 0.5 * numbered_steps as f64));
    }

    for kw in HIGH_SIGNAL_KEYWORDS {
        if text.contains(kw) {
            score += 2.0;
            reasons.push(format!("high-signal keyword '{kw}' (+2.0)"));
        }
    }
    for kw in MEDIUM_KEYWORDS {
        if text.contains(kw) {
            score += 1.0;
            reasons.push(format!("medium keyword '{kw}' (+1.0)"));
        }
    }
    for kw in LOW_KEYWORDS {
        if text.contains(kw) {
            score -= 0.5;
            reasons.push(format!("low keyword '{kw}' (-0.5)"));
        }
    }

    let type_bonus = match task_type {
        TaskType::Code => 1.0,
        TaskType::Test => 1.5,
        TaskType::Review => 2.0,
        _ => 0.0,
    };
    if type_bonus > 0.0 {
        score += type_bonus;
        reasons.push(format!("task_type={} (+{type_bonus:.1})", task_type.as_str()));
    }

    let priority_bonus = (f64::from(priority) / 10.0) * 0.5;
    score += priority_bonus;
    reasons.push(format!("priority={priority} (+{priority_bonus:.2})"));

    if current_iteration > 0 {
        let retry_bonus = 1.5 * f64::from(current_iteration);
        score += retry_bonus;
        reasons.push(format!("current_iteration={current_iteration} (+{retry_bonus:.1})"));
    }

    (score.clamp(1.0, 10.0), reasons.join("; "))
}

fn count_numbered_steps(description: &str) -> u32 {
    let lower = description.to_lowercase();
    let mut count = 0;
    let mut rest = lower.as_str();
    while let Some(pos) = rest.find("step ") {
        let after = &rest[pos + "step ".len()..];
        if after.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            count += 1;
        }
        rest = &rest[pos + "step ".len()..];
    }
    count
}

/// Shape the judge LLM is asked to return as JSON.
#[derive(Debug, Deserialize)]
pub struct JudgeResponse {
    pub complexity: f64,
    pub reasoning: String,
    #[serde(default)]
    pub factors: Vec<String>,
}

/// Tolerantly parse a judge verdict out of free-form LLM text: strip
/// markdown code fences, then take the first balanced `{...}` span.
#[must_use]
pub fn parse_judge_response(raw: &str) -> Option<JudgeResponse> {
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

/// Reconcile a heuristic score against an optional judge score (spec §4.5).
#[must_use]
pub fn assess(
    title: &str,
    description: &str,
    task_type: TaskType,
    priority: u8,
    current_iteration: u32,
    judge_raw: Option<&str>,
) -> ComplexityAssessment {
    let (router_score, router_reasoning) =
        heuristic_score(title, description, task_type, priority, current_iteration);

    let Some(judge) = judge_raw.and_then(parse_judge_response) else {
        return ComplexityAssessment {
            complexity: round_to_one_decimal(router_score),
            source: ComplexitySource::Router,
            reasoning: router_reasoning,
        };
    };

    let judge_score = judge.complexity.clamp(1.0, 10.0);
    let diff = judge_score - router_score;
    let combined = if diff >= 2.0 {
        judge_score
    } else if diff <= -2.0 {
        0.6 * router_score + 0.4 * judge_score
    } else {
        (router_score + judge_score) / 2.0
    };

    ComplexityAssessment {
        complexity: round_to_one_decimal(combined.clamp(1.0, 10.0)),
        source: ComplexitySource::Dual,
        reasoning: format!("router: {router_reasoning}; judge: {}", judge.reasoning),
    }
}

fn round_to_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
