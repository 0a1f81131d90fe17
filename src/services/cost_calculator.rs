//! Pure cost accounting: tokens x model -> money.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// USD per million tokens for a model family.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

/// Ordered so the first substring match wins; keep more specific names above
/// their cheaper siblings (e.g. `opus` before a bare `claude` fallback).
const PRICING_TABLE: &[(&str, ModelPricing)] = &[
    (
        "opus",
        ModelPricing {
            input_per_million: 15.0,
            output_per_million: 75.0,
        },
    ),
    (
        "sonnet",
        ModelPricing {
            input_per_million: 3.0,
            output_per_million: 15.0,
        },
    ),
    (
        "haiku",
        ModelPricing {
            input_per_million: 0.80,
            output_per_million: 4.0,
        },
    ),
    (
        "gpt-4",
        ModelPricing {
            input_per_million: 2.50,
            output_per_million: 10.0,
        },
    ),
    (
        "gpt-4o-mini",
        ModelPricing {
            input_per_million: 0.15,
            output_per_million: 0.60,
        },
    ),
];

/// Look up pricing by case-insensitive substring match. Unknown models and
/// anything naming the `local` family price at zero (`None` here and a
/// zero-cost table entry are the same thing from the caller's perspective).
#[must_use]
pub fn get_model_pricing(model: &str) -> Option<ModelPricing> {
    let lower = model.to_lowercase();
    if lower.contains("local") {
        return Some(ModelPricing {
            input_per_million: 0.0,
            output_per_million: 0.0,
        });
    }
    PRICING_TABLE
        .iter()
        .find(|(name, _)| lower.contains(name))
        .map(|(_, pricing)| *pricing)
}

/// `cost(model, input_tokens, output_tokens) -> USD`. Unknown models cost 0.
#[must_use]
pub fn estimate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    let Some(pricing) = get_model_pricing(model) else {
        return 0.0;
    };
    let input_cost = (input_tokens as f64 / 1_000_000.0) * pricing.input_per_million;
    let output_cost = (output_tokens as f64 / 1_000_000.0) * pricing.output_per_million;
    input_cost + output_cost
}

/// `estimate_cost` rounded up to whole cents, for budget accounting.
#[must_use]
pub fn estimate_cost_cents(model: &str, input_tokens: u64, output_tokens: u64) -> u64 {
    (estimate_cost(model, input_tokens, output_tokens) * 100.0).ceil() as u64
}

/// A model's tier, for budget/routing aggregation (spec §4.1: free/cheap/mid/premium).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Cheap,
    Mid,
    Premium,
}

impl Tier {
    #[must_use]
    pub fn for_model(model: &str) -> Self {
        let lower = model.to_lowercase();
        if lower.contains("local") {
            Self::Free
        } else if lower.contains("haiku") || lower.contains("mini") {
            Self::Cheap
        } else if lower.contains("sonnet") {
            Self::Mid
        } else {
            Self::Premium
        }
    }
}

/// Running totals, optionally scoped to one task or goal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_usd: f64,
    pub by_model: HashMap<String, f64>,
    pub by_tier: HashMap<Tier, f64>,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub task_count: u64,
}

impl CostSummary {
    pub fn add(&mut self, model: &str, input_tokens: u64, output_tokens: u64) {
        let cost = estimate_cost(model, input_tokens, output_tokens);
        self.total_usd += cost;
        *self.by_model.entry(model.to_string()).or_insert(0.0) += cost;
        *self.by_tier.entry(Tier::for_model(model)).or_insert(0.0) += cost;
        self.total_input_tokens += input_tokens;
        self.total_output_tokens += output_tokens;
        self.task_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_returns_none() {
        assert!(get_model_pricing("some-random-model").is_none());
    }

    #[test]
    fn local_models_are_free() {
        assert_eq!(estimate_cost("local-llama-70b", 1_000_000, 1_000_000), 0.0);
    }

    #[test]
    fn unknown_models_cost_zero() {
        assert_eq!(estimate_cost("mystery-model", 1_000_000, 1_000_000), 0.0);
    }

    #[test]
    fn sonnet_pricing_matches_table() {
        let cost = estimate_cost("claude-sonnet-4", 1_000_000, 1_000_000);
        assert!((cost - 18.0).abs() < 1e-9);
    }

    #[test]
    fn cost_is_additive() {
        let model = "claude-haiku-3.5";
        let whole = estimate_cost(model, 300, 500);
        let split = estimate_cost(model, 100, 200) + estimate_cost(model, 200, 300);
        assert!((whole - split).abs() < 1e-9);
    }

    #[test]
    fn tier_classification() {
        assert_eq!(Tier::for_model("local-llama"), Tier::Free);
        assert_eq!(Tier::for_model("claude-haiku"), Tier::Cheap);
        assert_eq!(Tier::for_model("claude-sonnet"), Tier::Mid);
        assert_eq!(Tier::for_model("claude-opus"), Tier::Premium);
    }

    #[test]
    fn summary_aggregates_across_models() {
        let mut summary = CostSummary::default();
        summary.add("claude-haiku", 100, 100);
        summary.add("claude-opus", 100, 100);
        assert_eq!(summary.task_count, 2);
        assert_eq!(summary.by_model.len(), 2);
        assert!(summary.total_usd > 0.0);
    }
}
