//! Budget Guard: accumulates spend, blocks premium/mid calls past a daily limit.

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::models::BudgetStatus;
use crate::services::cost_calculator::{estimate_cost_cents, Tier};
use crate::services::event_bus::{EventBus, EventPayload};

#[derive(Debug, Clone)]
pub struct BudgetGuardConfig {
    pub daily_limit_cents: u64,
    pub warning_threshold: f64,
    pub enabled: bool,
}

impl Default for BudgetGuardConfig {
    fn default() -> Self {
        Self {
            daily_limit_cents: 1_000,
            warning_threshold: 0.8,
            enabled: true,
        }
    }
}

struct Inner {
    daily_spent_cents: u64,
    all_time_spent_cents: u64,
    spent_by_model_cents: HashMap<String, u64>,
    task_count: u64,
    last_reset: DateTime<Utc>,
    warning_emitted_since_reset: bool,
    exceeded_emitted_since_reset: bool,
}

fn next_utc_midnight(after: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = (after + chrono::Duration::days(1)).date_naive();
    Utc.from_utc_datetime(&tomorrow.and_time(NaiveTime::MIN))
}

/// Singleton admission-control gate over premium/mid LLM calls.
pub struct BudgetGuard {
    config: BudgetGuardConfig,
    event_bus: Option<std::sync::Arc<EventBus>>,
    inner: RwLock<Inner>,
}

impl BudgetGuard {
    #[must_use]
    pub fn new(config: BudgetGuardConfig) -> Self {
        Self {
            config,
            event_bus: None,
            inner: RwLock::new(Inner {
                daily_spent_cents: 0,
                all_time_spent_cents: 0,
                spent_by_model_cents: HashMap::new(),
                task_count: 0,
                last_reset: Utc::now(),
                warning_emitted_since_reset: false,
                exceeded_emitted_since_reset: false,
            }),
        }
    }

    #[must_use]
    pub fn with_event_bus(mut self, bus: std::sync::Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Reset the daily counter if we've crossed a UTC-midnight boundary since
    /// the last recorded reset. Called lazily from every read/write path
    /// rather than on a background timer.
    async fn maybe_reset(&self, inner: &mut Inner) {
        if Utc::now() >= next_utc_midnight(inner.last_reset) {
            inner.daily_spent_cents = 0;
            inner.last_reset = Utc::now();
            inner.warning_emitted_since_reset = false;
            inner.exceeded_emitted_since_reset = false;
        }
    }

    /// Record a transaction. Never decreases totals.
    pub async fn record_usage(&self, input_tokens: u64, output_tokens: u64, model: &str) {
        let cost_cents = estimate_cost_cents(model, input_tokens, output_tokens);
        let mut inner = self.inner.write().await;
        self.maybe_reset(&mut inner).await;

        inner.daily_spent_cents += cost_cents;
        inner.all_time_spent_cents += cost_cents;
        inner.task_count += 1;
        *inner
            .spent_by_model_cents
            .entry(model.to_string())
            .or_insert(0) += cost_cents;

        let ratio = inner.daily_spent_cents as f64 / self.config.daily_limit_cents.max(1) as f64;
        let is_warning = ratio >= self.config.warning_threshold;
        let is_over = inner.daily_spent_cents > self.config.daily_limit_cents;

        if let Some(bus) = &self.event_bus {
            if is_over && !inner.exceeded_emitted_since_reset {
                inner.exceeded_emitted_since_reset = true;
                bus.publish(EventPayload::BudgetExceeded {
                    daily_spent_cents: inner.daily_spent_cents,
                    daily_limit_cents: self.config.daily_limit_cents,
                })
                .await;
            } else if is_warning && !inner.warning_emitted_since_reset {
                inner.warning_emitted_since_reset = true;
                bus.publish(EventPayload::BudgetWarning {
                    daily_spent_cents: inner.daily_spent_cents,
                    daily_limit_cents: self.config.daily_limit_cents,
                })
                .await;
            }
        }
    }

    async fn is_over_budget(&self) -> bool {
        let mut inner = self.inner.write().await;
        self.maybe_reset(&mut inner).await;
        inner.daily_spent_cents > self.config.daily_limit_cents
    }

    /// `enabled ∧ is_over_budget`, but only premium and mid tiers are ever
    /// blocked — `local` (and `cheap`, the next cheapest rung) stay available
    /// so a budget-exhausted orchestrator degrades rather than stalling.
    pub async fn is_blocked_for_tier(&self, tier: Tier) -> bool {
        if !matches!(tier, Tier::Mid | Tier::Premium) {
            return false;
        }
        self.config.enabled && self.is_over_budget().await
    }

    #[must_use]
    pub async fn snapshot(&self) -> BudgetStatus {
        let mut inner = self.inner.write().await;
        self.maybe_reset(&mut inner).await;
        let ratio = inner.daily_spent_cents as f64 / self.config.daily_limit_cents.max(1) as f64;
        BudgetStatus {
            daily_limit_cents: self.config.daily_limit_cents,
            daily_spent_cents: inner.daily_spent_cents,
            all_time_spent_cents: inner.all_time_spent_cents,
            warning_threshold: self.config.warning_threshold,
            is_warning: ratio >= self.config.warning_threshold,
            is_over_budget: inner.daily_spent_cents > self.config.daily_limit_cents,
            next_reset_at: next_utc_midnight(inner.last_reset),
            spent_by_model_cents: inner.spent_by_model_cents.clone(),
            task_count: inner.task_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard(limit_cents: u64) -> BudgetGuard {
        BudgetGuard::new(BudgetGuardConfig {
            daily_limit_cents: limit_cents,
            warning_threshold: 0.8,
            enabled: true,
        })
    }

    #[tokio::test]
    async fn record_usage_is_monotonic() {
        let g = guard(1_000_000);
        g.record_usage(1000, 1000, "claude-opus").await;
        let first = g.snapshot().await.daily_spent_cents;
        g.record_usage(1000, 1000, "claude-opus").await;
        let second = g.snapshot().await.daily_spent_cents;
        assert!(second >= first);
    }

    #[tokio::test]
    async fn over_budget_blocks_premium_and_mid_not_local() {
        let g = guard(10);
        g.record_usage(1_000_000, 1_000_000, "claude-opus").await;
        assert!(g.snapshot().await.is_over_budget);
        assert!(g.is_blocked_for_tier(Tier::Premium).await);
        assert!(g.is_blocked_for_tier(Tier::Mid).await);
        assert!(!g.is_blocked_for_tier(Tier::Free).await);
    }

    #[tokio::test]
    async fn disabled_guard_never_blocks() {
        let g = BudgetGuard::new(BudgetGuardConfig {
            daily_limit_cents: 1,
            warning_threshold: 0.8,
            enabled: false,
        });
        g.record_usage(1_000_000, 1_000_000, "claude-opus").await;
        assert!(!g.is_blocked_for_tier(Tier::Premium).await);
    }

    #[tokio::test]
    async fn unknown_model_costs_nothing() {
        let g = guard(10);
        g.record_usage(1_000_000, 1_000_000, "mystery").await;
        assert_eq!(g.snapshot().await.daily_spent_cents, 0);
    }
}
