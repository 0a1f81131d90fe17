//! Maps task state -> (tier, executor kind, fallback, estimated cost).

use crate::domain::models::AgentKind;
use crate::services::cost_calculator::Tier;

#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    pub agent_id: Option<String>,
    pub kind: AgentKind,
    pub tier: Tier,
    pub reason: String,
    pub confidence: f64,
    pub fallback_agent_id: Option<String>,
    pub est_cost: f64,
    pub escalate_to_human: bool,
    pub no_capacity: bool,
}

impl RoutingDecision {
    fn no_capacity(kind: AgentKind, tier: Tier) -> Self {
        Self {
            agent_id: None,
            kind,
            tier,
            reason: "no idle agent of target kind".to_string(),
            confidence: 0.0,
            fallback_agent_id: None,
            est_cost: 0.0,
            escalate_to_human: false,
            no_capacity: true,
        }
    }
}

fn tier_for_kind(kind: AgentKind) -> Tier {
    match kind {
        AgentKind::Coder => Tier::Free,
        AgentKind::Qa => Tier::Cheap,
        AgentKind::Cto => Tier::Mid,
    }
}

#[must_use]
pub fn estimated_cost(tier: Tier) -> f64 {
    match tier {
        Tier::Free => 0.0,
        Tier::Cheap => 0.001,
        Tier::Mid => 0.005,
        Tier::Premium => 0.04,
    }
}

/// Candidate agent snapshot the Router selects from: id + kind + idle status,
/// intentionally slim rather than the full `Agent` aggregate.
#[derive(Debug, Clone)]
pub struct IdleAgent {
    pub id: String,
    pub kind: AgentKind,
}

pub struct Router;

impl Router {
    /// Pick the nearest idle agent of a different kind, preferring `qa` when
    /// the primary kind is `coder`.
    fn pick_fallback(primary_kind: AgentKind, idle: &[IdleAgent]) -> Option<String> {
        let preferred = if matches!(primary_kind, AgentKind::Coder) {
            AgentKind::Qa
        } else {
            AgentKind::Coder
        };
        idle.iter()
            .find(|a| a.kind == preferred)
            .or_else(|| idle.iter().find(|a| a.kind != primary_kind))
            .map(|a| a.id.clone())
    }

    fn pick_idle(kind: AgentKind, idle: &[IdleAgent]) -> Option<String> {
        idle.iter().find(|a| a.kind == kind).map(|a| a.id.clone())
    }

    /// Main routing decision for assignment (spec §4.6, rules 1-7, first match wins).
    #[must_use]
    pub fn route(
        required_agent: Option<AgentKind>,
        complexity: f64,
        current_iteration: u32,
        idle: &[IdleAgent],
    ) -> RoutingDecision {
        if let Some(kind) = required_agent {
            return Self::decide_for_kind(kind, 1.0, "required_agent override", idle);
        }

        if current_iteration == 0 && complexity < 4.0 {
            return Self::decide_for_kind(AgentKind::Coder, 0.9, "low complexity, first attempt", idle);
        }
        if current_iteration == 0 {
            return Self::decide_for_kind(AgentKind::Qa, 0.8, "high complexity, first attempt", idle);
        }
        if current_iteration == 1 {
            return Self::decide_for_kind(AgentKind::Qa, 0.7, "1st fix", idle);
        }
        if current_iteration == 2 {
            return Self::decide_for_kind(AgentKind::Cto, 0.6, "2nd fix", idle);
        }

        // current_iteration >= 3
        RoutingDecision {
            agent_id: None,
            kind: AgentKind::Cto,
            tier: Tier::Mid,
            reason: "exhausted fix cycles, escalating to human".to_string(),
            confidence: 0.0,
            fallback_agent_id: None,
            est_cost: 0.0,
            escalate_to_human: true,
            no_capacity: false,
        }
    }

    fn decide_for_kind(kind: AgentKind, confidence: f64, reason: &str, idle: &[IdleAgent]) -> RoutingDecision {
        let tier = tier_for_kind(kind);
        if let Some(agent_id) = Self::pick_idle(kind, idle) {
            return RoutingDecision {
                agent_id: Some(agent_id),
                kind,
                tier,
                reason: reason.to_string(),
                confidence,
                fallback_agent_id: Self::pick_fallback(kind, idle),
                est_cost: estimated_cost(tier),
                escalate_to_human: false,
                no_capacity: false,
            };
        }
        // Rule 7: fall back to an idle CTO acting as routing manager.
        if !matches!(kind, AgentKind::Cto) {
            if let Some(cto_id) = Self::pick_idle(AgentKind::Cto, idle) {
                return RoutingDecision {
                    agent_id: Some(cto_id),
                    kind: AgentKind::Cto,
                    tier: Tier::Mid,
                    reason: format!("{reason} (no idle {}, routed to cto)", kind.as_str()),
                    confidence,
                    fallback_agent_id: None,
                    est_cost: estimated_cost(Tier::Mid),
                    escalate_to_human: false,
                    no_capacity: false,
                };
            }
        }
        RoutingDecision::no_capacity(kind, tier)
    }

    /// Decomposition sub-decision: `complexity >= 8 -> premium`, else `mid`.
    #[must_use]
    pub fn route_decomposition(complexity: f64) -> Tier {
        if complexity >= 8.0 {
            Tier::Premium
        } else {
            Tier::Mid
        }
    }

    /// Review sub-decision: always premium, cost scales with task count.
    #[must_use]
    pub fn route_review(task_count: usize) -> (Tier, f64) {
        (Tier::Premium, 0.02 * task_count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_agents() -> Vec<IdleAgent> {
        vec![
            IdleAgent { id: "coder-1".into(), kind: AgentKind::Coder },
            IdleAgent { id: "qa-1".into(), kind: AgentKind::Qa },
            IdleAgent { id: "cto-1".into(), kind: AgentKind::Cto },
        ]
    }

    #[test]
    fn low_complexity_first_attempt_routes_to_local_coder() {
        let decision = Router::route(None, 2.25, 0, &idle_agents());
        assert_eq!(decision.kind, AgentKind::Coder);
        assert_eq!(decision.tier, Tier::Free);
        assert_eq!(decision.est_cost, 0.0);
    }

    #[test]
    fn scenario_s2_second_fix_routes_to_cto_mid() {
        let decision = Router::route(None, 9.0, 2, &idle_agents());
        assert_eq!(decision.kind, AgentKind::Cto);
        assert_eq!(decision.tier, Tier::Mid);
        assert_eq!(decision.reason, "2nd fix");
    }

    #[test]
    fn scenario_s3_third_retry_escalates_to_human() {
        let decision = Router::route(None, 9.0, 3, &idle_agents());
        assert!(decision.escalate_to_human);
        assert!(decision.agent_id.is_none());
    }

    #[test]
    fn required_agent_overrides_complexity_rules() {
        let decision = Router::route(Some(AgentKind::Cto), 1.0, 0, &idle_agents());
        assert_eq!(decision.kind, AgentKind::Cto);
        assert_eq!(decision.confidence, 1.0);
    }

    #[test]
    fn no_idle_agent_of_kind_falls_back_to_cto() {
        let idle = vec![IdleAgent { id: "cto-1".into(), kind: AgentKind::Cto }];
        let decision = Router::route(None, 2.0, 0, &idle);
        assert_eq!(decision.kind, AgentKind::Cto);
        assert!(!decision.no_capacity);
    }

    #[test]
    fn no_capacity_when_nobody_idle() {
        let decision = Router::route(None, 2.0, 0, &[]);
        assert!(decision.no_capacity);
    }

    #[test]
    fn fallback_prefers_qa_when_primary_is_coder() {
        let decision = Router::route(None, 2.0, 0, &idle_agents());
        assert_eq!(decision.fallback_agent_id, Some("qa-1".to_string()));
    }

    #[test]
    fn decomposition_tier_boundary() {
        assert_eq!(Router::route_decomposition(8.0), Tier::Premium);
        assert_eq!(Router::route_decomposition(7.9), Tier::Mid);
    }

    #[test]
    fn review_is_always_premium_and_scales_with_task_count() {
        let (tier, cost) = Router::route_review(4);
        assert_eq!(tier, Tier::Premium);
        assert!((cost - 0.08).abs() < 1e-9);
    }
}
