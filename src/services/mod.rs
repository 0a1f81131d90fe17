//! Application services: the orchestration kernel's pure logic and
//! background loops, built on top of `domain::ports`.

pub mod budget_guard;
pub mod complexity_assessor;
pub mod cost_calculator;
pub mod event_bus;
pub mod executor;
pub mod loop_detector;
pub mod orchestrator;
pub mod queue;
pub mod resource_pool;
pub mod review_trigger;
pub mod router;
pub mod sweeper;

pub use budget_guard::{BudgetGuard, BudgetGuardConfig};
pub use complexity_assessor::{assess, heuristic_score, parse_judge_response, ComplexityAssessment, JudgeResponse};
pub use cost_calculator::{estimate_cost, estimate_cost_cents, get_model_pricing, CostSummary, ModelPricing, Tier};
pub use event_bus::{Event, EventBus, EventPayload};
pub use executor::Executor;
pub use loop_detector::{LoopDetector, Verdict};
pub use orchestrator::Orchestrator;
pub use queue::{Assigner, ClaimedAssignment};
pub use resource_pool::ResourcePool;
pub use review_trigger::ReviewTrigger;
pub use router::{estimated_cost, IdleAgent, Router, RoutingDecision};
pub use sweeper::Sweeper;
