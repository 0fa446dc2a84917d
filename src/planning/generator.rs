//! The seam between the trip planner and per-kind candidate logic

use rand_chacha::ChaCha8Rng;

use crate::agent::{AgentSnapshot, LegalityOracle, ModelClock};
use crate::attraction::location_values::LocationValueMaps;
use crate::geography::distance::Distance;
use crate::planning::action::{ActionKind, PlannedAction};
use crate::planning::plan::Plan;

/// World state a planning run reads but never mutates
#[derive(Clone, Copy)]
pub struct PlanningEnv<'a> {
    pub agent: &'a AgentSnapshot,
    pub location_values: &'a LocationValueMaps,
    pub distance: &'a dyn Distance,
    pub oracle: &'a dyn LegalityOracle,
    pub clock: ModelClock,
}

/// Environment plus the plan built so far
pub struct PlanningContext<'a> {
    pub env: PlanningEnv<'a>,
    pub plan: &'a Plan,
}

impl<'a> PlanningContext<'a> {
    pub fn agent(&self) -> &AgentSnapshot {
        self.env.agent
    }
}

/// Proposes candidate actions of one kind
///
/// A generator keeps whatever per-trip bookkeeping it needs between calls;
/// the planner calls `start` once per fresh trip.
pub trait ActionGenerator {
    fn kind(&self) -> ActionKind;

    /// Reset per-trip state before a new plan is built
    fn start(&mut self, _ctx: &PlanningContext, _rng: &mut ChaCha8Rng) {}

    /// Operational cap on how many actions of this kind one trip may hold
    fn remaining_budget(&self, ctx: &PlanningContext) -> u32;

    /// Draw one candidate, `None` when this kind has nothing left to offer
    fn next_candidate(&mut self, ctx: &PlanningContext, rng: &mut ChaCha8Rng) -> Option<PlannedAction>;

    /// Called before an existing plan is rebuilt from the agent's position
    fn prepare_for_replanning(&mut self, _ctx: &PlanningContext, _rng: &mut ChaCha8Rng) {}
}
