//! Draw-then-cheapest-insert trip planner
//!
//! A run repeatedly draws an action kind by weight, asks that kind's
//! generator for a candidate and inserts it where it lengthens the route the
//! least. It stops at the first candidate the remaining hours cannot pay for,
//! or when no kind has anything left to offer.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::config::{PlannerConfig, TripConfig};
use crate::core::error::{PlannerError, Result};
use crate::core::types::Hours;
use crate::geography::hazard::BanLayer;
use crate::planning::action::ActionKind;
use crate::planning::generator::{ActionGenerator, PlanningContext, PlanningEnv};
use crate::planning::location_draw::LocationDrawGenerator;
use crate::planning::own_device::OwnDeviceGenerator;
use crate::planning::plan::Plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerState {
    Idle,
    Planning,
    Planned,
}

pub struct TripPlanner {
    generators: BTreeMap<ActionKind, Box<dyn ActionGenerator>>,
    weights: BTreeMap<ActionKind, f64>,
    max_trip_hours: Hours,
    min_trip_fraction: f64,
    purge_illegal_actions: bool,
    preference_override: Option<BTreeSet<ActionKind>>,
    state: PlannerState,
    target_hours: Hours,
    /// Actions of each kind the current run may still add; drawn kinds only
    allowed: BTreeMap<ActionKind, u32>,
}

impl TripPlanner {
    pub fn new(
        trip: &TripConfig,
        weights: BTreeMap<ActionKind, f64>,
        generators: Vec<Box<dyn ActionGenerator>>,
    ) -> Result<Self> {
        if !(trip.max_trip_hours.is_finite() && trip.max_trip_hours > 0.0) {
            return Err(PlannerError::InvalidConfig(format!(
                "trip budget must be positive, got {}",
                trip.max_trip_hours
            )));
        }
        if !(trip.min_trip_fraction > 0.0 && trip.min_trip_fraction <= 1.0) {
            return Err(PlannerError::InvalidConfig(format!(
                "min_trip_fraction must be in (0, 1], got {}",
                trip.min_trip_fraction
            )));
        }

        let mut by_kind: BTreeMap<ActionKind, Box<dyn ActionGenerator>> = BTreeMap::new();
        for generator in generators {
            let kind = generator.kind();
            if by_kind.insert(kind, generator).is_some() {
                return Err(PlannerError::InvalidConfig(format!("two generators for {}", kind)));
            }
        }

        for (kind, weight) in &weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(PlannerError::InvalidConfig(format!(
                    "weight of {} must be finite and >= 0, got {}",
                    kind, weight
                )));
            }
            if *weight > 0.0 && !by_kind.contains_key(kind) {
                return Err(PlannerError::MissingGenerator(*kind));
            }
        }
        if !weights.values().any(|w| *w > 0.0) {
            return Err(PlannerError::InvalidConfig(
                "at least one action kind needs a positive weight".into(),
            ));
        }

        Ok(Self {
            generators: by_kind,
            weights,
            max_trip_hours: trip.max_trip_hours,
            min_trip_fraction: trip.min_trip_fraction,
            purge_illegal_actions: trip.purge_illegal_actions,
            preference_override: None,
            state: PlannerState::Idle,
            target_hours: 0.0,
            allowed: BTreeMap::new(),
        })
    }

    /// Planner with the stock generator for every kind
    ///
    /// Kinds without a positive weight still get a generator so a preference
    /// override can name them.
    pub fn from_config(config: &PlannerConfig, bans: &BanLayer) -> Result<Self> {
        config.validate()?;
        let mut generators: Vec<Box<dyn ActionGenerator>> = Vec::with_capacity(ActionKind::ALL.len());
        for kind in ActionKind::ALL {
            let generator: Box<dyn ActionGenerator> = match kind {
                ActionKind::SetOwn => Box::new(OwnDeviceGenerator::from_config(config)?.with_bans(bans.clone())),
                _ => Box::new(LocationDrawGenerator::from_config(kind, config)?.with_bans(bans.clone())),
            };
            generators.push(generator);
        }
        Self::new(&config.trip, config.weights.clone(), generators)
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    /// Budget of the most recent trip, 0 before the first one
    pub fn target_hours(&self) -> Hours {
        self.target_hours
    }

    pub fn weights(&self) -> &BTreeMap<ActionKind, f64> {
        &self.weights
    }

    pub fn preference_override(&self) -> Option<&BTreeSet<ActionKind>> {
        self.preference_override.as_ref()
    }

    /// Restrict every following run to `kinds` until cleared or replaced
    ///
    /// An empty list clears the override.
    pub fn set_preference_override(&mut self, kinds: impl IntoIterator<Item = ActionKind>) {
        let kinds: BTreeSet<ActionKind> = kinds.into_iter().collect();
        self.preference_override = if kinds.is_empty() { None } else { Some(kinds) };
    }

    pub fn clear_preference_override(&mut self) {
        self.preference_override = None;
    }

    /// Plan a whole trip from home back to home
    pub fn plan_new_trip(&mut self, env: &PlanningEnv, rng: &mut ChaCha8Rng) -> Plan {
        if self.state == PlannerState::Planned {
            self.state = PlannerState::Idle;
        }
        self.state = PlannerState::Planning;
        self.target_hours = self.draw_trip_budget(rng);
        self.allowed.clear();

        let plan = Plan::home(env.agent.home, env.agent.speed);
        {
            let ctx = PlanningContext { env: *env, plan: &plan };
            for generator in self.generators.values_mut() {
                generator.start(&ctx, rng);
            }
        }

        tracing::debug!(target_hours = self.target_hours, "planning new trip");
        let plan = self.fill(plan, self.target_hours, env, rng);
        self.finish(&plan);
        plan
    }

    /// Rebuild the rest of a trip from the agent's current position
    ///
    /// Deployments still pending in `previous` are kept, in order, for as
    /// long as they fit; no new ones are added. Hours already spent and the
    /// direct leg home come off the trip budget.
    pub fn replan(
        &mut self,
        previous: &Plan,
        hours_spent: Hours,
        env: &PlanningEnv,
        rng: &mut ChaCha8Rng,
    ) -> Plan {
        if self.target_hours <= 0.0 {
            self.target_hours = self.draw_trip_budget(rng);
        }
        self.state = PlannerState::Planning;

        let agent = env.agent;
        let mut plan = Plan::new(agent.position, agent.home, agent.speed);
        let home_leg = env.distance.distance(agent.position, agent.home) / agent.speed;
        plan.add_estimated_hours(home_leg);
        let mut hours_left = self.target_hours - hours_spent - home_leg;

        if hours_left >= 0.0 {
            for deployment in previous.pending().filter(|a| a.kind() == ActionKind::Deploy) {
                let insertion = plan.cheapest_insertion(deployment, env.distance);
                let cost = insertion.added_hours + deployment.duration_hours();
                if cost > hours_left {
                    tracing::debug!(cell = %deployment.cell(), cost, hours_left, "kept deployment no longer fits");
                    break;
                }
                hours_left -= cost;
                plan.insert_action(deployment.clone(), insertion.index, insertion.added_hours);
            }
        }

        self.allowed.clear();
        self.allowed.insert(ActionKind::Deploy, 0);
        {
            let ctx = PlanningContext { env: *env, plan: &plan };
            for generator in self.generators.values_mut() {
                generator.prepare_for_replanning(&ctx, rng);
            }
        }

        tracing::debug!(hours_spent, hours_left, kept = plan.len(), "replanning trip");
        let plan = self.fill(plan, hours_left, env, rng);
        self.finish(&plan);
        plan
    }

    fn draw_trip_budget(&self, rng: &mut ChaCha8Rng) -> Hours {
        if self.min_trip_fraction >= 1.0 {
            self.max_trip_hours
        } else {
            rng.gen_range(self.min_trip_fraction * self.max_trip_hours..=self.max_trip_hours)
        }
    }

    fn finish(&mut self, plan: &Plan) {
        self.state = PlannerState::Planned;
        tracing::info!(
            target_hours = self.target_hours,
            estimated_hours = plan.estimated_hours(),
            actions = plan.len(),
            "trip planned"
        );
    }

    /// The draw/insert loop
    ///
    /// The run ends as soon as no hours are left, even though a candidate
    /// costing nothing would still fit.
    fn fill(&mut self, mut plan: Plan, mut hours_left: Hours, env: &PlanningEnv, rng: &mut ChaCha8Rng) -> Plan {
        while hours_left > 0.0 {
            let Some(kind) = self.draw_kind(env, &plan, rng) else {
                tracing::debug!("no action kind left to draw");
                break;
            };

            let candidate = {
                let ctx = PlanningContext { env: *env, plan: &plan };
                match self.generators.get_mut(&kind) {
                    Some(generator) => generator.next_candidate(&ctx, rng),
                    None => None,
                }
            };
            let Some(action) = candidate else {
                self.exhaust(kind, "generator has no candidate");
                continue;
            };
            if self.purge_illegal_actions && !action.is_allowed_now(env.agent, env.oracle, env.clock.step) {
                self.exhaust(kind, "candidate is not allowed");
                continue;
            }

            let insertion = plan.cheapest_insertion(&action, env.distance);
            let cost = insertion.added_hours + action.duration_hours();
            if cost > hours_left {
                tracing::debug!(%kind, cell = %action.cell(), cost, hours_left, "candidate over budget");
                break;
            }

            hours_left -= cost;
            plan.insert_action(action, insertion.index, insertion.added_hours);
            if let Some(quota) = self.allowed.get_mut(&kind) {
                *quota = quota.saturating_sub(1);
            }
        }
        plan
    }

    fn exhaust(&mut self, kind: ActionKind, reason: &str) {
        tracing::debug!(%kind, reason, "action kind exhausted for this run");
        self.allowed.insert(kind, 0);
    }

    /// Weighted draw among the kinds still eligible
    ///
    /// A lone eligible kind is returned without touching the RNG.
    fn draw_kind(&mut self, env: &PlanningEnv, plan: &Plan, rng: &mut ChaCha8Rng) -> Option<ActionKind> {
        let kinds: Vec<ActionKind> = match &self.preference_override {
            Some(kinds) => kinds.iter().copied().collect(),
            None => self
                .weights
                .iter()
                .filter(|(_, w)| **w > 0.0)
                .map(|(kind, _)| *kind)
                .collect(),
        };

        let ctx = PlanningContext { env: *env, plan };
        let mut eligible: Vec<(ActionKind, f64)> = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let Some(generator) = self.generators.get(&kind) else {
                continue;
            };
            let weight = match self.weights.get(&kind) {
                Some(w) if *w > 0.0 => *w,
                _ => 1.0,
            };
            let quota = *self
                .allowed
                .entry(kind)
                .or_insert_with(|| generator.remaining_budget(&ctx));
            if quota > 0 {
                eligible.push((kind, weight));
            }
        }

        match eligible.len() {
            0 => None,
            1 => Some(eligible[0].0),
            _ => match WeightedIndex::new(eligible.iter().map(|(_, w)| *w)) {
                Ok(dist) => Some(eligible[dist.sample(rng)].0),
                Err(e) => {
                    tracing::warn!(error = %e, "cannot draw among action kinds");
                    None
                }
            },
        }
    }
}
