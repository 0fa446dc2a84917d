//! Weighted-draw generator over a location value store
//!
//! Draws a discretization group with probability proportional to the value it
//! holds, then a cell inside the group proportionally to cell value. Used for
//! every kind whose targets are places rather than specific devices.

use rand::distributions::{Distribution, WeightedIndex};
use rand_chacha::ChaCha8Rng;

use crate::agent::AgentSnapshot;
use crate::attraction::modulator::LocalModulator;
use crate::core::config::PlannerConfig;
use crate::core::error::{PlannerError, Result};
use crate::core::types::{Cell, Hours};
use crate::geography::discretization::MapDiscretization;
use crate::geography::hazard::BanLayer;
use crate::planning::action::{ActionKind, PlannedAction};
use crate::planning::generator::{ActionGenerator, PlanningContext};

/// Everything about an action except where it happens
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionTemplate {
    Deploy {
        delay_hours: Hours,
    },
    FishUnassociated {
        set_hours: Hours,
        search_hours: Hours,
    },
    SetForeign {
        set_hours: Hours,
        hours_wasted_if_empty: Hours,
        minimum_value: f64,
    },
}

impl ActionTemplate {
    pub fn from_config(kind: ActionKind, config: &PlannerConfig) -> Result<Self> {
        let d = &config.durations;
        match kind {
            ActionKind::Deploy => Ok(ActionTemplate::Deploy {
                delay_hours: d.deployment_delay_hours,
            }),
            ActionKind::FishUnassociated => Ok(ActionTemplate::FishUnassociated {
                set_hours: d.unassociated_set_hours,
                search_hours: d.unassociated_search_hours,
            }),
            ActionKind::SetForeign => Ok(ActionTemplate::SetForeign {
                set_hours: d.foreign_set_hours,
                hours_wasted_if_empty: d.failed_search_hours,
                minimum_value: config.draws.minimum_foreign_value,
            }),
            ActionKind::SetOwn => Err(PlannerError::InvalidConfig(
                "own-device sets target devices, not drawn locations".into(),
            )),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            ActionTemplate::Deploy { .. } => ActionKind::Deploy,
            ActionTemplate::FishUnassociated { .. } => ActionKind::FishUnassociated,
            ActionTemplate::SetForeign { .. } => ActionKind::SetForeign,
        }
    }

    pub fn at(&self, cell: Cell) -> PlannedAction {
        match *self {
            ActionTemplate::Deploy { delay_hours } => PlannedAction::Deploy { cell, delay_hours },
            ActionTemplate::FishUnassociated {
                set_hours,
                search_hours,
            } => PlannedAction::FishUnassociated {
                cell,
                set_hours,
                search_hours,
            },
            ActionTemplate::SetForeign {
                set_hours,
                hours_wasted_if_empty,
                minimum_value,
            } => PlannedAction::SetForeign {
                cell,
                set_hours,
                hours_wasted_if_empty,
                minimum_value,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocationDrawGenerator {
    template: ActionTemplate,
    discretization: MapDiscretization,
    local: LocalModulator,
    bans: BanLayer,
    trip_cap: Option<u32>,
}

impl LocationDrawGenerator {
    pub fn new(template: ActionTemplate, discretization: MapDiscretization) -> Self {
        Self {
            template,
            discretization,
            local: LocalModulator::can_act_there(),
            bans: BanLayer::new(),
            trip_cap: None,
        }
    }

    /// Generator for `kind` wired from the configuration
    pub fn from_config(kind: ActionKind, config: &PlannerConfig) -> Result<Self> {
        let template = ActionTemplate::from_config(kind, config)?;
        let discretization = MapDiscretization::new(
            config.map.width,
            config.map.height,
            config.draws.columns,
            config.draws.rows,
        )?;
        let mut generator = Self::new(template, discretization);

        let a = &config.attraction;
        match kind {
            ActionKind::Deploy => {
                generator.trip_cap = config.draws.max_deployments_per_trip;
            }
            ActionKind::FishUnassociated => {
                generator.local = LocalModulator::can_act_there()
                    .with_time_since_last_visit(a.unassociated_time_since_visit);
            }
            ActionKind::SetForeign => {
                generator.local =
                    LocalModulator::can_act_there().with_time_since_last_visit(a.foreign_time_since_visit);
            }
            ActionKind::SetOwn => {}
        }
        Ok(generator)
    }

    pub fn with_local_modulator(mut self, local: LocalModulator) -> Self {
        self.local = local;
        self
    }

    pub fn with_bans(mut self, bans: BanLayer) -> Self {
        self.bans = bans;
        self
    }

    pub fn with_trip_cap(mut self, cap: u32) -> Self {
        self.trip_cap = Some(cap);
        self
    }

    /// Drawable cells grouped by discretization group, with their weights
    fn weighted_groups(&self, ctx: &PlanningContext) -> Vec<Vec<(Cell, f64)>> {
        let mut groups = vec![Vec::new(); self.discretization.number_of_groups()];
        let Some(store) = ctx.env.location_values.get(self.template.kind()) else {
            return groups;
        };

        let agent = ctx.agent();
        for (cell, value) in store.all_values() {
            if value <= 0.0 || self.bans.is_banned(cell) {
                continue;
            }
            let travel_hours = ctx.env.distance.distance(agent.position, cell) / agent.speed;
            let weight = value * self.local.modulate(cell, travel_hours, ctx.env.clock, agent, ctx.env.oracle);
            if weight > 0.0 && weight.is_finite() {
                groups[self.discretization.group_of(cell)].push((cell, weight));
            }
        }
        groups
    }

    fn draw(groups: &[Vec<(Cell, f64)>], rng: &mut ChaCha8Rng) -> Option<Cell> {
        let group_weights: Vec<f64> = groups
            .iter()
            .map(|cells| cells.iter().map(|(_, w)| w).sum())
            .collect();
        // fails when every group is empty
        let group = WeightedIndex::new(&group_weights).ok()?.sample(rng);

        let cells = &groups[group];
        let cell = WeightedIndex::new(cells.iter().map(|(_, w)| *w)).ok()?.sample(rng);
        Some(cells[cell].0)
    }
}

impl ActionGenerator for LocationDrawGenerator {
    fn kind(&self) -> ActionKind {
        self.template.kind()
    }

    fn remaining_budget(&self, ctx: &PlanningContext) -> u32 {
        let agent: &AgentSnapshot = ctx.agent();
        let budget = match self.template {
            ActionTemplate::Deploy { .. } => agent.deployable_devices(),
            _ => agent.sets_remaining,
        };
        self.trip_cap.map_or(budget, |cap| budget.min(cap))
    }

    fn next_candidate(&mut self, ctx: &PlanningContext, rng: &mut ChaCha8Rng) -> Option<PlannedAction> {
        let groups = self.weighted_groups(ctx);
        match Self::draw(&groups, rng) {
            Some(cell) => Some(self.template.at(cell)),
            None => {
                tracing::debug!(kind = %self.template.kind(), "no drawable location left");
                None
            }
        }
    }
}
