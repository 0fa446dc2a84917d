//! Attraction fields: a value store seen through modulators
//!
//! A field answers two questions for one action kind: which way is the agent
//! pulled from where it stands, and how good would acting at a given cell be.

use glam::DVec2;

use crate::agent::{AgentSnapshot, LegalityOracle, ModelClock};
use crate::attraction::location_values::LocationValueStore;
use crate::attraction::modulator::{GlobalModulator, LocalModulator};
use crate::core::config::AttractionConfig;
use crate::core::types::Cell;
use crate::geography::distance::Distance;

/// Everything outside the field that evaluating it needs
pub struct FieldContext<'a> {
    pub agent: &'a AgentSnapshot,
    pub distance: &'a dyn Distance,
    pub oracle: &'a dyn LegalityOracle,
    pub clock: ModelClock,
}

#[derive(Debug, Clone)]
pub struct AttractionField<'a> {
    values: &'a LocationValueStore,
    local: LocalModulator,
    global: GlobalModulator,
    action_distance_exponent: f64,
    destination_distance_exponent: f64,
}

impl<'a> AttractionField<'a> {
    pub fn new(
        values: &'a LocationValueStore,
        local: LocalModulator,
        global: GlobalModulator,
        action_distance_exponent: f64,
        destination_distance_exponent: f64,
    ) -> Self {
        Self {
            values,
            local,
            global,
            action_distance_exponent,
            destination_distance_exponent,
        }
    }

    /// Field with the configured distance exponents
    pub fn from_config(
        values: &'a LocationValueStore,
        local: LocalModulator,
        global: GlobalModulator,
        config: &AttractionConfig,
    ) -> Self {
        Self::new(
            values,
            local,
            global,
            config.action_distance_exponent,
            config.destination_distance_exponent,
        )
    }

    pub fn values(&self) -> &LocationValueStore {
        self.values
    }

    /// Sum of value-weighted unit vectors toward every known cell
    ///
    /// Each pull is damped by travel time raised to the destination exponent
    /// and gated by the local modulator at the arrival step. The resultant is
    /// scaled by the global modulator.
    pub fn net_attraction(&self, ctx: &FieldContext) -> DVec2 {
        let global = self.global.modulate(ctx.agent);
        if global == 0.0 {
            return DVec2::ZERO;
        }

        let here = ctx.agent.position;
        let origin = cell_vec(here);
        let mut total = DVec2::ZERO;

        for (there, value) in self.values.all_values() {
            if value == 0.0 {
                continue;
            }
            let direction = cell_vec(there) - origin;
            let travel_hours = ctx.distance.distance(here, there) / ctx.agent.speed;
            if direction == DVec2::ZERO || travel_hours <= 0.0 {
                continue;
            }

            let local = self.local.modulate(there, travel_hours, ctx.clock, ctx.agent, ctx.oracle);
            if local == 0.0 {
                continue;
            }

            let strength = value * local / travel_hours.powf(self.destination_distance_exponent);
            total += direction.normalize() * strength;
        }

        total * global
    }

    /// Distance-discounted value of acting at `cell`
    pub fn action_value_at(&self, cell: Cell, distance: &dyn Distance) -> f64 {
        self.values
            .all_values()
            .map(|(there, value)| {
                value / (distance.distance(cell, there) + 1.0).powf(self.action_distance_exponent)
            })
            .sum()
    }
}

/// Combined pull of several fields
pub fn total_attraction(fields: &[AttractionField], ctx: &FieldContext) -> DVec2 {
    fields
        .iter()
        .fold(DVec2::ZERO, |acc, field| acc + field.net_attraction(ctx))
}

fn cell_vec(cell: Cell) -> DVec2 {
    DVec2::new(cell.x as f64, cell.y as f64)
}
