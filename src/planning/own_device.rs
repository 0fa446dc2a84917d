//! Bucketed best-of generator for sets on the agent's own devices
//!
//! Devices are bucketed by discretization group, each bucket a max-heap on
//! estimated value. A candidate is the best device of some group; picking it
//! consumes it, and a drained group drops out of every later listing.

use ordered_float::OrderedFloat;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::agent::DeviceReading;
use crate::core::config::PlannerConfig;
use crate::core::error::Result;
use crate::core::types::{Cell, DeviceId, Hours};
use crate::geography::discretization::MapDiscretization;
use crate::geography::hazard::BanLayer;
use crate::planning::action::{ActionKind, PlannedAction};
use crate::planning::generator::{ActionGenerator, PlanningContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ranked {
    value: OrderedFloat<f64>,
    device: DeviceId,
    cell: Cell,
}

impl Ord for Ranked {
    // highest value first, then lowest device id
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then_with(|| other.device.cmp(&self.device))
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Ranked> for DeviceReading {
    fn from(r: Ranked) -> Self {
        DeviceReading {
            device: r.device,
            cell: r.cell,
            value: r.value.into_inner(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OwnDeviceGenerator {
    discretization: MapDiscretization,
    buckets: Vec<BinaryHeap<Ranked>>,
    bans: BanLayer,
    minimum_value: f64,
    distance_penalty: f64,
    bad_readings_probability: f64,
    filter_illegal: bool,
    set_hours: Hours,
}

impl OwnDeviceGenerator {
    pub fn new(discretization: MapDiscretization, minimum_value: f64, set_hours: Hours) -> Self {
        let buckets = vec![BinaryHeap::new(); discretization.number_of_groups()];
        Self {
            discretization,
            buckets,
            bans: BanLayer::new(),
            minimum_value,
            distance_penalty: 1.0,
            bad_readings_probability: 0.0,
            filter_illegal: false,
            set_hours,
        }
    }

    pub fn from_config(config: &PlannerConfig) -> Result<Self> {
        let o = &config.own_sets;
        let discretization = MapDiscretization::new(config.map.width, config.map.height, o.columns, o.rows)?;
        let mut generator = Self::new(discretization, o.minimum_value, config.durations.own_set_hours);
        generator.distance_penalty = o.distance_penalty;
        generator.bad_readings_probability = o.bad_readings_probability;
        generator.filter_illegal = o.filter_illegal;
        Ok(generator)
    }

    pub fn with_bans(mut self, bans: BanLayer) -> Self {
        self.bans = bans;
        self
    }

    pub fn with_distance_penalty(mut self, penalty: f64) -> Self {
        self.distance_penalty = penalty;
        self
    }

    pub fn with_bad_readings_probability(mut self, probability: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&probability),
            "bad readings probability must be in [0, 1], got {}",
            probability
        );
        self.bad_readings_probability = probability;
        self
    }

    /// Rebuild the buckets from the agent's current device readings
    ///
    /// `is_legal` is only consulted when illegal devices are filtered.
    pub fn reset(
        &mut self,
        readings: &[DeviceReading],
        is_legal: impl Fn(Cell) -> bool,
        rng: &mut ChaCha8Rng,
    ) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }

        for reading in readings {
            if !reading.value.is_finite() || self.bans.is_banned(reading.cell) {
                continue;
            }
            if self.filter_illegal && !is_legal(reading.cell) {
                continue;
            }

            let mut value = reading.value;
            if value < self.minimum_value {
                let misread = self.bad_readings_probability > 0.0 && rng.gen_bool(self.bad_readings_probability);
                if !misread {
                    continue;
                }
                value = self.minimum_value;
            }

            let group = self.discretization.group_of(reading.cell);
            self.buckets[group].push(Ranked {
                value: OrderedFloat(value),
                device: reading.device,
                cell: reading.cell,
            });
        }
    }

    /// Devices still available across all groups
    pub fn len(&self) -> usize {
        self.buckets.iter().map(BinaryHeap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(BinaryHeap::is_empty)
    }

    /// Best remaining device of every non-empty group, by group index
    pub fn best_per_group(&self) -> Vec<(usize, DeviceReading)> {
        self.buckets
            .iter()
            .enumerate()
            .filter_map(|(group, bucket)| bucket.peek().map(|best| (group, DeviceReading::from(*best))))
            .collect()
    }

    pub fn value_of_group(&self, group: usize) -> Option<f64> {
        self.buckets
            .get(group)
            .and_then(BinaryHeap::peek)
            .map(|best| best.value.into_inner())
    }

    /// Consume the best device of `group`
    pub fn choose(&mut self, group: usize) -> Option<DeviceReading> {
        self.buckets.get_mut(group)?.pop().map(DeviceReading::from)
    }

    /// Group whose best device scores highest seen from `centroid`
    ///
    /// Score is `value / (1 + distance)^penalty`; the lower group wins ties.
    fn preferred_group(&self, centroid: Cell, ctx: &PlanningContext) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (group, reading) in self.best_per_group() {
            let distance = ctx.env.distance.distance(centroid, reading.cell);
            let score = reading.value / (1.0 + distance).powf(self.distance_penalty);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((group, score));
            }
        }
        best.map(|(group, _)| group)
    }

    fn reset_from(&mut self, ctx: &PlanningContext, rng: &mut ChaCha8Rng) {
        let agent = ctx.agent();
        let oracle = ctx.env.oracle;
        let step = ctx.env.clock.step;
        self.reset(&agent.deployed_devices, |cell| oracle.is_allowed_at(agent, cell, step), rng);
    }
}

impl ActionGenerator for OwnDeviceGenerator {
    fn kind(&self) -> ActionKind {
        ActionKind::SetOwn
    }

    fn start(&mut self, ctx: &PlanningContext, rng: &mut ChaCha8Rng) {
        self.reset_from(ctx, rng);
        tracing::debug!(devices = self.len(), "bucketed own devices");
    }

    fn remaining_budget(&self, ctx: &PlanningContext) -> u32 {
        ctx.agent().sets_remaining
    }

    fn next_candidate(&mut self, ctx: &PlanningContext, _rng: &mut ChaCha8Rng) -> Option<PlannedAction> {
        let centroid = ctx.plan.centroid_cell();
        let group = self.preferred_group(centroid, ctx)?;
        let reading = self.choose(group)?;
        Some(PlannedAction::SetOwn {
            device: reading.device,
            cell: reading.cell,
            set_hours: self.set_hours,
        })
    }

    fn prepare_for_replanning(&mut self, ctx: &PlanningContext, rng: &mut ChaCha8Rng) {
        self.reset_from(ctx, rng);
    }
}
