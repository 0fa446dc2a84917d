//! Modulators that throttle attraction by the agent's current resources
//!
//! Each modulator is plain data (logistic parameters) with one evaluation
//! method. Callers compose them by multiplying their outputs.

use serde::{Deserialize, Serialize};

use crate::agent::{AgentSnapshot, LegalityOracle, ModelClock};
use crate::core::config::AttractionConfig;
use crate::core::types::{Cell, Hours};

/// `1 / (1 + exp(-steepness * (x - midpoint)))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Logistic {
    pub midpoint: f64,
    pub steepness: f64,
}

impl Logistic {
    pub const fn new(midpoint: f64, steepness: f64) -> Self {
        Self { midpoint, steepness }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.midpoint.is_finite() || !self.steepness.is_finite() {
            return Err(format!(
                "logistic parameters must be finite, got midpoint {} steepness {}",
                self.midpoint, self.steepness
            ));
        }
        Ok(())
    }

    pub fn apply(&self, x: f64) -> f64 {
        1.0 / (1.0 + (-self.steepness * (x - self.midpoint)).exp())
    }

    /// Like `apply`, but an exhausted ratio (<= 0) gates the term to zero
    pub fn apply_gated(&self, ratio: f64) -> f64 {
        if ratio <= 0.0 {
            0.0
        } else {
            self.apply(ratio)
        }
    }
}

/// Per-cell modulator: legality first, then optional logistic terms
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalModulator {
    /// Applied to hours since the agent last acted at the cell
    pub time_since_last_visit: Option<Logistic>,
    /// Applied to the fraction of the regulatory set allowance left
    pub allowance_remaining: Option<Logistic>,
}

impl LocalModulator {
    /// Legality only: 1 where the agent may act, 0 elsewhere
    pub fn can_act_there() -> Self {
        Self::default()
    }

    pub fn with_time_since_last_visit(mut self, logistic: Logistic) -> Self {
        self.time_since_last_visit = Some(logistic);
        self
    }

    pub fn with_allowance_remaining(mut self, logistic: Logistic) -> Self {
        self.allowance_remaining = Some(logistic);
        self
    }

    /// Multiplier for acting at `cell` once the agent gets there
    ///
    /// Legality is checked at the arrival step and visit recency is measured
    /// at the arrival time, `travel_hours` after `agent.now`.
    pub fn modulate(
        &self,
        cell: Cell,
        travel_hours: Hours,
        clock: ModelClock,
        agent: &AgentSnapshot,
        oracle: &dyn LegalityOracle,
    ) -> f64 {
        if !oracle.is_allowed_at(agent, cell, clock.step_after(travel_hours)) {
            return 0.0;
        }

        let mut multiplier = 1.0;
        if let Some(logistic) = self.time_since_last_visit {
            // a cell never visited counts as fully recovered
            let arrival = agent.now + travel_hours.max(0.0);
            if let Some(hours) = agent.hours_since_visit_at(cell, arrival) {
                multiplier *= logistic.apply(hours);
            }
        }
        if let Some(logistic) = self.allowance_remaining {
            multiplier *= logistic.apply_gated(agent.sets_remaining_fraction());
        }
        multiplier
    }
}

/// Agent-wide modulator: independent logistic terms, multiplied together
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalModulator {
    pub hold_space_left: Option<Logistic>,
    pub sets_remaining: Option<Logistic>,
    pub travel_time_left: Option<Logistic>,
    pub active_devices_headroom: Option<Logistic>,
    pub devices_in_stock: Option<Logistic>,
}

impl GlobalModulator {
    /// Modulator for any kind of set: hold space and set allowance
    pub fn for_sets(config: &AttractionConfig) -> Self {
        Self {
            hold_space_left: Some(config.hold_space_left),
            sets_remaining: Some(config.sets_remaining),
            ..Self::default()
        }
    }

    /// Modulator for deployments: device limit headroom and stock
    pub fn for_deployments(config: &AttractionConfig) -> Self {
        Self {
            active_devices_headroom: Some(config.active_devices_headroom),
            devices_in_stock: Some(config.devices_in_stock),
            ..Self::default()
        }
    }

    /// High while the hold has room and the trip has time left
    pub fn for_time_at_sea(config: &AttractionConfig) -> Self {
        Self {
            hold_space_left: Some(config.hold_space_left),
            travel_time_left: Some(config.travel_time_left),
            ..Self::default()
        }
    }

    pub fn modulate(&self, agent: &AgentSnapshot) -> f64 {
        let terms = [
            (self.hold_space_left, agent.hold_space_left_fraction()),
            (self.sets_remaining, agent.sets_remaining_fraction()),
            (self.travel_time_left, agent.travel_time_left_fraction()),
            (self.active_devices_headroom, agent.active_devices_headroom_fraction()),
            (self.devices_in_stock, agent.devices_in_stock as f64),
        ];

        let mut product = 1.0;
        for (logistic, ratio) in terms {
            if let Some(logistic) = logistic {
                product *= logistic.apply_gated(ratio);
                if product == 0.0 {
                    return 0.0;
                }
            }
        }
        product
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AlwaysAllowed;
    use crate::core::types::Step;

    fn agent() -> AgentSnapshot {
        let mut agent = AgentSnapshot::new(Cell::new(0, 0), 1.0);
        agent.sets_allowance = 10;
        agent.sets_remaining = 10;
        agent.devices_in_stock = 100;
        agent
    }

    fn clock() -> ModelClock {
        ModelClock::new(0, 24.0)
    }

    #[test]
    fn test_logistic_midpoint_is_half() {
        let l = Logistic::new(3.0, 2.0);
        assert!((l.apply(3.0) - 0.5).abs() < 1e-12);
        assert!(l.apply(10.0) > 0.99);
        assert!(l.apply(-10.0) < 0.01);
    }

    #[test]
    fn test_local_zero_when_illegal() {
        let closed = |_: &AgentSnapshot, cell: Cell, _: Step| cell.x != 2;
        let m = LocalModulator::can_act_there();
        assert_eq!(m.modulate(Cell::new(2, 0), 0.0, clock(), &agent(), &closed), 0.0);
        assert_eq!(m.modulate(Cell::new(1, 0), 0.0, clock(), &agent(), &closed), 1.0);
    }

    #[test]
    fn test_local_recovers_with_time_since_visit() {
        let m = LocalModulator::can_act_there().with_time_since_last_visit(Logistic::new(50.0, 0.2));
        let mut a = agent();
        a.record_visit(Cell::new(1, 1), 0.0);

        a.now = 10.0;
        let soon = m.modulate(Cell::new(1, 1), 0.0, clock(), &a, &AlwaysAllowed);
        a.now = 200.0;
        let later = m.modulate(Cell::new(1, 1), 0.0, clock(), &a, &AlwaysAllowed);
        let never = m.modulate(Cell::new(5, 5), 0.0, clock(), &a, &AlwaysAllowed);

        assert!(soon < later);
        assert!(later > 0.99);
        assert_eq!(never, 1.0);
    }

    #[test]
    fn test_later_arrival_sees_a_more_recovered_cell() {
        let m = LocalModulator::can_act_there().with_time_since_last_visit(Logistic::new(50.0, 0.2));
        let mut a = agent();
        a.record_visit(Cell::new(1, 1), 0.0);
        a.now = 10.0;

        let on_arrival_now = m.modulate(Cell::new(1, 1), 0.0, clock(), &a, &AlwaysAllowed);
        let in_30_days = m.modulate(Cell::new(1, 1), 30.0 * 24.0, clock(), &a, &AlwaysAllowed);
        assert!(in_30_days > on_arrival_now);
        assert!(in_30_days > 0.99);
    }

    #[test]
    fn test_legality_checked_at_arrival_step() {
        let closed_from_step_2 = |_: &AgentSnapshot, _: Cell, step: Step| step < 2;
        let m = LocalModulator::can_act_there();
        let a = agent();
        assert_eq!(m.modulate(Cell::new(1, 1), 47.0, clock(), &a, &closed_from_step_2), 1.0);
        assert_eq!(m.modulate(Cell::new(1, 1), 48.0, clock(), &a, &closed_from_step_2), 0.0);
    }

    #[test]
    fn test_global_terms_multiply() {
        let hold = Logistic::new(0.5, 4.0);
        let travel = Logistic::new(0.5, 4.0);
        let m = GlobalModulator {
            hold_space_left: Some(hold),
            travel_time_left: Some(travel),
            ..GlobalModulator::default()
        };
        let mut a = agent();
        a.hold_fill_fraction = 0.25;
        a.hours_at_sea = 540.0;
        a.max_trip_hours = 720.0;

        let expected = hold.apply(0.75) * travel.apply(0.25);
        assert!((m.modulate(&a) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_global_full_hold_gates_to_zero() {
        let m = GlobalModulator::for_sets(&AttractionConfig::default());
        let mut a = agent();
        a.hold_fill_fraction = 1.0;
        assert_eq!(m.modulate(&a), 0.0);
    }

    #[test]
    fn test_global_no_stock_gates_deployments() {
        let m = GlobalModulator::for_deployments(&AttractionConfig::default());
        let mut a = agent();
        a.devices_in_stock = 0;
        assert_eq!(m.modulate(&a), 0.0);
    }

    #[test]
    fn test_time_at_sea_fades_near_the_end_of_a_trip() {
        let m = GlobalModulator::for_time_at_sea(&AttractionConfig::default());
        let mut a = agent();
        a.max_trip_hours = 720.0;
        a.hours_at_sea = 10.0;
        let early = m.modulate(&a);
        a.hours_at_sea = 700.0;
        let late = m.modulate(&a);
        assert!(early > 0.9);
        assert!(late < 0.5);
    }

    #[test]
    fn test_allowance_term_gates_when_no_sets_left() {
        let m = LocalModulator::can_act_there().with_allowance_remaining(Logistic::new(0.001, 10.0));
        let mut a = agent();
        assert!(m.modulate(Cell::new(1, 1), 0.0, clock(), &a, &AlwaysAllowed) > 0.5);
        a.sets_remaining = 0;
        assert_eq!(m.modulate(Cell::new(1, 1), 0.0, clock(), &a, &AlwaysAllowed), 0.0);
    }

    #[test]
    fn test_empty_global_is_neutral() {
        assert_eq!(GlobalModulator::default().modulate(&agent()), 1.0);
    }
}
