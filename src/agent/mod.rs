//! Read-only view of the agent and the collaborators the planner consults
//!
//! The surrounding simulation owns the real agent; the planner only ever
//! sees an `AgentSnapshot` taken at planning time.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{Cell, DeviceId, Hours, Step};
use crate::planning::action::ActionKind;

/// A device the agent has already placed, with its current estimated value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceReading {
    pub device: DeviceId,
    pub cell: Cell,
    pub value: f64,
}

/// Snapshot of agent state at planning time
#[derive(Debug, Clone)]
pub struct AgentSnapshot {
    pub position: Cell,
    pub home: Cell,
    /// Cells per hour
    pub speed: f64,
    /// 0 = empty hold, 1 = full
    pub hold_fill_fraction: f64,
    pub hours_at_sea: Hours,
    pub max_trip_hours: Hours,
    /// Model time in hours, used to age visit records
    pub now: Hours,
    /// Regulatory sets left this season
    pub sets_remaining: u32,
    pub sets_allowance: u32,
    pub devices_in_stock: u32,
    pub active_devices: u32,
    pub active_devices_limit: u32,
    pub deployed_devices: Vec<DeviceReading>,
    last_visits: AHashMap<Cell, Hours>,
}

impl AgentSnapshot {
    pub fn new(home: Cell, speed: f64) -> Self {
        assert!(speed > 0.0, "agent speed must be positive, got {}", speed);
        Self {
            position: home,
            home,
            speed,
            hold_fill_fraction: 0.0,
            hours_at_sea: 0.0,
            max_trip_hours: 720.0,
            now: 0.0,
            sets_remaining: u32::MAX,
            sets_allowance: u32::MAX,
            devices_in_stock: 0,
            active_devices: 0,
            active_devices_limit: 0,
            deployed_devices: Vec::new(),
            last_visits: AHashMap::new(),
        }
    }

    pub fn is_at_home(&self) -> bool {
        self.position == self.home
    }

    pub fn record_visit(&mut self, cell: Cell, at: Hours) {
        self.last_visits.insert(cell, at);
    }

    /// Hours since the agent last acted at `cell`, `None` if it never did
    pub fn hours_since_last_visit(&self, cell: Cell) -> Option<Hours> {
        self.hours_since_visit_at(cell, self.now)
    }

    /// Hours between the last visit to `cell` and model time `at`
    pub fn hours_since_visit_at(&self, cell: Cell, at: Hours) -> Option<Hours> {
        self.last_visits.get(&cell).map(|visited| (at - visited).max(0.0))
    }

    pub fn hold_space_left_fraction(&self) -> f64 {
        (1.0 - self.hold_fill_fraction).clamp(0.0, 1.0)
    }

    pub fn travel_time_left_fraction(&self) -> f64 {
        if self.max_trip_hours <= 0.0 {
            return 0.0;
        }
        (1.0 - self.hours_at_sea / self.max_trip_hours).clamp(0.0, 1.0)
    }

    pub fn sets_remaining_fraction(&self) -> f64 {
        if self.sets_allowance == 0 {
            return 0.0;
        }
        (self.sets_remaining as f64 / self.sets_allowance as f64).clamp(0.0, 1.0)
    }

    /// Unused share of the active-device limit (1 when no limit applies)
    pub fn active_devices_headroom_fraction(&self) -> f64 {
        if self.active_devices_limit == 0 {
            return 1.0;
        }
        let used = self.active_devices as f64 / self.active_devices_limit as f64;
        (1.0 - used).clamp(0.0, 1.0)
    }

    /// How many more devices may be deployed right now
    pub fn deployable_devices(&self) -> u32 {
        let headroom = if self.active_devices_limit == 0 {
            u32::MAX
        } else {
            self.active_devices_limit.saturating_sub(self.active_devices)
        };
        self.devices_in_stock.min(headroom)
    }
}

/// Regulatory oracle: may the agent act at this cell at this step?
pub trait LegalityOracle {
    fn is_allowed_at(&self, agent: &AgentSnapshot, cell: Cell, step: Step) -> bool;

    /// Whole action kinds can be forbidden regardless of place
    fn is_action_allowed(&self, _agent: &AgentSnapshot, _kind: ActionKind, _step: Step) -> bool {
        true
    }
}

/// Oracle for open-access scenarios and tests
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAllowed;

impl LegalityOracle for AlwaysAllowed {
    fn is_allowed_at(&self, _agent: &AgentSnapshot, _cell: Cell, _step: Step) -> bool {
        true
    }
}

impl<F> LegalityOracle for F
where
    F: Fn(&AgentSnapshot, Cell, Step) -> bool,
{
    fn is_allowed_at(&self, agent: &AgentSnapshot, cell: Cell, step: Step) -> bool {
        self(agent, cell, step)
    }
}

/// Maps elapsed hours onto model steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelClock {
    pub step: Step,
    pub hours_per_step: Hours,
}

impl ModelClock {
    pub fn new(step: Step, hours_per_step: Hours) -> Self {
        assert!(hours_per_step > 0.0, "hours_per_step must be positive");
        Self { step, hours_per_step }
    }

    /// Step at which something `hours` from now happens
    pub fn step_after(&self, hours: Hours) -> Step {
        if !hours.is_finite() || hours <= 0.0 {
            return self.step;
        }
        self.step + (hours / self.hours_per_step).floor() as Step
    }
}

impl Default for ModelClock {
    fn default() -> Self {
        Self::new(0, 24.0)
    }
}
