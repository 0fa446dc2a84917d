//! Plannable field actions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agent::{AgentSnapshot, LegalityOracle};
use crate::core::types::{Cell, DeviceId, Hours, Step};

/// Discriminant of a planned action, used for quotas and preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Put a new tracking device in the water
    Deploy,
    /// Fish on open water, away from any device
    FishUnassociated,
    /// Set on a device the agent deployed itself
    SetOwn,
    /// Set on a device somebody else deployed
    SetForeign,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Deploy,
        ActionKind::FishUnassociated,
        ActionKind::SetOwn,
        ActionKind::SetForeign,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Deploy => "deploy",
            ActionKind::FishUnassociated => "fish_unassociated",
            ActionKind::SetOwn => "set_own",
            ActionKind::SetForeign => "set_foreign",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One stop of a trip. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlannedAction {
    Deploy {
        cell: Cell,
        delay_hours: Hours,
    },
    FishUnassociated {
        cell: Cell,
        set_hours: Hours,
        search_hours: Hours,
    },
    SetOwn {
        device: DeviceId,
        cell: Cell,
        set_hours: Hours,
    },
    SetForeign {
        cell: Cell,
        set_hours: Hours,
        /// Budgeted in full: a foreign search is planned as if it fails
        hours_wasted_if_empty: Hours,
        /// Devices worth less than this are not set on
        minimum_value: f64,
    },
}

impl PlannedAction {
    pub fn cell(&self) -> Cell {
        match self {
            PlannedAction::Deploy { cell, .. }
            | PlannedAction::FishUnassociated { cell, .. }
            | PlannedAction::SetOwn { cell, .. }
            | PlannedAction::SetForeign { cell, .. } => *cell,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            PlannedAction::Deploy { .. } => ActionKind::Deploy,
            PlannedAction::FishUnassociated { .. } => ActionKind::FishUnassociated,
            PlannedAction::SetOwn { .. } => ActionKind::SetOwn,
            PlannedAction::SetForeign { .. } => ActionKind::SetForeign,
        }
    }

    /// Hours spent on location, on top of travelling there
    pub fn duration_hours(&self) -> Hours {
        match self {
            PlannedAction::Deploy { delay_hours, .. } => *delay_hours,
            PlannedAction::FishUnassociated {
                set_hours,
                search_hours,
                ..
            } => set_hours + search_hours,
            PlannedAction::SetOwn { set_hours, .. } => *set_hours,
            PlannedAction::SetForeign {
                set_hours,
                hours_wasted_if_empty,
                ..
            } => set_hours + hours_wasted_if_empty,
        }
    }

    /// Whether the action could be carried out at its cell at `step`
    pub fn is_allowed_now(&self, agent: &AgentSnapshot, oracle: &dyn LegalityOracle, step: Step) -> bool {
        oracle.is_action_allowed(agent, self.kind(), step) && oracle.is_allowed_at(agent, self.cell(), step)
    }
}
