//! Trip planning: actions, plans, candidate generators and the planner

pub mod action;
pub mod generator;
pub mod location_draw;
pub mod own_device;
pub mod plan;
pub mod planner;

pub use action::{ActionKind, PlannedAction};
pub use generator::{ActionGenerator, PlanningContext, PlanningEnv};
pub use location_draw::{ActionTemplate, LocationDrawGenerator};
pub use own_device::OwnDeviceGenerator;
pub use plan::{Insertion, Plan};
pub use planner::{PlannerState, TripPlanner};
