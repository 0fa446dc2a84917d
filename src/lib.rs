//! Harvest Planner - trip planning and spatial attraction for harvesting agents

pub mod agent;
pub mod attraction;
pub mod core;
pub mod geography;
pub mod planning;

pub use crate::core::{PlannerConfig, PlannerError, Result};
