//! Map geometry consumed by the planner: distances, spatial groups, bans

pub mod discretization;
pub mod distance;
pub mod hazard;

pub use discretization::MapDiscretization;
pub use distance::{Distance, Euclidean, Manhattan};
pub use hazard::{BanLayer, BannedArea};
