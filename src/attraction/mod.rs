//! Spatial attraction: value maps, modulators and the fields built on them

pub mod field;
pub mod location_values;
pub mod modulator;

pub use field::{total_attraction, AttractionField, FieldContext};
pub use location_values::{LocationValueMaps, LocationValueStore, Observation};
pub use modulator::{GlobalModulator, LocalModulator, Logistic};
