//! Planner configuration with documented constants
//!
//! All tunable numbers are collected here. Defaults are the calibrated values
//! the planner was tuned with; scenario files override them section by section.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::attraction::modulator::Logistic;
use crate::core::error::{PlannerError, Result};
use crate::planning::action::ActionKind;

/// Top-level configuration, loadable from TOML
///
/// Every section is optional in the file; missing sections use defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub map: MapConfig,
    pub trip: TripConfig,
    /// Relative probability of drawing each action kind (need not sum to 1)
    pub weights: BTreeMap<ActionKind, f64>,
    pub durations: DurationConfig,
    pub location_values: LocationValueConfig,
    pub attraction: AttractionConfig,
    pub own_sets: OwnSetConfig,
    pub draws: DrawConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripConfig {
    /// Upper bound of the travel-time budget of one trip (hours)
    pub max_trip_hours: f64,

    /// Lower bound of the budget as a fraction of `max_trip_hours`
    ///
    /// Each trip draws its budget uniformly in `[min * max, max]`.
    /// At 1.0 every trip gets exactly `max_trip_hours`.
    pub min_trip_fraction: f64,

    /// Reject candidates that are not legal at planning time
    ///
    /// When false, illegal actions stay in the plan and are only checked
    /// when the simulation gets around to executing them.
    pub purge_illegal_actions: bool,
}

/// How long each kind of action keeps the agent busy once on location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationConfig {
    /// Hours lost after each deployment (the deployment itself is instant)
    pub deployment_delay_hours: f64,
    pub unassociated_set_hours: f64,
    /// Hours spent searching before an unassociated set
    pub unassociated_search_hours: f64,
    pub own_set_hours: f64,
    pub foreign_set_hours: f64,
    /// Hours wasted when a foreign-device search comes up empty
    ///
    /// Planned pessimistically: a foreign set always budgets for it.
    pub failed_search_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationValueConfig {
    /// Fraction of every stored value lost per policy tick, in [0, 1)
    pub decay_rate: f64,
    /// Maximum number of cells a store keeps after a tick
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttractionConfig {
    /// Larger values make candidate scoring favour nearby valuable cells
    pub action_distance_exponent: f64,
    /// Larger values dampen the pull of far away cells on the heading
    pub destination_distance_exponent: f64,
    pub hold_space_left: Logistic,
    pub sets_remaining: Logistic,
    pub travel_time_left: Logistic,
    pub devices_in_stock: Logistic,
    /// Applied to the fraction of the active-device limit still unused
    pub active_devices_headroom: Logistic,
    pub unassociated_time_since_visit: Logistic,
    pub foreign_time_since_visit: Logistic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnSetConfig {
    /// Devices holding less than this are never targeted
    pub minimum_value: f64,
    /// Higher values prefer devices close to the plan centroid
    pub distance_penalty: f64,
    /// Chance a below-minimum device is misread as worth the minimum
    pub bad_readings_probability: f64,
    /// Reject devices that cannot legally be set on at planning time
    pub filter_illegal: bool,
    pub columns: u32,
    pub rows: u32,
}

/// Settings for the generators that draw from location values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawConfig {
    pub columns: u32,
    pub rows: u32,
    /// Operational cap on deployments per trip, on top of stock limits
    pub max_deployments_per_trip: Option<u32>,
    /// Value a foreign device must hold before it is worth stealing
    pub minimum_foreign_value: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        let mut weights = BTreeMap::new();
        weights.insert(ActionKind::Deploy, 1.0);
        weights.insert(ActionKind::FishUnassociated, 0.5);
        weights.insert(ActionKind::SetOwn, 1.0);
        weights.insert(ActionKind::SetForeign, 0.25);

        Self {
            map: MapConfig::default(),
            trip: TripConfig::default(),
            weights,
            durations: DurationConfig::default(),
            location_values: LocationValueConfig::default(),
            attraction: AttractionConfig::default(),
            own_sets: OwnSetConfig::default(),
            draws: DrawConfig::default(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
        }
    }
}

impl Default for TripConfig {
    fn default() -> Self {
        Self {
            max_trip_hours: 720.0,
            min_trip_fraction: 1.0,
            purge_illegal_actions: true,
        }
    }
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            deployment_delay_hours: 0.1,
            unassociated_set_hours: 2.69,
            unassociated_search_hours: 5.0,
            own_set_hours: 1.0,
            foreign_set_hours: 2.779,
            failed_search_hours: 20.0,
        }
    }
}

impl Default for LocationValueConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.05,
            capacity: 50,
        }
    }
}

impl Default for AttractionConfig {
    fn default() -> Self {
        Self {
            action_distance_exponent: 10.0,
            destination_distance_exponent: 2.0,
            hold_space_left: Logistic::new(0.156_705_739, 5.0),
            sets_remaining: Logistic::new(0.001, 10.0),
            travel_time_left: Logistic::new(0.101_832_419, 5.0),
            devices_in_stock: Logistic::new(465.769_382_876, 5.0),
            // a used-fraction midpoint of 0.8175, mirrored onto headroom
            active_devices_headroom: Logistic::new(0.182_536_364, 5.0),
            unassociated_time_since_visit: Logistic::new(51.911_626_661, 5.0),
            foreign_time_since_visit: Logistic::new(73.322_240_861, 5.0),
        }
    }
}

impl Default for OwnSetConfig {
    fn default() -> Self {
        Self {
            minimum_value: 5000.0,
            distance_penalty: 1.0,
            bad_readings_probability: 0.0,
            filter_illegal: false,
            columns: 6,
            rows: 3,
        }
    }
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            columns: 6,
            rows: 3,
            max_deployments_per_trip: None,
            minimum_foreign_value: 5000.0,
        }
    }
}

impl PlannerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PlannerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Positive weight of an action kind, if it is plannable at all
    pub fn weight_of(&self, kind: ActionKind) -> Option<f64> {
        self.weights.get(&kind).copied().filter(|w| *w > 0.0)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.map.width == 0 || self.map.height == 0 {
            return invalid(format!(
                "map must have a positive size, got {}x{}",
                self.map.width, self.map.height
            ));
        }

        if !(self.trip.max_trip_hours.is_finite() && self.trip.max_trip_hours > 0.0) {
            return invalid(format!(
                "max_trip_hours must be positive, got {}",
                self.trip.max_trip_hours
            ));
        }
        if !(self.trip.min_trip_fraction > 0.0 && self.trip.min_trip_fraction <= 1.0) {
            return invalid(format!(
                "min_trip_fraction must be in (0, 1], got {}",
                self.trip.min_trip_fraction
            ));
        }

        for (kind, weight) in &self.weights {
            if !weight.is_finite() || *weight < 0.0 {
                return invalid(format!("weight of {:?} must be finite and >= 0, got {}", kind, weight));
            }
        }
        if !self.weights.values().any(|w| *w > 0.0) {
            return invalid("at least one action kind needs a positive weight".into());
        }

        let d = &self.durations;
        for (name, hours) in [
            ("deployment_delay_hours", d.deployment_delay_hours),
            ("unassociated_set_hours", d.unassociated_set_hours),
            ("unassociated_search_hours", d.unassociated_search_hours),
            ("own_set_hours", d.own_set_hours),
            ("foreign_set_hours", d.foreign_set_hours),
            ("failed_search_hours", d.failed_search_hours),
        ] {
            if !hours.is_finite() || hours < 0.0 {
                return invalid(format!("{} must be finite and >= 0, got {}", name, hours));
            }
        }

        if !(0.0..1.0).contains(&self.location_values.decay_rate) {
            return invalid(format!(
                "decay_rate must be in [0, 1), got {}",
                self.location_values.decay_rate
            ));
        }
        if self.location_values.capacity == 0 {
            return invalid("location value capacity must be at least 1".into());
        }

        let a = &self.attraction;
        if !a.action_distance_exponent.is_finite() || !a.destination_distance_exponent.is_finite() {
            return invalid("distance exponents must be finite".into());
        }
        for (name, logistic) in [
            ("hold_space_left", a.hold_space_left),
            ("sets_remaining", a.sets_remaining),
            ("travel_time_left", a.travel_time_left),
            ("devices_in_stock", a.devices_in_stock),
            ("active_devices_headroom", a.active_devices_headroom),
            ("unassociated_time_since_visit", a.unassociated_time_since_visit),
            ("foreign_time_since_visit", a.foreign_time_since_visit),
        ] {
            logistic
                .validate()
                .map_err(|e| PlannerError::InvalidConfig(format!("{}: {}", name, e)))?;
        }

        if self.own_sets.columns == 0 || self.own_sets.rows == 0 {
            return invalid("own_sets discretization needs at least one group".into());
        }
        if !(0.0..=1.0).contains(&self.own_sets.bad_readings_probability) {
            return invalid(format!(
                "bad_readings_probability must be in [0, 1], got {}",
                self.own_sets.bad_readings_probability
            ));
        }
        if !self.own_sets.minimum_value.is_finite() || !self.own_sets.distance_penalty.is_finite() {
            return invalid("own_sets minimum_value and distance_penalty must be finite".into());
        }

        if self.draws.columns == 0 || self.draws.rows == 0 {
            return invalid("draws discretization needs at least one group".into());
        }

        Ok(())
    }
}

fn invalid(message: String) -> Result<()> {
    Err(PlannerError::InvalidConfig(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PlannerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_budget_rejected() {
        let mut config = PlannerConfig::default();
        config.trip.max_trip_hours = 0.0;
        assert!(matches!(config.validate(), Err(PlannerError::InvalidConfig(_))));
    }

    #[test]
    fn test_decay_rate_of_one_rejected() {
        let mut config = PlannerConfig::default();
        config.location_values.decay_rate = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_groups_rejected() {
        let mut config = PlannerConfig::default();
        config.own_sets.rows = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_logistic_rejected() {
        let mut config = PlannerConfig::default();
        config.attraction.travel_time_left = Logistic::new(f64::NAN, 5.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = PlannerConfig::from_toml_str(
            r#"
            [trip]
            max_trip_hours = 100.0

            [weights]
            fish_unassociated = 2.0
            set_own = 0.0
            "#,
        )
        .unwrap();

        assert_eq!(config.trip.max_trip_hours, 100.0);
        assert_eq!(config.trip.min_trip_fraction, 1.0);
        assert_eq!(config.weight_of(ActionKind::FishUnassociated), Some(2.0));
        assert_eq!(config.weight_of(ActionKind::SetOwn), None);
        assert_eq!(config.weight_of(ActionKind::Deploy), None);
        assert_eq!(config.location_values.capacity, 50);
    }

    #[test]
    fn test_invalid_toml_reports_toml_error() {
        let result = PlannerConfig::from_toml_str("[trip\nmax_trip_hours = ");
        assert!(matches!(result, Err(PlannerError::TomlError(_))));
    }
}
