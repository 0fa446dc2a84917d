//! Decaying, capacity-bounded map from cell to attraction value
//!
//! Each agent keeps one store per action kind. Stores grow from observed
//! outcomes, fade once per policy tick, and forget their weakest cells when
//! they outgrow their capacity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::LocationValueConfig;
use crate::core::types::Cell;
use crate::planning::action::ActionKind;

/// Default number of cells a store keeps after each tick
pub const DEFAULT_CAPACITY: usize = 50;

/// A value observed at a cell, reported back by the simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub kind: ActionKind,
    pub cell: Cell,
    pub value: f64,
}

impl Observation {
    pub fn new(kind: ActionKind, cell: Cell, value: f64) -> Self {
        Self { kind, cell, value }
    }
}

#[derive(Debug, Clone)]
pub struct LocationValueStore {
    kind: ActionKind,
    // ordered so sampling and summation are reproducible
    values: BTreeMap<Cell, f64>,
    decay_rate: f64,
    capacity: usize,
}

impl LocationValueStore {
    pub fn new(kind: ActionKind, decay_rate: f64, capacity: usize) -> Self {
        assert!(
            (0.0..1.0).contains(&decay_rate),
            "decay rate must be in [0, 1), got {}",
            decay_rate
        );
        assert!(capacity > 0, "location value capacity must be positive");
        Self {
            kind,
            values: BTreeMap::new(),
            decay_rate,
            capacity,
        }
    }

    pub fn from_config(kind: ActionKind, config: &LocationValueConfig) -> Self {
        Self::new(kind, config.decay_rate, config.capacity)
    }

    /// Cold-start the store from an external source of initial values
    pub fn seeded(mut self, initial: impl IntoIterator<Item = (Cell, f64)>) -> Self {
        for (cell, value) in initial {
            self.values.insert(cell, value.max(0.0));
        }
        self
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn decay_rate(&self) -> f64 {
        self.decay_rate
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored value, 0 for cells never observed
    pub fn value_at(&self, cell: Cell) -> f64 {
        self.values.get(&cell).copied().unwrap_or(0.0)
    }

    pub fn all_values(&self) -> impl Iterator<Item = (Cell, f64)> + '_ {
        self.values.iter().map(|(cell, value)| (*cell, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn total_value(&self) -> f64 {
        self.values.values().sum()
    }

    /// Merge an observation by addition; observations of other kinds are ignored
    ///
    /// Returns whether the observation was applied.
    pub fn observe(&mut self, observation: &Observation) -> bool {
        if observation.kind != self.kind || !observation.value.is_finite() {
            return false;
        }
        let entry = self.values.entry(observation.cell).or_insert(0.0);
        *entry = (*entry + observation.value).max(0.0);
        true
    }

    /// Policy tick: decay every value, then evict if over capacity
    pub fn step(&mut self) {
        let retained = 1.0 - self.decay_rate;
        for value in self.values.values_mut() {
            *value *= retained;
        }

        if self.values.len() > self.capacity {
            self.evict();
        }

        assert!(
            self.values.len() <= self.capacity,
            "eviction left {} entries in a store of capacity {}",
            self.values.len(),
            self.capacity
        );
    }

    fn evict(&mut self) {
        let before = self.values.len();
        let mean = self.total_value() / before as f64;
        self.values.retain(|_, value| *value >= mean);

        // everything sat at the mean: keep the strongest `capacity` cells
        if self.values.len() > self.capacity {
            let mut ranked: Vec<(Cell, f64)> = self.all_values().collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
            ranked.truncate(self.capacity);
            self.values = ranked.into_iter().collect();
        }

        tracing::debug!(
            kind = ?self.kind,
            before,
            after = self.values.len(),
            "evicted below-mean location values"
        );
    }
}

/// One store per action kind, fed from a single observation stream
#[derive(Debug, Clone, Default)]
pub struct LocationValueMaps {
    stores: BTreeMap<ActionKind, LocationValueStore>,
}

impl LocationValueMaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, store: LocationValueStore) -> Option<LocationValueStore> {
        self.stores.insert(store.kind(), store)
    }

    pub fn with_store(mut self, store: LocationValueStore) -> Self {
        self.insert(store);
        self
    }

    pub fn get(&self, kind: ActionKind) -> Option<&LocationValueStore> {
        self.stores.get(&kind)
    }

    pub fn get_mut(&mut self, kind: ActionKind) -> Option<&mut LocationValueStore> {
        self.stores.get_mut(&kind)
    }

    /// Route an observation to the store of its kind
    pub fn observe(&mut self, observation: &Observation) -> bool {
        self.stores
            .get_mut(&observation.kind)
            .is_some_and(|store| store.observe(observation))
    }

    pub fn step(&mut self) {
        for store in self.stores.values_mut() {
            store.step();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocationValueStore> {
        self.stores.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(decay_rate: f64) -> LocationValueStore {
        LocationValueStore::new(ActionKind::Deploy, decay_rate, DEFAULT_CAPACITY)
    }

    #[test]
    fn test_unseen_cell_is_zero() {
        assert_eq!(store(0.1).value_at(Cell::new(4, 4)), 0.0);
    }

    #[test]
    fn test_observe_adds() {
        let mut s = store(0.1);
        let obs = Observation::new(ActionKind::Deploy, Cell::new(1, 1), 2.5);
        assert!(s.observe(&obs));
        assert!(s.observe(&obs));
        assert_eq!(s.value_at(Cell::new(1, 1)), 5.0);
    }

    #[test]
    fn test_observe_ignores_other_kinds() {
        let mut s = store(0.1);
        let obs = Observation::new(ActionKind::SetOwn, Cell::new(1, 1), 2.5);
        assert!(!s.observe(&obs));
        assert!(s.is_empty());
    }

    #[test]
    fn test_observe_never_goes_negative() {
        let mut s = store(0.1).seeded([(Cell::new(0, 0), 1.0)]);
        s.observe(&Observation::new(ActionKind::Deploy, Cell::new(0, 0), -5.0));
        assert_eq!(s.value_at(Cell::new(0, 0)), 0.0);
    }

    #[test]
    fn test_step_without_decay_keeps_small_store_unchanged() {
        let mut s = store(0.0).seeded([
            (Cell::new(0, 0), 0.0),
            (Cell::new(1, 1), 1.0),
            (Cell::new(2, 2), 2.0),
        ]);
        s.step();
        assert_eq!(s.len(), 3);
        assert_eq!(s.value_at(Cell::new(0, 0)), 0.0);
        assert_eq!(s.value_at(Cell::new(1, 1)), 1.0);
        assert_eq!(s.value_at(Cell::new(2, 2)), 2.0);
    }

    #[test]
    fn test_step_decays_before_evicting() {
        let mut s = LocationValueStore::new(ActionKind::Deploy, 0.5, 2)
            .seeded([(Cell::new(0, 0), 1.0), (Cell::new(1, 0), 2.0), (Cell::new(2, 0), 6.0)]);
        s.step();
        // post-decay values 0.5, 1.0, 3.0 with mean 1.5
        assert_eq!(s.len(), 1);
        assert_eq!(s.value_at(Cell::new(2, 0)), 3.0);
    }

    #[test]
    fn test_eviction_of_uniform_store_still_respects_capacity() {
        let mut s = LocationValueStore::new(ActionKind::Deploy, 0.0, 3)
            .seeded((0..10).map(|x| (Cell::new(x, 0), 1.0)));
        s.step();
        assert_eq!(s.len(), 3);
        let kept: Vec<Cell> = s.all_values().map(|(c, _)| c).collect();
        assert_eq!(kept, vec![Cell::new(0, 0), Cell::new(1, 0), Cell::new(2, 0)]);
    }

    #[test]
    #[should_panic]
    fn test_decay_rate_of_one_panics() {
        store(1.0);
    }

    #[test]
    fn test_maps_route_observations() {
        let mut maps = LocationValueMaps::new()
            .with_store(store(0.0))
            .with_store(LocationValueStore::new(ActionKind::SetForeign, 0.0, 10));

        assert!(maps.observe(&Observation::new(ActionKind::SetForeign, Cell::new(3, 3), 7.0)));
        assert!(!maps.observe(&Observation::new(ActionKind::SetOwn, Cell::new(3, 3), 7.0)));

        assert_eq!(maps.get(ActionKind::SetForeign).unwrap().value_at(Cell::new(3, 3)), 7.0);
        assert_eq!(maps.get(ActionKind::Deploy).unwrap().value_at(Cell::new(3, 3)), 0.0);
    }
}
