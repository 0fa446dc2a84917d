//! A trip as an ordered tour of actions between two anchors
//!
//! The route is `start -> actions... -> end`. A fresh trip starts and ends at
//! home; polling an action moves the start anchor to where it happened, so
//! later insertions are priced from the agent's actual route.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::types::{Cell, Hours};
use crate::geography::distance::Distance;
use crate::planning::action::{ActionKind, PlannedAction};

/// Where to insert an action and what it costs in travel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Insertion {
    /// Position in `0..=len()`
    pub index: usize,
    /// Extra travel hours the detour adds to the route
    pub added_hours: Hours,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    start: Cell,
    end: Cell,
    actions: VecDeque<PlannedAction>,
    /// Cells per hour, used to turn detours into hours
    speed: f64,
    estimated_hours: Hours,
}

impl Plan {
    pub fn new(start: Cell, end: Cell, speed: f64) -> Self {
        assert!(speed > 0.0, "plan speed must be positive, got {}", speed);
        Self {
            start,
            end,
            actions: VecDeque::new(),
            speed,
            estimated_hours: 0.0,
        }
    }

    /// Empty round trip from and back to `home`
    pub fn home(home: Cell, speed: f64) -> Self {
        Self::new(home, home, speed)
    }

    pub fn start(&self) -> Cell {
        self.start
    }

    pub fn end(&self) -> Cell {
        self.end
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &PlannedAction> {
        self.actions.iter()
    }

    pub fn count_of(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind() == kind).count()
    }

    /// Travel plus on-location hours committed by the insertions so far
    pub fn estimated_hours(&self) -> Hours {
        self.estimated_hours
    }

    pub fn add_estimated_hours(&mut self, hours: Hours) {
        self.estimated_hours += hours;
    }

    /// Cell before position `index` on the route
    fn stop_before(&self, index: usize) -> Cell {
        if index == 0 {
            self.start
        } else {
            self.actions[index - 1].cell()
        }
    }

    /// Cell at position `index` on the route, the end anchor past the last action
    fn stop_at(&self, index: usize) -> Cell {
        self.actions.get(index).map_or(self.end, |a| a.cell())
    }

    /// Scan every gap of the route and pick the one with the smallest detour
    ///
    /// The first minimal position wins exact ties.
    pub fn cheapest_insertion(&self, action: &PlannedAction, distance: &dyn Distance) -> Insertion {
        let cell = action.cell();
        let mut best = Insertion {
            index: 0,
            added_hours: f64::INFINITY,
        };

        for index in 0..=self.actions.len() {
            let prev = self.stop_before(index);
            let next = self.stop_at(index);
            let detour = distance.distance(prev, cell) + distance.distance(cell, next) - distance.distance(prev, next);
            let added_hours = detour / self.speed;
            if added_hours < best.added_hours {
                best = Insertion { index, added_hours };
            }
        }

        best
    }

    /// Price the cheapest position for `action` and insert it there
    pub fn insert_cheapest(&mut self, action: PlannedAction, distance: &dyn Distance) -> Insertion {
        let insertion = self.cheapest_insertion(&action, distance);
        self.insert_action(action, insertion.index, insertion.added_hours);
        insertion
    }

    /// Insert at a position the caller already chose
    ///
    /// `travel_hours` must be the detour priced for `index` by
    /// `cheapest_insertion` against the current route. Anything else leaves
    /// `estimated_hours` out of step with `travel_hours()`.
    pub fn insert_action(&mut self, action: PlannedAction, index: usize, travel_hours: Hours) {
        assert!(
            index <= self.actions.len(),
            "insertion index {} out of range for a plan of {} actions",
            index,
            self.actions.len()
        );
        self.estimated_hours += travel_hours + action.duration_hours();
        self.actions.insert(index, action);
    }

    /// Remove the next action to execute; the route now starts from its cell
    pub fn poll_next_action(&mut self) -> Option<PlannedAction> {
        let action = self.actions.pop_front()?;
        self.start = action.cell();
        Some(action)
    }

    pub fn peek_next_action(&self) -> Option<&PlannedAction> {
        self.actions.front()
    }

    /// Mean position of the pending actions, the end anchor when there are none
    pub fn centroid(&self) -> (f64, f64) {
        if self.actions.is_empty() {
            return (self.end.x as f64, self.end.y as f64);
        }
        let n = self.actions.len() as f64;
        let (sx, sy) = self.actions.iter().fold((0.0, 0.0), |(sx, sy), a| {
            let c = a.cell();
            (sx + c.x as f64, sy + c.y as f64)
        });
        (sx / n, sy / n)
    }

    /// Centroid snapped to the nearest grid cell
    pub fn centroid_cell(&self) -> Cell {
        let (x, y) = self.centroid();
        Cell::nearest(x, y)
    }

    /// Cells in visiting order, anchors included
    pub fn route(&self) -> Vec<Cell> {
        let mut route = Vec::with_capacity(self.actions.len() + 2);
        route.push(self.start);
        route.extend(self.actions.iter().map(|a| a.cell()));
        route.push(self.end);
        route
    }

    /// Length of the whole route in hours of travel
    pub fn travel_hours(&self, distance: &dyn Distance) -> Hours {
        self.route()
            .windows(2)
            .map(|leg| distance.distance(leg[0], leg[1]))
            .sum::<f64>()
            / self.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DeviceId;
    use crate::geography::distance::Manhattan;

    fn fish(x: i32, y: i32) -> PlannedAction {
        PlannedAction::FishUnassociated {
            cell: Cell::new(x, y),
            set_hours: 1.0,
            search_hours: 0.0,
        }
    }

    fn insert_cheapest(plan: &mut Plan, action: PlannedAction) -> Insertion {
        plan.insert_cheapest(action, &Manhattan)
    }

    #[test]
    fn test_empty_plan_inserts_at_zero() {
        let plan = Plan::home(Cell::new(0, 0), 1.0);
        let ins = plan.cheapest_insertion(&fish(3, 0), &Manhattan);
        assert_eq!(ins.index, 0);
        assert_eq!(ins.added_hours, 6.0);
    }

    #[test]
    fn test_insertion_reorders_by_geometry() {
        let mut plan = Plan::home(Cell::new(0, 0), 1.0);
        insert_cheapest(&mut plan, fish(5, 0));
        let ins = insert_cheapest(&mut plan, fish(1, 1));
        assert_eq!(ins.index, 0);
        assert_eq!(ins.added_hours, 2.0);

        let cells: Vec<Cell> = plan.pending().map(|a| a.cell()).collect();
        assert_eq!(cells, vec![Cell::new(1, 1), Cell::new(5, 0)]);
    }

    #[test]
    fn test_ties_go_to_lowest_index() {
        let mut plan = Plan::home(Cell::new(0, 0), 1.0);
        insert_cheapest(&mut plan, fish(2, 0));
        // (1, 0) lies on both legs of the out-and-back route
        let ins = plan.cheapest_insertion(&fish(1, 0), &Manhattan);
        assert_eq!(ins.index, 0);
        assert_eq!(ins.added_hours, 0.0);
    }

    #[test]
    fn test_speed_scales_cost() {
        let plan = Plan::home(Cell::new(0, 0), 2.0);
        let ins = plan.cheapest_insertion(&fish(3, 0), &Manhattan);
        assert_eq!(ins.added_hours, 3.0);
    }

    #[test]
    fn test_estimated_hours_accumulate() {
        let mut plan = Plan::home(Cell::new(0, 0), 1.0);
        insert_cheapest(&mut plan, fish(2, 0));
        insert_cheapest(&mut plan, fish(0, 2));
        // 4 + 1, then 4 + 1
        assert_eq!(plan.estimated_hours(), 10.0);
        assert_eq!(plan.travel_hours(&Manhattan), 8.0);
    }

    #[test]
    fn test_estimate_matches_route_after_priced_inserts() {
        let mut plan = Plan::home(Cell::new(0, 0), 0.5);
        for (x, y) in [(3, 1), (-2, 4), (1, 1), (6, -3), (0, 5)] {
            insert_cheapest(&mut plan, fish(x, y));
        }
        let on_location: f64 = plan.pending().map(|a| a.duration_hours()).sum();
        assert!((plan.estimated_hours() - plan.travel_hours(&Manhattan) - on_location).abs() < 1e-9);
    }

    #[test]
    fn test_poll_moves_start_and_centroid() {
        let mut plan = Plan::home(Cell::new(0, 0), 1.0);
        plan.insert_action(fish(2, 0), 0, 4.0);
        plan.insert_action(fish(4, 2), 1, 4.0);
        assert_eq!(plan.centroid(), (3.0, 1.0));

        let first = plan.poll_next_action().unwrap();
        assert_eq!(first.cell(), Cell::new(2, 0));
        assert_eq!(plan.start(), Cell::new(2, 0));
        assert_eq!(plan.centroid(), (4.0, 2.0));

        plan.poll_next_action();
        assert_eq!(plan.centroid(), (0.0, 0.0));
        assert!(plan.poll_next_action().is_none());
    }

    #[test]
    fn test_count_of_kind() {
        let mut plan = Plan::home(Cell::new(0, 0), 1.0);
        plan.insert_action(fish(1, 0), 0, 0.0);
        plan.insert_action(
            PlannedAction::SetOwn {
                device: DeviceId::new(1),
                cell: Cell::new(2, 0),
                set_hours: 1.0,
            },
            1,
            0.0,
        );
        assert_eq!(plan.count_of(ActionKind::FishUnassociated), 1);
        assert_eq!(plan.count_of(ActionKind::SetOwn), 1);
        assert_eq!(plan.count_of(ActionKind::Deploy), 0);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_insert_panics() {
        let mut plan = Plan::home(Cell::new(0, 0), 1.0);
        plan.insert_action(fish(1, 0), 1, 0.0);
    }
}
