//! Externally supplied ban layer: cells the agent refuses to target

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::types::Cell;

/// Inclusive rectangle of banned cells
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BannedArea {
    pub min: Cell,
    pub max: Cell,
}

impl BannedArea {
    pub fn new(min: Cell, max: Cell) -> Self {
        assert!(min.x <= max.x && min.y <= max.y, "banned area {} - {} is inverted", min, max);
        Self { min, max }
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= self.min.x && cell.x <= self.max.x && cell.y >= self.min.y && cell.y <= self.max.y
    }
}

#[derive(Debug, Clone, Default)]
pub struct BanLayer {
    cells: AHashSet<Cell>,
    areas: Vec<BannedArea>,
}

impl BanLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ban_cell(&mut self, cell: Cell) {
        self.cells.insert(cell);
    }

    pub fn ban_area(&mut self, area: BannedArea) {
        self.areas.push(area);
    }

    pub fn with_area(mut self, area: BannedArea) -> Self {
        self.ban_area(area);
        self
    }

    pub fn is_banned(&self, cell: Cell) -> bool {
        self.cells.contains(&cell) || self.areas.iter().any(|a| a.contains(cell))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.areas.is_empty()
    }
}

impl FromIterator<Cell> for BanLayer {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
            areas: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_and_area_bans() {
        let layer: BanLayer = [Cell::new(9, 9)].into_iter().collect();
        let layer = layer.with_area(BannedArea::new(Cell::new(0, 0), Cell::new(2, 1)));

        assert!(layer.is_banned(Cell::new(9, 9)));
        assert!(layer.is_banned(Cell::new(2, 1)));
        assert!(layer.is_banned(Cell::new(0, 0)));
        assert!(!layer.is_banned(Cell::new(2, 2)));
        assert!(!layer.is_banned(Cell::new(3, 0)));
    }

    #[test]
    #[should_panic]
    fn test_inverted_area_panics() {
        BannedArea::new(Cell::new(3, 3), Cell::new(1, 1));
    }
}
