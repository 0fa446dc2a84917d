//! Partition of the map grid into rectangular groups

use crate::core::error::{PlannerError, Result};
use crate::core::types::Cell;

/// Splits a `width x height` map into `columns x rows` rectangles
///
/// Groups are numbered row by row: group = row * columns + column.
/// Cells outside the map are clamped onto the border groups.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDiscretization {
    width: u32,
    height: u32,
    columns: u32,
    rows: u32,
}

impl MapDiscretization {
    pub fn new(width: u32, height: u32, columns: u32, rows: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PlannerError::InvalidConfig(format!(
                "cannot discretize an empty {}x{} map",
                width, height
            )));
        }
        if columns == 0 || rows == 0 {
            return Err(PlannerError::InvalidConfig(format!(
                "discretization needs at least one group, got {}x{}",
                columns, rows
            )));
        }
        Ok(Self {
            width,
            height,
            columns: columns.min(width),
            rows: rows.min(height),
        })
    }

    pub fn number_of_groups(&self) -> usize {
        (self.columns * self.rows) as usize
    }

    pub fn group_of(&self, cell: Cell) -> usize {
        let x = cell.x.clamp(0, self.width as i32 - 1) as u64;
        let y = cell.y.clamp(0, self.height as i32 - 1) as u64;
        let column = x * self.columns as u64 / self.width as u64;
        let row = y * self.rows as u64 / self.height as u64;
        (row * self.columns as u64 + column) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_groups_is_config_error() {
        assert!(MapDiscretization::new(10, 10, 0, 3).is_err());
        assert!(MapDiscretization::new(0, 10, 2, 3).is_err());
    }

    #[test]
    fn test_groups_cover_map() {
        let d = MapDiscretization::new(12, 6, 3, 2).unwrap();
        assert_eq!(d.number_of_groups(), 6);
        assert_eq!(d.group_of(Cell::new(0, 0)), 0);
        assert_eq!(d.group_of(Cell::new(3, 0)), 0);
        assert_eq!(d.group_of(Cell::new(4, 0)), 1);
        assert_eq!(d.group_of(Cell::new(11, 0)), 2);
        assert_eq!(d.group_of(Cell::new(0, 3)), 3);
        assert_eq!(d.group_of(Cell::new(11, 5)), 5);
    }

    #[test]
    fn test_out_of_map_cells_clamp() {
        let d = MapDiscretization::new(12, 6, 3, 2).unwrap();
        assert_eq!(d.group_of(Cell::new(-5, -5)), 0);
        assert_eq!(d.group_of(Cell::new(100, 100)), 5);
    }

    #[test]
    fn test_more_groups_than_cells_is_capped() {
        let d = MapDiscretization::new(2, 2, 10, 10).unwrap();
        assert_eq!(d.number_of_groups(), 4);
    }
}
