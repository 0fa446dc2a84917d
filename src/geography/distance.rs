//! Distance functions between grid cells
//!
//! The planner only assumes distances are symmetric and expressed in the
//! same unit as the agent's speed (cells per hour).

use crate::core::types::Cell;

pub trait Distance {
    fn distance(&self, a: Cell, b: Cell) -> f64;
}

/// Grid distance moving along rows and columns only
#[derive(Debug, Clone, Copy, Default)]
pub struct Manhattan;

impl Distance for Manhattan {
    fn distance(&self, a: Cell, b: Cell) -> f64 {
        ((a.x - b.x).abs() + (a.y - b.y).abs()) as f64
    }
}

/// Straight-line distance, optionally scaled to a physical cell size
#[derive(Debug, Clone, Copy)]
pub struct Euclidean {
    pub cell_size: f64,
}

impl Default for Euclidean {
    fn default() -> Self {
        Self { cell_size: 1.0 }
    }
}

impl Distance for Euclidean {
    fn distance(&self, a: Cell, b: Cell) -> f64 {
        let dx = (a.x - b.x) as f64;
        let dy = (a.y - b.y) as f64;
        (dx * dx + dy * dy).sqrt() * self.cell_size
    }
}

impl<F> Distance for F
where
    F: Fn(Cell, Cell) -> f64,
{
    fn distance(&self, a: Cell, b: Cell) -> f64 {
        self(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan() {
        assert_eq!(Manhattan.distance(Cell::new(0, 0), Cell::new(3, -4)), 7.0);
        assert_eq!(Manhattan.distance(Cell::new(2, 2), Cell::new(2, 2)), 0.0);
    }

    #[test]
    fn test_euclidean_scaled() {
        let d = Euclidean { cell_size: 2.0 };
        assert!((d.distance(Cell::new(0, 0), Cell::new(3, 4)) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_closure_distance() {
        let chebyshev = |a: Cell, b: Cell| (a.x - b.x).abs().max((a.y - b.y).abs()) as f64;
        assert_eq!(chebyshev.distance(Cell::new(0, 0), Cell::new(3, 1)), 3.0);
    }
}
