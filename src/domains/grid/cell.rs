use serde::{Deserialize, Serialize};
use std::fmt;

pub const ORTHOGONAL_STEP_COST: u32 = 10;
pub const DIAGONAL_STEP_COST: u32 = 14;

// Order matters for reproducible search expansion.
const MOVES: [(i64, i64, u32); 8] = [
    (0, -1, ORTHOGONAL_STEP_COST),
    (0, 1, ORTHOGONAL_STEP_COST),
    (-1, 0, ORTHOGONAL_STEP_COST),
    (1, 0, ORTHOGONAL_STEP_COST),
    (-1, -1, DIAGONAL_STEP_COST),
    (-1, 1, DIAGONAL_STEP_COST),
    (1, -1, DIAGONAL_STEP_COST),
    (1, 1, DIAGONAL_STEP_COST),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn is_diagonal_to(&self, other: &Cell) -> bool {
        self.row.abs_diff(other.row) == 1 && self.col.abs_diff(other.col) == 1
    }

    /// Octile distance scaled by the 10/14 step costs.
    pub fn octile_distance(&self, other: &Cell) -> u32 {
        let dr = self.row.abs_diff(other.row) as u32;
        let dc = self.col.abs_diff(other.col) as u32;
        let diagonal = dr.min(dc);
        let straight = dr.max(dc) - diagonal;
        DIAGONAL_STEP_COST * diagonal + ORTHOGONAL_STEP_COST * straight
    }

    pub fn euclidean_distance(&self, other: &Cell) -> f64 {
        let dr = self.row as f64 - other.row as f64;
        let dc = self.col as f64 - other.col as f64;
        (dr * dr + dc * dc).sqrt()
    }

    /// In-bounds 8-connected neighbours paired with their step cost.
    pub fn neighbours(&self, rows: usize, cols: usize) -> impl Iterator<Item = (Cell, u32)> {
        let origin = *self;
        MOVES.iter().filter_map(move |&(dr, dc, cost)| {
            let row = origin.row as i64 + dr;
            let col = origin.col as i64 + dc;
            if row < 0 || col < 0 || row >= rows as i64 || col >= cols as i64 {
                return None;
            }
            Some((Cell::new(row as usize, col as usize), cost))
        })
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

impl From<(usize, usize)> for Cell {
    fn from((row, col): (usize, usize)) -> Self {
        Cell::new(row, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octile_distance_mixes_straight_and_diagonal_steps() {
        let a = Cell::new(0, 0);
        assert_eq!(a.octile_distance(&Cell::new(3, 0)), 30);
        assert_eq!(a.octile_distance(&Cell::new(2, 2)), 28);
        assert_eq!(a.octile_distance(&Cell::new(1, 4)), 14 + 30);
    }

    #[test]
    fn corner_cell_has_three_neighbours() {
        let corner = Cell::new(0, 0);
        let around: Vec<_> = corner.neighbours(5, 5).collect();
        assert_eq!(around.len(), 3);
        assert!(around.contains(&(Cell::new(1, 1), DIAGONAL_STEP_COST)));
    }
}
