use crate::domains::grid::{Cell, GridWorld};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::{Duration, Instant};

pub const DEFAULT_SEARCH_BUDGET: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedPath {
    /// Every cell from start to goal, both inclusive.
    pub cells: Vec<Cell>,
    pub cost: u32,
}

impl PlannedPath {
    pub fn steps(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }

    pub fn goal(&self) -> Option<Cell> {
        self.cells.last().copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(PlannedPath),
    NoPath,
    TimedOut { elapsed: Duration, expanded: usize },
}

impl SearchOutcome {
    pub fn into_path(self) -> Option<PlannedPath> {
        match self {
            SearchOutcome::Found(path) => Some(path),
            SearchOutcome::NoPath | SearchOutcome::TimedOut { .. } => None,
        }
    }
}

/// Time-boxed A* over the 8-connected grid.
#[derive(Debug, Clone)]
pub struct Pathfinder {
    budget: Duration,
}

impl Default for Pathfinder {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_BUDGET)
    }
}

impl Pathfinder {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    pub fn find_path(
        &self,
        grid: &GridWorld,
        occupied: &HashSet<Cell>,
        start: Cell,
        goal: Cell,
    ) -> Option<PlannedPath> {
        self.search(grid, occupied, start, goal).into_path()
    }

    /// `occupied` holds cells that are impassable right now on top of the
    /// static grid, typically the moving obstacles' current positions.
    pub fn search(&self, grid: &GridWorld, occupied: &HashSet<Cell>, start: Cell, goal: Cell) -> SearchOutcome {
        let started = Instant::now();
        let infeasible = |cell: Cell| grid.is_blocked(cell) || occupied.contains(&cell);

        if !grid.contains(start) || !grid.contains(goal) {
            return SearchOutcome::NoPath;
        }
        if start == goal {
            return SearchOutcome::Found(PlannedPath {
                cells: vec![start],
                cost: 0,
            });
        }
        if infeasible(goal) {
            return SearchOutcome::NoPath;
        }

        // (f, h, cell): the trailing keys make pops deterministic.
        let mut open: BinaryHeap<Reverse<(u32, u32, Cell)>> = BinaryHeap::new();
        let mut best_cost: HashMap<Cell, u32> = HashMap::new();
        let mut came_from: HashMap<Cell, Cell> = HashMap::new();
        let mut closed: HashSet<Cell> = HashSet::new();
        let mut expanded = 0usize;

        let h = start.octile_distance(&goal);
        best_cost.insert(start, 0);
        open.push(Reverse((h, h, start)));

        while let Some(Reverse((_, _, current))) = open.pop() {
            let elapsed = started.elapsed();
            if elapsed > self.budget {
                return SearchOutcome::TimedOut { elapsed, expanded };
            }
            if !closed.insert(current) {
                continue;
            }
            expanded += 1;

            let g = best_cost.get(&current).copied().unwrap_or(0);
            if current == goal {
                return SearchOutcome::Found(PlannedPath {
                    cells: reconstruct(&came_from, start, goal),
                    cost: g,
                });
            }

            for (next, step_cost) in current.neighbours(grid.rows(), grid.cols()) {
                if closed.contains(&next) || infeasible(next) {
                    continue;
                }
                let tentative = g + step_cost;
                if best_cost.get(&next).is_some_and(|&known| tentative >= known) {
                    continue;
                }
                best_cost.insert(next, tentative);
                came_from.insert(next, current);
                let h = next.octile_distance(&goal);
                open.push(Reverse((tentative + h, h, next)));
            }
        }

        SearchOutcome::NoPath
    }
}

fn reconstruct(came_from: &HashMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Cell> {
    let mut cells = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(&previous) => {
                cells.push(previous);
                current = previous;
            }
            None => break,
        }
    }
    cells.reverse();
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid(rows: usize, cols: usize) -> GridWorld {
        GridWorld::new(rows, cols).unwrap()
    }

    #[test]
    fn straight_corridor_costs_ten_per_step() {
        let grid = open_grid(15, 15);
        let path = Pathfinder::default()
            .find_path(&grid, &HashSet::new(), Cell::new(1, 3), Cell::new(4, 3))
            .unwrap();
        assert_eq!(path.cost, 30);
        assert_eq!(path.steps(), 3);
        assert_eq!(path.cells.first(), Some(&Cell::new(1, 3)));
        assert_eq!(path.goal(), Some(Cell::new(4, 3)));
    }

    #[test]
    fn same_cell_is_a_zero_cost_path() {
        let grid = open_grid(3, 3);
        let path = Pathfinder::default()
            .find_path(&grid, &HashSet::new(), Cell::new(1, 1), Cell::new(1, 1))
            .unwrap();
        assert_eq!(path.cells, vec![Cell::new(1, 1)]);
        assert_eq!(path.cost, 0);
    }

    #[test]
    fn routes_around_a_wall() {
        let mut grid = open_grid(5, 5);
        for row in 0..4 {
            grid.block(Cell::new(row, 2)).unwrap();
        }
        let path = Pathfinder::default()
            .find_path(&grid, &HashSet::new(), Cell::new(0, 0), Cell::new(0, 4))
            .unwrap();
        assert!(path.cells.iter().all(|c| !grid.is_blocked(*c)));
        assert!(path.cells.contains(&Cell::new(4, 2)));
    }

    #[test]
    fn occupied_goal_is_not_found() {
        let grid = open_grid(5, 5);
        let occupied: HashSet<Cell> = [Cell::new(3, 3)].into_iter().collect();
        let outcome = Pathfinder::default().search(&grid, &occupied, Cell::new(0, 0), Cell::new(3, 3));
        assert_eq!(outcome, SearchOutcome::NoPath);
    }

    #[test]
    fn timeout_reads_as_not_found() {
        let outcome = SearchOutcome::TimedOut {
            elapsed: Duration::from_millis(251),
            expanded: 42,
        };
        assert!(outcome.into_path().is_none());
    }
}
