use super::cell::Cell;
use super::obstacle::DynamicObstacle;
use crate::common::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub cell: Cell,
    /// Priority applied to submissions for this waypoint that carry no label.
    pub default_priority: Option<u8>,
}

/// Static occupancy grid plus the named waypoints and moving obstacles on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridWorld {
    rows: usize,
    cols: usize,
    blocked: Vec<bool>,
    waypoints: BTreeMap<String, Waypoint>,
    obstacles: Vec<DynamicObstacle>,
}

pub fn normalize_waypoint_name(name: &str) -> String {
    name.trim().to_uppercase()
}

impl GridWorld {
    pub fn new(rows: usize, cols: usize) -> DomainResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(DomainError::InvalidCommand {
                reason: format!("Grid dimensions must be positive, got {}x{}", rows, cols),
            });
        }
        Ok(Self {
            rows,
            cols,
            blocked: vec![false; rows * cols],
            waypoints: BTreeMap::new(),
            obstacles: Vec::new(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        self.contains(cell).then(|| cell.row * self.cols + cell.col)
    }

    fn ensure_contains(&self, cell: Cell) -> DomainResult<usize> {
        self.index(cell).ok_or(DomainError::OutOfBounds {
            row: cell.row,
            col: cell.col,
        })
    }

    /// Out-of-bounds cells count as blocked.
    pub fn is_blocked(&self, cell: Cell) -> bool {
        self.index(cell).map_or(true, |i| self.blocked[i])
    }

    pub fn blocked_cells(&self) -> BTreeSet<Cell> {
        (0..self.rows)
            .flat_map(|row| (0..self.cols).map(move |col| Cell::new(row, col)))
            .filter(|cell| self.is_blocked(*cell))
            .collect()
    }

    /// Flood fill over the static grid: true when `target` is connected to
    /// any of `origins`. Origins are expanded even if they sit on a blocked cell.
    pub fn reachable_from(&self, origins: &[Cell], target: Cell) -> bool {
        let mut seen = vec![false; self.rows * self.cols];
        let mut frontier = VecDeque::new();
        for &origin in origins {
            if let Some(i) = self.index(origin) {
                if !seen[i] {
                    seen[i] = true;
                    frontier.push_back(origin);
                }
            }
        }

        while let Some(cell) = frontier.pop_front() {
            if cell == target {
                return true;
            }
            for (next, _) in cell.neighbours(self.rows, self.cols) {
                if self.is_blocked(next) {
                    continue;
                }
                if let Some(i) = self.index(next) {
                    if !seen[i] {
                        seen[i] = true;
                        frontier.push_back(next);
                    }
                }
            }
        }
        false
    }

    pub fn add_waypoint(&mut self, name: &str, cell: Cell, default_priority: Option<u8>) -> DomainResult<()> {
        let index = self.ensure_contains(cell)?;
        let key = normalize_waypoint_name(name);
        if key.is_empty() {
            return Err(DomainError::InvalidCommand {
                reason: "Waypoint name must not be empty".to_string(),
            });
        }
        if self.waypoints.contains_key(&key) {
            return Err(DomainError::DuplicateId { id: key });
        }
        if self.blocked[index] {
            return Err(DomainError::ProtectedCell {
                row: cell.row,
                col: cell.col,
                reason: format!("waypoint {} cannot sit on a blocked cell", key),
            });
        }
        self.waypoints.insert(
            key.clone(),
            Waypoint {
                name: key,
                cell,
                default_priority,
            },
        );
        Ok(())
    }

    pub fn waypoint(&self, name: &str) -> Option<&Waypoint> {
        self.waypoints.get(&normalize_waypoint_name(name))
    }

    pub fn waypoint_at(&self, cell: Cell) -> Option<&Waypoint> {
        self.waypoints.values().find(|w| w.cell == cell)
    }

    /// Resolves `name` to a waypoint a robot could be sent to right now.
    /// `fleet` holds the robots' cells; together with the home waypoint they
    /// seed the reachability check. With no seeds at all it is skipped.
    pub fn feasible_destination(&self, name: &str, home: Option<&str>, fleet: &[Cell]) -> DomainResult<&Waypoint> {
        let waypoint = self.waypoint(name).ok_or_else(|| DomainError::UnknownWaypoint {
            name: name.to_string(),
        })?;
        let infeasible = |reason: &str| DomainError::InfeasibleDestination {
            destination: waypoint.name.clone(),
            reason: reason.to_string(),
        };
        let home = home.and_then(|home| self.waypoint(home));
        if home.is_some_and(|home| home.name == waypoint.name) {
            return Err(infeasible("home waypoint is not a delivery destination"));
        }
        if self.is_blocked(waypoint.cell) {
            return Err(infeasible("destination cell is blocked"));
        }

        let mut origins = fleet.to_vec();
        origins.extend(home.map(|home| home.cell));
        if !origins.is_empty() && !self.reachable_from(&origins, waypoint.cell) {
            return Err(infeasible("destination cannot be reached from the fleet"));
        }
        if self.has_obstacle_at(waypoint.cell) {
            return Err(infeasible("a moving obstacle stands on the destination"));
        }
        Ok(waypoint)
    }

    pub fn waypoints(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.values()
    }

    /// Closest waypoint by straight-line distance; ties go to the first name.
    pub fn nearest_waypoint(&self, cell: Cell) -> Option<(&Waypoint, f64)> {
        self.waypoints
            .values()
            .map(|w| (w, w.cell.euclidean_distance(&cell)))
            .fold(None, |best, candidate| match best {
                Some((_, d)) if d <= candidate.1 => best,
                _ => Some(candidate),
            })
    }

    pub fn add_obstacle(&mut self, obstacle: DynamicObstacle) -> DomainResult<()> {
        self.ensure_contains(obstacle.start)?;
        if self.obstacles.iter().any(|o| o.id == obstacle.id) {
            return Err(DomainError::DuplicateId { id: obstacle.id });
        }
        self.obstacles.push(obstacle);
        Ok(())
    }

    pub fn obstacles(&self) -> &[DynamicObstacle] {
        &self.obstacles
    }

    pub fn obstacle_cells(&self) -> HashSet<Cell> {
        self.obstacles.iter().map(|o| o.position).collect()
    }

    pub fn has_obstacle_at(&self, cell: Cell) -> bool {
        self.obstacles.iter().any(|o| o.position == cell)
    }

    pub fn advance_obstacles(&mut self) {
        let (rows, cols) = (self.rows, self.cols);
        for obstacle in &mut self.obstacles {
            obstacle.advance(rows, cols);
        }
    }

    /// Marks a cell as a static obstacle while building the floor plan.
    pub fn block(&mut self, cell: Cell) -> DomainResult<()> {
        let index = self.ensure_contains(cell)?;
        self.guard_protected(cell)?;
        self.blocked[index] = true;
        Ok(())
    }

    /// Flips a cell between free and blocked and returns the new state.
    pub fn toggle_obstacle(&mut self, cell: Cell) -> DomainResult<bool> {
        let index = self.ensure_contains(cell)?;
        self.guard_protected(cell)?;
        self.blocked[index] = !self.blocked[index];
        Ok(self.blocked[index])
    }

    fn guard_protected(&self, cell: Cell) -> DomainResult<()> {
        if let Some(waypoint) = self.waypoint_at(cell) {
            return Err(DomainError::ProtectedCell {
                row: cell.row,
                col: cell.col,
                reason: format!("waypoint {}", waypoint.name),
            });
        }
        if let Some(obstacle) = self.obstacles.iter().find(|o| o.position == cell) {
            return Err(DomainError::ProtectedCell {
                row: cell.row,
                col: cell.col,
                reason: format!("occupied by moving obstacle {}", obstacle.id),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::grid::Axis;

    fn floor() -> GridWorld {
        let mut grid = GridWorld::new(6, 6).unwrap();
        grid.add_waypoint("pha", Cell::new(4, 3), Some(2)).unwrap();
        grid.add_obstacle(
            DynamicObstacle::new("o1".to_string(), Cell::new(2, 0), Cell::new(2, 4), Axis::Horizontal, 1).unwrap(),
        )
        .unwrap();
        grid
    }

    #[test]
    fn toggle_flips_free_cells() {
        let mut grid = floor();
        assert!(grid.toggle_obstacle(Cell::new(0, 0)).unwrap());
        assert!(grid.is_blocked(Cell::new(0, 0)));
        assert!(!grid.toggle_obstacle(Cell::new(0, 0)).unwrap());
        assert!(!grid.is_blocked(Cell::new(0, 0)));
    }

    #[test]
    fn toggle_refuses_waypoints_and_moving_obstacles() {
        let mut grid = floor();
        assert!(matches!(
            grid.toggle_obstacle(Cell::new(4, 3)),
            Err(DomainError::ProtectedCell { .. })
        ));
        assert!(matches!(
            grid.toggle_obstacle(Cell::new(2, 0)),
            Err(DomainError::ProtectedCell { .. })
        ));
        assert!(matches!(
            grid.toggle_obstacle(Cell::new(9, 9)),
            Err(DomainError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn waypoint_lookup_ignores_case() {
        let grid = floor();
        assert_eq!(grid.waypoint("Pha").map(|w| w.cell), Some(Cell::new(4, 3)));
        assert!(grid.waypoint("ICU").is_none());
    }

    #[test]
    fn destination_checks_reject_home_and_unknown_names() {
        let mut grid = floor();
        grid.add_waypoint("ENT", Cell::new(0, 5), None).unwrap();
        assert!(matches!(
            grid.feasible_destination("ent", Some("ENT"), &[]),
            Err(DomainError::InfeasibleDestination { .. })
        ));
        assert!(matches!(
            grid.feasible_destination("lab", None, &[]),
            Err(DomainError::UnknownWaypoint { .. })
        ));
        assert!(grid.feasible_destination("PHA", Some("ENT"), &[]).is_ok());
    }

    #[test]
    fn walled_room_is_unreachable_even_with_free_neighbours() {
        let mut grid = GridWorld::new(12, 7).unwrap();
        grid.add_waypoint("PHA", Cell::new(5, 3), None).unwrap();
        // Ring two cells out from PHA; its direct neighbours stay free.
        for row in 3..=7 {
            for col in 1..=5 {
                if row == 3 || row == 7 || col == 1 || col == 5 {
                    grid.block(Cell::new(row, col)).unwrap();
                }
            }
        }
        let fleet = [Cell::new(0, 0), Cell::new(11, 6)];

        assert!(!grid.reachable_from(&fleet, Cell::new(5, 3)));
        assert!(matches!(
            grid.feasible_destination("PHA", None, &fleet),
            Err(DomainError::InfeasibleDestination { .. })
        ));
        assert!(grid.feasible_destination("PHA", None, &[Cell::new(4, 4)]).is_ok());

        grid.toggle_obstacle(Cell::new(3, 3)).unwrap();
        assert!(grid.feasible_destination("PHA", None, &fleet).is_ok());
    }

    #[test]
    fn out_of_bounds_counts_as_blocked() {
        let grid = floor();
        assert!(grid.is_blocked(Cell::new(6, 0)));
    }
}
