use crate::domains::fleet::{Robot, RobotStatus, Task, TaskId, TaskStatus, World};
use crate::domains::grid::{Cell, GridWorld};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Robots within this distance of a waypoint are reported at it.
pub const WAYPOINT_LABEL_RADIUS: f64 = 1.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotView {
    pub id: String,
    pub position: Cell,
    pub location: String,
    pub energy: f64,
    pub status: RobotStatus,
    pub current_task: Option<TaskId>,
    /// Cells still ahead on the current route.
    pub remaining_path: Vec<Cell>,
}

impl RobotView {
    fn capture(robot: &Robot, grid: &GridWorld) -> Self {
        Self {
            id: robot.id.clone(),
            position: robot.position,
            location: location_label(grid, robot.position),
            energy: robot.energy,
            status: robot.status(),
            current_task: robot.current_task.clone(),
            remaining_path: robot.path.iter().skip(robot.path_index).copied().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetStats {
    pub robots_by_status: BTreeMap<RobotStatus, usize>,
    pub pending_tasks: usize,
    pub assigned_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub average_completion_secs: Option<f64>,
}

impl FleetStats {
    pub fn from_world(world: &World) -> Self {
        let mut robots_by_status: BTreeMap<RobotStatus, usize> =
            RobotStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for robot in world.robots.values() {
            *robots_by_status.entry(robot.status()).or_default() += 1;
        }

        let count = |pred: fn(TaskStatus) -> bool| world.tasks.iter().filter(|t| pred(t.status())).count();
        let durations: Vec<f64> = world
            .tasks
            .iter()
            .filter_map(Task::completion_time)
            .map(|d| d.num_milliseconds() as f64 / 1000.0)
            .collect();
        let average_completion_secs =
            (!durations.is_empty()).then(|| durations.iter().sum::<f64>() / durations.len() as f64);

        Self {
            robots_by_status,
            pending_tasks: count(TaskStatus::is_pending),
            assigned_tasks: count(TaskStatus::is_active),
            completed_tasks: count(|s| s == TaskStatus::Complete),
            failed_tasks: count(|s| s == TaskStatus::Failed),
            average_completion_secs,
        }
    }
}

/// Read-only view of the fleet published at the end of every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub tick: u64,
    pub rows: usize,
    pub cols: usize,
    pub blocked: Vec<Cell>,
    pub obstacles: Vec<Cell>,
    pub tasks: Vec<Task>,
    pub robots: Vec<RobotView>,
    pub stats: FleetStats,
    pub captured_at: DateTime<Utc>,
}

impl FleetSnapshot {
    pub fn capture(world: &World) -> Self {
        let grid = &world.grid;
        Self {
            tick: world.tick,
            rows: grid.rows(),
            cols: grid.cols(),
            blocked: grid.blocked_cells().into_iter().collect(),
            obstacles: grid.obstacles().iter().map(|o| o.position).collect(),
            tasks: world.tasks.clone(),
            robots: world.robots.values().map(|r| RobotView::capture(r, grid)).collect(),
            stats: FleetStats::from_world(world),
            captured_at: Utc::now(),
        }
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn robot(&self, id: &str) -> Option<&RobotView> {
        self.robots.iter().find(|r| r.id == id)
    }
}

/// Nearest waypoint name when close enough, otherwise `Grid(r,c)`.
pub fn location_label(grid: &GridWorld, cell: Cell) -> String {
    match grid.nearest_waypoint(cell) {
        Some((waypoint, distance)) if distance <= WAYPOINT_LABEL_RADIUS => waypoint.name.clone(),
        _ => format!("Grid({},{})", cell.row, cell.col),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::fleet::EnergyProfile;

    fn world() -> World {
        let mut grid = GridWorld::new(12, 7).unwrap();
        grid.add_waypoint("PHA", Cell::new(4, 3), Some(2)).unwrap();
        let mut world = World::new(grid);
        world
            .add_robot(Robot::new("R1".to_string(), Cell::new(5, 4), EnergyProfile::default()))
            .unwrap();
        world
            .add_robot(Robot::new("R2".to_string(), Cell::new(9, 0), EnergyProfile::default()))
            .unwrap();
        world
    }

    #[test]
    fn robots_near_a_waypoint_take_its_name() {
        let snapshot = FleetSnapshot::capture(&world());
        assert_eq!(snapshot.robot("R1").unwrap().location, "PHA");
        assert_eq!(snapshot.robot("R2").unwrap().location, "Grid(9,0)");
    }

    #[test]
    fn stats_count_every_status() {
        let stats = FleetStats::from_world(&world());
        assert_eq!(stats.robots_by_status[&RobotStatus::Idle], 2);
        assert_eq!(stats.robots_by_status[&RobotStatus::Failed], 0);
        assert_eq!(stats.average_completion_secs, None);
    }
}
