use super::events::FleetEvent;
use super::robot::Robot;
use super::task::{RobotId, Task, TaskStatus};
use crate::common::{DomainError, DomainResult};
use crate::domains::grid::{normalize_waypoint_name, Cell, GridWorld};
use std::collections::BTreeMap;

/// Everything the simulation mutates. Components borrow it per call.
#[derive(Debug, Clone)]
pub struct World {
    pub grid: GridWorld,
    /// Submission order.
    pub tasks: Vec<Task>,
    pub robots: BTreeMap<RobotId, Robot>,
    pub tick: u64,
    home: Option<String>,
    next_sequence: u64,
    uncommitted_events: Vec<FleetEvent>,
}

impl World {
    pub fn new(grid: GridWorld) -> Self {
        Self {
            grid,
            tasks: Vec::new(),
            robots: BTreeMap::new(),
            tick: 0,
            home: None,
            next_sequence: 0,
            uncommitted_events: Vec::new(),
        }
    }

    pub fn set_home(&mut self, name: &str) -> DomainResult<()> {
        if self.grid.waypoint(name).is_none() {
            return Err(DomainError::UnknownWaypoint { name: name.to_string() });
        }
        self.home = Some(normalize_waypoint_name(name));
        Ok(())
    }

    pub fn home(&self) -> Option<&str> {
        self.home.as_deref()
    }

    pub fn is_home(&self, name: &str) -> bool {
        self.home.as_deref() == Some(normalize_waypoint_name(name).as_str())
    }

    pub fn add_robot(&mut self, robot: Robot) -> DomainResult<()> {
        if !self.grid.contains(robot.position) {
            return Err(DomainError::OutOfBounds {
                row: robot.position.row,
                col: robot.position.col,
            });
        }
        if self.grid.is_blocked(robot.position) {
            return Err(DomainError::ProtectedCell {
                row: robot.position.row,
                col: robot.position.col,
                reason: format!("robot {} cannot start on a blocked cell", robot.id),
            });
        }
        if self.robots.contains_key(&robot.id) {
            return Err(DomainError::DuplicateId { id: robot.id });
        }
        if let Some(other) = self.robots.values().find(|r| r.position == robot.position) {
            return Err(DomainError::ProtectedCell {
                row: robot.position.row,
                col: robot.position.col,
                reason: format!("already occupied by robot {}", other.id),
            });
        }
        self.robots.insert(robot.id.clone(), robot);
        Ok(())
    }

    pub fn next_sequence(&mut self) -> u64 {
        self.next_sequence += 1;
        self.next_sequence
    }

    pub fn insert_task(&mut self, task: Task) -> DomainResult<()> {
        if self.task(&task.id).is_some() {
            return Err(DomainError::DuplicateId { id: task.id });
        }
        self.tasks.push(task);
        Ok(())
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn robot(&self, id: &str) -> Option<&Robot> {
        self.robots.get(id)
    }

    pub fn robot_mut(&mut self, id: &str) -> Option<&mut Robot> {
        self.robots.get_mut(id)
    }

    pub fn tasks_in(&self, status: TaskStatus) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.status() == status)
    }

    /// Current cell of every robot, in id order.
    pub fn robot_cells(&self) -> Vec<Cell> {
        self.robots.values().map(|r| r.position).collect()
    }

    pub fn add_event(&mut self, event: FleetEvent) {
        self.uncommitted_events.push(event);
    }

    pub fn uncommitted_events(&self) -> &[FleetEvent] {
        &self.uncommitted_events
    }

    pub fn take_events(&mut self) -> Vec<FleetEvent> {
        std::mem::take(&mut self.uncommitted_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::fleet::{EnergyProfile, Priority};
    use chrono::Utc;

    fn world() -> World {
        let mut grid = GridWorld::new(5, 5).unwrap();
        grid.add_waypoint("ENT", Cell::new(1, 1), None).unwrap();
        World::new(grid)
    }

    #[test]
    fn duplicate_robots_are_rejected() {
        let mut world = world();
        world
            .add_robot(Robot::new("R1".to_string(), Cell::new(0, 0), EnergyProfile::default()))
            .unwrap();
        let err = world
            .add_robot(Robot::new("R1".to_string(), Cell::new(0, 1), EnergyProfile::default()))
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateId { .. }));
    }

    #[test]
    fn home_lookup_is_case_insensitive() {
        let mut world = world();
        world.set_home("ent").unwrap();
        assert!(world.is_home("Ent"));
        assert!(world.set_home("nowhere").is_err());
    }

    #[test]
    fn events_are_drained_once() {
        let mut world = world();
        let seq = world.next_sequence();
        world
            .insert_task(Task::new("t1".to_string(), "ENT".to_string(), Cell::new(1, 1), Priority(5), Utc::now(), seq))
            .unwrap();
        world.add_event(FleetEvent::TaskCreated {
            id: "t1".to_string(),
            destination: "ENT".to_string(),
            priority: 5,
            created_at: Utc::now(),
        });
        assert_eq!(world.take_events().len(), 1);
        assert!(world.take_events().is_empty());
    }
}
