use crate::common::DomainResult;
use crate::domains::fleet::{FailureReason, FleetEvent, RobotId, RobotStatus, TaskId, TaskStatus, World};
use crate::domains::grid::Cell;
use crate::domains::logger::DynLogger;
use crate::domains::pathfinding::Pathfinder;
use chrono::Utc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitReason {
    Obstacle { obstacle_id: String },
    Robot { robot_id: RobotId },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Advanced { to: Cell },
    Arrived { task_id: Option<TaskId> },
    Waiting(WaitReason),
    /// The next cell became a static obstacle; the robot now needs a replan.
    Blocked { at: Cell },
    OutOfEnergy { orphaned_task: Option<TaskId> },
    NotMoving,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplanOutcome {
    Resumed { cost: u32 },
    Failed { task_id: Option<TaskId> },
    NotReplanning,
}

/// Moves robots one cell per tick with a one-step reservation check.
pub struct MotionController {
    logger: DynLogger,
}

impl MotionController {
    pub fn new(logger: DynLogger) -> Self {
        Self { logger }
    }

    pub fn step(&self, world: &mut World, robot_id: &str) -> DomainResult<StepOutcome> {
        let Some(robot) = world.robot(robot_id) else {
            return Ok(StepOutcome::NotMoving);
        };
        if robot.status() != RobotStatus::Moving {
            return Ok(StepOutcome::NotMoving);
        }
        let Some(next) = robot.next_step() else {
            return self.arrive(world, robot_id);
        };

        if world.grid.is_blocked(next) {
            if let Some(robot) = world.robot_mut(robot_id) {
                robot.block()?;
            }
            self.logger
                .warn(&format!("Robot {} blocked at {} by a static obstacle, replanning", robot_id, next));
            return Ok(StepOutcome::Blocked { at: next });
        }
        if let Some(obstacle) = world.grid.obstacles().iter().find(|o| o.position == next) {
            return Ok(StepOutcome::Waiting(WaitReason::Obstacle {
                obstacle_id: obstacle.id.clone(),
            }));
        }
        if let Some(other) = world.robots.values().find(|r| r.id != robot_id && r.position == next) {
            return Ok(StepOutcome::Waiting(WaitReason::Robot {
                robot_id: other.id.clone(),
            }));
        }

        if !robot.can_afford(next) {
            let energy = robot.energy;
            let orphaned_task = match world.robot_mut(robot_id) {
                Some(robot) => robot.abort()?,
                None => None,
            };
            self.logger.warn(&format!(
                "Robot {} out of energy ({:.1}); task {} left orphaned",
                robot_id,
                energy,
                orphaned_task.as_deref().unwrap_or("-")
            ));
            return Ok(StepOutcome::OutOfEnergy { orphaned_task });
        }

        let (arrived, task_id) = match world.robot_mut(robot_id) {
            Some(robot) => {
                robot.advance_to(next);
                (robot.has_arrived(), robot.current_task.clone())
            }
            None => return Ok(StepOutcome::NotMoving),
        };
        if let Some(task) = task_id.as_deref().and_then(|id| world.task_mut(id)) {
            if task.status() == TaskStatus::Assigned {
                task.start_moving()?;
            }
        }

        if arrived {
            return self.arrive(world, robot_id);
        }
        Ok(StepOutcome::Advanced { to: next })
    }

    fn arrive(&self, world: &mut World, robot_id: &str) -> DomainResult<StepOutcome> {
        let task_id = match world.robot_mut(robot_id) {
            Some(robot) => robot.arrive()?,
            None => return Ok(StepOutcome::NotMoving),
        };

        if let Some(id) = task_id.as_deref() {
            match world.task_mut(id) {
                Some(task) if task.status().is_active() => {
                    let completed_at = Utc::now();
                    task.complete(completed_at)?;
                    self.logger.info(&format!("Robot {} completed task {}", robot_id, id));
                    world.add_event(FleetEvent::TaskCompleted {
                        id: id.to_string(),
                        robot_id: robot_id.to_string(),
                        completed_at,
                    });
                }
                _ => self
                    .logger
                    .warn(&format!("Robot {} arrived for task {} which is no longer active", robot_id, id)),
            }
        }
        Ok(StepOutcome::Arrived { task_id })
    }

    /// Searches a fresh route for a REPLANNING robot. Failure is final for
    /// both the robot (until cooldown) and its task.
    pub fn replan(&self, world: &mut World, pathfinder: &Pathfinder, robot_id: &str) -> DomainResult<ReplanOutcome> {
        let Some(robot) = world.robot(robot_id) else {
            return Ok(ReplanOutcome::NotReplanning);
        };
        if robot.status() != RobotStatus::Replanning {
            return Ok(ReplanOutcome::NotReplanning);
        }

        let target = robot
            .current_task
            .as_deref()
            .and_then(|id| world.task(id))
            .filter(|t| t.status().is_active())
            .map(|t| t.target);

        let path = target.and_then(|goal| {
            let occupied = world.grid.obstacle_cells();
            pathfinder.find_path(&world.grid, &occupied, robot.position, goal)
        });

        match path {
            Some(path) => {
                let cost = path.cost;
                if let Some(robot) = world.robot_mut(robot_id) {
                    robot.resume(path.cells)?;
                }
                self.logger
                    .info(&format!("Robot {} replanned (cost {})", robot_id, cost));
                Ok(ReplanOutcome::Resumed { cost })
            }
            None => {
                let tick = world.tick;
                let task_id = match world.robot_mut(robot_id) {
                    Some(robot) => robot.fail(tick)?,
                    None => None,
                };
                self.logger.error(&format!("Robot {} failed to replan", robot_id));
                let live_task = task_id
                    .as_deref()
                    .and_then(|id| world.task_mut(id))
                    .filter(|t| t.status().is_active());
                if let Some(task) = live_task {
                    task.fail(FailureReason::ReplanFailed)?;
                    let id = task.id.clone();
                    world.add_event(FleetEvent::TaskFailed {
                        id,
                        reason: FailureReason::ReplanFailed,
                        failed_at: Utc::now(),
                    });
                }
                Ok(ReplanOutcome::Failed { task_id })
            }
        }
    }
}
