use super::inbox::{FleetCommand, FleetHandle, PendingTask};
use super::snapshot::FleetSnapshot;
use crate::common::{DomainError, DomainResult};
use crate::config::Config;
use crate::domains::auction::{Auctioneer, Award, BidAttempt};
use crate::domains::fleet::{FleetEvent, Robot, RobotId, RobotStatus, Task, TaskId, World};
use crate::domains::grid::{Cell, DynamicObstacle, GridWorld};
use crate::domains::logger::DynLogger;
use crate::domains::motion::{MotionController, ReplanOutcome, StepOutcome};
use crate::domains::pathfinding::Pathfinder;
use std::collections::BTreeSet;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub inbox_capacity: usize,
    pub failed_robot_cooldown_ticks: Option<u64>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            inbox_capacity: 64,
            failed_robot_cooldown_ticks: Some(20),
        }
    }
}

/// The one expensive computation a tick is allowed.
#[derive(Debug, Clone, PartialEq)]
pub enum HeavyWork {
    Replan { robot_id: RobotId, outcome: ReplanOutcome },
    Bid(BidAttempt),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub heavy_work: Option<HeavyWork>,
    pub arbitrated: bool,
    pub tasks_created: Vec<TaskId>,
    pub awards: Vec<Award>,
    pub steps: Vec<(RobotId, StepOutcome)>,
    pub events_raised: usize,
}

impl TickReport {
    /// Robots that changed cell this tick.
    pub fn robots_moved(&self) -> impl Iterator<Item = &RobotId> {
        self.steps.iter().filter_map(|(id, outcome)| match outcome {
            StepOutcome::Advanced { .. } => Some(id),
            _ => None,
        })
    }
}

/// Owns the world and advances it one discrete step at a time.
pub struct TickScheduler {
    world: World,
    pathfinder: Pathfinder,
    auctioneer: Auctioneer,
    motion: MotionController,
    handle: FleetHandle,
    logger: DynLogger,
    settings: SchedulerSettings,
}

impl TickScheduler {
    pub fn new(
        world: World,
        pathfinder: Pathfinder,
        auctioneer: Auctioneer,
        settings: SchedulerSettings,
        logger: DynLogger,
    ) -> Self {
        let handle = FleetHandle::new(
            settings.inbox_capacity,
            FleetSnapshot::capture(&world),
            world.grid.clone(),
            world.home().map(str::to_string),
        );
        Self {
            motion: MotionController::new(logger.clone()),
            world,
            pathfinder,
            auctioneer,
            handle,
            logger,
            settings,
        }
    }

    /// Builds the floor plan and fleet described by `config`.
    pub fn from_config(config: &Config, logger: DynLogger) -> DomainResult<Self> {
        let world = build_world(config)?;
        let pathfinder = Pathfinder::new(Duration::from_millis(config.pathfinding.search_budget_ms));
        let auctioneer = Auctioneer::new(config.auction, logger.clone());
        let settings = SchedulerSettings {
            inbox_capacity: config.scheduler.inbox_capacity,
            failed_robot_cooldown_ticks: config.scheduler.failed_robot_cooldown_ticks,
        };
        Ok(Self::new(world, pathfinder, auctioneer, settings, logger))
    }

    pub fn handle(&self) -> FleetHandle {
        self.handle.clone()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct access for embedding code and tests; changes show up in the
    /// next published snapshot.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn take_events(&mut self) -> Vec<FleetEvent> {
        self.world.take_events()
    }

    pub fn snapshot(&self) -> FleetSnapshot {
        FleetSnapshot::capture(&self.world)
    }

    pub fn run_ticks(&mut self, ticks: u64) -> Vec<TickReport> {
        (0..ticks).map(|_| self.tick()).collect()
    }

    pub fn tick(&mut self) -> TickReport {
        self.world.tick += 1;
        let events_before = self.world.uncommitted_events().len();
        let mut report = TickReport {
            tick: self.world.tick,
            ..TickReport::default()
        };

        report.tasks_created = self.intake();
        self.recover_failed_robots();
        if let Err(e) = self.auctioneer.announce(&mut self.world) {
            self.logger.error(&format!("Announcing tasks failed: {}", e));
        }

        self.world.grid.advance_obstacles();

        let mut touched: BTreeSet<RobotId> = BTreeSet::new();
        report.heavy_work = self.heavy_work();
        if let Some(HeavyWork::Replan { robot_id, .. }) = &report.heavy_work {
            touched.insert(robot_id.clone());
        }

        if let Err(e) = self.auctioneer.settle_rounds(&mut self.world) {
            self.logger.error(&format!("Settling bid rounds failed: {}", e));
        }
        if report.heavy_work.is_none() {
            report.arbitrated = true;
            match self.auctioneer.arbitrate(&mut self.world, &self.pathfinder) {
                Ok(awards) => {
                    touched.extend(awards.iter().map(|a| a.robot_id.clone()));
                    report.awards = awards;
                }
                Err(e) => self.logger.error(&format!("Arbitration failed: {}", e)),
            }
        }

        let movers: Vec<RobotId> = self
            .world
            .robots
            .values()
            .filter(|r| r.status() == RobotStatus::Moving && !touched.contains(&r.id))
            .map(|r| r.id.clone())
            .collect();
        for robot_id in movers {
            match self.motion.step(&mut self.world, &robot_id) {
                Ok(outcome) => report.steps.push((robot_id, outcome)),
                Err(e) => self.logger.error(&format!("Robot {} step failed: {}", robot_id, e)),
            }
        }

        if let Err(e) = self.handle.publish(FleetSnapshot::capture(&self.world), &self.world.grid) {
            self.logger.error(&format!("Publishing snapshot failed: {}", e));
        }

        report.events_raised = self.world.uncommitted_events().len() - events_before;
        report
    }

    fn intake(&mut self) -> Vec<TaskId> {
        let commands = match self.handle.drain() {
            Ok(commands) => commands,
            Err(e) => {
                self.logger.error(&format!("Draining inbox failed: {}", e));
                return Vec::new();
            }
        };

        let mut created = Vec::new();
        for command in commands {
            match command {
                FleetCommand::SubmitTask(pending) => {
                    let task_id = pending.task_id.clone();
                    match self.create_task(pending) {
                        Ok(()) => created.push(task_id),
                        Err(e) => self.logger.warn(&format!("Dropped submission {}: {}", task_id, e)),
                    }
                }
                FleetCommand::ToggleObstacle(cell) => match self.world.grid.toggle_obstacle(cell) {
                    Ok(blocked) => self.logger.info(&format!(
                        "Cell {} is now {}",
                        cell,
                        if blocked { "blocked" } else { "free" }
                    )),
                    Err(e) => self.logger.warn(&format!("Obstacle edit at {} rejected: {}", cell, e)),
                },
            }
        }
        created
    }

    /// Re-validates a queued submission against the live floor and files it.
    fn create_task(&mut self, pending: PendingTask) -> DomainResult<()> {
        let fleet = self.world.robot_cells();
        let target = self
            .world
            .grid
            .feasible_destination(&pending.destination, self.world.home(), &fleet)?
            .cell;
        let sequence = self.world.next_sequence();
        let task = Task::new(
            pending.task_id.clone(),
            pending.destination.clone(),
            target,
            pending.priority,
            pending.created_at,
            sequence,
        );
        self.world.insert_task(task)?;
        self.logger.info(&format!(
            "Task {} created for {} ({})",
            pending.task_id, pending.destination, pending.priority
        ));
        self.world.add_event(FleetEvent::TaskCreated {
            id: pending.task_id,
            destination: pending.destination,
            priority: pending.priority.value(),
            created_at: pending.created_at,
        });
        Ok(())
    }

    fn recover_failed_robots(&mut self) {
        let tick = self.world.tick;
        let cooldown = self.settings.failed_robot_cooldown_ticks;
        for robot in self.world.robots.values_mut() {
            match robot.recover(tick, cooldown) {
                Ok(true) => self.logger.info(&format!("Robot {} back in service", robot.id)),
                Ok(false) => {}
                Err(e) => self.logger.error(&format!("Robot {} recovery failed: {}", robot.id, e)),
            }
        }
    }

    /// Replans take precedence over bids; both go in robot-id order.
    fn heavy_work(&mut self) -> Option<HeavyWork> {
        let replanning = self
            .world
            .robots
            .values()
            .find(|r| r.status() == RobotStatus::Replanning)
            .map(|r| r.id.clone());
        if let Some(robot_id) = replanning {
            return match self.motion.replan(&mut self.world, &self.pathfinder, &robot_id) {
                Ok(outcome) => Some(HeavyWork::Replan { robot_id, outcome }),
                Err(e) => {
                    self.logger.error(&format!("Robot {} replan failed: {}", robot_id, e));
                    None
                }
            };
        }

        let bidder = self
            .world
            .robots
            .values()
            .find(|r| r.status() == RobotStatus::Bidding && r.next_pending_bid().is_some())
            .map(|r| r.id.clone())?;
        match self.auctioneer.place_bid(&mut self.world, &self.pathfinder, &bidder) {
            Ok(attempt) => attempt.map(HeavyWork::Bid),
            Err(e) => {
                self.logger.error(&format!("Robot {} bid failed: {}", bidder, e));
                None
            }
        }
    }
}

fn cell_of([row, col]: [usize; 2]) -> Cell {
    Cell::new(row, col)
}

/// Validates `config` and assembles the starting world.
pub fn build_world(config: &Config) -> DomainResult<World> {
    let grid_config = &config.grid;
    let mut grid = GridWorld::new(grid_config.rows, grid_config.cols)?;

    for waypoint in &grid_config.waypoints {
        grid.add_waypoint(&waypoint.name, cell_of(waypoint.cell), waypoint.default_priority)?;
    }
    for obstacle in &grid_config.obstacles {
        grid.add_obstacle(DynamicObstacle::new(
            obstacle.id.clone(),
            cell_of(obstacle.start),
            cell_of(obstacle.end),
            obstacle.axis,
            obstacle.ticks_per_step,
        )?)?;
    }
    for &cell in &grid_config.blocked {
        grid.block(cell_of(cell))?;
    }

    let mut world = World::new(grid);
    if let Some(home) = &grid_config.home {
        world.set_home(home)?;
    }
    if config.robots.is_empty() {
        return Err(DomainError::InvalidCommand {
            reason: "At least one robot is required".to_string(),
        });
    }
    for robot in &config.robots {
        world.add_robot(
            Robot::new(robot.id.clone(), cell_of(robot.cell), config.energy).with_energy(robot.energy),
        )?;
    }
    Ok(world)
}
