use super::{Auctioneer, Bid, BidAttempt, BidRejection};
use crate::common::{DomainError, DomainResult};
use crate::domains::fleet::{FailureReason, FleetEvent, RobotId, TaskId, TaskStatus, World};
use crate::domains::pathfinding::Pathfinder;
use chrono::Utc;
use std::collections::BTreeSet;

impl Auctioneer {
    /// Opens a bidding round for every ANNOUNCED task, most urgent first.
    /// Returns the ids of tasks that entered BIDDING.
    pub fn announce(&self, world: &mut World) -> DomainResult<Vec<TaskId>> {
        let mut announced: Vec<(_, TaskId)> = world
            .tasks_in(TaskStatus::Announced)
            .map(|t| (t.arbitration_key(), t.id.clone()))
            .collect();
        announced.sort();

        let mut opened = Vec::new();
        for (_, task_id) in announced {
            let bidders: BTreeSet<RobotId> = world
                .robots
                .values()
                .filter(|r| r.can_bid())
                .map(|r| r.id.clone())
                .collect();

            if bidders.is_empty() {
                self.fail_task(world, &task_id, FailureReason::NoBidders)?;
                continue;
            }

            for robot_id in &bidders {
                if let Some(robot) = world.robot_mut(robot_id) {
                    robot.invite(&task_id)?;
                }
            }
            let count = bidders.len();
            if let Some(task) = world.task_mut(&task_id) {
                task.open_bidding(bidders)?;
                self.logger.info(&format!(
                    "Task {} open for bids (round {}, {} bidders)",
                    task_id, task.bidding_rounds, count
                ));
            }
            opened.push(task_id);
        }
        Ok(opened)
    }

    /// Prices `task_id` for `robot_id` without touching the world.
    pub fn estimate(
        &self,
        world: &World,
        pathfinder: &Pathfinder,
        robot_id: &str,
        task_id: &str,
    ) -> Result<Bid, BidRejection> {
        let task = world
            .task(task_id)
            .filter(|t| t.status() == TaskStatus::Bidding)
            .ok_or(BidRejection::TaskClosed)?;
        let robot = world.robot(robot_id).ok_or(BidRejection::TaskClosed)?;

        if !robot.has_enough_energy() {
            return Err(BidRejection::LowEnergy { energy: robot.energy });
        }
        if world.grid.is_blocked(task.target) {
            return Err(BidRejection::DestinationBlocked);
        }
        if world.grid.has_obstacle_at(task.target) {
            return Err(BidRejection::ObstacleOnDestination);
        }

        let occupied = world.grid.obstacle_cells();
        let path = pathfinder
            .find_path(&world.grid, &occupied, robot.position, task.target)
            .ok_or(BidRejection::NoPath)?;

        Ok(Bid {
            robot_id: robot.id.clone(),
            task_id: task.id.clone(),
            path_cost: path.cost,
            value: self.policy.bid_value(path.cost, robot.energy, task.priority),
        })
    }

    /// Computes the oldest bid `robot_id` still owes and records it.
    /// The queue entry is consumed whether or not a bid results.
    pub fn place_bid(
        &self,
        world: &mut World,
        pathfinder: &Pathfinder,
        robot_id: &str,
    ) -> DomainResult<Option<BidAttempt>> {
        let Some(task_id) = world.robot(robot_id).and_then(|r| r.next_pending_bid().cloned()) else {
            return Ok(None);
        };

        let result = self.estimate(world, pathfinder, robot_id, &task_id);
        match &result {
            Ok(bid) => {
                let task = world.task_mut(&task_id).ok_or_else(|| DomainError::InvalidCommand {
                    reason: format!("Task {} disappeared while bidding", task_id),
                })?;
                task.record_bid(robot_id, bid.value)?;
                self.logger.info(&format!(
                    "Robot {} bids {:.2} on task {} (path cost {})",
                    robot_id, bid.value, task_id, bid.path_cost
                ));
            }
            Err(rejection) => {
                self.logger
                    .info(&format!("Robot {} declines task {}: {}", robot_id, task_id, rejection));
            }
        }

        if let Some(robot) = world.robot_mut(robot_id) {
            robot.finish_bid(&task_id)?;
        }

        Ok(Some(BidAttempt {
            robot_id: robot_id.to_string(),
            task_id,
            result,
        }))
    }

    pub(crate) fn fail_task(&self, world: &mut World, task_id: &str, reason: FailureReason) -> DomainResult<()> {
        let Some(task) = world.task_mut(task_id) else {
            return Ok(());
        };
        task.fail(reason)?;
        self.logger.warn(&format!("Task {} failed: {}", task_id, reason));
        world.add_event(FleetEvent::TaskFailed {
            id: task_id.to_string(),
            reason,
            failed_at: Utc::now(),
        });
        Ok(())
    }
}
