use super::{Auctioneer, Award};
use crate::common::DomainResult;
use crate::domains::fleet::{FailureReason, FleetEvent, RobotId, RobotStatus, Task, TaskId, TaskStatus, World};
use crate::domains::pathfinding::Pathfinder;
use chrono::Utc;
use ordered_float::OrderedFloat;

/// Lowest bid wins; equal bids go to the smallest robot id.
pub fn select_winner<'a, I>(bids: I) -> Option<(RobotId, f64)>
where
    I: IntoIterator<Item = (&'a RobotId, f64)>,
{
    bids.into_iter()
        .min_by_key(|(robot_id, value)| (OrderedFloat(*value), (*robot_id).clone()))
        .map(|(robot_id, value)| (robot_id.clone(), value))
}

/// A round is settled once no invited robot still owes a bid on it.
fn round_closed(world: &World, task: &Task) -> bool {
    task.status() == TaskStatus::Bidding
        && task
            .potential_bidders
            .iter()
            .all(|id| world.robot(id).map_or(true, |r| !r.has_pending_bid(&task.id)))
}

impl Auctioneer {
    /// Fails every closed round that attracted no bids.
    pub fn settle_rounds(&self, world: &mut World) -> DomainResult<Vec<TaskId>> {
        let empty: Vec<TaskId> = world
            .tasks
            .iter()
            .filter(|t| round_closed(world, t) && t.bids.is_empty())
            .map(|t| t.id.clone())
            .collect();

        for task_id in &empty {
            self.fail_task(world, task_id, FailureReason::NoBids)?;
        }
        Ok(empty)
    }

    /// Awards closed rounds in `(priority, created_at, sequence)` order to
    /// the cheapest bidder that is still IDLE.
    pub fn arbitrate(&self, world: &mut World, pathfinder: &Pathfinder) -> DomainResult<Vec<Award>> {
        let mut ready: Vec<(_, TaskId)> = world
            .tasks
            .iter()
            .filter(|t| round_closed(world, t) && !t.bids.is_empty())
            .map(|t| (t.arbitration_key(), t.id.clone()))
            .collect();
        ready.sort();

        let mut awards = Vec::new();
        for (_, task_id) in ready {
            let Some(task) = world.task(&task_id) else { continue };
            let idle_bids = task.bids.iter().filter_map(|(robot_id, value)| {
                world
                    .robot(robot_id)
                    .filter(|r| r.status() == RobotStatus::Idle)
                    .map(|_| (robot_id, *value))
            });
            let Some((winner, bid)) = select_winner(idle_bids) else {
                continue;
            };
            let target = task.target;
            let destination = task.destination.clone();

            let Some(robot) = world.robot(&winner) else { continue };
            let occupied = world.grid.obstacle_cells();
            let Some(path) = pathfinder.find_path(&world.grid, &occupied, robot.position, target) else {
                self.logger.warn(&format!(
                    "Award of task {} to {} rolled back: route no longer available",
                    task_id, winner
                ));
                if let Some(task) = world.task_mut(&task_id) {
                    task.reopen()?;
                }
                continue;
            };

            let distance = path.cost;
            if let Some(robot) = world.robot_mut(&winner) {
                robot.begin_route(&task_id, path.cells)?;
            }
            if let Some(task) = world.task_mut(&task_id) {
                task.award(&winner)?;
            }
            self.logger.info(&format!(
                "Task {} awarded to {} (bid {:.2}, distance {})",
                task_id, winner, bid, distance
            ));
            world.add_event(FleetEvent::TaskAssigned {
                id: task_id.clone(),
                robot_id: winner.clone(),
                destination,
                distance,
                assigned_at: Utc::now(),
            });
            awards.push(Award {
                task_id,
                robot_id: winner,
                bid,
                distance,
            });
        }
        Ok(awards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_bids_go_to_smallest_id() {
        let r1 = "R1".to_string();
        let r2 = "R2".to_string();
        let winner = select_winner(vec![(&r2, 35.0), (&r1, 35.0)]);
        assert_eq!(winner, Some(("R1".to_string(), 35.0)));
    }

    #[test]
    fn lowest_bid_wins() {
        let r1 = "R1".to_string();
        let r3 = "R3".to_string();
        let winner = select_winner(vec![(&r1, 41.5), (&r3, 40.0)]);
        assert_eq!(winner.map(|(id, _)| id), Some("R3".to_string()));
    }

    #[test]
    fn no_bids_no_winner() {
        assert_eq!(select_winner(Vec::<(&RobotId, f64)>::new()), None);
    }
}
