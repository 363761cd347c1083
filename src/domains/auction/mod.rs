//! Contract-net allocation: announce a task, collect one bid per invited
//! robot (one bid per tick), then award it to the cheapest robot that is
//! still free.

pub mod arbitration;
pub mod bidding;

pub use arbitration::*;

use crate::domains::fleet::{Priority, RobotId, TaskId};
use crate::domains::logger::DynLogger;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weights of the bid formula
/// `path_cost + (100 - energy) / energy_divisor + priority * priority_weight`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BidPolicy {
    pub energy_divisor: f64,
    pub priority_weight: f64,
}

impl Default for BidPolicy {
    fn default() -> Self {
        Self {
            energy_divisor: 10.0,
            priority_weight: 5.0,
        }
    }
}

impl BidPolicy {
    pub fn bid_value(&self, path_cost: u32, energy: f64, priority: Priority) -> f64 {
        let energy_penalty = (100.0 - energy) / self.energy_divisor;
        path_cost as f64 + energy_penalty + priority.value() as f64 * self.priority_weight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub robot_id: RobotId,
    pub task_id: TaskId,
    pub path_cost: u32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BidRejection {
    LowEnergy { energy: f64 },
    DestinationBlocked,
    ObstacleOnDestination,
    NoPath,
    /// The task left BIDDING or no longer exists.
    TaskClosed,
}

impl fmt::Display for BidRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BidRejection::LowEnergy { energy } => write!(f, "energy {:.1} below threshold", energy),
            BidRejection::DestinationBlocked => f.write_str("destination is blocked"),
            BidRejection::ObstacleOnDestination => f.write_str("moving obstacle on destination"),
            BidRejection::NoPath => f.write_str("no path within the search budget"),
            BidRejection::TaskClosed => f.write_str("task is no longer open for bids"),
        }
    }
}

/// Result of the single bid computed during a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct BidAttempt {
    pub robot_id: RobotId,
    pub task_id: TaskId,
    pub result: Result<Bid, BidRejection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Award {
    pub task_id: TaskId,
    pub robot_id: RobotId,
    pub bid: f64,
    pub distance: u32,
}

pub struct Auctioneer {
    policy: BidPolicy,
    logger: DynLogger,
}

impl Auctioneer {
    pub fn new(policy: BidPolicy, logger: DynLogger) -> Self {
        Self { policy, logger }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bid_formula_adds_every_term() {
        let policy = BidPolicy::default();
        assert_eq!(policy.bid_value(30, 100.0, Priority(0)), 30.0);
        assert_eq!(policy.bid_value(30, 80.0, Priority(1)), 30.0 + 2.0 + 5.0);
    }

    #[test]
    fn urgent_tasks_bid_lower() {
        let policy = BidPolicy::default();
        assert!(policy.bid_value(40, 90.0, Priority(1)) < policy.bid_value(40, 90.0, Priority(5)));
    }
}
