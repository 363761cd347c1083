use crate::common::{DomainError, DomainResult};
use crate::domains::grid::Cell;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

pub type TaskId = String;
pub type RobotId = String;

/// Lower values are more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Priority(pub u8);

impl Priority {
    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLabel {
    Urgent,
    High,
    Medium,
    Low,
}

impl PriorityLabel {
    pub fn priority(self) -> Priority {
        match self {
            PriorityLabel::Urgent => Priority(0),
            PriorityLabel::High => Priority(1),
            PriorityLabel::Medium => Priority(5),
            PriorityLabel::Low => Priority(10),
        }
    }
}

impl FromStr for PriorityLabel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "urgent" => Ok(PriorityLabel::Urgent),
            "high" => Ok(PriorityLabel::High),
            "medium" => Ok(PriorityLabel::Medium),
            "low" => Ok(PriorityLabel::Low),
            other => Err(DomainError::InvalidCommand {
                reason: format!("Unknown priority label '{}'", other),
            }),
        }
    }
}

impl fmt::Display for PriorityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PriorityLabel::Urgent => "urgent",
            PriorityLabel::High => "high",
            PriorityLabel::Medium => "medium",
            PriorityLabel::Low => "low",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Announced,
    Bidding,
    Assigned,
    Moving,
    Complete,
    Failed,
}

impl TaskStatus {
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match self {
            Announced => matches!(next, Bidding | Failed),
            Bidding => matches!(next, Assigned | Announced | Failed),
            Assigned => matches!(next, Moving | Complete | Failed),
            Moving => matches!(next, Complete | Failed),
            Complete | Failed => false,
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, TaskStatus::Announced | TaskStatus::Bidding)
    }

    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Assigned | TaskStatus::Moving)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Complete | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NoBidders,
    NoBids,
    ReplanFailed,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            FailureReason::NoBidders => "no_bidders",
            FailureReason::NoBids => "no_bids",
            FailureReason::ReplanFailed => "replan_failed",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub destination: String,
    pub target: Cell,
    pub priority: Priority,
    status: TaskStatus,
    pub assignee: Option<RobotId>,
    pub bids: BTreeMap<RobotId, f64>,
    pub potential_bidders: BTreeSet<RobotId>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Submission order, used to order tasks created at the same instant.
    pub sequence: u64,
    pub bidding_rounds: u32,
    pub failure_reason: Option<FailureReason>,
}

impl Task {
    pub fn new(
        id: TaskId,
        destination: String,
        target: Cell,
        priority: Priority,
        created_at: DateTime<Utc>,
        sequence: u64,
    ) -> Self {
        Self {
            id,
            destination,
            target,
            priority,
            status: TaskStatus::Announced,
            assignee: None,
            bids: BTreeMap::new(),
            potential_bidders: BTreeSet::new(),
            created_at,
            completed_at: None,
            sequence,
            bidding_rounds: 0,
            failure_reason: None,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Key that orders tasks for award arbitration.
    pub fn arbitration_key(&self) -> (Priority, DateTime<Utc>, u64) {
        (self.priority, self.created_at, self.sequence)
    }

    fn transition(&mut self, next: TaskStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                entity: "task".to_string(),
                id: self.id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn open_bidding(&mut self, bidders: BTreeSet<RobotId>) -> DomainResult<()> {
        self.transition(TaskStatus::Bidding)?;
        self.bids.clear();
        self.potential_bidders = bidders;
        self.bidding_rounds += 1;
        Ok(())
    }

    pub fn record_bid(&mut self, robot_id: &str, value: f64) -> DomainResult<()> {
        if self.status != TaskStatus::Bidding {
            return Err(DomainError::InvalidCommand {
                reason: format!("Task {} is {} and takes no bids", self.id, self.status),
            });
        }
        if !self.potential_bidders.contains(robot_id) {
            return Err(DomainError::InvalidCommand {
                reason: format!("Robot {} was not invited to bid on task {}", robot_id, self.id),
            });
        }
        self.bids.insert(robot_id.to_string(), value);
        Ok(())
    }

    pub fn award(&mut self, robot_id: &str) -> DomainResult<()> {
        self.transition(TaskStatus::Assigned)?;
        self.assignee = Some(robot_id.to_string());
        Ok(())
    }

    /// Discards the current round so a fresh one can open.
    pub fn reopen(&mut self) -> DomainResult<()> {
        self.transition(TaskStatus::Announced)?;
        self.bids.clear();
        self.potential_bidders.clear();
        self.assignee = None;
        Ok(())
    }

    pub fn start_moving(&mut self) -> DomainResult<()> {
        self.transition(TaskStatus::Moving)
    }

    pub fn complete(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(TaskStatus::Complete)?;
        self.completed_at = Some(at);
        Ok(())
    }

    pub fn fail(&mut self, reason: FailureReason) -> DomainResult<()> {
        self.transition(TaskStatus::Failed)?;
        self.potential_bidders.clear();
        self.failure_reason = Some(reason);
        Ok(())
    }

    pub fn completion_time(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|done| done - self.created_at)
    }
}
