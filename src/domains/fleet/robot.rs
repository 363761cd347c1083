use super::task::{RobotId, TaskId};
use crate::common::{DomainError, DomainResult};
use crate::domains::grid::Cell;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

pub const FULL_ENERGY: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RobotStatus {
    Idle,
    Bidding,
    Moving,
    Replanning,
    Failed,
}

impl RobotStatus {
    pub fn can_transition_to(self, next: RobotStatus) -> bool {
        use RobotStatus::*;
        match self {
            Idle => matches!(next, Bidding | Moving),
            Bidding => matches!(next, Bidding | Idle),
            Moving => matches!(next, Replanning | Idle | Failed),
            Replanning => matches!(next, Moving | Failed | Idle),
            Failed => matches!(next, Idle),
        }
    }

    pub const ALL: [RobotStatus; 5] = [
        RobotStatus::Idle,
        RobotStatus::Bidding,
        RobotStatus::Moving,
        RobotStatus::Replanning,
        RobotStatus::Failed,
    ];
}

impl fmt::Display for RobotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyProfile {
    /// Robots below this level neither bid nor get invited.
    pub low_energy_threshold: f64,
    pub drain_per_step: f64,
    pub diagonal_factor: f64,
}

impl Default for EnergyProfile {
    fn default() -> Self {
        Self {
            low_energy_threshold: 20.0,
            drain_per_step: 0.5,
            diagonal_factor: 1.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Robot {
    pub id: RobotId,
    pub position: Cell,
    pub energy: f64,
    status: RobotStatus,
    pub path: Vec<Cell>,
    /// Index into `path` of the next cell to enter.
    pub path_index: usize,
    pub current_task: Option<TaskId>,
    pub pending_bids: VecDeque<TaskId>,
    pub energy_profile: EnergyProfile,
    pub failed_at_tick: Option<u64>,
}

impl Robot {
    pub fn new(id: RobotId, position: Cell, energy_profile: EnergyProfile) -> Self {
        Self {
            id,
            position,
            energy: FULL_ENERGY,
            status: RobotStatus::Idle,
            path: Vec::new(),
            path_index: 0,
            current_task: None,
            pending_bids: VecDeque::new(),
            energy_profile,
            failed_at_tick: None,
        }
    }

    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = energy.clamp(0.0, FULL_ENERGY);
        self
    }

    pub fn status(&self) -> RobotStatus {
        self.status
    }

    fn transition(&mut self, next: RobotStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                entity: "robot".to_string(),
                id: self.id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn has_enough_energy(&self) -> bool {
        self.energy >= self.energy_profile.low_energy_threshold
    }

    pub fn can_bid(&self) -> bool {
        matches!(self.status, RobotStatus::Idle | RobotStatus::Bidding) && self.has_enough_energy()
    }

    /// Queues a task this robot owes a bid on.
    pub fn invite(&mut self, task_id: &str) -> DomainResult<()> {
        self.transition(RobotStatus::Bidding)?;
        if !self.pending_bids.iter().any(|t| t == task_id) {
            self.pending_bids.push_back(task_id.to_string());
        }
        Ok(())
    }

    pub fn next_pending_bid(&self) -> Option<&TaskId> {
        self.pending_bids.front()
    }

    pub fn has_pending_bid(&self, task_id: &str) -> bool {
        self.pending_bids.iter().any(|t| t == task_id)
    }

    /// Drops `task_id` from the queue and returns to IDLE once nothing is owed.
    pub fn finish_bid(&mut self, task_id: &str) -> DomainResult<()> {
        self.pending_bids.retain(|t| t != task_id);
        if self.pending_bids.is_empty() && self.status == RobotStatus::Bidding {
            self.transition(RobotStatus::Idle)?;
        }
        Ok(())
    }

    pub fn begin_route(&mut self, task_id: &str, path: Vec<Cell>) -> DomainResult<()> {
        self.transition(RobotStatus::Moving)?;
        self.current_task = Some(task_id.to_string());
        self.path = path;
        self.path_index = 1;
        Ok(())
    }

    pub fn next_step(&self) -> Option<Cell> {
        self.path.get(self.path_index).copied()
    }

    pub fn has_arrived(&self) -> bool {
        self.path_index >= self.path.len()
    }

    pub fn step_cost(&self, next: Cell) -> f64 {
        let profile = &self.energy_profile;
        if self.position.is_diagonal_to(&next) {
            profile.drain_per_step * profile.diagonal_factor
        } else {
            profile.drain_per_step
        }
    }

    pub fn can_afford(&self, next: Cell) -> bool {
        self.energy >= self.step_cost(next)
    }

    pub fn advance_to(&mut self, next: Cell) {
        let cost = self.step_cost(next);
        self.energy = (self.energy - cost).max(0.0);
        self.position = next;
        self.path_index += 1;
    }

    /// The route ahead is statically blocked; the task is kept.
    pub fn block(&mut self) -> DomainResult<()> {
        self.transition(RobotStatus::Replanning)?;
        self.path.clear();
        self.path_index = 0;
        Ok(())
    }

    pub fn resume(&mut self, path: Vec<Cell>) -> DomainResult<()> {
        self.transition(RobotStatus::Moving)?;
        self.path = path;
        self.path_index = 1;
        Ok(())
    }

    pub fn fail(&mut self, tick: u64) -> DomainResult<Option<TaskId>> {
        self.transition(RobotStatus::Failed)?;
        self.clear_route();
        self.failed_at_tick = Some(tick);
        Ok(self.current_task.take())
    }

    pub fn arrive(&mut self) -> DomainResult<Option<TaskId>> {
        self.transition(RobotStatus::Idle)?;
        self.clear_route();
        Ok(self.current_task.take())
    }

    /// Gives up the route for lack of energy and returns the abandoned task.
    pub fn abort(&mut self) -> DomainResult<Option<TaskId>> {
        self.arrive()
    }

    /// Returns to IDLE once `cooldown` ticks have passed since the failure.
    pub fn recover(&mut self, tick: u64, cooldown: Option<u64>) -> DomainResult<bool> {
        let (Some(cooldown), Some(failed_at)) = (cooldown, self.failed_at_tick) else {
            return Ok(false);
        };
        if self.status != RobotStatus::Failed || tick < failed_at.saturating_add(cooldown) {
            return Ok(false);
        }
        self.transition(RobotStatus::Idle)?;
        self.failed_at_tick = None;
        Ok(true)
    }

    fn clear_route(&mut self) {
        self.path.clear();
        self.path_index = 0;
    }
}
