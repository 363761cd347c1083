use super::snapshot::FleetSnapshot;
use crate::common::{DomainError, DomainResult};
use crate::domains::fleet::{Priority, PriorityLabel, TaskId};
use crate::domains::grid::{Cell, GridWorld};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSubmission {
    pub task_id: Option<String>,
    pub destination: String,
    pub priority: Option<PriorityLabel>,
}

impl TaskSubmission {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_priority(mut self, label: PriorityLabel) -> Self {
        self.priority = Some(label);
        self
    }
}

/// Synchronous acknowledgement of an accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTicket {
    pub task_id: TaskId,
    pub destination: String,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

/// A validated submission waiting for the next tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTask {
    pub task_id: TaskId,
    pub destination: String,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FleetCommand {
    SubmitTask(PendingTask),
    ToggleObstacle(Cell),
}

struct Shared {
    queue: VecDeque<FleetCommand>,
    capacity: usize,
    snapshot: FleetSnapshot,
    /// Floor plan as of the last tick, used to pre-check requests.
    floor: GridWorld,
    home: Option<String>,
    known_task_ids: HashSet<TaskId>,
}

/// Cloneable entry point for producers running outside the tick loop.
/// One mutex guards the inbox and the latest snapshot.
#[derive(Clone)]
pub struct FleetHandle {
    shared: Arc<Mutex<Shared>>,
}

impl FleetHandle {
    pub fn new(capacity: usize, snapshot: FleetSnapshot, floor: GridWorld, home: Option<String>) -> Self {
        let known_task_ids = snapshot.tasks.iter().map(|t| t.id.clone()).collect();
        Self {
            shared: Arc::new(Mutex::new(Shared {
                queue: VecDeque::with_capacity(capacity),
                capacity,
                snapshot,
                floor,
                home,
                known_task_ids,
            })),
        }
    }

    fn lock(&self) -> DomainResult<MutexGuard<'_, Shared>> {
        self.shared
            .lock()
            .map_err(|e| DomainError::InfrastructureError(format!("Fleet inbox lock poisoned: {}", e)))
    }

    /// Validates a request against the latest floor plan and queues it.
    pub fn submit(&self, submission: TaskSubmission) -> DomainResult<TaskTicket> {
        let mut shared = self.lock()?;
        if shared.queue.len() >= shared.capacity {
            return Err(DomainError::InboxFull {
                capacity: shared.capacity,
            });
        }

        let fleet: Vec<Cell> = shared.snapshot.robots.iter().map(|r| r.position).collect();
        let waypoint = shared
            .floor
            .feasible_destination(&submission.destination, shared.home.as_deref(), &fleet)?;
        let destination = waypoint.name.clone();
        let priority = submission
            .priority
            .map(PriorityLabel::priority)
            .or(waypoint.default_priority.map(Priority))
            .unwrap_or_else(|| PriorityLabel::Medium.priority());

        let task_id = match submission.task_id {
            Some(id) if id.trim().is_empty() => {
                return Err(DomainError::InvalidCommand {
                    reason: "Task id must not be blank".to_string(),
                })
            }
            Some(id) => id,
            None => Uuid::new_v4().to_string(),
        };
        if !shared.known_task_ids.insert(task_id.clone()) {
            return Err(DomainError::DuplicateId { id: task_id });
        }

        let ticket = TaskTicket {
            task_id: task_id.clone(),
            destination: destination.clone(),
            priority,
            created_at: Utc::now(),
        };
        shared.queue.push_back(FleetCommand::SubmitTask(PendingTask {
            task_id,
            destination,
            priority,
            created_at: ticket.created_at,
        }));
        Ok(ticket)
    }

    /// Queues a static obstacle toggle. Rejected up front when the cell is
    /// out of bounds, a waypoint, or under a moving obstacle.
    pub fn toggle_obstacle(&self, cell: Cell) -> DomainResult<()> {
        let mut shared = self.lock()?;
        if shared.queue.len() >= shared.capacity {
            return Err(DomainError::InboxFull {
                capacity: shared.capacity,
            });
        }
        // Dry run on a scratch copy so the published floor stays untouched.
        shared.floor.clone().toggle_obstacle(cell)?;
        shared.queue.push_back(FleetCommand::ToggleObstacle(cell));
        Ok(())
    }

    pub fn snapshot(&self) -> DomainResult<FleetSnapshot> {
        Ok(self.lock()?.snapshot.clone())
    }

    pub fn pending(&self) -> usize {
        self.lock().map(|s| s.queue.len()).unwrap_or(0)
    }

    pub(crate) fn drain(&self) -> DomainResult<Vec<FleetCommand>> {
        Ok(self.lock()?.queue.drain(..).collect())
    }

    pub(crate) fn publish(&self, snapshot: FleetSnapshot, floor: &GridWorld) -> DomainResult<()> {
        let mut shared = self.lock()?;
        shared
            .known_task_ids
            .extend(snapshot.tasks.iter().map(|t| t.id.clone()));
        shared.snapshot = snapshot;
        shared.floor = floor.clone();
        Ok(())
    }
}
