use crate::common::DomainResult;
use crate::domains::fleet::PriorityLabel;
use crate::domains::grid::Cell;
use crate::domains::scheduler::{FleetHandle, TaskSubmission, TaskTicket};
use serde::{Deserialize, Serialize};

/// Wire shape of a delivery request, e.g.
/// `{"task_id": "t-17", "destination": "PHA", "priority": "high"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequestPayload {
    #[serde(default)]
    pub task_id: Option<String>,
    pub destination: String,
    #[serde(default)]
    pub priority: Option<String>,
}

impl TaskRequestPayload {
    pub fn from_json(raw: &str) -> DomainResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn into_submission(self) -> DomainResult<TaskSubmission> {
        let priority = self
            .priority
            .as_deref()
            .map(str::parse::<PriorityLabel>)
            .transpose()?;
        Ok(TaskSubmission {
            task_id: self.task_id,
            destination: self.destination,
            priority,
        })
    }
}

/// Wire shape of a static obstacle toggle: `{"row": 5, "col": 2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstacleEditPayload {
    pub row: usize,
    pub col: usize,
}

impl From<ObstacleEditPayload> for Cell {
    fn from(payload: ObstacleEditPayload) -> Self {
        Cell::new(payload.row, payload.col)
    }
}

/// Decodes a raw task request and hands it to the fleet.
pub fn submit_json(handle: &FleetHandle, raw: &str) -> DomainResult<TaskTicket> {
    let submission = TaskRequestPayload::from_json(raw)?.into_submission()?;
    handle.submit(submission)
}

/// Decodes a raw obstacle edit and queues it.
pub fn toggle_json(handle: &FleetHandle, raw: &str) -> DomainResult<Cell> {
    let payload: ObstacleEditPayload = serde_json::from_str(raw)?;
    let cell = Cell::from(payload);
    handle.toggle_obstacle(cell)?;
    Ok(cell)
}
