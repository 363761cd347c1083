use super::task::FailureReason;
use crate::common::DomainEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task lifecycle announcements, keyed by the task id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FleetEvent {
    #[serde(rename = "task.created", rename_all = "camelCase")]
    TaskCreated {
        id: String,
        destination: String,
        priority: u8,
        created_at: DateTime<Utc>,
    },
    #[serde(rename = "task.assigned", rename_all = "camelCase")]
    TaskAssigned {
        id: String,
        robot_id: String,
        destination: String,
        /// Path cost of the awarded route.
        distance: u32,
        assigned_at: DateTime<Utc>,
    },
    #[serde(rename = "task.completed", rename_all = "camelCase")]
    TaskCompleted {
        id: String,
        robot_id: String,
        completed_at: DateTime<Utc>,
    },
    #[serde(rename = "task.failed", rename_all = "camelCase")]
    TaskFailed {
        id: String,
        reason: FailureReason,
        failed_at: DateTime<Utc>,
    },
}

impl DomainEvent for FleetEvent {
    fn event_type(&self) -> &'static str {
        match self {
            FleetEvent::TaskCreated { .. } => "task.created",
            FleetEvent::TaskAssigned { .. } => "task.assigned",
            FleetEvent::TaskCompleted { .. } => "task.completed",
            FleetEvent::TaskFailed { .. } => "task.failed",
        }
    }

    fn aggregate_id(&self) -> &str {
        match self {
            FleetEvent::TaskCreated { id, .. } => id,
            FleetEvent::TaskAssigned { id, .. } => id,
            FleetEvent::TaskCompleted { id, .. } => id,
            FleetEvent::TaskFailed { id, .. } => id,
        }
    }

    fn event_version(&self) -> u64 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            FleetEvent::TaskCreated { created_at, .. } => *created_at,
            FleetEvent::TaskAssigned { assigned_at, .. } => *assigned_at,
            FleetEvent::TaskCompleted { completed_at, .. } => *completed_at,
            FleetEvent::TaskFailed { failed_at, .. } => *failed_at,
        }
    }
}
