use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unknown waypoint: {name}")]
    UnknownWaypoint { name: String },

    #[error("Destination {destination} is infeasible: {reason}")]
    InfeasibleDestination { destination: String, reason: String },

    #[error("Invalid command: {reason}")]
    InvalidCommand { reason: String },

    #[error("Invalid {entity} transition for {id}: {from} -> {to}")]
    InvalidTransition {
        entity: String,
        id: String,
        from: String,
        to: String,
    },

    #[error("Cell ({row},{col}) is protected: {reason}")]
    ProtectedCell { row: usize, col: usize, reason: String },

    #[error("Cell ({row},{col}) is outside the grid")]
    OutOfBounds { row: usize, col: usize },

    #[error("Duplicate id: {id}")]
    DuplicateId { id: String },

    #[error("Task inbox is full (capacity {capacity})")]
    InboxFull { capacity: usize },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Infrastructure error: {0}")]
    InfrastructureError(String),
}

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Event publisher error: {0}")]
    EventPublisher(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
pub type ApplicationResult<T> = Result<T, ApplicationError>;
