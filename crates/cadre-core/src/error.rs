//! Error types for Cadre Core
//!
//! Only contract violations surface as errors. Ordinary task failures (no
//! capable worker, a worker returning an error) are recorded on the task
//! record and reported through the goal report instead.

use thiserror::Error;

use crate::task::TaskStatus;

/// Result type alias for Cadre operations
pub type Result<T> = std::result::Result<T, CadreError>;

/// Main error type for Cadre operations
#[derive(Error, Debug)]
pub enum CadreError {
    /// Task state machine errors
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    /// Team, registry and factory errors
    #[error("Team error: {0}")]
    Team(#[from] TeamError),

    /// Recurring task engine errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Configuration loading errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to task status transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("Invalid transition for task {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

/// Errors related to team composition and task dispatch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TeamError {
    #[error("Worker already registered: {0}")]
    DuplicateWorker(String),

    #[error("Task not assigned to any worker: {0}")]
    UnassignedTask(String),

    #[error("Worker not found: {0}")]
    UnknownWorker(String),

    #[error("Team type already registered: {0}")]
    DuplicateTeamType(String),

    #[error("Unknown team type: {0}")]
    UnknownTeamType(String),
}

/// Errors raised by the recurring task engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Job not found: {0}")]
    UnknownJob(String),

    #[error("Interval for job {0} must be greater than zero")]
    InvalidInterval(String),

    #[error("Job {name} failed: {message}")]
    JobFailed { name: String, message: String },

    #[error("Job {0} is already running")]
    JobRunning(String),
}

/// Errors raised while loading configuration files
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Unsupported config format: {0} (expected .toml or .json)")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
