//! Error types.
//!
//! Configuration and lifecycle problems are reported as [`SchedulerError`].
//! A failed query is not a scheduler error: it travels inside the completion
//! event as a [`QueryError`] and ends up on the variable's status.

use thiserror::Error;

/// Errors raised by the variable set and its components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The variables reference each other in a loop. The cycle is reported as
    /// a path whose first name is repeated at the end.
    #[error("dependency cycle detected: {}", .cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },

    #[error("variable `{0}` is declared more than once")]
    DuplicateVariable(String),

    #[error("unknown variable `{0}`")]
    UnknownVariable(String),

    /// An update was requested while the variable already has one in flight.
    #[error("variable `{0}` already has an update in flight")]
    UpdateInFlight(String),

    /// A completion or cancellation was requested while nothing is in flight.
    #[error("variable `{0}` has no update in flight")]
    NotLoading(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// A query that failed in the executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = SchedulerError> = std::result::Result<T, E>;
