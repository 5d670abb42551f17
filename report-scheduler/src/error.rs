//! Error types for the report-scheduler crate.

use crate::pool::NodeHandle;

/// Errors that can occur while scheduling reports.
#[derive(Debug, thiserror::Error, Clone, Eq, PartialEq)]
pub enum SchedulerError {
    /// No subscription nodes are registered, so there is nothing to schedule
    #[error("No subscription nodes registered")]
    EmptyPool,

    /// Every slot of the node pool is in use
    #[error("Subscription node pool exhausted (capacity {capacity})")]
    PoolExhausted {
        /// The configured pool capacity
        capacity: usize,
    },

    /// The handle does not refer to a live node
    #[error("Unknown subscription node: {0}")]
    UnknownNode(NodeHandle),

    /// Negotiated reporting intervals are not usable
    #[error("Invalid reporting intervals: {0}")]
    InvalidIntervals(String),

    /// The reporting engine drove a node through a transition it cannot take
    #[error("Invalid node transition: {0}")]
    InvalidTransition(String),

    /// The underlying timer could not be armed
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Errors from a [`TimerDelegate`](crate::TimerDelegate) implementation.
#[derive(Debug, thiserror::Error, Clone, Eq, PartialEq)]
pub enum TimerError {
    /// The timer refused the request
    #[error("Failed to arm timer: {0}")]
    ArmFailed(String),

    /// The timer backend is gone
    #[error("Timer backend unavailable")]
    Unavailable,
}

/// Convenience type alias for Results using SchedulerError.
pub type Result<T> = std::result::Result<T, SchedulerError>;
