use attribute_path::PathError;
use report_scheduler::SchedulerError;
use thiserror::Error;

use crate::logging::LoggingError;
use crate::subscription::SubscriptionId;

/// Errors that can occur in the Report Manager
#[derive(Error, Debug)]
pub enum ManagerError {
    /// The scheduler rejected an operation
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// A subscription named a malformed path list
    #[error("Invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// The background worker is gone
    #[error("Report worker disconnected")]
    WorkerDisconnected,

    /// Subscription not found
    #[error("Subscription {0} not found")]
    SubscriptionNotFound(SubscriptionId),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Logging could not be initialized
    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),
}

/// Result type for Report Manager operations
pub type Result<T> = std::result::Result<T, ManagerError>;
