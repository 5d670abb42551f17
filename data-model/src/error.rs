//! Error types for data model mutation.

use crate::types::{ConcreteAttributePath, ConcreteClusterPath, EndpointId};

/// Errors raised when editing an [`InMemoryDataModel`](crate::InMemoryDataModel).
///
/// Queries never fail; only mutations that reference a missing parent or duplicate
/// an existing element do.
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum DataModelError {
    /// The endpoint does not exist
    #[error("Endpoint not found: {0}")]
    EndpointNotFound(EndpointId),

    /// The cluster does not exist on the endpoint
    #[error("Cluster not found: {0}")]
    ClusterNotFound(ConcreteClusterPath),

    /// The attribute does not exist in the cluster
    #[error("Attribute not found: {0}")]
    AttributeNotFound(ConcreteAttributePath),

    /// The element being added is already present
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

/// Convenience type alias for Results using DataModelError.
pub type Result<T> = std::result::Result<T, DataModelError>;
