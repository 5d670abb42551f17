//! Identifier and concrete path types.

use std::fmt;

/// Logical addressable unit within a device.
pub type EndpointId = u16;

/// Identifier of a cluster hosted on an endpoint.
pub type ClusterId = u32;

/// Identifier of an attribute within a cluster.
pub type AttributeId = u32;

/// A fully resolved (endpoint, cluster) pair.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ConcreteClusterPath {
    pub endpoint: EndpointId,
    pub cluster: ClusterId,
}

impl ConcreteClusterPath {
    pub fn new(endpoint: EndpointId, cluster: ClusterId) -> Self {
        Self { endpoint, cluster }
    }

    /// Extend this cluster path with an attribute id.
    pub fn attribute(self, attribute: AttributeId) -> ConcreteAttributePath {
        ConcreteAttributePath::new(self.endpoint, self.cluster, attribute)
    }
}

impl fmt::Display for ConcreteClusterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {:#06x})", self.endpoint, self.cluster)
    }
}

/// A fully resolved (endpoint, cluster, attribute) triple.
///
/// Ordering is lexicographic on (endpoint, cluster, attribute), which matches the
/// order a fully wildcarded expansion produces for metadata attributes.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ConcreteAttributePath {
    pub endpoint: EndpointId,
    pub cluster: ClusterId,
    pub attribute: AttributeId,
}

impl ConcreteAttributePath {
    pub fn new(endpoint: EndpointId, cluster: ClusterId, attribute: AttributeId) -> Self {
        Self {
            endpoint,
            cluster,
            attribute,
        }
    }

    /// The cluster this attribute belongs to.
    pub fn cluster_path(&self) -> ConcreteClusterPath {
        ConcreteClusterPath::new(self.endpoint, self.cluster)
    }
}

impl From<(EndpointId, ClusterId, AttributeId)> for ConcreteAttributePath {
    fn from((endpoint, cluster, attribute): (EndpointId, ClusterId, AttributeId)) -> Self {
        Self::new(endpoint, cluster, attribute)
    }
}

impl fmt::Display for ConcreteAttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {:#06x}, {:#06x})",
            self.endpoint, self.cluster, self.attribute
        )
    }
}
