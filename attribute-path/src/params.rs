//! Path specifiers as issued by a read or subscribe request.

use im_data_model::global_attributes;
use im_data_model::{AttributeId, ClusterId, ConcreteAttributePath, EndpointId};

use crate::error::{PathError, Result};

/// An attribute path where each segment is either concrete or a wildcard (`None`).
#[derive(Debug, Clone, Copy, Default, Hash, Eq, PartialEq)]
pub struct AttributePathParams {
    pub endpoint: Option<EndpointId>,
    pub cluster: Option<ClusterId>,
    pub attribute: Option<AttributeId>,
}

impl AttributePathParams {
    pub fn new(
        endpoint: Option<EndpointId>,
        cluster: Option<ClusterId>,
        attribute: Option<AttributeId>,
    ) -> Self {
        Self {
            endpoint,
            cluster,
            attribute,
        }
    }

    /// Wildcard at every level: all attributes of all clusters of all endpoints.
    pub fn wildcard() -> Self {
        Self::default()
    }

    /// No wildcard at any level.
    pub fn concrete(endpoint: EndpointId, cluster: ClusterId, attribute: AttributeId) -> Self {
        Self::new(Some(endpoint), Some(cluster), Some(attribute))
    }

    pub fn with_endpoint(mut self, endpoint: EndpointId) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn with_cluster(mut self, cluster: ClusterId) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeId) -> Self {
        self.attribute = Some(attribute);
        self
    }

    pub fn has_wildcard_endpoint(&self) -> bool {
        self.endpoint.is_none()
    }

    pub fn has_wildcard_cluster(&self) -> bool {
        self.cluster.is_none()
    }

    pub fn has_wildcard_attribute(&self) -> bool {
        self.attribute.is_none()
    }

    /// Whether any segment is a wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.has_wildcard_endpoint() || self.has_wildcard_cluster() || self.has_wildcard_attribute()
    }

    /// The concrete path this specifier names, if it has no wildcard.
    pub fn as_concrete(&self) -> Option<ConcreteAttributePath> {
        Some(ConcreteAttributePath::new(
            self.endpoint?,
            self.cluster?,
            self.attribute?,
        ))
    }

    /// Whether `path` is covered by this specifier.
    pub fn includes(&self, path: &ConcreteAttributePath) -> bool {
        self.endpoint.map_or(true, |id| id == path.endpoint)
            && self.cluster.map_or(true, |id| id == path.cluster)
            && self.attribute.map_or(true, |id| id == path.attribute)
    }

    /// Reject specifier shapes that can never be meaningful.
    pub fn validate(&self) -> Result<()> {
        match (self.cluster, self.attribute) {
            (None, Some(attribute)) if !global_attributes::is_global(attribute) => {
                Err(PathError::NonGlobalAttributeWithWildcardCluster { attribute })
            }
            _ => Ok(()),
        }
    }
}

impl From<ConcreteAttributePath> for AttributePathParams {
    fn from(path: ConcreteAttributePath) -> Self {
        Self::concrete(path.endpoint, path.cluster, path.attribute)
    }
}

/// Validate a whole request path list.
pub fn validate_all(paths: &[AttributePathParams]) -> Result<()> {
    if paths.is_empty() {
        return Err(PathError::Empty);
    }
    paths.iter().try_for_each(AttributePathParams::validate)
}
