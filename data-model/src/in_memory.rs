//! Ordered in-memory data model
//!
//! A live, mutable endpoint → cluster → attribute tree. Interior locking lets the
//! tree be shared (`Arc<InMemoryDataModel>`) between whoever mutates the device
//! topology and the readers expanding paths against it.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use parking_lot::RwLock;

use crate::error::{DataModelError, Result};
use crate::provider::{AttributeInfo, ClusterInfo, DataModel};
use crate::types::{AttributeId, ClusterId, ConcreteAttributePath, ConcreteClusterPath, EndpointId};

#[derive(Debug, Clone, Default)]
struct ClusterEntry {
    data_version: u32,
    attributes: BTreeMap<AttributeId, AttributeInfo>,
}

type ClusterMap = BTreeMap<ClusterId, ClusterEntry>;

/// Data model backed by ordered maps.
///
/// Enumeration order is ascending id order at every level.
#[derive(Debug, Default)]
pub struct InMemoryDataModel {
    endpoints: RwLock<BTreeMap<EndpointId, ClusterMap>>,
}

impl InMemoryDataModel {
    /// Create an empty data model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper: host `cluster` on `endpoint` with the given attributes.
    ///
    /// The endpoint is created if missing; an existing cluster is replaced.
    pub fn with_cluster(
        self,
        endpoint: EndpointId,
        cluster: ClusterId,
        attributes: impl IntoIterator<Item = AttributeId>,
    ) -> Self {
        {
            let mut endpoints = self.endpoints.write();
            let entry = ClusterEntry {
                data_version: 0,
                attributes: attributes
                    .into_iter()
                    .map(|id| (id, AttributeInfo::default()))
                    .collect(),
            };
            endpoints.entry(endpoint).or_default().insert(cluster, entry);
        }
        self
    }

    /// Builder-style helper: an endpoint with no clusters.
    pub fn with_endpoint(self, endpoint: EndpointId) -> Self {
        self.endpoints.write().entry(endpoint).or_default();
        self
    }

    /// Number of endpoints currently present.
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.read().len()
    }

    /// Add an empty endpoint.
    pub fn add_endpoint(&self, endpoint: EndpointId) -> Result<()> {
        let mut endpoints = self.endpoints.write();
        if endpoints.contains_key(&endpoint) {
            return Err(DataModelError::AlreadyExists(format!("endpoint {}", endpoint)));
        }
        endpoints.insert(endpoint, ClusterMap::new());
        tracing::debug!("Added endpoint {}", endpoint);
        Ok(())
    }

    /// Remove an endpoint together with everything it hosts.
    pub fn remove_endpoint(&self, endpoint: EndpointId) -> Result<()> {
        self.endpoints
            .write()
            .remove(&endpoint)
            .map(|_| tracing::debug!("Removed endpoint {}", endpoint))
            .ok_or(DataModelError::EndpointNotFound(endpoint))
    }

    /// Host an empty server cluster on an existing endpoint.
    pub fn add_cluster(&self, path: ConcreteClusterPath) -> Result<()> {
        let mut endpoints = self.endpoints.write();
        let clusters = endpoints
            .get_mut(&path.endpoint)
            .ok_or(DataModelError::EndpointNotFound(path.endpoint))?;
        if clusters.contains_key(&path.cluster) {
            return Err(DataModelError::AlreadyExists(format!("cluster {}", path)));
        }
        clusters.insert(path.cluster, ClusterEntry::default());
        Ok(())
    }

    /// Remove a server cluster and its attributes.
    pub fn remove_cluster(&self, path: ConcreteClusterPath) -> Result<()> {
        let mut endpoints = self.endpoints.write();
        endpoints
            .get_mut(&path.endpoint)
            .ok_or(DataModelError::EndpointNotFound(path.endpoint))?
            .remove(&path.cluster)
            .map(|_| ())
            .ok_or(DataModelError::ClusterNotFound(path))
    }

    /// Add an attribute to an existing cluster.
    pub fn add_attribute(&self, path: ConcreteAttributePath, info: AttributeInfo) -> Result<()> {
        let mut endpoints = self.endpoints.write();
        let cluster = Self::cluster_mut(&mut endpoints, path.cluster_path())?;
        if cluster.attributes.contains_key(&path.attribute) {
            return Err(DataModelError::AlreadyExists(format!("attribute {}", path)));
        }
        cluster.attributes.insert(path.attribute, info);
        Ok(())
    }

    /// Remove an attribute from its cluster.
    pub fn remove_attribute(&self, path: ConcreteAttributePath) -> Result<()> {
        let mut endpoints = self.endpoints.write();
        Self::cluster_mut(&mut endpoints, path.cluster_path())?
            .attributes
            .remove(&path.attribute)
            .map(|_| ())
            .ok_or(DataModelError::AttributeNotFound(path))
    }

    /// Increment the data version of a cluster, returning the new version.
    pub fn bump_data_version(&self, path: ConcreteClusterPath) -> Result<u32> {
        let mut endpoints = self.endpoints.write();
        let cluster = Self::cluster_mut(&mut endpoints, path)?;
        cluster.data_version = cluster.data_version.wrapping_add(1);
        Ok(cluster.data_version)
    }

    fn cluster_mut(
        endpoints: &mut BTreeMap<EndpointId, ClusterMap>,
        path: ConcreteClusterPath,
    ) -> Result<&mut ClusterEntry> {
        endpoints
            .get_mut(&path.endpoint)
            .ok_or(DataModelError::EndpointNotFound(path.endpoint))?
            .get_mut(&path.cluster)
            .ok_or(DataModelError::ClusterNotFound(path))
    }
}

impl DataModel for InMemoryDataModel {
    fn first_endpoint(&self) -> Option<EndpointId> {
        self.endpoints.read().keys().next().copied()
    }

    fn next_endpoint(&self, before: EndpointId) -> Option<EndpointId> {
        self.endpoints
            .read()
            .range((Excluded(before), Unbounded))
            .next()
            .map(|(id, _)| *id)
    }

    fn first_server_cluster(&self, endpoint: EndpointId) -> Option<ClusterId> {
        self.endpoints
            .read()
            .get(&endpoint)?
            .keys()
            .next()
            .copied()
    }

    fn next_server_cluster(&self, before: &ConcreteClusterPath) -> Option<ClusterId> {
        self.endpoints
            .read()
            .get(&before.endpoint)?
            .range((Excluded(before.cluster), Unbounded))
            .next()
            .map(|(id, _)| *id)
    }

    fn first_attribute(&self, cluster: &ConcreteClusterPath) -> Option<AttributeId> {
        self.endpoints
            .read()
            .get(&cluster.endpoint)?
            .get(&cluster.cluster)?
            .attributes
            .keys()
            .next()
            .copied()
    }

    fn next_attribute(&self, before: &ConcreteAttributePath) -> Option<AttributeId> {
        self.endpoints
            .read()
            .get(&before.endpoint)?
            .get(&before.cluster)?
            .attributes
            .range((Excluded(before.attribute), Unbounded))
            .next()
            .map(|(id, _)| *id)
    }

    fn attribute_info(&self, path: &ConcreteAttributePath) -> Option<AttributeInfo> {
        self.endpoints
            .read()
            .get(&path.endpoint)?
            .get(&path.cluster)?
            .attributes
            .get(&path.attribute)
            .copied()
    }

    fn server_cluster_info(&self, path: &ConcreteClusterPath) -> Option<ClusterInfo> {
        self.endpoints
            .read()
            .get(&path.endpoint)?
            .get(&path.cluster)
            .map(|entry| ClusterInfo {
                data_version: entry.data_version,
            })
    }
}
