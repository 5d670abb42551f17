//! The query trait the reporting core consumes.

use std::sync::Arc;

use crate::types::{AttributeId, ClusterId, ConcreteAttributePath, ConcreteClusterPath, EndpointId};

/// Metadata returned for an attribute that exists.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct AttributeInfo {
    /// Attribute accepts writes
    pub writable: bool,
    /// Attribute value is a list
    pub list: bool,
}

/// Metadata returned for a server cluster that exists.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ClusterInfo {
    /// Bumped whenever any attribute of the cluster changes
    pub data_version: u32,
}

/// Ordered, read-only view of a device's endpoint/cluster/attribute tree.
///
/// All first/next queries must be stable and total: asking the same question twice
/// yields the same answer until the underlying tree changes. `None` means "no such
/// element" (end of enumeration, or an unknown starting point).
pub trait DataModel {
    /// The lowest endpoint id.
    fn first_endpoint(&self) -> Option<EndpointId>;

    /// The endpoint following `before`.
    fn next_endpoint(&self, before: EndpointId) -> Option<EndpointId>;

    /// The first server cluster hosted on `endpoint`.
    fn first_server_cluster(&self, endpoint: EndpointId) -> Option<ClusterId>;

    /// The server cluster following `before` on the same endpoint.
    fn next_server_cluster(&self, before: &ConcreteClusterPath) -> Option<ClusterId>;

    /// The first attribute of `cluster`.
    fn first_attribute(&self, cluster: &ConcreteClusterPath) -> Option<AttributeId>;

    /// The attribute following `before` in the same cluster.
    fn next_attribute(&self, before: &ConcreteAttributePath) -> Option<AttributeId>;

    /// Metadata for `path`, or `None` if the attribute is absent.
    fn attribute_info(&self, path: &ConcreteAttributePath) -> Option<AttributeInfo>;

    /// Metadata for `path`, or `None` if the cluster is absent.
    fn server_cluster_info(&self, path: &ConcreteClusterPath) -> Option<ClusterInfo>;
}

macro_rules! forward_data_model {
    ($($ty:ty),*) => {
        $(
            impl<M: DataModel + ?Sized> DataModel for $ty {
                fn first_endpoint(&self) -> Option<EndpointId> {
                    (**self).first_endpoint()
                }

                fn next_endpoint(&self, before: EndpointId) -> Option<EndpointId> {
                    (**self).next_endpoint(before)
                }

                fn first_server_cluster(&self, endpoint: EndpointId) -> Option<ClusterId> {
                    (**self).first_server_cluster(endpoint)
                }

                fn next_server_cluster(&self, before: &ConcreteClusterPath) -> Option<ClusterId> {
                    (**self).next_server_cluster(before)
                }

                fn first_attribute(&self, cluster: &ConcreteClusterPath) -> Option<AttributeId> {
                    (**self).first_attribute(cluster)
                }

                fn next_attribute(&self, before: &ConcreteAttributePath) -> Option<AttributeId> {
                    (**self).next_attribute(before)
                }

                fn attribute_info(&self, path: &ConcreteAttributePath) -> Option<AttributeInfo> {
                    (**self).attribute_info(path)
                }

                fn server_cluster_info(&self, path: &ConcreteClusterPath) -> Option<ClusterInfo> {
                    (**self).server_cluster_info(path)
                }
            }
        )*
    };
}

forward_data_model!(&M, Box<M>, Arc<M>);
