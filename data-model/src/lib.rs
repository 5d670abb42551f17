//! # im-data-model
//!
//! The query surface the reporting core walks to find out what a device currently
//! exposes: endpoints, the server clusters hosted on each endpoint, and the attributes
//! of each cluster.
//!
//! The core never owns the data model. It only asks ordered "first"/"next" questions
//! through the [`DataModel`] trait, so any backing representation (generated metadata
//! tables, a dynamic bridge, a test fixture) can sit behind it.
//!
//! ## Usage
//!
//! ```rust
//! use im_data_model::{DataModel, InMemoryDataModel, ConcreteClusterPath};
//!
//! let model = InMemoryDataModel::new()
//!     .with_cluster(1, 0x0006, [0x0000, 0x4000])
//!     .with_cluster(1, 0x0008, [0x0000]);
//!
//! assert_eq!(model.first_endpoint(), Some(1));
//! assert_eq!(model.first_server_cluster(1), Some(0x0006));
//! assert_eq!(
//!     model.next_server_cluster(&ConcreteClusterPath::new(1, 0x0006)),
//!     Some(0x0008)
//! );
//! ```

pub mod error;
pub mod global_attributes;
pub mod in_memory;
pub mod provider;
pub mod types;

pub use error::{DataModelError, Result};
pub use in_memory::InMemoryDataModel;
pub use provider::{AttributeInfo, ClusterInfo, DataModel};
pub use types::{AttributeId, ClusterId, ConcreteAttributePath, ConcreteClusterPath, EndpointId};
