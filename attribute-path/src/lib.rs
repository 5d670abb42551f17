//! # attribute-path
//!
//! Turns read/subscribe path specifiers, each possibly wildcarded at the endpoint,
//! cluster or attribute level, into the concrete attribute paths a device exposes
//! right now.
//!
//! Expansion is lazy and resumable. All position state lives in an
//! [`ExpansionState`] value, so a report that spans several messages can drop its
//! iterator between messages and pick up exactly where it stopped.
//!
//! ## Ordering
//!
//! Specifiers are walked in list order. Within one specifier the output is
//! column-major: every attribute of a cluster, then the next cluster of the endpoint,
//! then the next endpoint. After a cluster's own attributes, wildcard expansion
//! appends the global attributes that cluster metadata does not carry
//! ([`NOT_IN_METADATA`](im_data_model::global_attributes::NOT_IN_METADATA)).
//!
//! ```rust
//! use attribute_path::{AttributePathExpandIterator, AttributePathParams};
//! use im_data_model::InMemoryDataModel;
//!
//! let model = InMemoryDataModel::new().with_cluster(1, 6, [0, 1, 2]);
//! let paths = [AttributePathParams::wildcard().with_endpoint(1).with_cluster(6)];
//!
//! let attributes: Vec<_> = AttributePathExpandIterator::new(&model, &paths)
//!     .map(|path| path.attribute)
//!     .collect();
//! assert_eq!(attributes, vec![0, 1, 2, 0xFFF8, 0xFFF9, 0xFFFB]);
//! ```

mod error;
mod iterator;
mod params;

pub use error::{PathError, Result};
pub use iterator::{AttributePathExpandIterator, ExpansionState};
pub use params::{validate_all, AttributePathParams};
