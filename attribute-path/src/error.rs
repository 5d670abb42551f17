//! Error types for path specifiers.

use im_data_model::AttributeId;

/// Errors for malformed path specifiers.
///
/// A well-formed specifier that matches nothing is not an error: expansion simply
/// yields no paths for it.
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum PathError {
    /// A wildcard cluster can only be combined with a global attribute id
    #[error("Attribute {attribute:#06x} is not global and cannot be used with a wildcard cluster")]
    NonGlobalAttributeWithWildcardCluster {
        /// The offending attribute id
        attribute: AttributeId,
    },

    /// A request must name at least one path
    #[error("Path list is empty")]
    Empty,
}

/// Convenience type alias for Results using PathError.
pub type Result<T> = std::result::Result<T, PathError>;
