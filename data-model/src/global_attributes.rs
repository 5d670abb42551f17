//! Attribute ids with fixed, cross-cluster meaning.

use crate::types::AttributeId;

pub const GENERATED_COMMAND_LIST: AttributeId = 0xFFF8;
pub const ACCEPTED_COMMAND_LIST: AttributeId = 0xFFF9;
pub const ATTRIBUTE_LIST: AttributeId = 0xFFFB;
pub const FEATURE_MAP: AttributeId = 0xFFFC;
pub const CLUSTER_REVISION: AttributeId = 0xFFFD;

/// Global attributes that per-cluster metadata does not carry.
///
/// Wildcard expansion appends these, in this order, after a cluster's own attributes.
pub const NOT_IN_METADATA: [AttributeId; 3] =
    [GENERATED_COMMAND_LIST, ACCEPTED_COMMAND_LIST, ATTRIBUTE_LIST];

/// Whether `id` is one of the global attribute ids.
pub fn is_global(id: AttributeId) -> bool {
    matches!(
        id,
        GENERATED_COMMAND_LIST | ACCEPTED_COMMAND_LIST | ATTRIBUTE_LIST | FEATURE_MAP | CLUSTER_REVISION
    )
}

/// Whether `id` is served for every cluster without appearing in its metadata.
pub fn is_not_in_metadata(id: AttributeId) -> bool {
    NOT_IN_METADATA.contains(&id)
}

/// The tail-list entry following `id`, if `id` is in the tail and not its last entry.
pub(crate) fn next_not_in_metadata(id: AttributeId) -> Option<AttributeId> {
    let index = NOT_IN_METADATA.iter().position(|&g| g == id)?;
    NOT_IN_METADATA.get(index + 1).copied()
}

/// Position-aware successor lookup exposed for path expansion.
///
/// Returns `Some(next)` when `id` is in the tail with a successor, `Some(None)` when `id`
/// is the final tail entry, and `None` when `id` is not part of the tail at all.
pub fn tail_successor(id: AttributeId) -> Option<Option<AttributeId>> {
    if is_not_in_metadata(id) {
        Some(next_not_in_metadata(id))
    } else {
        None
    }
}
