//! Subscription bookkeeping owned by the report worker

use std::collections::BTreeMap;
use std::fmt;

use attribute_path::{AttributePathParams, ExpansionState};
use im_data_model::ConcreteAttributePath;
use report_scheduler::NodeHandle;

/// Identifier handed to subscribers.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// One report message produced for a subscription.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReportBatch {
    pub subscription: SubscriptionId,
    pub paths: Vec<ConcreteAttributePath>,
    /// Another chunk follows once this one is acknowledged
    pub more_chunks: bool,
}

#[derive(Debug)]
pub(crate) struct Subscription {
    pub(crate) paths: Vec<AttributePathParams>,
    pub(crate) node: NodeHandle,
    /// Where the next chunk starts, while a chunked report is in progress
    pub(crate) cursor: Option<ExpansionState>,
    /// Acknowledged chunk waiting for the next reporting pass
    pub(crate) continue_pending: bool,
}

impl Subscription {
    pub(crate) fn new(paths: Vec<AttributePathParams>, node: NodeHandle) -> Self {
        Self {
            paths,
            node,
            cursor: None,
            continue_pending: false,
        }
    }

    pub(crate) fn includes(&self, path: &ConcreteAttributePath) -> bool {
        self.paths.iter().any(|params| params.includes(path))
    }
}

/// Live subscriptions, addressable by id or by scheduler node.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionTable {
    next_id: u64,
    by_id: BTreeMap<SubscriptionId, Subscription>,
}

impl SubscriptionTable {
    pub(crate) fn insert(&mut self, subscription: Subscription) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.by_id.insert(id, subscription);
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> Option<Subscription> {
        self.by_id.remove(&id)
    }

    pub(crate) fn get_mut(&mut self, id: SubscriptionId) -> Option<&mut Subscription> {
        self.by_id.get_mut(&id)
    }

    pub(crate) fn id_for_node(&self, node: NodeHandle) -> Option<SubscriptionId> {
        self.by_id
            .iter()
            .find(|(_, sub)| sub.node == node)
            .map(|(id, _)| *id)
    }

    /// Subscriptions covering `path`.
    pub(crate) fn matching(&self, path: &ConcreteAttributePath) -> Vec<(SubscriptionId, NodeHandle)> {
        self.by_id
            .iter()
            .filter(|(_, sub)| sub.includes(path))
            .map(|(id, sub)| (*id, sub.node))
            .collect()
    }

    /// Subscriptions whose next chunk was acknowledged, clearing the mark.
    pub(crate) fn take_continuations(&mut self) -> Vec<SubscriptionId> {
        self.by_id
            .iter_mut()
            .filter(|(_, sub)| sub.continue_pending)
            .map(|(id, sub)| {
                sub.continue_pending = false;
                *id
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }
}
