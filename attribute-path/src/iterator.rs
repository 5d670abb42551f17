//! Lazy, resumable expansion of path specifiers into concrete attribute paths.

use std::iter::FusedIterator;

use im_data_model::global_attributes::{self, NOT_IN_METADATA};
use im_data_model::{
    AttributeId, ClusterId, ConcreteAttributePath, ConcreteClusterPath, DataModel, EndpointId,
};

use crate::params::AttributePathParams;

/// Position of an expansion, detached from any borrow.
///
/// `None` in a segment means "not positioned yet": the next advance at that level
/// takes the first candidate (or the specifier's concrete id). `expanded` records that
/// a fully concrete specifier has already been handled, since its positions alone
/// cannot tell "not started" from "done".
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ExpansionState {
    path_index: usize,
    endpoint: Option<EndpointId>,
    cluster: Option<ClusterId>,
    attribute: Option<AttributeId>,
    expanded: bool,
}

impl ExpansionState {
    /// State positioned before the first specifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the specifier currently being expanded.
    pub fn path_index(&self) -> usize {
        self.path_index
    }

    /// The last path handed out for the current specifier, if any.
    pub fn last_output(&self) -> Option<ConcreteAttributePath> {
        Some(ConcreteAttributePath::new(
            self.endpoint?,
            self.cluster?,
            self.attribute?,
        ))
    }

    fn start_next_path(&mut self) {
        *self = Self {
            path_index: self.path_index + 1,
            ..Self::default()
        };
    }
}

/// Iterator over the concrete paths matched by a list of specifiers.
///
/// Each specifier is exhausted (including all of its expansions) before the next one
/// starts. Once `next` returns `None` it keeps returning `None`.
///
/// A concrete segment that the data model does not know about ends expansion of that
/// specifier without output; zero matches is a legal outcome for a request naming an
/// absent path.
pub struct AttributePathExpandIterator<'a, M: DataModel + ?Sized> {
    model: &'a M,
    paths: &'a [AttributePathParams],
    state: ExpansionState,
}

impl<'a, M: DataModel + ?Sized> AttributePathExpandIterator<'a, M> {
    /// Start expanding `paths` from the beginning.
    pub fn new(model: &'a M, paths: &'a [AttributePathParams]) -> Self {
        Self::resume(model, paths, ExpansionState::new())
    }

    /// Continue an expansion from a previously saved state.
    ///
    /// `paths` must be the same list the state was produced from.
    pub fn resume(model: &'a M, paths: &'a [AttributePathParams], state: ExpansionState) -> Self {
        Self {
            model,
            paths,
            state,
        }
    }

    /// Snapshot of the current position.
    pub fn state(&self) -> ExpansionState {
        self.state.clone()
    }

    /// Give up the borrow, keeping only the position.
    pub fn into_state(self) -> ExpansionState {
        self.state
    }

    /// Roll back to an earlier snapshot of this same expansion.
    pub fn restore(&mut self, state: ExpansionState) {
        self.state = state;
    }

    /// Whether every specifier has been exhausted.
    pub fn is_exhausted(&self) -> bool {
        self.state.path_index >= self.paths.len()
    }

    fn advance_output_path(&mut self, params: &AttributePathParams) -> Option<ConcreteAttributePath> {
        if let Some(path) = params.as_concrete() {
            if self.state.expanded {
                return None;
            }
            self.state.expanded = true;
            if !self.is_valid_concrete(&path) {
                tracing::debug!("Concrete path {} is not present, skipping", path);
                return None;
            }
            self.state.endpoint = Some(path.endpoint);
            self.state.cluster = Some(path.cluster);
            self.state.attribute = Some(path.attribute);
            return Some(path);
        }

        loop {
            if let (Some(endpoint), Some(cluster)) = (self.state.endpoint, self.state.cluster) {
                let cluster_path = ConcreteClusterPath::new(endpoint, cluster);
                if let Some(attribute) = self.next_attribute_id(params, cluster_path) {
                    self.state.attribute = Some(attribute);
                    return Some(cluster_path.attribute(attribute));
                }
            }

            if let Some(endpoint) = self.state.endpoint {
                if let Some(cluster) = self.next_cluster_id(params, endpoint) {
                    self.state.cluster = Some(cluster);
                    self.state.attribute = None;
                    continue;
                }
            }

            if let Some(endpoint) = self.next_endpoint_id(params) {
                self.state.endpoint = Some(endpoint);
                self.state.cluster = None;
                self.state.attribute = None;
                continue;
            }

            return None;
        }
    }

    fn next_attribute_id(
        &self,
        params: &AttributePathParams,
        cluster_path: ConcreteClusterPath,
    ) -> Option<AttributeId> {
        // A cluster removed between chunks has no attributes left, global or not.
        if self.model.server_cluster_info(&cluster_path).is_none() {
            return None;
        }

        let Some(current) = self.state.attribute else {
            return match params.attribute {
                None => {
                    let first = self.model.first_attribute(&cluster_path);
                    self.skip_tail_ids(cluster_path, first)
                        .or(Some(NOT_IN_METADATA[0]))
                }
                Some(attribute) => self
                    .is_valid_attribute(&cluster_path.attribute(attribute))
                    .then_some(attribute),
            };
        };

        if params.attribute.is_some() {
            return None;
        }

        // Already walking the tail: follow its fixed order to the end.
        if let Some(successor) = global_attributes::tail_successor(current) {
            return successor;
        }

        let next = self.model.next_attribute(&cluster_path.attribute(current));
        self.skip_tail_ids(cluster_path, next)
            .or(Some(NOT_IN_METADATA[0]))
    }

    /// Step past tail ids the provider enumerates itself, so the tail is emitted once.
    fn skip_tail_ids(
        &self,
        cluster_path: ConcreteClusterPath,
        mut candidate: Option<AttributeId>,
    ) -> Option<AttributeId> {
        while let Some(id) = candidate {
            if !global_attributes::is_not_in_metadata(id) {
                return Some(id);
            }
            candidate = self.model.next_attribute(&cluster_path.attribute(id));
        }
        None
    }

    fn next_cluster_id(&self, params: &AttributePathParams, endpoint: EndpointId) -> Option<ClusterId> {
        match (self.state.cluster, params.cluster) {
            (None, None) => self.model.first_server_cluster(endpoint),
            (None, Some(cluster)) => self
                .model
                .server_cluster_info(&ConcreteClusterPath::new(endpoint, cluster))
                .map(|_| cluster),
            (Some(current), None) => self
                .model
                .next_server_cluster(&ConcreteClusterPath::new(endpoint, current)),
            (Some(_), Some(_)) => None,
        }
    }

    fn next_endpoint_id(&self, params: &AttributePathParams) -> Option<EndpointId> {
        match (self.state.endpoint, params.endpoint) {
            (None, None) => self.model.first_endpoint(),
            (None, Some(endpoint)) => Some(endpoint),
            (Some(current), None) => self.model.next_endpoint(current),
            (Some(_), Some(_)) => None,
        }
    }

    fn is_valid_attribute(&self, path: &ConcreteAttributePath) -> bool {
        global_attributes::is_not_in_metadata(path.attribute)
            || self.model.attribute_info(path).is_some()
    }

    fn is_valid_concrete(&self, path: &ConcreteAttributePath) -> bool {
        self.model.server_cluster_info(&path.cluster_path()).is_some()
            && self.is_valid_attribute(path)
    }
}

impl<'a, M: DataModel + ?Sized> Iterator for AttributePathExpandIterator<'a, M> {
    type Item = ConcreteAttributePath;

    fn next(&mut self) -> Option<Self::Item> {
        let paths = self.paths;
        while let Some(params) = paths.get(self.state.path_index) {
            if let Some(path) = self.advance_output_path(params) {
                tracing::trace!("Expanded path {}", path);
                return Some(path);
            }
            tracing::debug!(
                "Path specifier {} exhausted: {:?}",
                self.state.path_index,
                params
            );
            self.state.start_next_path();
        }
        None
    }
}

impl<'a, M: DataModel + ?Sized> FusedIterator for AttributePathExpandIterator<'a, M> {}

#[cfg(test)]
mod tests {
    use super::*;
    use im_data_model::global_attributes::{
        ACCEPTED_COMMAND_LIST, ATTRIBUTE_LIST, FEATURE_MAP, GENERATED_COMMAND_LIST,
    };
    use im_data_model::{AttributeInfo, InMemoryDataModel};

    fn model() -> InMemoryDataModel {
        InMemoryDataModel::new()
            .with_cluster(0, 0x001D, [0x0000])
            .with_cluster(1, 0x0006, [0x0000, 0x0001, 0x0002])
            .with_cluster(1, 0x0008, [0x0000, FEATURE_MAP])
    }

    fn expand(model: &InMemoryDataModel, paths: &[AttributePathParams]) -> Vec<(u16, u32, u32)> {
        AttributePathExpandIterator::new(model, paths)
            .map(|p| (p.endpoint, p.cluster, p.attribute))
            .collect()
    }

    fn expand_from(
        model: &InMemoryDataModel,
        paths: &[AttributePathParams],
        state: ExpansionState,
    ) -> Vec<(u16, u32, u32)> {
        AttributePathExpandIterator::resume(model, paths, state)
            .map(|p| (p.endpoint, p.cluster, p.attribute))
            .collect()
    }

    #[test]
    fn test_attribute_wildcard_appends_global_tail() {
        let model = model();
        let paths = [AttributePathParams::wildcard().with_endpoint(1).with_cluster(0x0006)];
        assert_eq!(
            expand(&model, &paths),
            vec![
                (1, 0x0006, 0x0000),
                (1, 0x0006, 0x0001),
                (1, 0x0006, 0x0002),
                (1, 0x0006, GENERATED_COMMAND_LIST),
                (1, 0x0006, ACCEPTED_COMMAND_LIST),
                (1, 0x0006, ATTRIBUTE_LIST),
            ]
        );
    }

    #[test]
    fn test_cluster_wildcard_with_global_attribute() {
        let model = model();
        let paths = [AttributePathParams::wildcard()
            .with_endpoint(1)
            .with_attribute(ATTRIBUTE_LIST)];
        assert_eq!(
            expand(&model, &paths),
            vec![(1, 0x0006, ATTRIBUTE_LIST), (1, 0x0008, ATTRIBUTE_LIST)]
        );
    }

    #[test]
    fn test_cluster_wildcard_with_metadata_attribute() {
        let model = model();
        // Only the cluster that actually carries FeatureMap is expanded.
        let paths = [AttributePathParams::wildcard().with_attribute(FEATURE_MAP)];
        assert_eq!(expand(&model, &paths), vec![(1, 0x0008, FEATURE_MAP)]);
    }

    #[test]
    fn test_endpoint_wildcard_concrete_cluster() {
        let model = model();
        let paths = [AttributePathParams::wildcard()
            .with_cluster(0x0008)
            .with_attribute(0x0000)];
        assert_eq!(expand(&model, &paths), vec![(1, 0x0008, 0x0000)]);
    }

    #[test]
    fn test_concrete_path_emitted_once() {
        let model = model();
        let paths = [AttributePathParams::concrete(1, 0x0006, 0x0001)];
        let mut iter = AttributePathExpandIterator::new(&model, &paths);
        assert_eq!(iter.next(), Some(ConcreteAttributePath::new(1, 0x0006, 0x0001)));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
        assert!(iter.is_exhausted());
    }

    #[test]
    fn test_concrete_global_path_valid_without_metadata() {
        let model = model();
        let paths = [AttributePathParams::concrete(1, 0x0006, ACCEPTED_COMMAND_LIST)];
        assert_eq!(expand(&model, &paths), vec![(1, 0x0006, ACCEPTED_COMMAND_LIST)]);
    }

    #[test]
    fn test_invalid_concrete_segments_yield_nothing() {
        let model = model();
        let paths = [
            AttributePathParams::concrete(1, 0x0006, 0x7777),
            AttributePathParams::concrete(1, 0x0300, 0x0000),
            AttributePathParams::concrete(9, 0x0006, 0x0000),
            AttributePathParams::wildcard().with_endpoint(9),
            AttributePathParams::wildcard().with_endpoint(1).with_cluster(0x0300),
        ];
        assert!(expand(&model, &paths).is_empty());
    }

    #[test]
    fn test_specifiers_exhausted_in_order() {
        let model = model();
        let paths = [
            AttributePathParams::concrete(1, 0x0008, 0x0000),
            AttributePathParams::wildcard().with_endpoint(0),
        ];
        assert_eq!(
            expand(&model, &paths),
            vec![
                (1, 0x0008, 0x0000),
                (0, 0x001D, 0x0000),
                (0, 0x001D, GENERATED_COMMAND_LIST),
                (0, 0x001D, ACCEPTED_COMMAND_LIST),
                (0, 0x001D, ATTRIBUTE_LIST),
            ]
        );
    }

    #[test]
    fn test_provider_listing_tail_ids_is_not_duplicated() {
        let model = InMemoryDataModel::new().with_cluster(
            1,
            0x0006,
            [0x0000, GENERATED_COMMAND_LIST, ATTRIBUTE_LIST],
        );
        let paths = [AttributePathParams::wildcard()];
        assert_eq!(
            expand(&model, &paths),
            vec![
                (1, 0x0006, 0x0000),
                (1, 0x0006, GENERATED_COMMAND_LIST),
                (1, 0x0006, ACCEPTED_COMMAND_LIST),
                (1, 0x0006, ATTRIBUTE_LIST),
            ]
        );
    }

    #[test]
    fn test_resume_from_saved_state() {
        let model = model();
        let paths = [AttributePathParams::wildcard()];
        let full = expand(&model, &paths);

        let mut collected = Vec::new();
        let mut state = ExpansionState::new();
        loop {
            // Two paths per "message", dropping the iterator in between.
            let mut iter = AttributePathExpandIterator::resume(&model, &paths, state);
            let chunk: Vec<_> = iter.by_ref().take(2).collect();
            state = iter.into_state();
            if chunk.is_empty() {
                break;
            }
            collected.extend(chunk.into_iter().map(|p| (p.endpoint, p.cluster, p.attribute)));
        }
        assert_eq!(collected, full);
    }

    #[test]
    fn test_restore_replays_path() {
        let model = model();
        let paths = [AttributePathParams::wildcard().with_endpoint(1)];
        let mut iter = AttributePathExpandIterator::new(&model, &paths);

        assert_eq!(iter.next().map(|p| p.attribute), Some(0x0000));
        let checkpoint = iter.state();
        let second = iter.next();
        iter.restore(checkpoint);
        assert_eq!(iter.next(), second);
        assert_eq!(iter.state().path_index(), 0);
        assert_eq!(iter.state().last_output(), second);
    }

    #[test]
    fn test_live_tree_change_between_chunks() {
        let model = model();
        let paths = [AttributePathParams::wildcard().with_endpoint(1).with_cluster(0x0006)];

        let mut iter = AttributePathExpandIterator::new(&model, &paths);
        assert_eq!(iter.next().map(|p| p.attribute), Some(0x0000));
        let state = iter.into_state();

        // Attribute 0x0001 disappears and 0x0005 appears while the report is paused.
        model
            .remove_attribute(ConcreteAttributePath::new(1, 0x0006, 0x0001))
            .unwrap();
        model
            .add_attribute(ConcreteAttributePath::new(1, 0x0006, 0x0005), AttributeInfo::default())
            .unwrap();

        let rest: Vec<_> = AttributePathExpandIterator::resume(&model, &paths, state)
            .map(|p| p.attribute)
            .collect();
        assert_eq!(
            rest,
            vec![0x0002, 0x0005, GENERATED_COMMAND_LIST, ACCEPTED_COMMAND_LIST, ATTRIBUTE_LIST]
        );
    }

    #[test]
    fn test_removed_cluster_between_chunks() {
        let model = InMemoryDataModel::new()
            .with_cluster(1, 0x0006, [0x0000, 0x0001, 0x0002])
            .with_cluster(1, 0x0008, [0x0000]);
        let paths = [AttributePathParams::wildcard().with_endpoint(1)];

        let mut iter = AttributePathExpandIterator::new(&model, &paths);
        assert_eq!(iter.next(), Some(ConcreteAttributePath::new(1, 0x0006, 0x0000)));
        let state = iter.into_state();

        model
            .remove_cluster(ConcreteClusterPath::new(1, 0x0006))
            .unwrap();

        let rest = expand_from(&model, &paths, state);
        assert_eq!(
            rest,
            vec![
                (1, 0x0008, 0x0000),
                (1, 0x0008, GENERATED_COMMAND_LIST),
                (1, 0x0008, ACCEPTED_COMMAND_LIST),
                (1, 0x0008, ATTRIBUTE_LIST),
            ]
        );
    }

    #[test]
    fn test_removed_cluster_while_walking_tail() {
        let model = model();
        let paths = [AttributePathParams::wildcard().with_endpoint(1).with_cluster(0x0006)];

        let mut iter = AttributePathExpandIterator::new(&model, &paths);
        let emitted: Vec<_> = iter.by_ref().take(4).map(|p| p.attribute).collect();
        assert_eq!(emitted.last(), Some(&GENERATED_COMMAND_LIST));
        let state = iter.into_state();

        model
            .remove_cluster(ConcreteClusterPath::new(1, 0x0006))
            .unwrap();
        assert!(expand_from(&model, &paths, state).is_empty());
    }

    #[test]
    fn test_empty_inputs() {
        let empty_model = InMemoryDataModel::new();
        assert!(expand(&empty_model, &[AttributePathParams::wildcard()]).is_empty());
        assert!(expand(&model(), &[]).is_empty());
    }
}
