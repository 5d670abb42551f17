//! Turning a subscription's specifiers into report chunks

use attribute_path::{AttributePathExpandIterator, AttributePathParams, ExpansionState};
use im_data_model::{ConcreteAttributePath, DataModel};
use tracing::trace;

/// One chunk of expanded paths and where the next chunk starts, if any.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Chunk {
    pub paths: Vec<ConcreteAttributePath>,
    pub resume_from: Option<ExpansionState>,
}

impl Chunk {
    pub fn is_last(&self) -> bool {
        self.resume_from.is_none()
    }
}

/// Expand at most `max_paths` paths starting at `state`.
///
/// The iterator is checkpointed before probing for one more path. The next chunk
/// resumes from the checkpoint and emits the probed path first.
pub fn next_chunk<M: DataModel + ?Sized>(
    model: &M,
    paths: &[AttributePathParams],
    state: ExpansionState,
    max_paths: usize,
) -> Chunk {
    let mut iter = AttributePathExpandIterator::resume(model, paths, state);
    let out: Vec<_> = iter.by_ref().take(max_paths).collect();

    let checkpoint = iter.state();
    let resume_from = iter.next().map(|_| checkpoint);

    trace!(
        "Expanded {} paths (more: {})",
        out.len(),
        resume_from.is_some()
    );
    Chunk {
        paths: out,
        resume_from,
    }
}
