//! Pluggable instance matchers.
//!
//! A matcher is registered against the concept-frame types it handles; an
//! instance store delegates indexing and querying to whichever registered
//! matcher claims a given type.

use std::sync::Arc;

use crate::error::KbResult;
use crate::expression::ConceptFrame;
use crate::hierarchy::FrameArena;
use crate::ident::InstanceId;

use super::graph::InstanceGraph;

/// Indexes and queries instance frames of the types it handles.
pub trait InstanceMatcher: Send + Sync {
    /// Whether this matcher covers the given concept type.
    fn handles(&self, frame_type: &ConceptFrame, arena: &FrameArena) -> bool;

    /// Index an instance frame.
    fn add(&self, graph: &InstanceGraph, id: InstanceId) -> KbResult<()>;

    /// Drop an instance frame from the index.
    fn remove(&self, graph: &InstanceGraph, id: InstanceId) -> KbResult<()>;

    /// Instances matching a probe frame.
    fn matches(&self, graph: &InstanceGraph, probe: InstanceId) -> KbResult<Vec<InstanceId>>;
}

/// Registered matchers, dispatched by declared type coverage.
#[derive(Default)]
pub struct MatcherRegistry {
    matchers: Vec<Arc<dyn InstanceMatcher>>,
}

impl MatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, matcher: Arc<dyn InstanceMatcher>) {
        self.matchers.push(matcher);
    }

    /// The first registered matcher handling a type, if any.
    pub fn dispatch(
        &self,
        frame_type: &ConceptFrame,
        arena: &FrameArena,
    ) -> Option<Arc<dyn InstanceMatcher>> {
        self.matchers
            .iter()
            .find(|m| m.handles(frame_type, arena))
            .map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl std::fmt::Debug for MatcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatcherRegistry")
            .field("matchers", &self.matchers.len())
            .finish()
    }
}
