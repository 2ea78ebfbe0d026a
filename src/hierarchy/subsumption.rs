//! Subsumption cache: memoized ancestor/descendant closures.
//!
//! Repeated closure queries over a multi-inheritance DAG are O(depth) crawls;
//! the cache converts them into O(1) lookups. Entries are memoized lazily on
//! first query and can be bulk-precomputed by the arena's `optimize` pass.
//! Any hierarchy mutation invalidates the whole cache — editing is therefore
//! only legal before the model is marked built, or through the synthesis
//! path, which re-clears it.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;

use crate::ident::{FrameId, VisibilityFilter};

/// An ordered frame set with O(1) membership tests.
///
/// Keeps discovery order for deterministic iteration while serving
/// `contains` from a hash set.
#[derive(Debug, Clone, Default)]
pub struct FrameSet {
    order: Vec<FrameId>,
    members: HashSet<FrameId>,
}

impl FrameSet {
    /// Build a set from frames in discovery order, dropping duplicates.
    pub fn from_ordered(frames: Vec<FrameId>) -> Self {
        let mut set = FrameSet::default();
        for frame in frames {
            set.insert(frame);
        }
        set
    }

    /// Insert a frame, keeping first-seen order.
    pub fn insert(&mut self, frame: FrameId) -> bool {
        if self.members.insert(frame) {
            self.order.push(frame);
            true
        } else {
            false
        }
    }

    /// Membership test.
    pub fn contains(&self, frame: FrameId) -> bool {
        self.members.contains(&frame)
    }

    /// Frames in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.order.iter().copied()
    }

    /// Frames in discovery order, as a slice.
    pub fn as_slice(&self) -> &[FrameId] {
        &self.order
    }

    /// Number of frames in the set.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Cache key: one closure per (frame, visibility filter).
type ClosureKey = (FrameId, VisibilityFilter);

/// Memoized closure storage for the frame arena.
#[derive(Debug, Default)]
pub struct SubsumptionCache {
    ancestors: DashMap<ClosureKey, Arc<FrameSet>>,
    descendants: DashMap<ClosureKey, Arc<FrameSet>>,
    structured: DashMap<FrameId, Arc<Vec<FrameId>>>,
}

impl SubsumptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ancestors(&self, frame: FrameId, filter: VisibilityFilter) -> Option<Arc<FrameSet>> {
        self.ancestors.get(&(frame, filter)).map(|e| Arc::clone(&e))
    }

    pub fn store_ancestors(
        &self,
        frame: FrameId,
        filter: VisibilityFilter,
        set: FrameSet,
    ) -> Arc<FrameSet> {
        let set = Arc::new(set);
        self.ancestors.insert((frame, filter), Arc::clone(&set));
        set
    }

    pub fn descendants(&self, frame: FrameId, filter: VisibilityFilter) -> Option<Arc<FrameSet>> {
        self.descendants.get(&(frame, filter)).map(|e| Arc::clone(&e))
    }

    pub fn store_descendants(
        &self,
        frame: FrameId,
        filter: VisibilityFilter,
        set: FrameSet,
    ) -> Arc<FrameSet> {
        let set = Arc::new(set);
        self.descendants.insert((frame, filter), Arc::clone(&set));
        set
    }

    pub fn structured_ancestors(&self, frame: FrameId) -> Option<Arc<Vec<FrameId>>> {
        self.structured.get(&frame).map(|e| Arc::clone(&e))
    }

    pub fn store_structured_ancestors(
        &self,
        frame: FrameId,
        frames: Vec<FrameId>,
    ) -> Arc<Vec<FrameId>> {
        let frames = Arc::new(frames);
        self.structured.insert(frame, Arc::clone(&frames));
        frames
    }

    /// Drop every memoized closure. Called on any hierarchy mutation.
    pub fn invalidate(&self) {
        self.ancestors.clear();
        self.descendants.clear();
        self.structured.clear();
    }

    /// Number of memoized entries across all tables.
    pub fn len(&self) -> usize {
        self.ancestors.len() + self.descendants.len() + self.structured.len()
    }

    /// Whether nothing is memoized.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
