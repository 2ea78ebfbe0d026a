//! The frame arena: id-keyed storage for the concept hierarchy.
//!
//! Frames reference each other by [`FrameId`] rather than by pointer, so the
//! DAG can be mutated during build and shared read-mostly afterwards. All
//! link mutations keep super/sub symmetry, maintain the root-link invariant
//! (a frame with no other supers is linked to the root), and invalidate the
//! subsumption cache.

use dashmap::DashMap;

use std::sync::Arc;

use crate::annotation::Annotations;
use crate::error::{AccessError, KbResult, ModelError};
use crate::ident::{FrameId, IdAllocator, Identity, SlotKey, Source, Visibility, VisibilityFilter};
use crate::lattice::fixed::ConceptValue;
use crate::lattice::slot::Slot;

use super::crawler::{self, Direction};
use super::frame::AtomicFrame;
use super::subsumption::{FrameSet, SubsumptionCache};

/// Id-keyed storage for atomic frames, with the subsumption cache attached.
#[derive(Debug)]
pub struct FrameArena {
    frames: DashMap<FrameId, AtomicFrame>,
    names: DashMap<String, FrameId>,
    root: FrameId,
    alloc: IdAllocator,
    cache: SubsumptionCache,
}

impl FrameArena {
    /// Create an arena holding only the root frame.
    pub fn new() -> KbResult<Self> {
        let alloc = IdAllocator::new();
        let root = alloc.next_frame()?;
        let frames = DashMap::new();
        let names = DashMap::new();
        let identity = Identity::with_label("root", "Root");
        names.insert(identity.name.clone(), root);
        frames.insert(
            root,
            AtomicFrame::new(root, identity, Visibility::Exposed, Source::Unspecified),
        );
        Ok(Self {
            frames,
            names,
            root,
            alloc,
            cache: SubsumptionCache::new(),
        })
    }

    /// The unique root frame every other frame descends from.
    pub fn root(&self) -> FrameId {
        self.root
    }

    /// Number of frames, root included.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether only the root frame exists.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// All frame ids, sorted for deterministic iteration.
    pub fn frame_ids(&self) -> Vec<FrameId> {
        let mut ids: Vec<FrameId> = self.frames.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    /// Whether a frame with this id exists.
    pub fn contains(&self, id: FrameId) -> bool {
        self.frames.contains_key(&id)
    }

    /// Look up a frame id by unique name.
    pub fn resolve(&self, name: &str) -> Option<FrameId> {
        self.names.get(name).map(|e| *e.value())
    }

    /// Look up a frame id by unique name, erroring if absent.
    pub fn require(&self, name: &str) -> KbResult<FrameId> {
        self.resolve(name)
            .ok_or_else(|| ModelError::UnknownFrame { name: name.into() }.into())
    }

    /// Run a closure against a frame, erroring if the id is unknown.
    pub fn with_frame<R>(&self, id: FrameId, f: impl FnOnce(&AtomicFrame) -> R) -> KbResult<R> {
        self.frames
            .get(&id)
            .map(|frame| f(frame.value()))
            .ok_or_else(|| AccessError::NoSuchFrame { id: id.to_string() }.into())
    }

    /// The frame's identity, if it exists.
    pub fn identity_of(&self, id: FrameId) -> Option<Identity> {
        self.frames.get(&id).map(|f| f.identity.clone())
    }

    /// Display label, falling back to the raw id.
    pub fn label_of(&self, id: FrameId) -> String {
        self.identity_of(id)
            .map(|i| i.label)
            .unwrap_or_else(|| id.to_string())
    }

    /// Visibility, if the frame exists.
    pub fn visibility_of(&self, id: FrameId) -> Option<Visibility> {
        self.frames.get(&id).map(|f| f.visibility)
    }

    /// Direct supers, cloned. Empty for unknown ids.
    pub fn supers_of(&self, id: FrameId) -> Vec<FrameId> {
        self.frames
            .get(&id)
            .map(|f| f.supers.clone())
            .unwrap_or_default()
    }

    /// Direct subs, cloned. Empty for unknown ids.
    pub fn subs_of(&self, id: FrameId) -> Vec<FrameId> {
        self.frames
            .get(&id)
            .map(|f| f.subs.clone())
            .unwrap_or_default()
    }

    /// Direct subs admitted by a visibility filter.
    pub fn subs_filtered(&self, id: FrameId, filter: VisibilityFilter) -> Vec<FrameId> {
        self.subs_of(id)
            .into_iter()
            .filter(|s| self.visibility_of(*s).is_some_and(|v| filter.admits(v)))
            .collect()
    }

    /// Direct supers admitted by a visibility filter.
    pub fn supers_filtered(&self, id: FrameId, filter: VisibilityFilter) -> Vec<FrameId> {
        self.supers_of(id)
            .into_iter()
            .filter(|s| self.visibility_of(*s).is_some_and(|v| filter.admits(v)))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Frame mutation
    // -----------------------------------------------------------------------

    /// Add a frame, linked to the root until it gains a real super.
    pub fn add_frame(
        &self,
        identity: Identity,
        visibility: Visibility,
        source: Source,
    ) -> KbResult<FrameId> {
        self.add_frame_inner(identity, visibility, source, false)
    }

    /// Add a hidden synthetic frame (dynamic value-type synthesis).
    pub(crate) fn add_synthetic_frame(&self, identity: Identity) -> KbResult<FrameId> {
        self.add_frame_inner(identity, Visibility::Hidden, Source::Unspecified, true)
    }

    fn add_frame_inner(
        &self,
        identity: Identity,
        visibility: Visibility,
        source: Source,
        synthetic: bool,
    ) -> KbResult<FrameId> {
        if self.names.contains_key(&identity.name) {
            return Err(ModelError::DuplicateFrame {
                name: identity.name,
            }
            .into());
        }
        let id = self.alloc.next_frame()?;
        let mut frame = AtomicFrame::new(id, identity, visibility, source);
        frame.synthetic = synthetic;
        frame.link_super(self.root);
        self.names.insert(frame.identity.name.clone(), id);
        self.frames.insert(id, frame);
        if let Some(mut root) = self.frames.get_mut(&self.root) {
            root.link_sub(id);
        }
        self.cache.invalidate();
        Ok(id)
    }

    /// Add a direct super-link, rejecting links that would create a cycle.
    ///
    /// Maintains the root-link invariant: the root stays a direct super only
    /// while it is the sole super.
    pub fn add_super(&self, child: FrameId, sup: FrameId) -> KbResult<()> {
        if !self.contains(child) {
            return Err(AccessError::NoSuchFrame {
                id: child.to_string(),
            }
            .into());
        }
        if !self.contains(sup) {
            return Err(AccessError::NoSuchFrame { id: sup.to_string() }.into());
        }
        if self.supers_of(child).contains(&sup) {
            return Ok(());
        }
        if child == sup || self.subsumes(child, sup) {
            return Err(ModelError::CyclicSuperLink {
                frame: self.label_of(child),
                super_frame: self.label_of(sup),
            }
            .into());
        }

        if let Some(mut c) = self.frames.get_mut(&child) {
            c.link_super(sup);
        }
        if let Some(mut s) = self.frames.get_mut(&sup) {
            s.link_sub(child);
        }

        // Drop the automatic root link once a real super exists.
        if sup != self.root && self.supers_of(child).contains(&self.root) {
            self.unlink(child, self.root);
        }
        self.cache.invalidate();
        Ok(())
    }

    /// Remove a direct super-link; relinks to the root if the frame would be
    /// left with no supers. No-op if the link is absent.
    pub fn remove_super(&self, child: FrameId, sup: FrameId) -> KbResult<()> {
        if !self.contains(child) || !self.contains(sup) {
            return Ok(());
        }
        self.unlink(child, sup);
        if self.supers_of(child).is_empty() {
            if let Some(mut c) = self.frames.get_mut(&child) {
                c.link_super(self.root);
            }
            if let Some(mut r) = self.frames.get_mut(&self.root) {
                r.link_sub(child);
            }
        }
        self.cache.invalidate();
        Ok(())
    }

    fn unlink(&self, child: FrameId, sup: FrameId) {
        if let Some(mut c) = self.frames.get_mut(&child) {
            c.unlink_super(sup);
        }
        if let Some(mut s) = self.frames.get_mut(&sup) {
            s.unlink_sub(child);
        }
    }

    /// Remove a frame entirely: detach all hierarchy links and rewire
    /// orphaned children to the removed frame's former parents.
    ///
    /// Removing the root (or an unknown id) is a no-op.
    pub fn remove_frame(&self, id: FrameId) -> KbResult<()> {
        if id == self.root || !self.contains(id) {
            return Ok(());
        }
        let parents = self.supers_of(id);
        let children = self.subs_of(id);

        for p in &parents {
            self.unlink(id, *p);
        }
        for c in &children {
            self.unlink(*c, id);
        }
        for c in &children {
            for p in &parents {
                // Rewiring cannot cycle: the removed node is already detached.
                self.add_super(*c, *p)?;
            }
            if self.supers_of(*c).is_empty() {
                self.add_super(*c, self.root)?;
            }
        }

        if let Some((_, frame)) = self.frames.remove(&id) {
            self.names.remove(&frame.identity.name);
        }
        self.cache.invalidate();
        Ok(())
    }

    /// Change a frame's visibility. Invalidates filtered closures.
    pub fn set_visibility(&self, id: FrameId, visibility: Visibility) -> KbResult<()> {
        let mut frame = self
            .frames
            .get_mut(&id)
            .ok_or_else(|| AccessError::NoSuchFrame { id: id.to_string() })?;
        frame.visibility = visibility;
        drop(frame);
        self.cache.invalidate();
        Ok(())
    }

    /// Merge a provenance tag into a frame's source.
    pub fn merge_source(&self, id: FrameId, source: Source) -> KbResult<()> {
        let mut frame = self
            .frames
            .get_mut(&id)
            .ok_or_else(|| AccessError::NoSuchFrame { id: id.to_string() })?;
        frame.source = frame.source.merge(source);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Slots and fixed values
    // -----------------------------------------------------------------------

    /// Attach a slot to a frame. A same-key slot is replaced, its source
    /// merged.
    pub fn add_slot(&self, id: FrameId, slot: Slot) -> KbResult<()> {
        let mut frame = self
            .frames
            .get_mut(&id)
            .ok_or_else(|| AccessError::NoSuchFrame { id: id.to_string() })?;
        if let Some(existing) = frame.slots.iter_mut().find(|s| s.key() == slot.key()) {
            let merged = existing.source().merge(slot.source());
            *existing = slot.with_source(merged);
        } else {
            frame.slots.push(slot);
        }
        Ok(())
    }

    /// Detach a slot from a frame. No-op if absent.
    pub fn remove_slot(&self, id: FrameId, key: SlotKey) -> KbResult<()> {
        if let Some(mut frame) = self.frames.get_mut(&id) {
            frame.slots.retain(|s| s.key() != key);
        }
        Ok(())
    }

    /// Slots declared directly on a frame, cloned.
    pub fn direct_slots(&self, id: FrameId) -> Vec<Slot> {
        self.frames
            .get(&id)
            .map(|f| f.slots.clone())
            .unwrap_or_default()
    }

    /// Add a fixed default slot-value with absorption semantics: the new
    /// value is dropped if an existing value subsumes it, and it evicts any
    /// existing value it subsumes.
    pub fn add_fixed_value(
        &self,
        id: FrameId,
        key: SlotKey,
        value: ConceptValue,
        source: Source,
    ) -> KbResult<()> {
        let existing: Vec<ConceptValue> = self
            .frames
            .get(&id)
            .ok_or_else(|| AccessError::NoSuchFrame { id: id.to_string() })?
            .fixed
            .values(key)
            .to_vec();

        // Absorption is computed with no frame guard held, since value
        // subsumption may read other frames in the arena.
        if existing.iter().any(|e| e.subsumes(&value, self)) {
            if let Some(mut frame) = self.frames.get_mut(&id) {
                frame.fixed.merge_entry_source(key, source);
            }
            return Ok(());
        }
        let mut kept: Vec<ConceptValue> = existing
            .into_iter()
            .filter(|e| !value.subsumes(e, self))
            .collect();
        kept.push(value);

        if let Some(mut frame) = self.frames.get_mut(&id) {
            frame.fixed.set_values(key, kept, source);
        }
        Ok(())
    }

    /// Drop all fixed values for a slot key on a frame. No-op if absent.
    pub fn clear_fixed_values(&self, id: FrameId, key: SlotKey) -> KbResult<()> {
        if let Some(mut frame) = self.frames.get_mut(&id) {
            frame.fixed.remove(key);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Annotations
    // -----------------------------------------------------------------------

    /// Append an annotation value to a frame.
    pub fn annotate(&self, id: FrameId, key: impl Into<String>, value: serde_json::Value) -> KbResult<()> {
        let mut frame = self
            .frames
            .get_mut(&id)
            .ok_or_else(|| AccessError::NoSuchFrame { id: id.to_string() })?;
        frame.annotations.add(key, value);
        Ok(())
    }

    /// A frame's annotations, cloned.
    pub fn annotations_of(&self, id: FrameId) -> KbResult<Annotations> {
        self.with_frame(id, |f| f.annotations.clone())
    }

    /// Append an annotation value to a slot declared directly on a frame.
    pub fn annotate_slot(
        &self,
        id: FrameId,
        key: SlotKey,
        ann_key: impl Into<String>,
        value: serde_json::Value,
    ) -> KbResult<()> {
        let mut frame = self
            .frames
            .get_mut(&id)
            .ok_or_else(|| AccessError::NoSuchFrame { id: id.to_string() })?;
        let label = frame.identity.label.clone();
        let slot = frame
            .slots
            .iter_mut()
            .find(|s| s.key() == key)
            .ok_or(AccessError::NoSuchSlot {
                slot: key.to_string(),
                frame: label,
            })?;
        slot.annotate(ann_key, value);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Subsumption
    // -----------------------------------------------------------------------

    /// Whether `a` subsumes `b`: `a == b`, or `a` is an ancestor of `b`.
    ///
    /// Served from the cache when a closure for `b` is memoized; otherwise a
    /// fast-reject on a childless `a` followed by an upward crawl from `b`.
    pub fn subsumes(&self, a: FrameId, b: FrameId) -> bool {
        if a == b {
            return true;
        }
        if let Some(ancestors) = self.cache.ancestors(b, VisibilityFilter::All) {
            return ancestors.contains(a);
        }
        if self.subs_of(a).is_empty() {
            return false;
        }
        crawler::reaches(self, b, Direction::Up, VisibilityFilter::All, a)
    }

    /// All ancestors of a frame under a visibility filter, memoized.
    pub fn ancestors(&self, id: FrameId, filter: VisibilityFilter) -> Arc<FrameSet> {
        if let Some(cached) = self.cache.ancestors(id, filter) {
            return cached;
        }
        let set = FrameSet::from_ordered(crawler::collect(self, id, Direction::Up, filter));
        self.cache.store_ancestors(id, filter, set)
    }

    /// All descendants of a frame under a visibility filter, memoized.
    pub fn descendants(&self, id: FrameId, filter: VisibilityFilter) -> Arc<FrameSet> {
        if let Some(cached) = self.cache.descendants(id, filter) {
            return cached;
        }
        let set = FrameSet::from_ordered(crawler::collect(self, id, Direction::Down, filter));
        self.cache.store_descendants(id, filter, set)
    }

    /// Ancestors that carry slots or fixed values of their own, memoized.
    ///
    /// Used to decide whether a subtree is structured without re-crawling it
    /// on every query.
    pub fn structured_ancestors(&self, id: FrameId) -> Arc<Vec<FrameId>> {
        if let Some(cached) = self.cache.structured_ancestors(id) {
            return cached;
        }
        let structured: Vec<FrameId> = self
            .ancestors(id, VisibilityFilter::All)
            .iter()
            .filter(|a| {
                self.frames
                    .get(a)
                    .is_some_and(|f| f.is_structured())
            })
            .collect();
        self.cache.store_structured_ancestors(id, structured)
    }

    /// Bulk-precompute closures for every frame, converting repeated
    /// O(depth) crawls into O(1) lookups.
    pub fn optimize(&self) {
        let ids = self.frame_ids();
        for id in &ids {
            self.ancestors(*id, VisibilityFilter::All);
            self.descendants(*id, VisibilityFilter::All);
            self.structured_ancestors(*id);
        }
        tracing::info!(
            frames = ids.len(),
            entries = self.cache.len(),
            "subsumption cache optimized"
        );
    }

    /// Drop every memoized closure; the next query recomputes lazily.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    /// Number of memoized cache entries (diagnostics).
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}
