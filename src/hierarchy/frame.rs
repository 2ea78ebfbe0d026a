//! Atomic frame nodes: named hierarchy entries with super/sub links, slots,
//! and fixed default slot-values.

use crate::annotation::Annotations;
use crate::ident::{FrameId, Identity, SlotKey, Source, Visibility};
use crate::lattice::fixed::FixedValues;
use crate::lattice::slot::Slot;

/// A named node in the concept frame hierarchy.
///
/// Links are ordered and deduplicated; the arena is responsible for keeping
/// super/sub links symmetric and acyclic.
#[derive(Debug, Clone)]
pub struct AtomicFrame {
    pub(crate) id: FrameId,
    pub(crate) identity: Identity,
    pub(crate) visibility: Visibility,
    pub(crate) source: Source,
    /// Created by dynamic value-type frame synthesis rather than a builder.
    pub(crate) synthetic: bool,
    pub(crate) supers: Vec<FrameId>,
    pub(crate) subs: Vec<FrameId>,
    pub(crate) slots: Vec<Slot>,
    pub(crate) fixed: FixedValues,
    pub(crate) annotations: Annotations,
}

impl AtomicFrame {
    pub(crate) fn new(id: FrameId, identity: Identity, visibility: Visibility, source: Source) -> Self {
        Self {
            id,
            identity,
            visibility,
            source,
            synthetic: false,
            supers: Vec::new(),
            subs: Vec::new(),
            slots: Vec::new(),
            fixed: FixedValues::new(),
            annotations: Annotations::new(),
        }
    }

    /// Unique id of this frame.
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// Name and display label.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Exposed or hidden.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Provenance tag.
    pub fn source(&self) -> Source {
        self.source
    }

    /// Whether this frame was created by dynamic value-type synthesis.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// Direct super-frames, in link order.
    pub fn direct_supers(&self) -> &[FrameId] {
        &self.supers
    }

    /// Direct sub-frames, in link order.
    pub fn direct_subs(&self) -> &[FrameId] {
        &self.subs
    }

    /// Slots declared directly on this frame, in declaration order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// The slot with the given key, if declared directly on this frame.
    pub fn slot(&self, key: SlotKey) -> Option<&Slot> {
        self.slots.iter().find(|s| s.key() == key)
    }

    /// Fixed default slot-values declared directly on this frame.
    pub fn fixed_values(&self) -> &FixedValues {
        &self.fixed
    }

    /// Whether this frame carries slots or fixed values of its own.
    ///
    /// "Structured" frames are the ones that contribute to an instance's
    /// effective slot set; unstructured frames are pure taxonomy nodes.
    pub fn is_structured(&self) -> bool {
        !self.slots.is_empty() || !self.fixed.is_empty()
    }

    /// Annotations attached to this frame.
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    // -- link maintenance (arena-internal) ----------------------------------

    pub(crate) fn link_super(&mut self, sup: FrameId) {
        if !self.supers.contains(&sup) {
            self.supers.push(sup);
        }
    }

    pub(crate) fn unlink_super(&mut self, sup: FrameId) {
        self.supers.retain(|s| *s != sup);
    }

    pub(crate) fn link_sub(&mut self, sub: FrameId) {
        if !self.subs.contains(&sub) {
            self.subs.push(sub);
        }
    }

    pub(crate) fn unlink_sub(&mut self, sub: FrameId) {
        self.subs.retain(|s| *s != sub);
    }
}
