//! Instance frames: category, function, type, slots, and back-references.

use crate::expression::ConceptFrame;
use crate::ident::{FrameId, InstanceId, SlotKey};

use super::slot::InstanceSlot;

/// What an instance frame structurally is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceCategory {
    /// A regular local instance of an atomic (or extension) type.
    Atomic,
    /// An instance typed by a disjunction. Query-function only.
    Disjunction,
    /// A stand-in for an instance held elsewhere; local edits forbidden.
    Reference { external_id: String },
}

/// What an instance frame is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceFunction {
    /// States a fact about one individual.
    Assertion,
    /// Describes a sought pattern.
    Query,
}

/// One node in an instance graph.
///
/// The `referencing` back-set lists every slot elsewhere whose value is this
/// frame; auto-update propagation walks it.
#[derive(Debug, Clone)]
pub struct InstanceFrame {
    pub(crate) id: InstanceId,
    pub(crate) category: InstanceCategory,
    pub(crate) function: InstanceFunction,
    pub(crate) frame_type: ConceptFrame,
    pub(crate) inferred_types: Vec<FrameId>,
    pub(crate) suggested_types: Vec<FrameId>,
    pub(crate) slots: Vec<InstanceSlot>,
    pub(crate) referencing: Vec<(InstanceId, SlotKey)>,
    pub(crate) auto_update: bool,
    pub(crate) updating: bool,
    /// Transient instances never arm auto-update.
    pub(crate) free: bool,
}

impl InstanceFrame {
    pub(crate) fn new(
        id: InstanceId,
        category: InstanceCategory,
        function: InstanceFunction,
        frame_type: ConceptFrame,
        free: bool,
    ) -> Self {
        Self {
            id,
            category,
            function,
            frame_type,
            inferred_types: Vec::new(),
            suggested_types: Vec::new(),
            slots: Vec::new(),
            referencing: Vec::new(),
            auto_update: false,
            updating: false,
            free,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn category(&self) -> &InstanceCategory {
        &self.category
    }

    pub fn function(&self) -> InstanceFunction {
        self.function
    }

    /// The fixed concept-level type.
    pub fn frame_type(&self) -> &ConceptFrame {
        &self.frame_type
    }

    /// Types the reasoner has inferred beyond the fixed type.
    pub fn inferred_types(&self) -> &[FrameId] {
        &self.inferred_types
    }

    /// Types the reasoner suggests as plausible narrowings.
    pub fn suggested_types(&self) -> &[FrameId] {
        &self.suggested_types
    }

    pub fn slots(&self) -> &[InstanceSlot] {
        &self.slots
    }

    pub fn slot(&self, key: SlotKey) -> Option<&InstanceSlot> {
        self.slots.iter().find(|s| s.key() == key)
    }

    pub(crate) fn slot_mut(&mut self, key: SlotKey) -> Option<&mut InstanceSlot> {
        self.slots.iter_mut().find(|s| s.key() == key)
    }

    /// Slots elsewhere whose value is this frame.
    pub fn referencing(&self) -> &[(InstanceId, SlotKey)] {
        &self.referencing
    }

    pub fn auto_update(&self) -> bool {
        self.auto_update
    }

    /// Whether this is a transient instance that never arms auto-update.
    pub fn is_free(&self) -> bool {
        self.free
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.category, InstanceCategory::Reference { .. })
    }

    pub(crate) fn add_back_reference(&mut self, from: InstanceId, key: SlotKey) {
        if !self.referencing.contains(&(from, key)) {
            self.referencing.push((from, key));
        }
    }

    pub(crate) fn remove_back_reference(&mut self, from: InstanceId, key: SlotKey) {
        self.referencing.retain(|r| *r != (from, key));
    }
}
