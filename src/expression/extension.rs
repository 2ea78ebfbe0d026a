//! Extension frames: anonymous specializations of a base atomic frame.
//!
//! An extension pins fixed slot-values onto a base frame without introducing
//! a new hierarchy node. Abstract extensions compare structurally; concrete
//! extensions stand for one particular individual and compare by identity
//! (their serial) alone.

use crate::hierarchy::FrameArena;
use crate::ident::FrameId;
use crate::lattice::fixed::FixedValues;

/// An anonymous specialization of `base` carrying fixed slot-values.
///
/// Never built with an empty fixed-value set; the model returns the base
/// frame unchanged instead (see `ConceptModel::extend`).
#[derive(Debug)]
pub struct Extension {
    serial: u64,
    base: FrameId,
    fixed: FixedValues,
    concrete: bool,
}

impl Extension {
    pub(crate) fn new(serial: u64, base: FrameId, fixed: FixedValues, concrete: bool) -> Self {
        Self {
            serial,
            base,
            fixed,
            concrete,
        }
    }

    /// Identity serial, unique per model.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// The atomic frame this extension specializes.
    pub fn base(&self) -> FrameId {
        self.base
    }

    /// The fixed slot-values pinned by this extension.
    pub fn fixed(&self) -> &FixedValues {
        &self.fixed
    }

    /// Concrete extensions denote one individual; abstract extensions denote
    /// a structural constraint.
    pub fn is_concrete(&self) -> bool {
        self.concrete
    }

    /// Extension subsumption. Concrete extensions subsume only themselves;
    /// abstract ones subsume structurally: base subsumes base, and the fixed
    /// values cover the other's.
    pub fn subsumes(&self, other: &Extension, arena: &FrameArena) -> bool {
        if self.concrete || other.concrete {
            return self.serial == other.serial;
        }
        arena.subsumes(self.base, other.base) && self.fixed.subsumes(&other.fixed, arena)
    }

    /// Structural equality for abstract extensions, identity for concrete.
    pub fn matches(&self, other: &Extension, arena: &FrameArena) -> bool {
        if self.concrete || other.concrete {
            return self.serial == other.serial;
        }
        self.base == other.base && self.fixed.matches(&other.fixed, arena)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ConceptFrame;
    use crate::ident::{Identity, SlotKey, Source, Visibility};
    use crate::lattice::fixed::ConceptValue;

    fn skey(raw: u64) -> SlotKey {
        SlotKey::new(raw).unwrap()
    }

    fn hierarchy() -> (FrameArena, FrameId, FrameId) {
        let arena = FrameArena::new().unwrap();
        let animal = arena
            .add_frame(Identity::new("animal"), Visibility::Exposed, Source::Direct)
            .unwrap();
        let dog = arena
            .add_frame(Identity::new("dog"), Visibility::Exposed, Source::Direct)
            .unwrap();
        arena.add_super(dog, animal).unwrap();
        (arena, animal, dog)
    }

    fn fixed_text(key: SlotKey, value: &str) -> FixedValues {
        let mut fixed = FixedValues::new();
        fixed.set_values(key, vec![ConceptValue::Text(value.into())], Source::Direct);
        fixed
    }

    #[test]
    fn abstract_extensions_compare_structurally() {
        let (arena, _, dog) = hierarchy();
        let k = skey(1);
        let a = Extension::new(1, dog, fixed_text(k, "rex"), false);
        let b = Extension::new(2, dog, fixed_text(k, "rex"), false);
        // Different serials, same structure.
        assert!(a.matches(&b, &arena));
        assert!(a.subsumes(&b, &arena) && b.subsumes(&a, &arena));
    }

    #[test]
    fn concrete_extensions_are_identity_only() {
        let (arena, _, dog) = hierarchy();
        let k = skey(1);
        let a = Extension::new(1, dog, fixed_text(k, "rex"), true);
        let b = Extension::new(2, dog, fixed_text(k, "rex"), true);
        assert!(!a.matches(&b, &arena));
        assert!(!a.subsumes(&b, &arena));
        assert!(a.matches(&a, &arena));
        assert!(a.subsumes(&a, &arena));
    }

    #[test]
    fn base_subsumption_carries_into_extensions() {
        let (arena, animal, dog) = hierarchy();
        let k = skey(1);
        let broad = Extension::new(1, animal, fixed_text(k, "rex"), false);
        let narrow = Extension::new(2, dog, fixed_text(k, "rex"), false);
        assert!(broad.subsumes(&narrow, &arena));
        assert!(!narrow.subsumes(&broad, &arena));
    }

    #[test]
    fn atomic_frames_subsume_extensions_via_base() {
        let (arena, animal, dog) = hierarchy();
        let ext = ConceptFrame::Extension(std::sync::Arc::new(Extension::new(
            1,
            dog,
            fixed_text(skey(1), "rex"),
            false,
        )));
        assert!(ConceptFrame::atomic(animal).subsumes(&ext, &arena));
        // Extensions never subsume non-extensions.
        assert!(!ext.subsumes(&ConceptFrame::atomic(dog), &arena));
    }
}
