//! Slot value types and their subsumption/intersection contract.

use crate::expression::ConceptFrame;
use crate::hierarchy::FrameArena;
use crate::ident::FrameId;

use super::fixed::ConceptValue;
use super::number::NumberRange;
use super::text::TextFormat;

/// The type constraint a slot places on its values.
#[derive(Debug, Clone)]
pub enum ValueType {
    /// Values are instances of this concept frame.
    Frame(ConceptFrame),
    /// Values are concept frames themselves, drawn from this frame's
    /// subtree.
    MetaFrame(FrameId),
    /// Values are numbers within this range.
    Number(NumberRange),
    /// Values are strings conforming to this format.
    Text(TextFormat),
}

impl ValueType {
    /// Type subsumption. Frame types delegate to concept subsumption,
    /// meta-frame types compare their root frames, numeric types require
    /// same-kind range containment, text types require the subsumer to be
    /// unconstrained or the same format. Variants never cross.
    pub fn subsumes(&self, other: &ValueType, arena: &FrameArena) -> bool {
        match (self, other) {
            (ValueType::Frame(a), ValueType::Frame(b)) => a.subsumes(b, arena),
            (ValueType::MetaFrame(a), ValueType::MetaFrame(b)) => arena.subsumes(*a, *b),
            (ValueType::Number(a), ValueType::Number(b)) => a.subsumes(b),
            (ValueType::Text(a), ValueType::Text(b)) => a.subsumes(b),
            _ => false,
        }
    }

    /// Pairwise intersection ("update"): the narrowed type both constraints
    /// admit, or `None` when the narrowing is incompatible.
    pub fn intersect(&self, other: &ValueType, arena: &FrameArena) -> Option<ValueType> {
        match (self, other) {
            (ValueType::Frame(a), ValueType::Frame(b)) => {
                if a.subsumes(b, arena) {
                    Some(ValueType::Frame(b.clone()))
                } else if b.subsumes(a, arena) {
                    Some(ValueType::Frame(a.clone()))
                } else {
                    None
                }
            }
            (ValueType::MetaFrame(a), ValueType::MetaFrame(b)) => {
                if arena.subsumes(*a, *b) {
                    Some(ValueType::MetaFrame(*b))
                } else if arena.subsumes(*b, *a) {
                    Some(ValueType::MetaFrame(*a))
                } else {
                    None
                }
            }
            (ValueType::Number(a), ValueType::Number(b)) => a.intersect(b).map(ValueType::Number),
            (ValueType::Text(a), ValueType::Text(b)) => {
                if a.subsumes(b) {
                    Some(ValueType::Text(b.clone()))
                } else if b.subsumes(a) {
                    Some(ValueType::Text(a.clone()))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Whether a concept-level value conforms to this type.
    ///
    /// Text format conformance is checked separately against the registry;
    /// here only the variant is checked for text types.
    pub fn admits(&self, value: &ConceptValue, arena: &FrameArena) -> bool {
        match (self, value) {
            (ValueType::Frame(ty), ConceptValue::Frame(v)) => ty.subsumes(v, arena),
            (ValueType::MetaFrame(root), ConceptValue::Frame(v)) => {
                ConceptFrame::atomic(*root).subsumes(v, arena)
            }
            (ValueType::Number(range), ConceptValue::Number(v)) => range.subsumes(v),
            (ValueType::Text(_), ConceptValue::Text(_)) => true,
            _ => false,
        }
    }

    /// Short description for diagnostics.
    pub fn describe(&self, arena: &FrameArena) -> String {
        match self {
            ValueType::Frame(f) => f.describe(arena),
            ValueType::MetaFrame(f) => format!("meta({})", arena.label_of(*f)),
            ValueType::Number(r) => r.to_string(),
            ValueType::Text(t) => format!("text({t})"),
        }
    }
}
