//! Values held by instance slots.

use crate::expression::ConceptFrame;
use crate::hierarchy::FrameArena;
use crate::ident::InstanceId;
use crate::lattice::number::NumberRange;

/// A value in an instance slot.
///
/// Frame values reference other instance frames by id; concept values carry
/// concept-level frames (meta-frame slots and abstract assertions).
#[derive(Debug, Clone)]
pub enum InstanceValue {
    Frame(InstanceId),
    Concept(ConceptFrame),
    Number(NumberRange),
    Text(String),
}

impl InstanceValue {
    /// Whether this value is indefinite: a non-exact range or an abstract
    /// concept rather than one definite individual.
    pub fn is_abstract(&self) -> bool {
        match self {
            InstanceValue::Frame(_) => false,
            InstanceValue::Concept(cf) => cf.is_abstract(),
            InstanceValue::Number(range) => !range.is_exact(),
            InstanceValue::Text(_) => false,
        }
    }

    /// The referenced instance, if this is a frame value.
    pub fn as_instance(&self) -> Option<InstanceId> {
        match self {
            InstanceValue::Frame(id) => Some(*id),
            _ => None,
        }
    }

    /// Short description for diagnostics.
    pub fn describe(&self, arena: &FrameArena) -> String {
        match self {
            InstanceValue::Frame(id) => id.to_string(),
            InstanceValue::Concept(cf) => cf.describe(arena),
            InstanceValue::Number(range) => range.to_string(),
            InstanceValue::Text(text) => format!("{text:?}"),
        }
    }
}
