//! Slot declarations: identity, cardinality, value type, provenance.

use crate::annotation::Annotations;
use crate::ident::{Identity, SlotKey, Source};

use super::value_type::ValueType;

/// How many values a slot admits and how new values conflict with old ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// At most one value; a newcomer always evicts the incumbent.
    SingleValue,
    /// Many values, but no two whose types subsume each other.
    UniqueTypes,
    /// Many values, never conflicting.
    Repeatable,
}

impl Cardinality {
    /// Maximum asserted-value count, if capped.
    pub fn max_asserted(&self) -> Option<usize> {
        match self {
            Cardinality::SingleValue => Some(1),
            _ => None,
        }
    }

    /// The conflict rule: given the subsumption relation between an
    /// incumbent value and a newcomer, does the newcomer evict it?
    pub fn conflicts(&self, incumbent_subsumes: bool, newcomer_subsumes: bool) -> bool {
        match self {
            Cardinality::SingleValue => true,
            Cardinality::UniqueTypes => incumbent_subsumes || newcomer_subsumes,
            Cardinality::Repeatable => false,
        }
    }
}

/// A typed value position declared on an atomic frame.
#[derive(Debug, Clone)]
pub struct Slot {
    key: SlotKey,
    identity: Identity,
    cardinality: Cardinality,
    value_type: ValueType,
    source: Source,
    /// Whether abstract (indefinite) values may be asserted on instances.
    assertable_on_abstract: bool,
    annotations: Annotations,
}

impl Slot {
    pub fn new(
        key: SlotKey,
        identity: Identity,
        cardinality: Cardinality,
        value_type: ValueType,
        source: Source,
    ) -> Self {
        Self {
            key,
            identity,
            cardinality,
            value_type,
            source,
            assertable_on_abstract: false,
            annotations: Annotations::new(),
        }
    }

    /// Allow asserting abstract values (ranges, abstract extensions) on
    /// instance slots of this declaration.
    pub fn assertable_on_abstract(mut self, allowed: bool) -> Self {
        self.assertable_on_abstract = allowed;
        self
    }

    pub fn key(&self) -> SlotKey {
        self.key
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn allows_abstract(&self) -> bool {
        self.assertable_on_abstract
    }

    /// Opaque key → value-list metadata on this declaration.
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub(crate) fn annotate(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.annotations.add(key, value);
    }

    /// The same slot with a replaced source tag.
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }
}
