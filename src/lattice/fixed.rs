//! Concept-level slot values and per-frame fixed default values.
//!
//! Fixed values are stored as an ordered, source-tracked map from slot key
//! to value list. Adding a value absorbs it against existing same-slot
//! values: a new value is dropped if an existing one subsumes it, and it
//! evicts any existing value it subsumes.

use crate::expression::ConceptFrame;
use crate::hierarchy::FrameArena;
use crate::ident::{SlotKey, Source};

use super::number::NumberRange;

/// A concept-level value a slot can be fixed to.
///
/// Frame values may themselves be extensions carrying nested fixed values,
/// so the type is recursive.
#[derive(Debug, Clone)]
pub enum ConceptValue {
    Frame(ConceptFrame),
    Number(NumberRange),
    Text(String),
}

impl ConceptValue {
    /// Value subsumption: frames by concept subsumption, numbers by range
    /// containment, text by exact equality. Variants never cross.
    pub fn subsumes(&self, other: &ConceptValue, arena: &FrameArena) -> bool {
        match (self, other) {
            (ConceptValue::Frame(a), ConceptValue::Frame(b)) => a.subsumes(b, arena),
            (ConceptValue::Number(a), ConceptValue::Number(b)) => a.subsumes(b),
            (ConceptValue::Text(a), ConceptValue::Text(b)) => a == b,
            _ => false,
        }
    }

    /// Structural equality across value variants.
    pub fn matches(&self, other: &ConceptValue, arena: &FrameArena) -> bool {
        match (self, other) {
            (ConceptValue::Frame(a), ConceptValue::Frame(b)) => a.matches(b, arena),
            (ConceptValue::Number(a), ConceptValue::Number(b)) => a == b,
            (ConceptValue::Text(a), ConceptValue::Text(b)) => a == b,
            _ => false,
        }
    }

    /// Short description for diagnostics.
    pub fn describe(&self, arena: &FrameArena) -> String {
        match self {
            ConceptValue::Frame(f) => f.describe(arena),
            ConceptValue::Number(r) => r.to_string(),
            ConceptValue::Text(t) => format!("{t:?}"),
        }
    }
}

/// One slot's fixed values plus the source that contributed them.
#[derive(Debug, Clone)]
pub struct FixedEntry {
    pub key: SlotKey,
    pub source: Source,
    pub values: Vec<ConceptValue>,
}

/// Ordered, source-tracked fixed default slot-values of one frame.
#[derive(Debug, Clone, Default)]
pub struct FixedValues {
    entries: Vec<FixedEntry>,
}

impl FixedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[FixedEntry] {
        &self.entries
    }

    /// Slot keys carrying fixed values, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = SlotKey> + '_ {
        self.entries.iter().map(|e| e.key)
    }

    /// The fixed values for a slot key. Empty if absent.
    pub fn values(&self, key: SlotKey) -> &[ConceptValue] {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.values.as_slice())
            .unwrap_or(&[])
    }

    /// Replace the value list for a key, merging the entry source.
    pub fn set_values(&mut self, key: SlotKey, values: Vec<ConceptValue>, source: Source) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            entry.values = values;
            entry.source = entry.source.merge(source);
        } else {
            self.entries.push(FixedEntry {
                key,
                source,
                values,
            });
        }
    }

    /// Merge a source tag into an existing entry. No-op if absent.
    pub fn merge_entry_source(&mut self, key: SlotKey, source: Source) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            entry.source = entry.source.merge(source);
        }
    }

    /// Absorb a new value into a key's list: dropped when an existing value
    /// subsumes it, evicting existing values it subsumes.
    pub fn absorb(&mut self, key: SlotKey, value: ConceptValue, source: Source, arena: &FrameArena) {
        let existing = self.values(key);
        if existing.iter().any(|e| e.subsumes(&value, arena)) {
            self.merge_entry_source(key, source);
            return;
        }
        let mut kept: Vec<ConceptValue> = existing
            .iter()
            .filter(|e| !value.subsumes(e, arena))
            .cloned()
            .collect();
        kept.push(value);
        self.set_values(key, kept, source);
    }

    /// Drop the entry for a key. No-op if absent.
    pub fn remove(&mut self, key: SlotKey) {
        self.entries.retain(|e| e.key != key);
    }

    /// Whether this value set subsumes another: every entry here must be
    /// covered by a same-key entry there, each of whose values is subsumed
    /// by some value here. Extra entries on `other` are tolerated.
    pub fn subsumes(&self, other: &FixedValues, arena: &FrameArena) -> bool {
        self.entries.iter().all(|entry| {
            let theirs = other.values(entry.key);
            !theirs.is_empty()
                && theirs
                    .iter()
                    .all(|tv| entry.values.iter().any(|sv| sv.subsumes(tv, arena)))
        })
    }

    /// Structural equality: same keys, and mutually matching value lists.
    pub fn matches(&self, other: &FixedValues, arena: &FrameArena) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries.iter().all(|entry| {
            let theirs = other.values(entry.key);
            entry.values.len() == theirs.len()
                && entry
                    .values
                    .iter()
                    .all(|sv| theirs.iter().any(|tv| sv.matches(tv, arena)))
                && theirs
                    .iter()
                    .all(|tv| entry.values.iter().any(|sv| sv.matches(tv, arena)))
        })
    }
}
