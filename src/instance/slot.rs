//! Instance slots: fixed vs. asserted value sets and their merge.

use crate::ident::SlotKey;
use crate::lattice::slot::{Cardinality, Slot};

use super::value::InstanceValue;

/// Relates two instance values for merge purposes.
///
/// Passed in by the graph, since frame-valued entries need cycle-safe
/// structural subsumption over the whole instance graph.
pub(crate) type ValueOrder<'a> = &'a dyn Fn(&InstanceValue, &InstanceValue) -> bool;

/// One slot on an instance frame.
///
/// Holds two logically distinct value sets: *fixed* (derived from the model,
/// not client-editable) and *asserted* (client-editable). Their union, after
/// cardinality-conflict and redundancy filtering, is the current value list.
#[derive(Debug, Clone)]
pub struct InstanceSlot {
    spec: Slot,
    fixed: Vec<InstanceValue>,
    asserted: Vec<InstanceValue>,
    current: Vec<InstanceValue>,
}

impl InstanceSlot {
    pub(crate) fn new(spec: Slot) -> Self {
        Self {
            spec,
            fixed: Vec::new(),
            asserted: Vec::new(),
            current: Vec::new(),
        }
    }

    /// The slot declaration this instance slot follows.
    pub fn spec(&self) -> &Slot {
        &self.spec
    }

    pub fn key(&self) -> SlotKey {
        self.spec.key()
    }

    /// Model-derived values, not client-editable.
    pub fn fixed(&self) -> &[InstanceValue] {
        &self.fixed
    }

    /// Client-asserted values.
    pub fn asserted(&self) -> &[InstanceValue] {
        &self.asserted
    }

    /// The merged value list.
    pub fn current(&self) -> &[InstanceValue] {
        &self.current
    }

    pub fn has_values(&self) -> bool {
        !self.current.is_empty()
    }

    pub(crate) fn replace_fixed(&mut self, values: Vec<InstanceValue>, subsumes: ValueOrder<'_>) {
        self.fixed = values;
        self.remerge(subsumes);
    }

    pub(crate) fn replace_asserted(
        &mut self,
        values: Vec<InstanceValue>,
        subsumes: ValueOrder<'_>,
    ) {
        self.asserted.clear();
        for value in values {
            self.insert_asserted(value, subsumes);
        }
        self.remerge(subsumes);
    }

    pub(crate) fn add_asserted(&mut self, value: InstanceValue, subsumes: ValueOrder<'_>) {
        self.insert_asserted(value, subsumes);
        self.remerge(subsumes);
    }

    pub(crate) fn clear_asserted(&mut self, subsumes: ValueOrder<'_>) {
        self.asserted.clear();
        self.remerge(subsumes);
    }

    /// Insert under the cardinality conflict rule: conflicting incumbents
    /// are evicted before the newcomer lands.
    fn insert_asserted(&mut self, value: InstanceValue, subsumes: ValueOrder<'_>) {
        let cardinality = self.spec.cardinality();
        self.asserted.retain(|incumbent| {
            !cardinality.conflicts(subsumes(incumbent, &value), subsumes(&value, incumbent))
        });
        self.asserted.push(value);
        if let Some(cap) = cardinality.max_asserted() {
            while self.asserted.len() > cap {
                self.asserted.remove(0);
            }
        }
    }

    /// Install already-merged value sets. Used by deep copy, where values
    /// are rewritten one-to-one and the merge result is unchanged.
    pub(crate) fn overwrite_value_sets(
        &mut self,
        fixed: Vec<InstanceValue>,
        asserted: Vec<InstanceValue>,
        current: Vec<InstanceValue>,
    ) {
        self.fixed = fixed;
        self.asserted = asserted;
        self.current = current;
    }

    /// Recompute the current list from asserted and fixed values.
    ///
    /// Asserted values subsumed by a fixed value are suppressed, as is every
    /// asserted value on a single-valued slot that carries any fixed value.
    /// Fixed values not subsumed by a surviving asserted value are appended.
    fn remerge(&mut self, subsumes: ValueOrder<'_>) {
        let single = self.spec.cardinality() == Cardinality::SingleValue;
        let mut kept: Vec<InstanceValue> = self
            .asserted
            .iter()
            .filter(|a| {
                if single && !self.fixed.is_empty() {
                    return false;
                }
                !self.fixed.iter().any(|f| subsumes(f, a))
            })
            .cloned()
            .collect();
        for fixed in &self.fixed {
            if !kept.iter().any(|a| subsumes(a, fixed)) {
                kept.push(fixed.clone());
            }
        }
        self.current = kept;
    }
}
