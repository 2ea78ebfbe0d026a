//! The instance graph: frame storage, slot mutation, and the auto-update
//! engine.
//!
//! A graph holds instance frames keyed by id against one shared concept
//! model. Slot mutation is single-threaded by design; the auto-update
//! reentrancy flag assumes single-threaded callers.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::error::{AccessError, InstanceError, KbResult};
use crate::expression::ConceptFrame;
use crate::ident::{FrameId, IdAllocator, InstanceId, SlotKey};
use crate::lattice::fixed::{ConceptValue, FixedValues};
use crate::lattice::slot::Slot;
use crate::lattice::value_type::ValueType;
use crate::model::ConceptModel;
use crate::structural;

use super::frame::{InstanceCategory, InstanceFrame, InstanceFunction};
use super::slot::InstanceSlot;
use super::update::{Reasoner, UpdateOps};
use super::value::InstanceValue;

/// A graph of instance frames over one concept model.
pub struct InstanceGraph {
    model: Arc<ConceptModel>,
    frames: HashMap<InstanceId, InstanceFrame>,
    alloc: IdAllocator,
    reasoner: Option<Arc<dyn Reasoner>>,
    default_ops: UpdateOps,
}

impl InstanceGraph {
    pub fn new(model: Arc<ConceptModel>) -> Self {
        Self {
            model,
            frames: HashMap::new(),
            alloc: IdAllocator::new(),
            reasoner: None,
            default_ops: UpdateOps::ALL,
        }
    }

    pub fn with_reasoner(model: Arc<ConceptModel>, reasoner: Arc<dyn Reasoner>) -> Self {
        let mut graph = Self::new(model);
        graph.reasoner = Some(reasoner);
        graph
    }

    /// The operation kinds auto-update requests per wave.
    pub fn set_default_ops(&mut self, ops: UpdateOps) {
        self.default_ops = ops;
    }

    pub fn model(&self) -> &Arc<ConceptModel> {
        &self.model
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.frames.contains_key(&id)
    }

    pub fn frame(&self, id: InstanceId) -> KbResult<&InstanceFrame> {
        self.frames
            .get(&id)
            .ok_or_else(|| AccessError::NoSuchInstance { id: id.to_string() }.into())
    }

    fn frame_mut(&mut self, id: InstanceId) -> KbResult<&mut InstanceFrame> {
        self.frames
            .get_mut(&id)
            .ok_or_else(|| AccessError::NoSuchInstance { id: id.to_string() }.into())
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Create an assertion frame: one individual of a definite type.
    ///
    /// Disjunction types are rejected; auto-update is armed once initial
    /// instantiation completes.
    pub fn create_assertion(&mut self, frame_type: ConceptFrame) -> KbResult<InstanceId> {
        self.create(frame_type, InstanceFunction::Assertion, false)
    }

    /// Create a query frame describing a sought pattern.
    pub fn create_query(&mut self, frame_type: ConceptFrame) -> KbResult<InstanceId> {
        self.create(frame_type, InstanceFunction::Query, false)
    }

    /// Create a transient frame that never arms auto-update.
    pub fn create_free(
        &mut self,
        frame_type: ConceptFrame,
        function: InstanceFunction,
    ) -> KbResult<InstanceId> {
        self.create(frame_type, function, true)
    }

    /// Create a reference frame standing in for an externally held instance.
    /// Local value edits on it are forbidden.
    pub fn create_reference(
        &mut self,
        frame_type: ConceptFrame,
        function: InstanceFunction,
        external_id: impl Into<String>,
    ) -> KbResult<InstanceId> {
        self.reject_asserted_disjunction(&frame_type, function)?;
        let id = self.instantiate(
            frame_type,
            function,
            InstanceCategory::Reference {
                external_id: external_id.into(),
            },
            false,
        )?;
        self.arm(id)?;
        Ok(id)
    }

    fn create(
        &mut self,
        frame_type: ConceptFrame,
        function: InstanceFunction,
        free: bool,
    ) -> KbResult<InstanceId> {
        self.reject_asserted_disjunction(&frame_type, function)?;
        let category = match &frame_type {
            ConceptFrame::Disjunction(_) => InstanceCategory::Disjunction,
            _ => InstanceCategory::Atomic,
        };
        let id = self.instantiate(frame_type, function, category, free)?;
        if !free {
            self.arm(id)?;
        }
        Ok(id)
    }

    /// An assertion-function frame may never carry a disjunction type.
    fn reject_asserted_disjunction(
        &self,
        frame_type: &ConceptFrame,
        function: InstanceFunction,
    ) -> KbResult<()> {
        if matches!(frame_type, ConceptFrame::Disjunction(_))
            && function == InstanceFunction::Assertion
        {
            return Err(InstanceError::DisjunctionTypeOnAssertion {
                frame_type: frame_type.describe(self.model.arena()),
            }
            .into());
        }
        Ok(())
    }

    /// Arm auto-update and run the initial wave.
    fn arm(&mut self, id: InstanceId) -> KbResult<()> {
        self.frame_mut(id)?.auto_update = true;
        self.values_changed(id)
    }

    fn instantiate(
        &mut self,
        frame_type: ConceptFrame,
        function: InstanceFunction,
        category: InstanceCategory,
        free: bool,
    ) -> KbResult<InstanceId> {
        let id = self.alloc.next_instance()?;
        let frame = InstanceFrame::new(id, category, function, frame_type.clone(), free);
        self.frames.insert(id, frame);

        // Slot set and fixed values come from the type's slot frames.
        let bases = self.slot_frames(&frame_type);
        let mut specs: Vec<Slot> = Vec::new();
        let mut fixed = FixedValues::new();
        for base in bases {
            for slot in self.model.effective_slots(base) {
                if !specs.iter().any(|s| s.key() == slot.key()) {
                    specs.push(slot);
                }
            }
            let inherited = self.model.effective_fixed(base)?;
            for entry in inherited.entries() {
                for value in &entry.values {
                    fixed.absorb(entry.key, value.clone(), entry.source, self.model.arena());
                }
            }
        }
        if let ConceptFrame::Extension(ext) = &frame_type {
            for entry in ext.fixed().entries() {
                for value in &entry.values {
                    fixed.absorb(entry.key, value.clone(), entry.source, self.model.arena());
                }
            }
        }

        let mut slots: Vec<InstanceSlot> = specs.into_iter().map(InstanceSlot::new).collect();
        for slot in &mut slots {
            let concept_values = fixed.values(slot.key()).to_vec();
            if concept_values.is_empty() {
                continue;
            }
            let mut values = Vec::with_capacity(concept_values.len());
            for cv in concept_values {
                values.push(self.lower_fixed_value(slot.spec(), cv, function)?);
            }
            let order = value_order(self);
            slot.replace_fixed(values, &order);
        }

        let mut referenced: Vec<(InstanceId, SlotKey)> = Vec::new();
        for slot in &slots {
            for value in slot.current() {
                if let Some(target) = value.as_instance() {
                    referenced.push((target, slot.key()));
                }
            }
        }
        self.frame_mut(id)?.slots = slots;
        for (target, key) in referenced {
            self.frame_mut(target)?.add_back_reference(id, key);
        }
        tracing::debug!(instance = %id, "instantiated frame");
        Ok(id)
    }

    /// The atomic frames contributing slots to a concept type.
    fn slot_frames(&self, frame_type: &ConceptFrame) -> Vec<FrameId> {
        match frame_type {
            ConceptFrame::Atomic(id) => vec![*id],
            ConceptFrame::Extension(e) => vec![e.base()],
            ConceptFrame::Disjunction(d) => d.supers().to_vec(),
        }
    }

    /// Lower a concept-level fixed value to an instance value. Frame values
    /// on frame-typed slots become transient nested instances.
    fn lower_fixed_value(
        &mut self,
        spec: &Slot,
        value: ConceptValue,
        function: InstanceFunction,
    ) -> KbResult<InstanceValue> {
        Ok(match value {
            ConceptValue::Number(range) => InstanceValue::Number(range),
            ConceptValue::Text(text) => InstanceValue::Text(text),
            ConceptValue::Frame(cf) => match spec.value_type() {
                ValueType::MetaFrame(_) => InstanceValue::Concept(cf),
                _ => {
                    let nested = self.create_free(cf, function)?;
                    InstanceValue::Frame(nested)
                }
            },
        })
    }

    /// Remove a frame, detaching the back-references it contributed.
    pub fn remove(&mut self, id: InstanceId) -> KbResult<()> {
        let Some(frame) = self.frames.remove(&id) else {
            return Ok(());
        };
        for slot in frame.slots() {
            for value in slot.current() {
                if let Some(target) = value.as_instance() {
                    if let Some(t) = self.frames.get_mut(&target) {
                        t.remove_back_reference(id, slot.key());
                    }
                }
            }
        }
        for frame in self.frames.values_mut() {
            frame.referencing.retain(|(from, _)| *from != id);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Slot mutation
    // -----------------------------------------------------------------------

    /// Replace the asserted values of a slot.
    pub fn set_asserted(
        &mut self,
        id: InstanceId,
        key: SlotKey,
        values: Vec<InstanceValue>,
    ) -> KbResult<()> {
        self.mutate_slot(id, key, values, MutationKind::ReplaceAsserted)
    }

    /// Add one asserted value under the slot's cardinality conflict rule.
    pub fn add_asserted(
        &mut self,
        id: InstanceId,
        key: SlotKey,
        value: InstanceValue,
    ) -> KbResult<()> {
        self.mutate_slot(id, key, vec![value], MutationKind::AddAsserted)
    }

    /// Drop all asserted values of a slot.
    pub fn clear_asserted(&mut self, id: InstanceId, key: SlotKey) -> KbResult<()> {
        self.mutate_slot(id, key, Vec::new(), MutationKind::ClearAsserted)
    }

    /// Replace the fixed values of a slot, re-validating and re-merging.
    pub fn set_fixed(
        &mut self,
        id: InstanceId,
        key: SlotKey,
        values: Vec<InstanceValue>,
    ) -> KbResult<()> {
        self.mutate_slot(id, key, values, MutationKind::ReplaceFixed)
    }

    fn mutate_slot(
        &mut self,
        id: InstanceId,
        key: SlotKey,
        values: Vec<InstanceValue>,
        kind: MutationKind,
    ) -> KbResult<()> {
        let holder = self.frame(id)?;
        let slot_name = self.slot_name(key);
        if holder.is_reference() {
            return Err(InstanceError::ReadOnlySlot { slot: slot_name }.into());
        }
        let mut slot = holder
            .slot(key)
            .cloned()
            .ok_or_else(|| AccessError::NoSuchSlot {
                slot: slot_name.clone(),
                frame: holder.frame_type().describe(self.model.arena()),
            })?;

        for value in &values {
            self.validate_value(holder, slot.spec(), value)?;
            // Abstract values are assertable only where the declaration
            // allows it; fixed values may always be indefinite.
            if kind != MutationKind::ReplaceFixed
                && value.is_abstract()
                && holder.function() == InstanceFunction::Assertion
                && !slot.spec().allows_abstract()
            {
                return Err(InstanceError::AbstractValueNotAssertable {
                    slot: slot.spec().identity().name.clone(),
                }
                .into());
            }
        }
        if kind == MutationKind::ReplaceFixed {
            if let Some(cap) = slot.spec().cardinality().max_asserted() {
                if values.len() > cap {
                    return Err(InstanceError::TooManyFixedValues {
                        slot: slot_name,
                        count: values.len(),
                    }
                    .into());
                }
            }
        }

        let before: Vec<InstanceId> =
            slot.current().iter().filter_map(|v| v.as_instance()).collect();
        {
            let order = value_order(self);
            match kind {
                MutationKind::ReplaceAsserted => slot.replace_asserted(values, &order),
                MutationKind::AddAsserted => {
                    for value in values {
                        slot.add_asserted(value, &order);
                    }
                }
                MutationKind::ClearAsserted => slot.clear_asserted(&order),
                MutationKind::ReplaceFixed => slot.replace_fixed(values, &order),
            }
        }
        let after: Vec<InstanceId> =
            slot.current().iter().filter_map(|v| v.as_instance()).collect();

        if let Some(stored) = self.frame_mut(id)?.slot_mut(key) {
            *stored = slot;
        }
        for gone in before.iter().filter(|b| !after.contains(b)) {
            if let Some(target) = self.frames.get_mut(gone) {
                target.remove_back_reference(id, key);
            }
        }
        for new in after.iter().filter(|a| !before.contains(a)) {
            self.frame_mut(*new)?.add_back_reference(id, key);
        }

        self.values_changed(id)
    }

    fn slot_name(&self, key: SlotKey) -> String {
        self.model
            .slot_identity(key)
            .map(|i| i.name)
            .unwrap_or_else(|| key.to_string())
    }

    /// Check a value against a slot declaration and the reference rules.
    fn validate_value(
        &self,
        holder: &InstanceFrame,
        spec: &Slot,
        value: &InstanceValue,
    ) -> KbResult<()> {
        let arena = self.model.arena();
        let mismatch = || {
            InstanceError::ValueTypeMismatch {
                slot: spec.identity().name.clone(),
                expected: spec.value_type().describe(arena),
                value: value.describe(arena),
            }
            .into()
        };
        match (spec.value_type(), value) {
            (ValueType::Frame(ty), InstanceValue::Frame(target_id)) => {
                let target = self.frame(*target_id)?;
                if target.function() != holder.function() {
                    return Err(InstanceError::CrossFunctionReference {
                        from: holder.frame_type().describe(arena),
                        to: target.frame_type().describe(arena),
                    }
                    .into());
                }
                if !ty.subsumes(target.frame_type(), arena) {
                    return Err(mismatch());
                }
            }
            (ValueType::Frame(ty), InstanceValue::Concept(cf)) => {
                if !ty.subsumes(cf, arena) {
                    return Err(mismatch());
                }
            }
            (ValueType::MetaFrame(root), InstanceValue::Concept(cf)) => {
                if !ConceptFrame::atomic(*root).subsumes(cf, arena) {
                    return Err(mismatch());
                }
            }
            (ValueType::Number(range), InstanceValue::Number(v)) => {
                if !range.subsumes(v) {
                    return Err(mismatch());
                }
            }
            (ValueType::Text(format), InstanceValue::Text(text)) => {
                self.model.text_formats().validate(format, text)?;
            }
            _ => return Err(mismatch()),
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------------

    /// Replace the reasoner-inferred types. Reasoner-facing.
    pub fn set_inferred_types(&mut self, id: InstanceId, types: Vec<FrameId>) -> KbResult<()> {
        self.frame_mut(id)?.inferred_types = types;
        Ok(())
    }

    /// Replace the reasoner-suggested types. Reasoner-facing.
    pub fn set_suggested_types(&mut self, id: InstanceId, types: Vec<FrameId>) -> KbResult<()> {
        self.frame_mut(id)?.suggested_types = types;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Auto-update
    // -----------------------------------------------------------------------

    /// Arm or disarm auto-update for one frame.
    pub fn set_auto_update(&mut self, id: InstanceId, enabled: bool) -> KbResult<()> {
        self.frame_mut(id)?.auto_update = enabled;
        Ok(())
    }

    /// React to a current-value change: update this frame, then propagate to
    /// every frame referencing it, each at most once per wave.
    fn values_changed(&mut self, id: InstanceId) -> KbResult<()> {
        let frame = self.frame(id)?;
        if !frame.auto_update || frame.updating || self.reasoner.is_none() {
            return Ok(());
        }
        let ops = self.default_ops;
        let mut visited: HashSet<InstanceId> = HashSet::new();
        let mut queue: VecDeque<InstanceId> = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            if !visited.insert(next) {
                continue;
            }
            self.update_frame(next, ops)?;
            if let Ok(frame) = self.frame(next) {
                queue.extend(frame.referencing().iter().map(|(from, _)| *from));
            }
        }
        Ok(())
    }

    /// Run the convergence loop on one frame regardless of its auto-update
    /// flag. Re-entrant calls on a mid-update frame are no-ops.
    pub fn force_update(&mut self, id: InstanceId, ops: UpdateOps) -> KbResult<()> {
        self.update_frame(id, ops)
    }

    fn update_frame(&mut self, id: InstanceId, ops: UpdateOps) -> KbResult<()> {
        let Some(reasoner) = self.reasoner.clone() else {
            return Ok(());
        };
        {
            let frame = self.frame_mut(id)?;
            if frame.updating {
                return Ok(());
            }
            frame.updating = true;
        }
        // Invoke until the reasoner reports a no-op fixed point.
        let outcome = loop {
            match reasoner.update(self, id, ops) {
                Ok(changed) if changed.any() => continue,
                Ok(_) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        if let Some(frame) = self.frames.get_mut(&id) {
            frame.updating = false;
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Copying
    // -----------------------------------------------------------------------

    /// Deep-copy a frame and everything it references, preserving shared
    /// structure and cycles. Auto-update stays disarmed while copying and is
    /// re-armed to match the originals afterwards.
    pub fn copy(&mut self, id: InstanceId) -> KbResult<InstanceId> {
        let mut memo: HashMap<InstanceId, InstanceId> = HashMap::new();
        let copied = self.copy_inner(id, &mut memo)?;
        for (original, duplicate) in &memo {
            let armed = self.frame(*original)?.auto_update();
            self.frame_mut(*duplicate)?.auto_update = armed;
        }
        Ok(copied)
    }

    fn copy_inner(
        &mut self,
        id: InstanceId,
        memo: &mut HashMap<InstanceId, InstanceId>,
    ) -> KbResult<InstanceId> {
        if let Some(done) = memo.get(&id) {
            return Ok(*done);
        }
        let original = self.frame(id)?.clone();
        let new_id = self.alloc.next_instance()?;
        memo.insert(id, new_id);

        let mut duplicate = InstanceFrame::new(
            new_id,
            original.category().clone(),
            original.function(),
            original.frame_type().clone(),
            original.is_free(),
        );
        duplicate.inferred_types = original.inferred_types().to_vec();
        duplicate.suggested_types = original.suggested_types().to_vec();
        self.frames.insert(new_id, duplicate);

        let mut slots: Vec<InstanceSlot> = Vec::with_capacity(original.slots().len());
        for slot in original.slots() {
            let mut clone = slot.clone();
            self.rewrite_values(&mut clone, new_id, memo)?;
            slots.push(clone);
        }
        let mut referenced: Vec<(InstanceId, SlotKey)> = Vec::new();
        for slot in &slots {
            for value in slot.current() {
                if let Some(target) = value.as_instance() {
                    referenced.push((target, slot.key()));
                }
            }
        }
        self.frame_mut(new_id)?.slots = slots;
        for (target, key) in referenced {
            self.frame_mut(target)?.add_back_reference(new_id, key);
        }
        Ok(new_id)
    }

    fn rewrite_values(
        &mut self,
        slot: &mut InstanceSlot,
        _owner: InstanceId,
        memo: &mut HashMap<InstanceId, InstanceId>,
    ) -> KbResult<()> {
        let rewrite = |graph: &mut Self,
                       values: &[InstanceValue],
                       memo: &mut HashMap<InstanceId, InstanceId>|
         -> KbResult<Vec<InstanceValue>> {
            let mut out = Vec::with_capacity(values.len());
            for value in values {
                out.push(match value {
                    InstanceValue::Frame(target) => {
                        InstanceValue::Frame(graph.copy_inner(*target, memo)?)
                    }
                    other => other.clone(),
                });
            }
            Ok(out)
        };
        let fixed = rewrite(self, slot.fixed(), memo)?;
        let asserted = rewrite(self, slot.asserted(), memo)?;
        let current = rewrite(self, slot.current(), memo)?;
        slot.overwrite_value_sets(fixed, asserted, current);
        Ok(())
    }

    /// Structural value subsumption, used by slot merging.
    pub(crate) fn value_subsumes(&self, a: &InstanceValue, b: &InstanceValue) -> bool {
        let arena = self.model.arena();
        match (a, b) {
            (InstanceValue::Frame(x), InstanceValue::Frame(y)) => {
                structural::subsumes(self, *x, *y)
            }
            (InstanceValue::Concept(cf), InstanceValue::Frame(y)) => self
                .frame(*y)
                .map(|f| cf.subsumes(f.frame_type(), arena))
                .unwrap_or(false),
            (InstanceValue::Concept(x), InstanceValue::Concept(y)) => x.subsumes(y, arena),
            (InstanceValue::Number(x), InstanceValue::Number(y)) => x.subsumes(y),
            (InstanceValue::Text(x), InstanceValue::Text(y)) => x == y,
            _ => false,
        }
    }
}

fn value_order(graph: &InstanceGraph) -> impl Fn(&InstanceValue, &InstanceValue) -> bool + '_ {
    move |a, b| graph.value_subsumes(a, b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MutationKind {
    ReplaceAsserted,
    AddAsserted,
    ClearAsserted,
    ReplaceFixed,
}

impl std::fmt::Debug for InstanceGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceGraph")
            .field("frames", &self.frames.len())
            .field("reasoner", &self.reasoner.is_some())
            .finish()
    }
}
