//! The concept model: arena, slot-key registry, expression construction,
//! and the build lifecycle.
//!
//! A model is built single-threaded through section builders, normalised and
//! validated once, then shared read-mostly. Dynamic value-type synthesis is
//! the only mutation path that stays open after build.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

use crate::annotation::Annotations;
use crate::error::{KbResult, ModelError};
use crate::events::{ListenerSet, ListenerToken, ModelEvent, ModelListener};
use crate::expression::{ConceptFrame, Disjunction, Extension};
use crate::hierarchy::{FrameArena, normalise};
use crate::ident::{
    FrameId, IdAllocator, Identity, SlotKey, Source, Visibility, VisibilityFilter,
};
use crate::lattice::fixed::{ConceptValue, FixedValues};
use crate::lattice::slot::Slot;
use crate::lattice::text::TextFormatRegistry;
use crate::lattice::value_type::ValueType;
use crate::synthesis::FrameSynthesizer;

/// Interned slot identities: one key per unique slot name.
#[derive(Debug, Default)]
struct SlotKeyRegistry {
    names: DashMap<String, SlotKey>,
    identities: DashMap<SlotKey, Identity>,
    alloc: IdAllocator,
}

impl SlotKeyRegistry {
    fn intern(&self, identity: Identity) -> KbResult<SlotKey> {
        if let Some(existing) = self.names.get(&identity.name) {
            return Ok(*existing.value());
        }
        let key = self.alloc.next_slot_key()?;
        self.names.insert(identity.name.clone(), key);
        self.identities.insert(key, identity);
        Ok(key)
    }

    fn resolve(&self, name: &str) -> Option<SlotKey> {
        self.names.get(name).map(|e| *e.value())
    }

    fn identity(&self, key: SlotKey) -> Option<Identity> {
        self.identities.get(&key).map(|e| e.value().clone())
    }
}

/// Summary counters for diagnostics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub frames: usize,
    pub slot_keys: usize,
    pub synthetic_frames: usize,
    pub cache_entries: usize,
    pub built: bool,
}

/// A knowledge model: the frame hierarchy plus everything needed to build,
/// query, and extend it.
pub struct ConceptModel {
    arena: FrameArena,
    slot_keys: SlotKeyRegistry,
    serials: AtomicU64,
    annotations: Mutex<Annotations>,
    listeners: ListenerSet,
    synthesizer: FrameSynthesizer,
    text_formats: TextFormatRegistry,
    built: AtomicBool,
    pending_extensions: Mutex<Vec<Arc<Extension>>>,
}

impl ConceptModel {
    pub fn new() -> KbResult<Self> {
        Ok(Self {
            arena: FrameArena::new()?,
            slot_keys: SlotKeyRegistry::default(),
            serials: AtomicU64::new(1),
            annotations: Mutex::new(Annotations::new()),
            listeners: ListenerSet::new(),
            synthesizer: FrameSynthesizer::new(),
            text_formats: TextFormatRegistry::new(),
            built: AtomicBool::new(false),
            pending_extensions: Mutex::new(Vec::new()),
        })
    }

    /// The frame hierarchy.
    pub fn arena(&self) -> &FrameArena {
        &self.arena
    }

    /// Named text-format validators owned by this model.
    pub fn text_formats(&self) -> &TextFormatRegistry {
        &self.text_formats
    }

    /// Whether the build phase has completed.
    pub fn is_built(&self) -> bool {
        self.built.load(Ordering::Acquire)
    }

    fn ensure_mutable(&self) -> KbResult<()> {
        if self.is_built() {
            Err(ModelError::ModelFrozen.into())
        } else {
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Listeners and annotations
    // -----------------------------------------------------------------------

    pub fn register_listener(&self, listener: Arc<dyn ModelListener>) -> ListenerToken {
        self.listeners.register(listener)
    }

    pub fn unregister_listener(&self, token: ListenerToken) {
        self.listeners.unregister(token);
    }

    /// Attach a model-level annotation.
    pub fn annotate(&self, key: impl Into<String>, value: serde_json::Value) {
        self.annotations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add(key, value);
    }

    /// Model-level annotations, cloned.
    pub fn annotations(&self) -> Annotations {
        self.annotations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // -----------------------------------------------------------------------
    // Slot keys
    // -----------------------------------------------------------------------

    /// Intern a slot identity, returning the stable key for its name.
    pub fn intern_slot_key(&self, identity: Identity) -> KbResult<SlotKey> {
        self.slot_keys.intern(identity)
    }

    /// The key for a slot name, if interned.
    pub fn resolve_slot_key(&self, name: &str) -> Option<SlotKey> {
        self.slot_keys.resolve(name)
    }

    /// The identity behind a slot key.
    pub fn slot_identity(&self, key: SlotKey) -> Option<Identity> {
        self.slot_keys.identity(key)
    }

    // -----------------------------------------------------------------------
    // Effective structure
    // -----------------------------------------------------------------------

    /// The slots effective on a frame: its own declarations plus inherited
    /// ones, nearest declaration winning per key.
    pub fn effective_slots(&self, frame: FrameId) -> Vec<Slot> {
        let mut slots = self.arena.direct_slots(frame);
        for ancestor in self.arena.ancestors(frame, VisibilityFilter::All).iter() {
            for slot in self.arena.direct_slots(ancestor) {
                if !slots.iter().any(|s| s.key() == slot.key()) {
                    slots.push(slot);
                }
            }
        }
        slots
    }

    /// The effective slot on a frame with the given key, if any.
    pub fn effective_slot(&self, frame: FrameId, key: SlotKey) -> Option<Slot> {
        self.effective_slots(frame)
            .into_iter()
            .find(|s| s.key() == key)
    }

    /// Fixed values effective on a frame: own and inherited entries merged
    /// under the usual absorption rule.
    pub fn effective_fixed(&self, frame: FrameId) -> KbResult<FixedValues> {
        let mut merged = self.arena.with_frame(frame, |f| f.fixed_values().clone())?;
        for ancestor in self.arena.ancestors(frame, VisibilityFilter::All).iter() {
            let inherited = self
                .arena
                .with_frame(ancestor, |f| f.fixed_values().clone())?;
            for entry in inherited.entries() {
                for value in &entry.values {
                    merged.absorb(entry.key, value.clone(), entry.source, &self.arena);
                }
            }
        }
        Ok(merged)
    }

    // -----------------------------------------------------------------------
    // Expression construction
    // -----------------------------------------------------------------------

    /// Resolve a candidate set into a canonical disjunction or atomic frame.
    pub fn disjoin(&self, candidates: &[ConceptFrame]) -> KbResult<ConceptFrame> {
        Disjunction::resolve(candidates, &self.arena)
    }

    /// Create an abstract extension of `base` with the given fixed values.
    ///
    /// An empty fixed set returns the base unchanged. Before build
    /// completion the fixed values are validated lazily, once the hierarchy
    /// is normalised; afterwards validation happens immediately.
    pub fn extend(&self, base: FrameId, fixed: FixedValues) -> KbResult<ConceptFrame> {
        self.extend_inner(base, fixed, false)
    }

    /// Create a concrete extension: an individual, equal only to itself.
    pub fn extend_concrete(&self, base: FrameId, fixed: FixedValues) -> KbResult<ConceptFrame> {
        self.extend_inner(base, fixed, true)
    }

    fn extend_inner(
        &self,
        base: FrameId,
        fixed: FixedValues,
        concrete: bool,
    ) -> KbResult<ConceptFrame> {
        if fixed.is_empty() && !concrete {
            return Ok(ConceptFrame::Atomic(base));
        }
        let serial = self.serials.fetch_add(1, Ordering::Relaxed);
        let extension = Arc::new(Extension::new(serial, base, fixed, concrete));
        if self.is_built() {
            self.validate_extension(&extension)?;
        } else {
            self.pending_extensions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Arc::clone(&extension));
        }
        Ok(ConceptFrame::Extension(extension))
    }

    /// The hidden synthetic frame for "subtype of `sup` restricted to
    /// `subs`". Open after build; invalidates and lazily rebuilds closures.
    pub fn synthesize(&self, sup: FrameId, subs: &[FrameId]) -> KbResult<FrameId> {
        self.synthesizer.get_or_create(&self.arena, sup, subs)
    }

    // -----------------------------------------------------------------------
    // Build lifecycle
    // -----------------------------------------------------------------------

    /// Run the build phase: sections in sequence, then normalisation,
    /// validation, and cache precomputation. The model is frozen afterwards.
    pub fn build(&self, sections: &[&dyn SectionBuilder]) -> KbResult<()> {
        self.ensure_mutable()?;
        let builder = ModelBuilder { model: self };
        for section in sections {
            tracing::debug!(section = section.name(), "running section builder");
            section.build(&builder)?;
        }
        self.complete_build()
    }

    /// Re-run the build phase on an already-built model.
    ///
    /// Every section must support incremental builds; the model is unfrozen
    /// for the duration and refrozen on completion.
    pub fn rebuild(&self, sections: &[&dyn SectionBuilder]) -> KbResult<()> {
        for section in sections {
            if !section.supports_incremental() {
                return Err(ModelError::ModelFrozen.into());
            }
        }
        self.reopen();
        let builder = ModelBuilder { model: self };
        for section in sections {
            tracing::debug!(section = section.name(), "running incremental section");
            section.build(&builder)?;
        }
        self.complete_build()
    }

    /// Unfreeze the model for further build-phase mutation. Drops every
    /// memoized closure; they rebuild on the next completed build.
    pub fn reopen(&self) {
        self.built.store(false, Ordering::Release);
        self.arena.invalidate_cache();
    }

    fn complete_build(&self) -> KbResult<()> {
        let report = normalise(&self.arena)?;
        self.validate_slot_types()?;
        self.validate_frame_fixed_values()?;

        let pending: Vec<Arc<Extension>> = std::mem::take(
            &mut *self
                .pending_extensions
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for extension in &pending {
            self.validate_extension(extension)?;
        }

        self.arena.optimize();
        self.built.store(true, Ordering::Release);
        self.listeners.notify(&ModelEvent::BuildComplete);
        tracing::info!(
            frames = self.arena.len(),
            edge_changes = report.changes(),
            extensions = pending.len(),
            "model build complete"
        );
        Ok(())
    }

    /// Every slot must be type-consistent with same-key slots on ancestors:
    /// the ancestor's value type must subsume the descendant's.
    fn validate_slot_types(&self) -> KbResult<()> {
        for frame in self.arena.frame_ids() {
            for slot in self.arena.direct_slots(frame) {
                for ancestor in self.arena.ancestors(frame, VisibilityFilter::All).iter() {
                    let Some(above) = self
                        .arena
                        .direct_slots(ancestor)
                        .into_iter()
                        .find(|s| s.key() == slot.key())
                    else {
                        continue;
                    };
                    if !above.value_type().subsumes(slot.value_type(), &self.arena) {
                        return Err(ModelError::SlotTypeConflict {
                            slot: slot.identity().name.clone(),
                            frame: self.arena.label_of(frame),
                            ancestor: self.arena.label_of(ancestor),
                        }
                        .into());
                    }
                }
            }
        }
        Ok(())
    }

    /// Fixed values declared on frames must fit the effective slot they
    /// target.
    fn validate_frame_fixed_values(&self) -> KbResult<()> {
        for frame in self.arena.frame_ids() {
            let fixed = self.arena.with_frame(frame, |f| f.fixed_values().clone())?;
            for entry in fixed.entries() {
                self.validate_fixed_entry(frame, entry.key, &entry.values)?;
            }
        }
        Ok(())
    }

    fn validate_extension(&self, extension: &Extension) -> KbResult<()> {
        for entry in extension.fixed().entries() {
            self.validate_fixed_entry(extension.base(), entry.key, &entry.values)?;
        }
        Ok(())
    }

    fn validate_fixed_entry(
        &self,
        frame: FrameId,
        key: SlotKey,
        values: &[ConceptValue],
    ) -> KbResult<()> {
        let slot_name = || {
            self.slot_identity(key)
                .map(|i| i.name)
                .unwrap_or_else(|| key.to_string())
        };
        let Some(slot) = self.effective_slot(frame, key) else {
            return Err(ModelError::InvalidFixedValue {
                slot: slot_name(),
                frame: self.arena.label_of(frame),
            }
            .into());
        };
        if slot
            .cardinality()
            .max_asserted()
            .is_some_and(|cap| values.len() > cap)
        {
            return Err(ModelError::InvalidFixedValue {
                slot: slot_name(),
                frame: self.arena.label_of(frame),
            }
            .into());
        }
        for value in values {
            if !slot.value_type().admits(value, &self.arena) {
                return Err(ModelError::InvalidFixedValue {
                    slot: slot_name(),
                    frame: self.arena.label_of(frame),
                }
                .into());
            }
            if let (ValueType::Text(format), ConceptValue::Text(text)) =
                (slot.value_type(), value)
            {
                self.text_formats.validate(format, text)?;
            }
        }
        Ok(())
    }

    /// Summary counters.
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            frames: self.arena.len(),
            slot_keys: self.slot_keys.names.len(),
            synthetic_frames: self.synthesizer.len(),
            cache_entries: self.arena.cache_len(),
            built: self.is_built(),
        }
    }
}

impl std::fmt::Debug for ConceptModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let info = self.info();
        f.debug_struct("ConceptModel")
            .field("frames", &info.frames)
            .field("slot_keys", &info.slot_keys)
            .field("built", &info.built)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Build-phase capabilities
// ---------------------------------------------------------------------------

/// Mutation capability handed to section builders during the build phase.
pub struct ModelBuilder<'m> {
    model: &'m ConceptModel,
}

impl<'m> ModelBuilder<'m> {
    pub fn model(&self) -> &'m ConceptModel {
        self.model
    }

    /// Add a named frame. Fires a `FrameAdded` event.
    pub fn add_frame(
        &self,
        identity: Identity,
        visibility: Visibility,
        source: Source,
    ) -> KbResult<FrameId> {
        self.model.ensure_mutable()?;
        let id = self.model.arena.add_frame(identity, visibility, source)?;
        self.model.listeners.notify(&ModelEvent::FrameAdded(id));
        Ok(id)
    }

    /// Resolve a frame by name, erroring if absent.
    pub fn resolve(&self, name: &str) -> KbResult<FrameId> {
        self.model.arena.require(name)
    }

    pub fn add_super(&self, child: FrameId, sup: FrameId) -> KbResult<()> {
        self.model.ensure_mutable()?;
        self.model.arena.add_super(child, sup)
    }

    pub fn remove_super(&self, child: FrameId, sup: FrameId) -> KbResult<()> {
        self.model.ensure_mutable()?;
        self.model.arena.remove_super(child, sup)
    }

    /// Remove a frame entirely. Fires a `FrameRemoved` event.
    pub fn remove_frame(&self, id: FrameId) -> KbResult<()> {
        self.model.ensure_mutable()?;
        self.model.arena.remove_frame(id)?;
        self.model.listeners.notify(&ModelEvent::FrameRemoved(id));
        Ok(())
    }

    pub fn set_visibility(&self, id: FrameId, visibility: Visibility) -> KbResult<()> {
        self.model.ensure_mutable()?;
        self.model.arena.set_visibility(id, visibility)
    }

    /// Declare a slot on a frame, interning its key by name. Fires a
    /// `SlotAdded` event.
    pub fn declare_slot(
        &self,
        frame: FrameId,
        identity: Identity,
        cardinality: crate::lattice::slot::Cardinality,
        value_type: ValueType,
        source: Source,
    ) -> KbResult<SlotKey> {
        self.model.ensure_mutable()?;
        let key = self.model.intern_slot_key(identity.clone())?;
        let slot = Slot::new(key, identity, cardinality, value_type, source);
        self.model.arena.add_slot(frame, slot)?;
        self.model
            .listeners
            .notify(&ModelEvent::SlotAdded { frame, slot: key });
        Ok(key)
    }

    /// Attach an already-constructed slot. Fires a `SlotAdded` event.
    pub fn add_slot(&self, frame: FrameId, slot: Slot) -> KbResult<()> {
        self.model.ensure_mutable()?;
        let key = slot.key();
        self.model.arena.add_slot(frame, slot)?;
        self.model
            .listeners
            .notify(&ModelEvent::SlotAdded { frame, slot: key });
        Ok(())
    }

    pub fn remove_slot(&self, frame: FrameId, key: SlotKey) -> KbResult<()> {
        self.model.ensure_mutable()?;
        self.model.arena.remove_slot(frame, key)
    }

    /// Fix a default slot-value on a frame, under absorption.
    pub fn add_fixed_value(
        &self,
        frame: FrameId,
        key: SlotKey,
        value: ConceptValue,
        source: Source,
    ) -> KbResult<()> {
        self.model.ensure_mutable()?;
        self.model.arena.add_fixed_value(frame, key, value, source)
    }

    pub fn annotate_frame(
        &self,
        frame: FrameId,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> KbResult<()> {
        self.model.arena.annotate(frame, key, value)
    }

    pub fn annotate_slot(
        &self,
        frame: FrameId,
        slot: SlotKey,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> KbResult<()> {
        self.model.arena.annotate_slot(frame, slot, key, value)
    }
}

/// A pluggable build-phase contributor.
///
/// Sections run in sequence during [`ConceptModel::build`]; each may add,
/// resolve, and remove frames and slots through the builder capability.
pub trait SectionBuilder {
    /// Section name for build logs.
    fn name(&self) -> &str;

    /// Contribute frames and slots to the model under construction.
    fn build(&self, builder: &ModelBuilder<'_>) -> KbResult<()>;

    /// Whether this section may run again on an already-built model.
    fn supports_incremental(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KbError;
    use crate::lattice::number::NumberRange;
    use crate::lattice::slot::Cardinality;

    struct Taxonomy;

    impl SectionBuilder for Taxonomy {
        fn name(&self) -> &str {
            "taxonomy"
        }

        fn build(&self, b: &ModelBuilder<'_>) -> KbResult<()> {
            let animal = b.add_frame(
                Identity::new("animal"),
                Visibility::Exposed,
                Source::Direct,
            )?;
            let dog = b.add_frame(Identity::new("dog"), Visibility::Exposed, Source::Direct)?;
            b.add_super(dog, animal)?;
            b.declare_slot(
                animal,
                Identity::new("age"),
                Cardinality::SingleValue,
                ValueType::Number(NumberRange::int_range(Some(0), Some(100))?),
                Source::Direct,
            )?;
            Ok(())
        }
    }

    #[test]
    fn build_freezes_the_model() {
        let model = ConceptModel::new().unwrap();
        model.build(&[&Taxonomy]).unwrap();
        assert!(model.is_built());

        let result = model.build(&[&Taxonomy]);
        assert!(matches!(
            result,
            Err(KbError::Model(ModelError::ModelFrozen))
        ));
        // Synthesis stays open after build.
        let animal = model.arena().require("animal").unwrap();
        let dog = model.arena().require("dog").unwrap();
        assert!(model.synthesize(animal, &[dog]).is_ok());
    }

    #[test]
    fn slots_are_inherited_with_nearest_winning() {
        let model = ConceptModel::new().unwrap();
        model.build(&[&Taxonomy]).unwrap();
        let dog = model.arena().require("dog").unwrap();

        let slots = model.effective_slots(dog);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].identity().name, "age");
    }

    #[test]
    fn narrowed_slot_type_is_accepted_widened_is_rejected() {
        struct Narrowing;
        impl SectionBuilder for Narrowing {
            fn name(&self) -> &str {
                "narrowing"
            }
            fn build(&self, b: &ModelBuilder<'_>) -> KbResult<()> {
                let dog = b.resolve("dog")?;
                let key = b.model().resolve_slot_key("age").unwrap();
                let identity = b.model().slot_identity(key).unwrap();
                b.add_slot(
                    dog,
                    Slot::new(
                        key,
                        identity,
                        Cardinality::SingleValue,
                        ValueType::Number(NumberRange::int_range(Some(0), Some(30))?),
                        Source::Direct,
                    ),
                )?;
                Ok(())
            }
        }
        let model = ConceptModel::new().unwrap();
        model.build(&[&Taxonomy, &Narrowing]).unwrap();

        struct Widening;
        impl SectionBuilder for Widening {
            fn name(&self) -> &str {
                "widening"
            }
            fn build(&self, b: &ModelBuilder<'_>) -> KbResult<()> {
                let dog = b.resolve("dog")?;
                let key = b.model().resolve_slot_key("age").unwrap();
                let identity = b.model().slot_identity(key).unwrap();
                b.add_slot(
                    dog,
                    Slot::new(
                        key,
                        identity,
                        Cardinality::SingleValue,
                        ValueType::Number(NumberRange::int_range(Some(0), Some(500))?),
                        Source::Direct,
                    ),
                )?;
                Ok(())
            }
        }
        let model = ConceptModel::new().unwrap();
        let result = model.build(&[&Taxonomy, &Widening]);
        assert!(matches!(
            result,
            Err(KbError::Model(ModelError::SlotTypeConflict { .. }))
        ));
    }

    #[test]
    fn empty_extension_returns_the_base() {
        let model = ConceptModel::new().unwrap();
        model.build(&[&Taxonomy]).unwrap();
        let dog = model.arena().require("dog").unwrap();

        let ext = model.extend(dog, FixedValues::new()).unwrap();
        assert!(matches!(ext, ConceptFrame::Atomic(id) if id == dog));
    }

    #[test]
    fn extension_fixed_values_are_validated_after_build() {
        let model = ConceptModel::new().unwrap();
        model.build(&[&Taxonomy]).unwrap();
        let dog = model.arena().require("dog").unwrap();
        let age = model.resolve_slot_key("age").unwrap();

        let mut ok = FixedValues::new();
        ok.set_values(
            age,
            vec![ConceptValue::Number(NumberRange::exact_int(5))],
            Source::Direct,
        );
        assert!(model.extend(dog, ok).is_ok());

        let mut out_of_range = FixedValues::new();
        out_of_range.set_values(
            age,
            vec![ConceptValue::Number(NumberRange::exact_int(200))],
            Source::Direct,
        );
        assert!(matches!(
            model.extend(dog, out_of_range),
            Err(KbError::Model(ModelError::InvalidFixedValue { .. }))
        ));
    }

    #[test]
    fn pre_build_extensions_validate_at_build_completion() {
        struct ExtendEarly;
        impl SectionBuilder for ExtendEarly {
            fn name(&self) -> &str {
                "extend-early"
            }
            fn build(&self, b: &ModelBuilder<'_>) -> KbResult<()> {
                let dog = b.resolve("dog")?;
                let age = b.model().resolve_slot_key("age").unwrap();
                let mut fixed = FixedValues::new();
                fixed.set_values(
                    age,
                    vec![ConceptValue::Number(NumberRange::exact_int(999))],
                    Source::Direct,
                );
                // Does not fail here: validation is deferred to build end.
                b.model().extend(dog, fixed)?;
                Ok(())
            }
        }
        let model = ConceptModel::new().unwrap();
        let result = model.build(&[&Taxonomy, &ExtendEarly]);
        assert!(matches!(
            result,
            Err(KbError::Model(ModelError::InvalidFixedValue { .. }))
        ));
    }

    #[test]
    fn rebuild_requires_incremental_sections() {
        let model = ConceptModel::new().unwrap();
        model.build(&[&Taxonomy]).unwrap();
        assert!(model.rebuild(&[&Taxonomy]).is_err());

        struct Incremental;
        impl SectionBuilder for Incremental {
            fn name(&self) -> &str {
                "incremental"
            }
            fn build(&self, b: &ModelBuilder<'_>) -> KbResult<()> {
                let animal = b.resolve("animal")?;
                let cat =
                    b.add_frame(Identity::new("cat"), Visibility::Exposed, Source::Direct)?;
                b.add_super(cat, animal)?;
                Ok(())
            }
            fn supports_incremental(&self) -> bool {
                true
            }
        }
        model.rebuild(&[&Incremental]).unwrap();
        assert!(model.is_built());
        assert!(model.arena().resolve("cat").is_some());
    }

    #[test]
    fn build_complete_event_fires() {
        use std::sync::atomic::AtomicUsize;

        struct Counter(AtomicUsize);
        impl ModelListener for Counter {
            fn on_event(&self, event: &ModelEvent) {
                if matches!(event, ModelEvent::BuildComplete) {
                    self.0.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let model = ConceptModel::new().unwrap();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        model.register_listener(counter.clone());
        model.build(&[&Taxonomy]).unwrap();
        assert_eq!(counter.0.load(Ordering::Relaxed), 1);
    }
}
