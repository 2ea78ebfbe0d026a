//! End-to-end tests over the instance layer: creation, slot mutation,
//! auto-update propagation, copying, and the structural matchers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ontoframe::error::{InstanceError, KbError, KbResult};
use ontoframe::expression::ConceptFrame;
use ontoframe::hierarchy::FrameArena;
use ontoframe::ident::{Identity, InstanceId, Source, Visibility};
use ontoframe::instance::{
    InstanceFunction, InstanceGraph, InstanceMatcher, InstanceValue, MatcherRegistry, Reasoner,
    UpdateOps,
};
use ontoframe::lattice::fixed::{ConceptValue, FixedValues};
use ontoframe::lattice::number::NumberRange;
use ontoframe::lattice::slot::{Cardinality, Slot};
use ontoframe::lattice::text::TextFormat;
use ontoframe::lattice::value_type::ValueType;
use ontoframe::model::{ConceptModel, ModelBuilder, SectionBuilder};
use ontoframe::structural;

struct Menagerie;

impl SectionBuilder for Menagerie {
    fn name(&self) -> &str {
        "menagerie"
    }

    fn build(&self, b: &ModelBuilder<'_>) -> KbResult<()> {
        let animal = b.add_frame(Identity::new("animal"), Visibility::Exposed, Source::Direct)?;
        for name in ["dog", "cat"] {
            let sub = b.add_frame(Identity::new(name), Visibility::Exposed, Source::Direct)?;
            b.add_super(sub, animal)?;
        }
        b.declare_slot(
            animal,
            Identity::new("age"),
            Cardinality::SingleValue,
            ValueType::Number(NumberRange::int_range(Some(0), Some(100))?),
            Source::Direct,
        )?;
        b.declare_slot(
            animal,
            Identity::new("name"),
            Cardinality::SingleValue,
            ValueType::Text(TextFormat::Free),
            Source::Direct,
        )?;
        let friend_key = b.model().intern_slot_key(Identity::new("friend"))?;
        b.add_slot(
            animal,
            Slot::new(
                friend_key,
                Identity::new("friend"),
                Cardinality::Repeatable,
                ValueType::Frame(ConceptFrame::atomic(animal)),
                Source::Direct,
            ),
        )?;
        let weight_key = b.model().intern_slot_key(Identity::new("weight"))?;
        b.add_slot(
            animal,
            Slot::new(
                weight_key,
                Identity::new("weight"),
                Cardinality::SingleValue,
                ValueType::Number(NumberRange::int_range(None, None)?),
                Source::Direct,
            )
            .assertable_on_abstract(true),
        )?;
        Ok(())
    }
}

struct Fixture {
    model: Arc<ConceptModel>,
    graph: InstanceGraph,
}

fn fixture() -> Fixture {
    let model = ConceptModel::new().unwrap();
    model.build(&[&Menagerie]).unwrap();
    let model = Arc::new(model);
    let graph = InstanceGraph::new(Arc::clone(&model));
    Fixture { model, graph }
}

fn exact(v: i64) -> InstanceValue {
    InstanceValue::Number(NumberRange::exact_int(v))
}

#[test]
fn instances_inherit_slots_and_fixed_values() {
    let Fixture { model, mut graph } = fixture();
    let dog = model.arena().require("dog").unwrap();
    let age = model.resolve_slot_key("age").unwrap();

    // An extension fixing age=50 becomes a fixed instance-slot value.
    let mut fixed = FixedValues::new();
    fixed.set_values(
        age,
        vec![ConceptValue::Number(NumberRange::exact_int(50))],
        Source::Direct,
    );
    let fifty = model.extend(dog, fixed).unwrap();

    let rex = graph.create_assertion(fifty).unwrap();
    let frame = graph.frame(rex).unwrap();
    assert_eq!(frame.slots().len(), 4);
    let slot = frame.slot(age).unwrap();
    assert_eq!(slot.fixed().len(), 1);
    assert_eq!(slot.current().len(), 1);

    // Out-of-range assertion is rejected at validation, not merged.
    let result = graph.add_asserted(rex, age, exact(200));
    assert!(matches!(
        result,
        Err(KbError::Instance(InstanceError::ValueTypeMismatch { .. }))
    ));
    // In-range assertion is suppressed: the single-valued slot keeps its
    // fixed value.
    graph.add_asserted(rex, age, exact(30)).unwrap();
    let slot = graph.frame(rex).unwrap().slot(age).unwrap();
    assert_eq!(slot.current().len(), 1);
    assert!(matches!(
        &slot.current()[0],
        InstanceValue::Number(r) if r.is_exact()
    ));
}

#[test]
fn fixed_value_subsuming_assertion_wins_the_merge() {
    let Fixture { model, mut graph } = fixture();
    let dog = model.arena().require("dog").unwrap();
    let age = model.resolve_slot_key("age").unwrap();

    let rex = graph.create_assertion(ConceptFrame::atomic(dog)).unwrap();
    let wide = InstanceValue::Number(NumberRange::int_range(Some(0), Some(100)).unwrap());
    graph.set_fixed(rex, age, vec![wide]).unwrap();
    graph.add_asserted(rex, age, exact(50)).unwrap();

    let slot = graph.frame(rex).unwrap().slot(age).unwrap();
    assert_eq!(slot.current().len(), 1);
    assert!(matches!(
        &slot.current()[0],
        InstanceValue::Number(r) if !r.is_exact()
    ));
}

#[test]
fn single_valued_slot_rejects_multiple_fixed_values() {
    let Fixture { model, mut graph } = fixture();
    let dog = model.arena().require("dog").unwrap();
    let age = model.resolve_slot_key("age").unwrap();
    let rex = graph.create_assertion(ConceptFrame::atomic(dog)).unwrap();

    let result = graph.set_fixed(rex, age, vec![exact(1), exact(2)]);
    assert!(matches!(
        result,
        Err(KbError::Instance(InstanceError::TooManyFixedValues { .. }))
    ));
}

#[test]
fn disjunction_types_are_query_only() {
    let Fixture { model, mut graph } = fixture();
    let dog = model.arena().require("dog").unwrap();
    let cat = model.arena().require("cat").unwrap();
    let either = model
        .disjoin(&[ConceptFrame::atomic(dog), ConceptFrame::atomic(cat)])
        .unwrap();

    assert!(matches!(
        graph.create_assertion(either.clone()),
        Err(KbError::Instance(
            InstanceError::DisjunctionTypeOnAssertion { .. }
        ))
    ));
    assert!(graph.create_query(either).is_ok());
}

#[test]
fn cross_function_references_are_forbidden() {
    let Fixture { model, mut graph } = fixture();
    let animal = model.arena().require("animal").unwrap();
    let dog = model.arena().require("dog").unwrap();
    let friend = model.resolve_slot_key("friend").unwrap();

    let rex = graph.create_assertion(ConceptFrame::atomic(dog)).unwrap();
    let probe = graph.create_query(ConceptFrame::atomic(animal)).unwrap();

    let result = graph.set_asserted(probe, friend, vec![InstanceValue::Frame(rex)]);
    assert!(matches!(
        result,
        Err(KbError::Instance(InstanceError::CrossFunctionReference { .. }))
    ));
}

#[test]
fn reference_frames_forbid_local_edits() {
    let Fixture { model, mut graph } = fixture();
    let dog = model.arena().require("dog").unwrap();
    let age = model.resolve_slot_key("age").unwrap();

    let external = graph
        .create_reference(
            ConceptFrame::atomic(dog),
            InstanceFunction::Assertion,
            "kb-7:rex",
        )
        .unwrap();
    assert!(graph.frame(external).unwrap().is_reference());

    let result = graph.set_asserted(external, age, vec![exact(4)]);
    assert!(matches!(
        result,
        Err(KbError::Instance(InstanceError::ReadOnlySlot { .. }))
    ));
}

#[test]
fn abstract_values_need_the_slot_flag_on_assertions() {
    let Fixture { model, mut graph } = fixture();
    let dog = model.arena().require("dog").unwrap();
    let animal = model.arena().require("animal").unwrap();
    let age = model.resolve_slot_key("age").unwrap();
    let weight = model.resolve_slot_key("weight").unwrap();

    let rex = graph.create_assertion(ConceptFrame::atomic(dog)).unwrap();
    let range = InstanceValue::Number(NumberRange::int_range(Some(1), Some(5)).unwrap());

    // age is not abstract-assertable on assertion frames.
    assert!(matches!(
        graph.add_asserted(rex, age, range.clone()),
        Err(KbError::Instance(
            InstanceError::AbstractValueNotAssertable { .. }
        ))
    ));
    // weight is flagged, so a range is fine.
    graph.add_asserted(rex, weight, range.clone()).unwrap();

    // Query frames may always hold indefinite values.
    let probe = graph.create_query(ConceptFrame::atomic(animal)).unwrap();
    graph.add_asserted(probe, age, range).unwrap();
}

// ---------------------------------------------------------------------------
// Auto-update
// ---------------------------------------------------------------------------

/// Reports `slot_values` changes a fixed number of times per frame, then
/// settles. Records every update call.
struct Converging {
    budget: u32,
    calls: Mutex<HashMap<InstanceId, u32>>,
}

impl Converging {
    fn new(budget: u32) -> Self {
        Self {
            budget,
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn calls_for(&self, id: InstanceId) -> u32 {
        self.calls.lock().unwrap().get(&id).copied().unwrap_or(0)
    }
}

impl Reasoner for Converging {
    fn update(
        &self,
        graph: &mut InstanceGraph,
        frame: InstanceId,
        ops: UpdateOps,
    ) -> KbResult<UpdateOps> {
        let mut calls = self.calls.lock().unwrap();
        let count = calls.entry(frame).or_insert(0);
        *count += 1;
        if ops.inferred_types {
            let dog = graph.model().arena().require("dog")?;
            graph.set_inferred_types(frame, vec![dog])?;
        }
        if ops.slot_values && *count <= self.budget {
            Ok(UpdateOps {
                slot_values: true,
                ..UpdateOps::NONE
            })
        } else {
            Ok(UpdateOps::NONE)
        }
    }
}

#[test]
fn auto_update_converges_to_a_fixed_point() {
    let model = ConceptModel::new().unwrap();
    model.build(&[&Menagerie]).unwrap();
    let model = Arc::new(model);
    let reasoner = Arc::new(Converging::new(3));
    let mut graph = InstanceGraph::with_reasoner(Arc::clone(&model), reasoner.clone());

    let dog = model.arena().require("dog").unwrap();
    let rex = graph.create_assertion(ConceptFrame::atomic(dog)).unwrap();

    // Initial instantiation drove the loop to the fixed point: the budgeted
    // changes plus one final no-op round.
    assert_eq!(reasoner.calls_for(rex), 4);
    assert_eq!(graph.frame(rex).unwrap().inferred_types(), &[dog]);

    // Re-running update at the fixed point is a single no-op round.
    graph.force_update(rex, UpdateOps::ALL).unwrap();
    assert_eq!(reasoner.calls_for(rex), 5);
    graph.force_update(rex, UpdateOps::ALL).unwrap();
    assert_eq!(reasoner.calls_for(rex), 6);
}

#[test]
fn value_changes_propagate_through_referencing_frames() {
    let model = ConceptModel::new().unwrap();
    model.build(&[&Menagerie]).unwrap();
    let model = Arc::new(model);
    let reasoner = Arc::new(Converging::new(0));
    let mut graph = InstanceGraph::with_reasoner(Arc::clone(&model), reasoner.clone());

    let dog = model.arena().require("dog").unwrap();
    let friend = model.resolve_slot_key("friend").unwrap();
    let age = model.resolve_slot_key("age").unwrap();

    let rex = graph.create_assertion(ConceptFrame::atomic(dog)).unwrap();
    let milo = graph.create_assertion(ConceptFrame::atomic(dog)).unwrap();
    graph
        .set_asserted(rex, friend, vec![InstanceValue::Frame(milo)])
        .unwrap();
    assert!(
        graph
            .frame(milo)
            .unwrap()
            .referencing()
            .contains(&(rex, friend))
    );

    let before_rex = reasoner.calls_for(rex);
    // Mutating milo updates milo and then the frame referencing it.
    graph.add_asserted(milo, age, exact(3)).unwrap();
    assert!(reasoner.calls_for(rex) > before_rex);
}

#[test]
fn free_instances_do_not_arm_auto_update() {
    let model = ConceptModel::new().unwrap();
    model.build(&[&Menagerie]).unwrap();
    let model = Arc::new(model);
    let reasoner = Arc::new(Converging::new(0));
    let mut graph = InstanceGraph::with_reasoner(Arc::clone(&model), reasoner.clone());

    let dog = model.arena().require("dog").unwrap();
    let age = model.resolve_slot_key("age").unwrap();
    let transient = graph
        .create_free(ConceptFrame::atomic(dog), InstanceFunction::Assertion)
        .unwrap();
    graph.add_asserted(transient, age, exact(2)).unwrap();
    assert_eq!(reasoner.calls_for(transient), 0);
    assert!(graph.frame(transient).unwrap().is_free());
}

// ---------------------------------------------------------------------------
// Copying and structural matchers
// ---------------------------------------------------------------------------

#[test]
fn copy_round_trips_structural_equality_and_hash() {
    let Fixture { model, mut graph } = fixture();
    let dog = model.arena().require("dog").unwrap();
    let age = model.resolve_slot_key("age").unwrap();
    let name = model.resolve_slot_key("name").unwrap();
    let friend = model.resolve_slot_key("friend").unwrap();

    let rex = graph.create_assertion(ConceptFrame::atomic(dog)).unwrap();
    let milo = graph.create_assertion(ConceptFrame::atomic(dog)).unwrap();
    graph.add_asserted(rex, age, exact(5)).unwrap();
    graph
        .add_asserted(rex, name, InstanceValue::Text("rex".into()))
        .unwrap();
    // A reference cycle: rex -> milo -> rex.
    graph
        .set_asserted(rex, friend, vec![InstanceValue::Frame(milo)])
        .unwrap();
    graph
        .set_asserted(milo, friend, vec![InstanceValue::Frame(rex)])
        .unwrap();

    let twin = graph.copy(rex).unwrap();
    assert_ne!(twin, rex);
    // Deep copy: the twin's friend is a copy of milo, not milo itself.
    let twin_friend = graph.frame(twin).unwrap().slot(friend).unwrap().current()[0]
        .as_instance()
        .unwrap();
    assert_ne!(twin_friend, milo);

    assert!(structural::equals(&graph, rex, twin));
    assert!(structural::equals(&graph, twin, rex));
    assert_eq!(
        structural::structural_hash(&graph, rex),
        structural::structural_hash(&graph, twin)
    );

    // Divergence breaks equality.
    graph.add_asserted(twin, age, exact(6)).unwrap();
    assert!(!structural::equals(&graph, rex, twin));
}

#[test]
fn structural_subsumption_covers_values() {
    let Fixture { model, mut graph } = fixture();
    let animal = model.arena().require("animal").unwrap();
    let dog = model.arena().require("dog").unwrap();
    let age = model.resolve_slot_key("age").unwrap();

    let rex = graph.create_assertion(ConceptFrame::atomic(dog)).unwrap();
    graph.add_asserted(rex, age, exact(5)).unwrap();
    graph
        .add_asserted(
            rex,
            model.resolve_slot_key("name").unwrap(),
            InstanceValue::Text("rex".into()),
        )
        .unwrap();

    // A query for animals aged 0-10 subsumes rex; extra right slots are
    // tolerated.
    let probe = graph.create_query(ConceptFrame::atomic(animal)).unwrap();
    let range = InstanceValue::Number(NumberRange::int_range(Some(0), Some(10)).unwrap());
    // Same-function copy of rex for the right side: subsumption is
    // function-agnostic, but slot values must be comparable.
    let pup = graph.create_query(ConceptFrame::atomic(dog)).unwrap();
    graph.add_asserted(probe, age, range.clone()).unwrap();
    graph.add_asserted(pup, age, exact(5)).unwrap();

    assert!(structural::subsumes(&graph, probe, pup));
    assert!(!structural::subsumes(&graph, pup, probe));
}

/// Indexes every frame whose type is subsumed by a covered atomic frame and
/// answers probes by structural subsumption.
struct SubsumptionMatcher {
    covers: ConceptFrame,
    index: Mutex<Vec<InstanceId>>,
}

impl InstanceMatcher for SubsumptionMatcher {
    fn handles(&self, frame_type: &ConceptFrame, arena: &FrameArena) -> bool {
        self.covers.subsumes(frame_type, arena)
    }

    fn add(&self, _graph: &InstanceGraph, id: InstanceId) -> KbResult<()> {
        self.index.lock().unwrap().push(id);
        Ok(())
    }

    fn remove(&self, _graph: &InstanceGraph, id: InstanceId) -> KbResult<()> {
        self.index.lock().unwrap().retain(|i| *i != id);
        Ok(())
    }

    fn matches(&self, graph: &InstanceGraph, probe: InstanceId) -> KbResult<Vec<InstanceId>> {
        Ok(self
            .index
            .lock()
            .unwrap()
            .iter()
            .copied()
            .filter(|i| structural::subsumes(graph, probe, *i))
            .collect())
    }
}

#[test]
fn matcher_registry_dispatches_by_type_coverage() {
    let Fixture { model, mut graph } = fixture();
    let animal = model.arena().require("animal").unwrap();
    let dog = model.arena().require("dog").unwrap();

    let matcher = Arc::new(SubsumptionMatcher {
        covers: ConceptFrame::atomic(animal),
        index: Mutex::new(Vec::new()),
    });
    let mut registry = MatcherRegistry::new();
    registry.register(matcher.clone());

    let rex = graph.create_assertion(ConceptFrame::atomic(dog)).unwrap();
    let milo = graph.create_assertion(ConceptFrame::atomic(dog)).unwrap();
    let age = model.resolve_slot_key("age").unwrap();
    graph.add_asserted(rex, age, exact(5)).unwrap();
    graph.add_asserted(milo, age, exact(40)).unwrap();

    let dispatched = registry
        .dispatch(&ConceptFrame::atomic(dog), model.arena())
        .unwrap();
    dispatched.add(&graph, rex).unwrap();
    dispatched.add(&graph, milo).unwrap();

    // A query for young animals matches rex only.
    let probe = graph.create_query(ConceptFrame::atomic(animal)).unwrap();
    let young = InstanceValue::Number(NumberRange::int_range(Some(0), Some(10)).unwrap());
    graph.add_asserted(probe, age, young).unwrap();
    assert_eq!(dispatched.matches(&graph, probe).unwrap(), vec![rex]);

    dispatched.remove(&graph, rex).unwrap();
    assert!(dispatched.matches(&graph, probe).unwrap().is_empty());
}

#[test]
fn flattening_to_extension_rejects_cycles() {
    let Fixture { model, mut graph } = fixture();
    let dog = model.arena().require("dog").unwrap();
    let age = model.resolve_slot_key("age").unwrap();
    let friend = model.resolve_slot_key("friend").unwrap();

    let rex = graph.create_assertion(ConceptFrame::atomic(dog)).unwrap();
    graph.add_asserted(rex, age, exact(5)).unwrap();

    let flattened = structural::to_extension(&graph, rex).unwrap();
    let ConceptFrame::Extension(ext) = &flattened else {
        panic!("expected an extension");
    };
    assert_eq!(ext.base(), dog);
    assert_eq!(ext.fixed().values(age).len(), 1);

    // Introduce a cycle and expect rejection.
    let milo = graph.create_assertion(ConceptFrame::atomic(dog)).unwrap();
    graph
        .set_asserted(rex, friend, vec![InstanceValue::Frame(milo)])
        .unwrap();
    graph
        .set_asserted(milo, friend, vec![InstanceValue::Frame(rex)])
        .unwrap();
    assert!(matches!(
        structural::to_extension(&graph, rex),
        Err(KbError::Instance(InstanceError::CyclicInstanceGraph { .. }))
    ));
}
