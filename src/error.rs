//! Rich diagnostic error types for the ontoframe engine.
//!
//! The taxonomy follows three classes: model-construction errors
//! ([`ModelError`]), access errors ([`AccessError`]), and illegal-mutation /
//! instance-contract errors ([`InstanceError`]). Each variant carries a
//! miette `#[diagnostic]` code and help text. Every error is surfaced
//! synchronously to the caller that attempted the operation; nothing in the
//! core retries.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the ontoframe engine.
///
/// Each variant wraps a class-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum KbError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Instance(#[from] InstanceError),
}

/// Convenience alias for functions returning ontoframe results.
pub type KbResult<T> = std::result::Result<T, KbError>;

// ---------------------------------------------------------------------------
// Model-construction errors
// ---------------------------------------------------------------------------

/// Errors raised while building or mutating the concept model.
///
/// These abort only the mutation that triggered them; the model remains in
/// its prior consistent state.
#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("adding {super_frame} as a super of {frame} would create a cycle")]
    #[diagnostic(
        code(ontoframe::model::cyclic_super),
        help(
            "The super/sub relation must remain a DAG. The frame already \
             subsumes the proposed super; link the frames the other way \
             around, or introduce an intermediate frame."
        )
    )]
    CyclicSuperLink { frame: String, super_frame: String },

    #[error("duplicate frame name: {name}")]
    #[diagnostic(
        code(ontoframe::model::duplicate_frame),
        help(
            "Frame names are unique within a model. Resolve the existing \
             frame instead of adding a second one, or pick a new name."
        )
    )]
    DuplicateFrame { name: String },

    #[error("unknown frame: {name}")]
    #[diagnostic(
        code(ontoframe::model::unknown_frame),
        help("No frame with this name exists in the model. Add it first, or check the spelling.")
    )]
    UnknownFrame { name: String },

    #[error("model is already built; hierarchy mutation is not permitted")]
    #[diagnostic(
        code(ontoframe::model::frozen),
        help(
            "Editing is only legal before the model is marked built. \
             Call `ConceptModel::reopen()` to invalidate the subsumption \
             cache and re-enter the build phase."
        )
    )]
    ModelFrozen,

    #[error("slot {slot} on {frame} is not consistent with the same slot on ancestor {ancestor}")]
    #[diagnostic(
        code(ontoframe::model::slot_type_conflict),
        help(
            "A slot's value type must be subsumed by the value type of any \
             same-identity slot on an ancestor frame. Widen the ancestor's \
             slot or narrow this one to a compatible type."
        )
    )]
    SlotTypeConflict {
        slot: String,
        frame: String,
        ancestor: String,
    },

    #[error("invalid number range: {detail}")]
    #[diagnostic(
        code(ontoframe::model::invalid_range),
        help(
            "Numeric ranges require min <= max, finite (non-NaN) bounds, \
             and bounds of the declared numeric kind."
        )
    )]
    InvalidNumberRange { detail: String },

    #[error("a definite value is required here, found an indefinite one ({context})")]
    #[diagnostic(
        code(ontoframe::model::indefinite_bound),
        help(
            "This operation needs an exact numeric value, but the range is \
             unbounded or spans more than one value."
        )
    )]
    IndefiniteBound { context: String },

    #[error("cannot resolve a disjunction over an empty candidate set")]
    #[diagnostic(
        code(ontoframe::model::empty_disjunction),
        help("Provide at least one candidate frame to disjunction resolution.")
    )]
    EmptyDisjunction,

    #[error("fixed value for slot {slot} is invalid on frame {frame}")]
    #[diagnostic(
        code(ontoframe::model::invalid_fixed_value),
        help(
            "Fixed slot-values must name a slot declared on the frame or one \
             of its ancestors, and each value must match that slot's value type."
        )
    )]
    InvalidFixedValue { slot: String, frame: String },

    #[error("cannot synthesize a frame under {super_frame}: {sub} is not one of its descendants")]
    #[diagnostic(
        code(ontoframe::model::invalid_synthesis),
        help(
            "Dynamic value-type frames represent an exact (super, subs) \
             combination; every listed sub must already be subsumed by the super."
        )
    )]
    InvalidSynthesis { super_frame: String, sub: String },

    #[error("unknown text format: {name}")]
    #[diagnostic(
        code(ontoframe::model::unknown_text_format),
        help(
            "Register the format's validator with the model's \
             TextFormatRegistry before referencing it from a slot."
        )
    )]
    UnknownTextFormat { name: String },

    #[error("identifier space exhausted: cannot allocate more than u64::MAX ids")]
    #[diagnostic(
        code(ontoframe::model::ids_exhausted),
        help(
            "The ID space is exhausted. This requires 2^64 allocations and \
             almost certainly indicates an allocation loop."
        )
    )]
    IdentifiersExhausted,
}

// ---------------------------------------------------------------------------
// Access errors
// ---------------------------------------------------------------------------

/// Errors raised by lookups that expected an entity or multiplicity that
/// does not hold. Never retried.
#[derive(Debug, Error, Diagnostic)]
pub enum AccessError {
    #[error("no such frame: {id}")]
    #[diagnostic(
        code(ontoframe::access::no_frame),
        help("The frame id does not exist in this model. It may have been removed during build.")
    )]
    NoSuchFrame { id: String },

    #[error("no slot {slot} on frame {frame}")]
    #[diagnostic(
        code(ontoframe::access::no_slot),
        help("The frame carries no slot of this identity, directly or by inheritance.")
    )]
    NoSuchSlot { slot: String, frame: String },

    #[error("no such instance frame: {id}")]
    #[diagnostic(
        code(ontoframe::access::no_instance),
        help("The instance id does not exist in this graph; it may belong to a different graph.")
    )]
    NoSuchInstance { id: String },

    #[error("no annotation values for key {key}")]
    #[diagnostic(
        code(ontoframe::access::no_annotation),
        help("The entity carries no annotation under this key.")
    )]
    NoSuchAnnotation { key: String },

    #[error("expected exactly one annotation value for {key}, found {found}")]
    #[diagnostic(
        code(ontoframe::access::annotation_multiplicity),
        help("Use `values()` when a key may carry zero or many values.")
    )]
    AnnotationMultiplicity { key: String, found: usize },

    #[error("value cast mismatch: expected {expected}, found {found}")]
    #[diagnostic(
        code(ontoframe::access::value_cast),
        help("Check the slot's declared value type before casting its values.")
    )]
    ValueCastMismatch { expected: String, found: String },
}

// ---------------------------------------------------------------------------
// Instance / illegal-mutation errors
// ---------------------------------------------------------------------------

/// Errors raised by the instance layer, including collaborator-contract
/// violations (illegal mutations of read-only state).
#[derive(Debug, Error, Diagnostic)]
pub enum InstanceError {
    #[error("an assertion-function frame cannot carry the disjunction type {frame_type}")]
    #[diagnostic(
        code(ontoframe::instance::disjunction_assertion),
        help(
            "Disjunction types are only legal on query-function frames. \
             Resolve the disjunction to a single atomic frame first, or \
             create the frame with Function::Query."
        )
    )]
    DisjunctionTypeOnAssertion { frame_type: String },

    #[error("frames of different function cannot reference each other ({from} -> {to})")]
    #[diagnostic(
        code(ontoframe::instance::cross_function),
        help(
            "Assertion frames may only hold assertion frames as slot values, \
             and query frames only query frames."
        )
    )]
    CrossFunctionReference { from: String, to: String },

    #[error("value {value} does not match the declared type of slot {slot} ({expected})")]
    #[diagnostic(
        code(ontoframe::instance::value_type_mismatch),
        help(
            "Slot values must be subsumed by the slot's declared value type. \
             Out-of-range numbers, mismatched text formats, and frames of an \
             unrelated type are all rejected here."
        )
    )]
    ValueTypeMismatch {
        slot: String,
        expected: String,
        value: String,
    },

    #[error("single-valued slot {slot} cannot hold {count} fixed values")]
    #[diagnostic(
        code(ontoframe::instance::fixed_cardinality),
        help("A single-valued slot admits at most one fixed value.")
    )]
    TooManyFixedValues { slot: String, count: usize },

    #[error("slot {slot} is read-only and cannot be edited locally")]
    #[diagnostic(
        code(ontoframe::instance::read_only_slot),
        help(
            "Reference-instance slots are deactivated; edit the referenced \
             instance through its owning graph instead. This indicates a \
             collaborator-contract violation."
        )
    )]
    ReadOnlySlot { slot: String },

    #[error("abstract value cannot be asserted on slot {slot} of an assertion frame")]
    #[diagnostic(
        code(ontoframe::instance::abstract_value),
        help(
            "The slot is not flagged abstract-assertable; only exact values \
             may be asserted on assertion-function frames."
        )
    )]
    AbstractValueNotAssertable { slot: String },

    #[error("instance graph contains a cycle through {frame}; cannot flatten to an extension")]
    #[diagnostic(
        code(ontoframe::instance::cyclic_graph),
        help(
            "Conversion to a concept-level extension requires an acyclic \
             instance graph. Break the cycle before converting."
        )
    )]
    CyclicInstanceGraph { frame: String },

    #[error("text value {value:?} violates format {format}")]
    #[diagnostic(
        code(ontoframe::instance::text_format),
        help("The slot's text format validator rejected this value.")
    )]
    TextFormatViolation { format: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_converts_to_kb_error() {
        let err = ModelError::DuplicateFrame {
            name: "animal".into(),
        };
        let kb: KbError = err.into();
        assert!(matches!(kb, KbError::Model(ModelError::DuplicateFrame { .. })));
    }

    #[test]
    fn access_error_converts_to_kb_error() {
        let err = AccessError::NoSuchAnnotation { key: "label".into() };
        let kb: KbError = err.into();
        assert!(matches!(kb, KbError::Access(AccessError::NoSuchAnnotation { .. })));
    }

    #[test]
    fn instance_error_converts_to_kb_error() {
        let err = InstanceError::ReadOnlySlot { slot: "age".into() };
        let kb: KbError = err.into();
        assert!(matches!(kb, KbError::Instance(InstanceError::ReadOnlySlot { .. })));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = ModelError::CyclicSuperLink {
            frame: "animal".into(),
            super_frame: "dog".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("animal"));
        assert!(msg.contains("dog"));
        assert!(msg.contains("cycle"));
    }
}
