//! Expression frames: the concept-frame algebra over atomic frames.
//!
//! A [`ConceptFrame`] is an atomic hierarchy node, a disjunction over a set
//! of atomic disjuncts, or an extension (an anonymous specialization of a
//! base frame carrying fixed slot-values). Disjunctions and extensions are
//! expressed purely in terms of the hierarchy and lattice layers.

pub mod disjunction;
pub mod extension;

use std::sync::Arc;

use crate::hierarchy::FrameArena;
use crate::ident::FrameId;

pub use disjunction::Disjunction;
pub use extension::Extension;

/// A concept-level type: atomic, disjunction, or extension.
#[derive(Debug, Clone)]
pub enum ConceptFrame {
    Atomic(FrameId),
    Disjunction(Arc<Disjunction>),
    Extension(Arc<Extension>),
}

impl ConceptFrame {
    /// The concept frame for a plain hierarchy node.
    pub fn atomic(id: FrameId) -> Self {
        ConceptFrame::Atomic(id)
    }

    /// Expand this frame into its atomic disjuncts. Atomic frames expand to
    /// themselves, extensions to their base.
    pub fn disjuncts_into(&self, out: &mut Vec<FrameId>) {
        match self {
            ConceptFrame::Atomic(id) => out.push(*id),
            ConceptFrame::Disjunction(d) => out.extend_from_slice(d.disjuncts()),
            ConceptFrame::Extension(e) => out.push(e.base()),
        }
    }

    /// Concept subsumption across all three variants.
    ///
    /// Atomic and disjunction frames subsume through the hierarchy.
    /// Extensions are subsumed by anything subsuming their base, but only
    /// subsume other extensions: abstract extensions structurally, concrete
    /// extensions by identity alone.
    pub fn subsumes(&self, other: &ConceptFrame, arena: &FrameArena) -> bool {
        match (self, other) {
            (ConceptFrame::Atomic(a), ConceptFrame::Atomic(b)) => arena.subsumes(*a, *b),
            (ConceptFrame::Atomic(a), ConceptFrame::Disjunction(d)) => {
                d.disjuncts().iter().all(|b| arena.subsumes(*a, *b))
            }
            (ConceptFrame::Atomic(a), ConceptFrame::Extension(e)) => {
                arena.subsumes(*a, e.base())
            }
            (ConceptFrame::Disjunction(d), ConceptFrame::Atomic(b)) => {
                d.disjuncts().iter().any(|a| arena.subsumes(*a, *b))
            }
            (ConceptFrame::Disjunction(d), ConceptFrame::Disjunction(o)) => o
                .disjuncts()
                .iter()
                .all(|b| d.disjuncts().iter().any(|a| arena.subsumes(*a, *b))),
            (ConceptFrame::Disjunction(d), ConceptFrame::Extension(e)) => {
                d.disjuncts().iter().any(|a| arena.subsumes(*a, e.base()))
            }
            (ConceptFrame::Extension(a), ConceptFrame::Extension(b)) => a.subsumes(b, arena),
            (ConceptFrame::Extension(_), _) => false,
        }
    }

    /// Structural equality. Concrete extensions compare by identity.
    pub fn matches(&self, other: &ConceptFrame, arena: &FrameArena) -> bool {
        match (self, other) {
            (ConceptFrame::Atomic(a), ConceptFrame::Atomic(b)) => a == b,
            (ConceptFrame::Disjunction(a), ConceptFrame::Disjunction(b)) => {
                a.disjuncts().len() == b.disjuncts().len()
                    && a.disjuncts().iter().all(|d| b.disjuncts().contains(d))
            }
            (ConceptFrame::Extension(a), ConceptFrame::Extension(b)) => a.matches(b, arena),
            _ => false,
        }
    }

    /// The single closest unambiguous atomic frame, if one exists.
    pub fn atomic_projection(&self, arena: &FrameArena) -> Option<FrameId> {
        match self {
            ConceptFrame::Atomic(id) => Some(*id),
            ConceptFrame::Disjunction(d) => d.atomic_projection(arena),
            ConceptFrame::Extension(e) => Some(e.base()),
        }
    }

    /// Whether this frame denotes an indefinite ("abstract") type rather
    /// than one definite concept.
    pub fn is_abstract(&self) -> bool {
        match self {
            ConceptFrame::Atomic(_) => false,
            ConceptFrame::Disjunction(_) => true,
            ConceptFrame::Extension(e) => !e.is_concrete(),
        }
    }

    /// Short description for diagnostics.
    pub fn describe(&self, arena: &FrameArena) -> String {
        match self {
            ConceptFrame::Atomic(id) => arena.label_of(*id),
            ConceptFrame::Disjunction(d) => {
                let labels: Vec<String> =
                    d.disjuncts().iter().map(|f| arena.label_of(*f)).collect();
                format!("one-of({})", labels.join(" | "))
            }
            ConceptFrame::Extension(e) => {
                let kind = if e.is_concrete() { "concrete" } else { "abstract" };
                format!("{}+{} ext#{}", arena.label_of(e.base()), kind, e.serial())
            }
        }
    }
}
