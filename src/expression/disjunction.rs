//! Disjunction frames: "one of" a most-general set of atomic disjuncts.

use crate::error::{KbResult, ModelError};
use crate::hierarchy::FrameArena;
use crate::ident::{FrameId, VisibilityFilter};

use super::ConceptFrame;

/// A resolved disjunction over two or more atomic disjuncts.
///
/// Never constructed with fewer than two disjuncts: [`Disjunction::resolve`]
/// canonicalizes single-element sets into the atomic frame itself. The
/// super-frames are the closest common supertypes of the disjuncts.
#[derive(Debug)]
pub struct Disjunction {
    disjuncts: Vec<FrameId>,
    supers: Vec<FrameId>,
}

impl Disjunction {
    /// Resolve a candidate set into a canonical concept frame.
    ///
    /// Each candidate is expanded into its atomic disjuncts, the set is
    /// reduced to its most general members (dropping anything subsumed by
    /// another remaining disjunct), and a single survivor is returned as an
    /// atomic frame rather than a size-1 wrapper.
    pub fn resolve(candidates: &[ConceptFrame], arena: &FrameArena) -> KbResult<ConceptFrame> {
        let mut expanded: Vec<FrameId> = Vec::new();
        for candidate in candidates {
            candidate.disjuncts_into(&mut expanded);
        }
        expanded.sort();
        expanded.dedup();
        if expanded.is_empty() {
            return Err(ModelError::EmptyDisjunction.into());
        }

        let general = most_general(&expanded, arena);
        if general.len() == 1 {
            return Ok(ConceptFrame::Atomic(general[0]));
        }
        let supers = common_supers(&general, arena);
        Ok(ConceptFrame::Disjunction(
            std::sync::Arc::new(Disjunction {
                disjuncts: general,
                supers,
            }),
        ))
    }

    /// The most-general atomic disjuncts, sorted.
    pub fn disjuncts(&self) -> &[FrameId] {
        &self.disjuncts
    }

    /// Closest common supertypes of the disjuncts.
    pub fn supers(&self) -> &[FrameId] {
        &self.supers
    }

    /// The single closest common subsumer, if unambiguous.
    pub fn atomic_projection(&self, _arena: &FrameArena) -> Option<FrameId> {
        match self.supers.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

/// Drop every frame subsumed by another member of the set.
fn most_general(frames: &[FrameId], arena: &FrameArena) -> Vec<FrameId> {
    frames
        .iter()
        .filter(|f| {
            !frames
                .iter()
                .any(|other| other != *f && arena.subsumes(*other, **f))
        })
        .copied()
        .collect()
}

/// The most specific frames that subsume every disjunct.
///
/// Computed by intersecting each disjunct's ancestor closure (the disjunct
/// itself included), then dropping members that strictly subsume another
/// member.
fn common_supers(disjuncts: &[FrameId], arena: &FrameArena) -> Vec<FrameId> {
    let mut common: Vec<FrameId> = Vec::new();
    for (i, disjunct) in disjuncts.iter().enumerate() {
        let ancestors = arena.ancestors(*disjunct, VisibilityFilter::All);
        let mut closure: Vec<FrameId> = vec![*disjunct];
        closure.extend(ancestors.iter());
        if i == 0 {
            common = closure;
        } else {
            common.retain(|c| closure.contains(c));
        }
    }
    let specific: Vec<FrameId> = common
        .iter()
        .filter(|c| {
            !common
                .iter()
                .any(|other| other != *c && arena.subsumes(**c, *other))
        })
        .copied()
        .collect();
    specific
}
