//! Cycle-safe structural matchers over instance graphs.
//!
//! Equality and subsumption share one scheme: a visited-pair memo passed
//! through the recursion short-circuits cycles by provisionally accepting an
//! as-yet-unresolved recursive match. Conversion to a concept-level
//! extension instead uses an explicit visited stack, because a cycle there
//! must be rejected outright rather than short-circuited.

use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::error::{InstanceError, KbResult};
use crate::expression::ConceptFrame;
use crate::ident::{InstanceId, Source};
use crate::instance::graph::InstanceGraph;
use crate::instance::slot::InstanceSlot;
use crate::instance::value::InstanceValue;
use crate::lattice::fixed::{ConceptValue, FixedValues};

type PairMemo = HashSet<(InstanceId, InstanceId)>;

/// Structural equality of two instance frames.
///
/// Types must match structurally, the value-bearing slot sets must agree,
/// and each slot's value lists must match pairwise, recursing into
/// frame-valued entries.
pub fn equals(graph: &InstanceGraph, a: InstanceId, b: InstanceId) -> bool {
    let mut memo = PairMemo::new();
    equals_inner(graph, a, b, &mut memo)
}

/// Structural subsumption: does `a` describe a superset of what `b` is?
///
/// The left type must subsume the right type, and every value-bearing slot
/// on the left must be covered by a same-key slot on the right, each of
/// whose values is subsumed by some left value. Extra right slots are
/// tolerated.
pub fn subsumes(graph: &InstanceGraph, a: InstanceId, b: InstanceId) -> bool {
    let mut memo = PairMemo::new();
    subsumes_inner(graph, a, b, &mut memo)
}

fn value_bearing(frame_slots: &[InstanceSlot]) -> impl Iterator<Item = &InstanceSlot> {
    frame_slots.iter().filter(|s| s.has_values())
}

fn equals_inner(graph: &InstanceGraph, a: InstanceId, b: InstanceId, memo: &mut PairMemo) -> bool {
    if a == b {
        return true;
    }
    // A recursive match still in flight is provisionally accepted.
    if !memo.insert((a, b)) {
        return true;
    }
    let (Ok(fa), Ok(fb)) = (graph.frame(a), graph.frame(b)) else {
        return false;
    };
    let arena = graph.model().arena();
    if !fa.frame_type().matches(fb.frame_type(), arena) {
        return false;
    }
    if value_bearing(fa.slots()).count() != value_bearing(fb.slots()).count() {
        return false;
    }
    value_bearing(fa.slots()).all(|sa| {
        let Some(sb) = fb.slot(sa.key()).filter(|s| s.has_values()) else {
            return false;
        };
        let (va, vb) = (sa.current(), sb.current());
        va.len() == vb.len()
            && va
                .iter()
                .all(|x| vb.iter().any(|y| value_equals(graph, x, y, memo)))
            && vb
                .iter()
                .all(|y| va.iter().any(|x| value_equals(graph, x, y, memo)))
    })
}

fn subsumes_inner(
    graph: &InstanceGraph,
    a: InstanceId,
    b: InstanceId,
    memo: &mut PairMemo,
) -> bool {
    if a == b {
        return true;
    }
    if !memo.insert((a, b)) {
        return true;
    }
    let (Ok(fa), Ok(fb)) = (graph.frame(a), graph.frame(b)) else {
        return false;
    };
    let arena = graph.model().arena();
    if !fa.frame_type().subsumes(fb.frame_type(), arena) {
        return false;
    }
    value_bearing(fa.slots()).all(|sa| {
        let Some(sb) = fb.slot(sa.key()).filter(|s| s.has_values()) else {
            return false;
        };
        // Coverage, not bijection: each right value has a left subsumer.
        sb.current().iter().all(|y| {
            sa.current()
                .iter()
                .any(|x| value_subsumes(graph, x, y, memo))
        })
    })
}

fn value_equals(
    graph: &InstanceGraph,
    x: &InstanceValue,
    y: &InstanceValue,
    memo: &mut PairMemo,
) -> bool {
    let arena = graph.model().arena();
    match (x, y) {
        (InstanceValue::Frame(a), InstanceValue::Frame(b)) => equals_inner(graph, *a, *b, memo),
        (InstanceValue::Concept(a), InstanceValue::Concept(b)) => a.matches(b, arena),
        (InstanceValue::Number(a), InstanceValue::Number(b)) => a == b,
        (InstanceValue::Text(a), InstanceValue::Text(b)) => a == b,
        _ => false,
    }
}

fn value_subsumes(
    graph: &InstanceGraph,
    x: &InstanceValue,
    y: &InstanceValue,
    memo: &mut PairMemo,
) -> bool {
    let arena = graph.model().arena();
    match (x, y) {
        (InstanceValue::Frame(a), InstanceValue::Frame(b)) => subsumes_inner(graph, *a, *b, memo),
        (InstanceValue::Concept(a), InstanceValue::Frame(b)) => graph
            .frame(*b)
            .map(|f| a.subsumes(f.frame_type(), arena))
            .unwrap_or(false),
        (InstanceValue::Concept(a), InstanceValue::Concept(b)) => a.subsumes(b, arena),
        (InstanceValue::Number(a), InstanceValue::Number(b)) => a.subsumes(b),
        (InstanceValue::Text(a), InstanceValue::Text(b)) => a == b,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Structural hashing
// ---------------------------------------------------------------------------

/// A hash consistent with [`equals`]: structurally equal frames hash alike.
///
/// Slot-value lists are folded order-independently, since equality matches
/// them as multisets. Cycles hash a fixed revisit marker.
pub fn structural_hash(graph: &InstanceGraph, id: InstanceId) -> u64 {
    let mut hasher = DefaultHasher::new();
    let mut visited: HashSet<InstanceId> = HashSet::new();
    hash_frame(graph, id, &mut visited, &mut hasher);
    hasher.finish()
}

const REVISIT_MARKER: u64 = 0x9e37_79b9_7f4a_7c15;

fn hash_frame(
    graph: &InstanceGraph,
    id: InstanceId,
    visited: &mut HashSet<InstanceId>,
    hasher: &mut DefaultHasher,
) {
    if !visited.insert(id) {
        REVISIT_MARKER.hash(hasher);
        return;
    }
    let Ok(frame) = graph.frame(id) else {
        0u64.hash(hasher);
        return;
    };
    hash_concept(frame.frame_type(), hasher);

    let mut slots: Vec<&InstanceSlot> = value_bearing(frame.slots()).collect();
    slots.sort_by_key(|s| s.key());
    for slot in slots {
        slot.key().hash(hasher);
        slot.current().len().hash(hasher);
        // Fold values order-independently.
        let mut acc: u64 = 0;
        for value in slot.current() {
            let mut value_hasher = DefaultHasher::new();
            hash_value(graph, value, visited, &mut value_hasher);
            acc = acc.wrapping_add(value_hasher.finish());
        }
        acc.hash(hasher);
    }
}

fn hash_concept(frame: &ConceptFrame, hasher: &mut DefaultHasher) {
    match frame {
        ConceptFrame::Atomic(id) => {
            1u8.hash(hasher);
            id.hash(hasher);
        }
        ConceptFrame::Disjunction(d) => {
            2u8.hash(hasher);
            let mut ids = d.disjuncts().to_vec();
            ids.sort();
            ids.hash(hasher);
        }
        ConceptFrame::Extension(e) => {
            3u8.hash(hasher);
            e.base().hash(hasher);
            if e.is_concrete() {
                e.serial().hash(hasher);
            }
        }
    }
}

fn hash_value(
    graph: &InstanceGraph,
    value: &InstanceValue,
    visited: &mut HashSet<InstanceId>,
    hasher: &mut DefaultHasher,
) {
    match value {
        InstanceValue::Frame(target) => {
            10u8.hash(hasher);
            hash_frame(graph, *target, visited, hasher);
        }
        InstanceValue::Concept(cf) => {
            11u8.hash(hasher);
            hash_concept(cf, hasher);
        }
        InstanceValue::Number(range) => {
            12u8.hash(hasher);
            range.min().map(|n| n.as_f64().to_bits()).hash(hasher);
            range.max().map(|n| n.as_f64().to_bits()).hash(hasher);
        }
        InstanceValue::Text(text) => {
            13u8.hash(hasher);
            text.hash(hasher);
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion to extension
// ---------------------------------------------------------------------------

/// Flatten an instance frame into a concept-level extension of its type.
///
/// Frame-valued entries flatten recursively; any reference cycle is rejected
/// with an error, detected via an explicit visited stack.
pub fn to_extension(graph: &InstanceGraph, id: InstanceId) -> KbResult<ConceptFrame> {
    let mut stack: Vec<InstanceId> = Vec::new();
    to_extension_inner(graph, id, &mut stack)
}

fn to_extension_inner(
    graph: &InstanceGraph,
    id: InstanceId,
    stack: &mut Vec<InstanceId>,
) -> KbResult<ConceptFrame> {
    let arena = graph.model().arena();
    if stack.contains(&id) {
        return Err(InstanceError::CyclicInstanceGraph {
            frame: graph
                .frame(id)
                .map(|f| f.frame_type().describe(arena))
                .unwrap_or_else(|_| id.to_string()),
        }
        .into());
    }
    stack.push(id);

    let frame = graph.frame(id)?;
    let base = frame
        .frame_type()
        .atomic_projection(arena)
        .unwrap_or_else(|| arena.root());
    let mut fixed = FixedValues::new();
    for slot in value_bearing(frame.slots()) {
        for value in slot.current() {
            let concept_value = match value {
                InstanceValue::Number(range) => ConceptValue::Number(*range),
                InstanceValue::Text(text) => ConceptValue::Text(text.clone()),
                InstanceValue::Concept(cf) => ConceptValue::Frame(cf.clone()),
                InstanceValue::Frame(target) => {
                    ConceptValue::Frame(to_extension_inner(graph, *target, stack)?)
                }
            };
            fixed.absorb(slot.key(), concept_value, Source::Indirect, arena);
        }
    }

    stack.pop();
    graph.model().extend(base, fixed)
}
