//! Build-time hierarchy normaliser.
//!
//! Runs once per model build, in three passes whose order is load-bearing:
//!
//! 1. all-visibility redundant-edge elimination,
//! 2. exposed-connectivity repair (hidden ancestors' exposed supers get
//!    linked directly to each exposed frame),
//! 3. redundant-edge elimination restricted to the exposed view.
//!
//! Any other order leaves either a disconnected exposed view or un-removed
//! redundant edges.

use crate::error::KbResult;
use crate::ident::{FrameId, Visibility, VisibilityFilter};

use super::arena::FrameArena;
use super::crawler::{self, Direction};

/// Edge changes made by a [`normalise`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormaliseReport {
    /// Direct super-links removed in the all-visibility pass.
    pub redundant_removed: usize,
    /// Direct super-links added by exposed-connectivity repair.
    pub repair_links_added: usize,
    /// Direct super-links removed in the exposed-only pass.
    pub exposed_removed: usize,
}

impl NormaliseReport {
    /// Total number of edge changes.
    pub fn changes(&self) -> usize {
        self.redundant_removed + self.repair_links_added + self.exposed_removed
    }

    /// Whether the run changed nothing (idempotence witness).
    pub fn is_noop(&self) -> bool {
        self.changes() == 0
    }
}

/// Normalise the hierarchy: minimal direct edges, connected exposed view.
pub fn normalise(arena: &FrameArena) -> KbResult<NormaliseReport> {
    let mut report = NormaliseReport::default();
    report.redundant_removed = remove_redundant_edges(arena, VisibilityFilter::All)?;
    report.repair_links_added = repair_exposed_connectivity(arena)?;
    report.exposed_removed = remove_redundant_edges(arena, VisibilityFilter::ExposedOnly)?;
    tracing::info!(
        removed = report.redundant_removed,
        repaired = report.repair_links_added,
        exposed_removed = report.exposed_removed,
        "hierarchy normalised"
    );
    Ok(report)
}

/// Remove direct super-links that are also reachable through another direct
/// super of the same frame, under the given visibility filter.
fn remove_redundant_edges(arena: &FrameArena, filter: VisibilityFilter) -> KbResult<usize> {
    let mut removed = 0;
    for frame in arena.frame_ids() {
        if filter == VisibilityFilter::ExposedOnly
            && arena.visibility_of(frame) != Some(Visibility::Exposed)
        {
            continue;
        }
        let supers = match filter {
            VisibilityFilter::All => arena.supers_of(frame),
            _ => arena.supers_filtered(frame, filter),
        };
        for sup in &supers {
            let implied_elsewhere = supers.iter().any(|other| {
                other != sup && crawler::reaches(arena, *other, Direction::Up, filter, *sup)
            });
            if implied_elsewhere {
                arena.remove_super(frame, *sup)?;
                removed += 1;
            }
        }
    }
    Ok(removed)
}

/// For each exposed frame, link it directly to the exposed supers of every
/// hidden ancestor, so the exposed-only view stays a connected DAG once
/// hidden frames are excluded from traversal.
fn repair_exposed_connectivity(arena: &FrameArena) -> KbResult<usize> {
    let mut added = 0;
    for frame in arena.frame_ids() {
        if arena.visibility_of(frame) != Some(Visibility::Exposed) {
            continue;
        }
        let hidden_ancestors: Vec<FrameId> = arena
            .ancestors(frame, VisibilityFilter::All)
            .iter()
            .filter(|a| arena.visibility_of(*a) == Some(Visibility::Hidden))
            .collect();
        for hidden in hidden_ancestors {
            for exposed_super in arena.supers_filtered(hidden, VisibilityFilter::ExposedOnly) {
                if !arena.supers_of(frame).contains(&exposed_super) {
                    arena.add_super(frame, exposed_super)?;
                    added += 1;
                }
            }
        }
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::{Identity, Source};

    fn arena_with(names: &[&str]) -> (FrameArena, Vec<FrameId>) {
        let arena = FrameArena::new().unwrap();
        let ids = names
            .iter()
            .map(|n| {
                arena
                    .add_frame(Identity::new(*n), Visibility::Exposed, Source::Direct)
                    .unwrap()
            })
            .collect();
        (arena, ids)
    }

    #[test]
    fn transitive_direct_edge_is_removed() {
        // c -> b -> a, plus the redundant direct edge c -> a.
        let (arena, ids) = arena_with(&["a", "b", "c"]);
        arena.add_super(ids[1], ids[0]).unwrap();
        arena.add_super(ids[2], ids[1]).unwrap();
        arena.add_super(ids[2], ids[0]).unwrap();

        let report = normalise(&arena).unwrap();
        assert_eq!(report.redundant_removed, 1);
        assert_eq!(arena.supers_of(ids[2]), vec![ids[1]]);
        // Subsumption is unchanged by edge minimization.
        assert!(arena.subsumes(ids[0], ids[2]));
    }

    #[test]
    fn hidden_bridge_is_repaired_in_exposed_view() {
        // leaf -> hidden mid -> animal; the exposed view would lose leaf.
        let (arena, ids) = arena_with(&["animal", "mid", "leaf"]);
        arena.add_super(ids[1], ids[0]).unwrap();
        arena.add_super(ids[2], ids[1]).unwrap();
        arena.set_visibility(ids[1], Visibility::Hidden).unwrap();

        let before = crawler::collect(
            &arena,
            ids[2],
            Direction::Up,
            VisibilityFilter::ExposedOnly,
        );
        assert!(!before.contains(&ids[0]));

        let report = normalise(&arena).unwrap();
        assert!(report.repair_links_added >= 1);

        let after = crawler::collect(
            &arena,
            ids[2],
            Direction::Up,
            VisibilityFilter::ExposedOnly,
        );
        assert!(after.contains(&ids[0]));
        // The hidden frame is still a direct super in the all view.
        assert!(arena.supers_of(ids[2]).contains(&ids[1]));
    }

    #[test]
    fn exposed_pass_cleans_up_repair_overshoot() {
        // leaf -> h1 -> via -> top, plus a pre-existing direct leaf -> top.
        // Repair links leaf to via; the direct leaf -> top edge then becomes
        // redundant in the exposed view and must go.
        let (arena, ids) = arena_with(&["top", "via", "h1", "leaf"]);
        arena.add_super(ids[1], ids[0]).unwrap(); // via -> top
        arena.add_super(ids[2], ids[1]).unwrap(); // h1 -> via
        arena.add_super(ids[3], ids[2]).unwrap(); // leaf -> h1
        arena.add_super(ids[3], ids[0]).unwrap(); // leaf -> top (redundant)
        arena.set_visibility(ids[2], Visibility::Hidden).unwrap();

        let report = normalise(&arena).unwrap();
        assert!(report.exposed_removed >= 1 || report.redundant_removed >= 1);
        let exposed = arena.supers_filtered(ids[3], VisibilityFilter::ExposedOnly);
        assert_eq!(exposed, vec![ids[1]]);
    }

    #[test]
    fn normalisation_is_idempotent() {
        let (arena, ids) = arena_with(&["a", "b", "c", "h"]);
        arena.add_super(ids[1], ids[0]).unwrap();
        arena.add_super(ids[2], ids[1]).unwrap();
        arena.add_super(ids[2], ids[0]).unwrap();
        arena.add_super(ids[3], ids[0]).unwrap();
        arena.set_visibility(ids[3], Visibility::Hidden).unwrap();

        let first = normalise(&arena).unwrap();
        assert!(!first.is_noop());
        let second = normalise(&arena).unwrap();
        assert!(second.is_noop());
    }
}
