//! Generic depth-first hierarchy crawler.
//!
//! Everything upward/downward in the hierarchy layer is built on [`crawl`]:
//! a visited-set DFS over super- or sub-links with three termination modes.
//! The visited set is keyed by frame id, so multi-inheritance diamonds are
//! visited once and termination is guaranteed on any DAG.

use std::collections::HashSet;

use crate::ident::{FrameId, VisibilityFilter};

use super::arena::FrameArena;

/// Per-visit verdict returned by a crawl visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStep {
    /// Continue into this frame's neighbors.
    Continue,
    /// Stop exploring this branch but continue the overall walk.
    PruneBranch,
    /// Stop the entire walk (early-exit existence checks).
    Halt,
}

/// Traversal direction over the hierarchy DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow super-links (towards the root).
    Up,
    /// Follow sub-links (towards the leaves).
    Down,
}

fn neighbors(arena: &FrameArena, frame: FrameId, direction: Direction) -> Vec<FrameId> {
    match direction {
        Direction::Up => arena.supers_of(frame),
        Direction::Down => arena.subs_of(frame),
    }
}

/// Depth-first crawl from `start` (exclusive), visiting each reachable frame
/// at most once.
///
/// Frames rejected by the visibility filter are neither visited nor crawled
/// through — an exposed-only crawl cannot pass through a hidden frame.
/// Returns `true` if the visitor halted the walk.
pub fn crawl(
    arena: &FrameArena,
    start: FrameId,
    direction: Direction,
    filter: VisibilityFilter,
    mut visit: impl FnMut(FrameId) -> CrawlStep,
) -> bool {
    let mut visited: HashSet<FrameId> = HashSet::new();
    visited.insert(start);
    let mut stack: Vec<FrameId> = neighbors(arena, start, direction);

    while let Some(frame) = stack.pop() {
        if !visited.insert(frame) {
            continue;
        }
        let Some(visibility) = arena.visibility_of(frame) else {
            continue;
        };
        if !filter.admits(visibility) {
            continue;
        }
        match visit(frame) {
            CrawlStep::Continue => stack.extend(neighbors(arena, frame, direction)),
            CrawlStep::PruneBranch => {}
            CrawlStep::Halt => return true,
        }
    }
    false
}

/// Whether `target` is reachable from `start` in the given direction.
pub fn reaches(
    arena: &FrameArena,
    start: FrameId,
    direction: Direction,
    filter: VisibilityFilter,
    target: FrameId,
) -> bool {
    crawl(arena, start, direction, filter, |frame| {
        if frame == target {
            CrawlStep::Halt
        } else {
            CrawlStep::Continue
        }
    })
}

/// Collect every frame reachable from `start`, in visit order.
pub fn collect(
    arena: &FrameArena,
    start: FrameId,
    direction: Direction,
    filter: VisibilityFilter,
) -> Vec<FrameId> {
    let mut out = Vec::new();
    crawl(arena, start, direction, filter, |frame| {
        out.push(frame);
        CrawlStep::Continue
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::{Identity, Source, Visibility};

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
    fn upward_crawl_reaches_all_ancestors() {
        // a <- b <- c
        let (arena, ids) = arena_with(&["a", "b", "c"]);
        arena.add_super(ids[1], ids[0]).unwrap();
        arena.add_super(ids[2], ids[1]).unwrap();

        let up = collect(&arena, ids[2], Direction::Up, VisibilityFilter::All);
        assert!(up.contains(&ids[1]));
        assert!(up.contains(&ids[0]));
        assert!(up.contains(&arena.root()));
        assert_eq!(up.len(), 3);
    }

    #[test]
    fn diamond_visits_shared_ancestor_once() {
        // d -> b -> a, d -> c -> a
        let (arena, ids) = arena_with(&["a", "b", "c", "d"]);
        arena.add_super(ids[1], ids[0]).unwrap();
        arena.add_super(ids[2], ids[0]).unwrap();
        arena.add_super(ids[3], ids[1]).unwrap();
        arena.add_super(ids[3], ids[2]).unwrap();

        let mut visits = 0;
        crawl(
            &arena,
            ids[3],
            Direction::Up,
            VisibilityFilter::All,
            |frame| {
                if frame == ids[0] {
                    visits += 1;
                }
                CrawlStep::Continue
            },
        );
        assert_eq!(visits, 1);
    }

    #[test]
    fn prune_branch_skips_neighbors_but_continues() {
        // c -> b -> a; c -> x
        let (arena, ids) = arena_with(&["a", "b", "c", "x"]);
        arena.add_super(ids[1], ids[0]).unwrap();
        arena.add_super(ids[2], ids[1]).unwrap();
        arena.add_super(ids[2], ids[3]).unwrap();

        let mut seen = Vec::new();
        crawl(
            &arena,
            ids[2],
            Direction::Up,
            VisibilityFilter::All,
            |frame| {
                seen.push(frame);
                if frame == ids[1] {
                    CrawlStep::PruneBranch
                } else {
                    CrawlStep::Continue
                }
            },
        );
        // a is only reachable through the pruned branch.
        assert!(!seen.contains(&ids[0]));
        assert!(seen.contains(&ids[3]));
    }

    #[test]
    fn halt_stops_the_walk() {
        let (arena, ids) = arena_with(&["a", "b", "c"]);
        arena.add_super(ids[1], ids[0]).unwrap();
        arena.add_super(ids[2], ids[1]).unwrap();

        assert!(reaches(
            &arena,
            ids[2],
            Direction::Up,
            VisibilityFilter::All,
            ids[0]
        ));
        assert!(!reaches(
            &arena,
            ids[0],
            Direction::Up,
            VisibilityFilter::All,
            ids[2]
        ));
    }

    #[test]
    fn exposed_crawl_does_not_pass_through_hidden_frames() {
        // c -> hidden -> a
        let (arena, ids) = arena_with(&["a", "h", "c"]);
        arena.add_super(ids[1], ids[0]).unwrap();
        arena.add_super(ids[2], ids[1]).unwrap();
        arena.set_visibility(ids[1], Visibility::Hidden).unwrap();

        let up = collect(&arena, ids[2], Direction::Up, VisibilityFilter::ExposedOnly);
        assert!(!up.contains(&ids[1]));
        // a is unreachable without passing through the hidden frame.
        assert!(!up.contains(&ids[0]));

        let hidden_only = collect(&arena, ids[2], Direction::Up, VisibilityFilter::HiddenOnly);
        assert_eq!(hidden_only, vec![ids[1]]);
    }
}
