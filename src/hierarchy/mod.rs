//! Concept frame hierarchy: atomic frames, the frame arena, traversal,
//! subsumption closures, and the build-time normaliser.
//!
//! The hierarchy is a DAG of [`AtomicFrame`] nodes rooted at a single root
//! frame, stored in a [`FrameArena`] and addressed by [`crate::ident::FrameId`].
//! All upward/downward algorithms are built on the generic [`crawler`], and
//! repeated closure queries are served by the [`subsumption`] cache.

pub mod arena;
pub mod crawler;
pub mod frame;
pub mod normalise;
pub mod subsumption;

pub use arena::FrameArena;
pub use crawler::{CrawlStep, Direction};
pub use frame::AtomicFrame;
pub use normalise::{NormaliseReport, normalise};
pub use subsumption::FrameSet;
