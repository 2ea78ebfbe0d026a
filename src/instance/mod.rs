//! Instance frames, slots, and the auto-update engine.

pub mod frame;
pub mod graph;
pub mod matcher;
pub mod slot;
pub mod update;
pub mod value;

pub use frame::{InstanceCategory, InstanceFrame, InstanceFunction};
pub use graph::InstanceGraph;
pub use matcher::{InstanceMatcher, MatcherRegistry};
pub use slot::InstanceSlot;
pub use update::{Reasoner, UpdateOps};
pub use value::InstanceValue;
