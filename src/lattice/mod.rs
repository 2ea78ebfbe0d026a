//! Slot and value-type lattice.
//!
//! Slots attach typed, cardinality-constrained value positions to atomic
//! frames. Value types form a subsumption order with pairwise intersection;
//! fixed default slot-values are stored per frame with absorption semantics.

pub mod fixed;
pub mod number;
pub mod slot;
pub mod text;
pub mod value_type;

pub use fixed::{ConceptValue, FixedValues};
pub use number::{Num, NumberKind, NumberRange};
pub use slot::{Cardinality, Slot};
pub use text::{TextFormat, TextFormatRegistry, TextValidator};
pub use value_type::ValueType;
