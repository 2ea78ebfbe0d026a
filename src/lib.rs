// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # ontoframe
//!
//! A frame-based knowledge-modeling engine: a concept frame hierarchy with
//! cached subsumption closures, a slot and value-type lattice, an
//! expression-frame algebra, and an instance model with a pluggable
//! reasoner-driven auto-update loop.
//!
//! ## Architecture
//!
//! - **Hierarchy** (`hierarchy`): atomic frame DAG, generic crawler,
//!   subsumption cache, build-time normaliser
//! - **Lattice** (`lattice`): slots, cardinalities, value types with
//!   subsumption/intersection, fixed default slot-values
//! - **Expressions** (`expression`): disjunction and extension frames over
//!   atomic frames
//! - **Synthesis** (`synthesis`): cached hidden frames for exact
//!   (super, subs) value-type restrictions
//! - **Model** (`model`): build lifecycle, section builders, validation
//! - **Instances** (`instance`): instance frames/slots, auto-update engine,
//!   matcher plugins
//! - **Structural matchers** (`structural`): cycle-safe equality,
//!   subsumption, hashing, and flattening over instance graphs
//!
//! ## Library usage
//!
//! ```no_run
//! use ontoframe::expression::ConceptFrame;
//! use ontoframe::ident::{Identity, Source, Visibility};
//! use ontoframe::instance::InstanceGraph;
//! use ontoframe::model::{ConceptModel, ModelBuilder, SectionBuilder};
//! use std::sync::Arc;
//!
//! struct Animals;
//! impl SectionBuilder for Animals {
//!     fn name(&self) -> &str {
//!         "animals"
//!     }
//!     fn build(&self, b: &ModelBuilder<'_>) -> ontoframe::error::KbResult<()> {
//!         let animal = b.add_frame(Identity::new("animal"), Visibility::Exposed, Source::Direct)?;
//!         let dog = b.add_frame(Identity::new("dog"), Visibility::Exposed, Source::Direct)?;
//!         b.add_super(dog, animal)?;
//!         Ok(())
//!     }
//! }
//!
//! let model = Arc::new(ConceptModel::new().unwrap());
//! model.build(&[&Animals]).unwrap();
//! let dog = model.arena().require("dog").unwrap();
//! let mut graph = InstanceGraph::new(model);
//! let rex = graph.create_assertion(ConceptFrame::atomic(dog)).unwrap();
//! assert!(graph.contains(rex));
//! ```

pub mod annotation;
pub mod error;
pub mod events;
pub mod expression;
pub mod hierarchy;
pub mod ident;
pub mod instance;
pub mod lattice;
pub mod model;
pub mod structural;
pub mod synthesis;
