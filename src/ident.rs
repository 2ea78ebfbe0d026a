//! Core identifier types for the ontoframe engine.
//!
//! Every concept frame, slot, and instance frame is keyed by a niche-optimized
//! `NonZeroU64` newtype. The [`IdAllocator`] provides thread-safe monotonic
//! ID generation shared by the model and instance layers.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{KbResult, ModelError};

/// Unique identifier for a concept frame in the hierarchy.
///
/// Uses `NonZeroU64` so that `Option<FrameId>` is the same size as `FrameId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FrameId(NonZeroU64);

impl FrameId {
    /// Create a `FrameId` from a raw `u64`. Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(FrameId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame:{}", self.0)
    }
}

/// Unique identifier for a slot identity.
///
/// A slot key is shared by every frame that carries a slot of the same
/// identity; slot-type consistency checks and instance-slot matching are
/// keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SlotKey(NonZeroU64);

impl SlotKey {
    /// Create a `SlotKey` from a raw `u64`. Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(SlotKey)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot:{}", self.0)
    }
}

/// Unique identifier for an instance frame in an instance graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct InstanceId(NonZeroU64);

impl InstanceId {
    /// Create an `InstanceId` from a raw `u64`. Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(InstanceId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "inst:{}", self.0)
    }
}

/// Human-facing identity of a frame or slot: a unique name plus a display label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Unique name within its namespace (frame names, slot names).
    pub name: String,
    /// Display label; defaults to the name.
    pub label: String,
}

impl Identity {
    /// Create an identity whose label equals its name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let label = name.clone();
        Self { name, label }
    }

    /// Create an identity with a distinct display label.
    pub fn with_label(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Provenance tag recording where a frame or slot came from.
///
/// Used for merge decisions when the same entity is contributed by more than
/// one section builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Asserted directly by a model source.
    Direct,
    /// Derived indirectly (e.g. from an imported structure).
    Indirect,
    /// Contributed both directly and indirectly.
    Dual,
    /// Provenance unknown.
    #[default]
    Unspecified,
}

impl Source {
    /// Combine two provenance tags for a merged entity.
    ///
    /// Direct + Indirect yields Dual; Unspecified defers to the other tag.
    pub fn merge(self, other: Source) -> Source {
        use Source::*;
        match (self, other) {
            (Unspecified, s) | (s, Unspecified) => s,
            (a, b) if a == b => a,
            _ => Dual,
        }
    }

    /// Whether this tag records any direct assertion.
    pub fn is_direct(self) -> bool {
        matches!(self, Source::Direct | Source::Dual)
    }
}

/// Visibility of a concept frame in the hierarchy.
///
/// Hidden frames participate in subsumption but are excluded from
/// exposed-only traversals and queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    /// Visible to clients of the model.
    #[default]
    Exposed,
    /// Internal frame (synthetic or deliberately hidden).
    Hidden,
}

/// Visibility filter applied to hierarchy crawls and closure queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisibilityFilter {
    /// Admit every frame.
    #[default]
    All,
    /// Admit only exposed frames.
    ExposedOnly,
    /// Admit only hidden frames.
    HiddenOnly,
}

impl VisibilityFilter {
    /// Whether a frame with the given visibility passes this filter.
    pub fn admits(self, visibility: Visibility) -> bool {
        match self {
            VisibilityFilter::All => true,
            VisibilityFilter::ExposedOnly => visibility == Visibility::Exposed,
            VisibilityFilter::HiddenOnly => visibility == Visibility::Hidden,
        }
    }
}

/// Thread-safe monotonic ID allocator.
///
/// Produces raw values starting from 1; safe to share via `Arc`.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Create a new allocator that starts from 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Create an allocator that resumes from a given value.
    pub fn starting_from(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start.max(1)),
        }
    }

    /// Allocate the next raw ID.
    ///
    /// Errors if the ID space is exhausted (after 2^64 - 1 allocations).
    pub fn next_raw(&self) -> KbResult<NonZeroU64> {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        NonZeroU64::new(raw).ok_or_else(|| ModelError::IdentifiersExhausted.into())
    }

    /// Allocate the next [`FrameId`].
    pub fn next_frame(&self) -> KbResult<FrameId> {
        Ok(FrameId(self.next_raw()?))
    }

    /// Allocate the next [`SlotKey`].
    pub fn next_slot_key(&self) -> KbResult<SlotKey> {
        Ok(SlotKey(self.next_raw()?))
    }

    /// Allocate the next [`InstanceId`].
    pub fn next_instance(&self) -> KbResult<InstanceId> {
        Ok(InstanceId(self.next_raw()?))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
