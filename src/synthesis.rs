//! Dynamic value-type frame synthesis.
//!
//! Produces cached hidden synthetic frames standing for the exact
//! combination "subtype of a super restricted to these subs", used when a
//! slot's value type must be narrowed without adding a visible concept.
//! This is the one hierarchy mutation path retained after model build.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

use crate::error::{KbResult, ModelError};
use crate::hierarchy::FrameArena;
use crate::ident::{FrameId, Identity};

/// Get-or-create cache of hidden synthetic frames, keyed by
/// `(super, sorted subs)`.
///
/// Creation is double-checked: cache miss, then an exclusive per-super lock,
/// then a recheck before inserting, so concurrent requests for the same key
/// are idempotent.
#[derive(Debug, Default)]
pub struct FrameSynthesizer {
    cache: DashMap<(FrameId, Vec<FrameId>), FrameId>,
    locks: DashMap<FrameId, Arc<Mutex<()>>>,
    counter: AtomicU64,
}

impl FrameSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The hidden synthetic frame below `sup` covering exactly `subs`,
    /// created on first request and reused thereafter.
    ///
    /// Every sub must already be subsumed by the super.
    pub fn get_or_create(
        &self,
        arena: &FrameArena,
        sup: FrameId,
        subs: &[FrameId],
    ) -> KbResult<FrameId> {
        let mut key_subs: Vec<FrameId> = subs.to_vec();
        key_subs.sort();
        key_subs.dedup();

        for sub in &key_subs {
            if !arena.subsumes(sup, *sub) || *sub == sup {
                return Err(ModelError::InvalidSynthesis {
                    super_frame: arena.label_of(sup),
                    sub: arena.label_of(*sub),
                }
                .into());
            }
        }

        let key = (sup, key_subs);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(*hit.value());
        }

        let lock = self
            .locks
            .entry(sup)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Recheck under the lock: another caller may have won the race.
        if let Some(hit) = self.cache.get(&key) {
            return Ok(*hit.value());
        }

        let id = self.create(arena, sup, &key.1)?;
        self.cache.insert(key, id);
        Ok(id)
    }

    fn create(&self, arena: &FrameArena, sup: FrameId, subs: &[FrameId]) -> KbResult<FrameId> {
        let serial = self.counter.fetch_add(1, Ordering::Relaxed);
        let name = format!("synth:{sup}:{serial}");
        let synth = arena.add_synthetic_frame(Identity::new(name))?;
        arena.add_super(synth, sup)?;
        for sub in subs {
            arena.add_super(*sub, synth)?;
        }
        tracing::debug!(
            synth = %synth,
            sup = %arena.label_of(sup),
            subs = subs.len(),
            "synthesized hidden frame"
        );
        Ok(synth)
    }

    /// Number of cached synthetic frames.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
