//! Model event dispatch: build/frame/slot notifications.
//!
//! Listeners are notified in registration order from a snapshot copy of the
//! listener list, so a listener may register or unregister listeners during
//! notification without affecting the current dispatch wave.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::ident::{FrameId, SlotKey};

/// An event raised by the concept model during the build phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    /// A frame was added to the hierarchy.
    FrameAdded(FrameId),
    /// A frame was removed (links detached, children rewired).
    FrameRemoved(FrameId),
    /// A slot was added to a frame.
    SlotAdded { frame: FrameId, slot: SlotKey },
    /// The model build completed: hierarchy normalised, caches optimized.
    BuildComplete,
}

/// Observer of model events.
pub trait ModelListener: Send + Sync {
    fn on_event(&self, event: &ModelEvent);
}

/// Token returned by [`ListenerSet::register`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

/// Registration-ordered listener list with snapshot dispatch.
#[derive(Default)]
pub struct ListenerSet {
    listeners: Mutex<Vec<(u64, Arc<dyn ModelListener>)>>,
    next_token: AtomicU64,
}

impl ListenerSet {
    /// Create an empty listener set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; later listeners are notified after earlier ones.
    pub fn register(&self, listener: Arc<dyn ModelListener>) -> ListenerToken {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((token, listener));
        ListenerToken(token)
    }

    /// Unregister a previously registered listener. No-op if already removed.
    pub fn unregister(&self, token: ListenerToken) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(t, _)| *t != token.0);
    }

    /// Notify all listeners in registration order.
    ///
    /// The list is snapshot-copied before iteration, so re-entrant
    /// registration changes only affect later waves.
    pub fn notify(&self, event: &ModelEvent) {
        let snapshot: Vec<Arc<dyn ModelListener>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in snapshot {
            listener.on_event(event);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Counter {
        count: AtomicUsize,
    }

    impl ModelListener for Counter {
        fn on_event(&self, _event: &ModelEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn notify_reaches_all_listeners() {
        let set = ListenerSet::new();
        let a = Arc::new(Counter {
            count: AtomicUsize::new(0),
        });
        let b = Arc::new(Counter {
            count: AtomicUsize::new(0),
        });
        set.register(a.clone());
        set.register(b.clone());

        set.notify(&ModelEvent::BuildComplete);
        assert_eq!(a.count.load(Ordering::SeqCst), 1);
        assert_eq!(b.count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregister_stops_notifications() {
        let set = ListenerSet::new();
        let a = Arc::new(Counter {
            count: AtomicUsize::new(0),
        });
        let token = set.register(a.clone());
        set.notify(&ModelEvent::BuildComplete);
        set.unregister(token);
        set.notify(&ModelEvent::BuildComplete);
        assert_eq!(a.count.load(Ordering::SeqCst), 1);
        assert!(set.is_empty());
    }

    struct SelfRegistering {
        set: Arc<ListenerSet>,
        fired: AtomicUsize,
    }

    impl ModelListener for SelfRegistering {
        fn on_event(&self, _event: &ModelEvent) {
            self.fired.fetch_add(1, Ordering::SeqCst);
            // Registering during dispatch must not affect the current wave.
            self.set.register(Arc::new(Counter {
                count: AtomicUsize::new(0),
            }));
        }
    }

    #[test]
    fn reentrant_registration_does_not_affect_current_wave() {
        let set = Arc::new(ListenerSet::new());
        let listener = Arc::new(SelfRegistering {
            set: Arc::clone(&set),
            fired: AtomicUsize::new(0),
        });
        set.register(listener.clone());

        set.notify(&ModelEvent::BuildComplete);
        assert_eq!(listener.fired.load(Ordering::SeqCst), 1);
        assert_eq!(set.len(), 2);
    }
}
