#![forbid(unsafe_code)]

//! Patch-producing state store.
//!
//! [`Store`] owns the state tree in two synchronized forms: a canonical
//! JSON value tree (the patch target) and a typed [`Arc`] snapshot that
//! consumers hold read-only. A mutation runs a producer against a
//! [`Draft`] of the value tree and yields the forward/inverse patch lists
//! recorded by the draft; undo/redo replays such lists through
//! [`apply`](Store::apply).
//!
//! # Invariants
//!
//! 1. The snapshot always deserializes from the current value tree; it is
//!    swapped atomically (by reference) after every mutation, so readers
//!    see either the fully-old or fully-new state, never a partial one.
//! 2. A single synchronous, payload-free notification is broadcast after
//!    every successful `mutate`/`apply`; subscribers re-read state on
//!    demand.
//! 3. All mutation entry points are synchronous calls on a single thread;
//!    no locking discipline is required.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::draft::Draft;
use crate::patch::{Patch, PatchError, apply_patches};

/// Handle returned by [`Store::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Result of one mutation: the patch pair describing exactly what changed.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    /// Patches that replay the mutation on the pre-mutation snapshot.
    pub forward: Vec<Patch>,
    /// Patches that revert the mutation on the post-mutation snapshot.
    pub inverse: Vec<Patch>,
}

impl MutationOutcome {
    /// True when the producer changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.forward.is_empty()
    }
}

/// Versioned state container producing structural patches.
pub struct Store<S> {
    value: Value,
    snapshot: Arc<S>,
    subscribers: Vec<(SubscriptionId, Box<dyn Fn()>)>,
    next_subscription: u64,
}

impl<S: fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("snapshot", &self.snapshot)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<S: Serialize + DeserializeOwned> Store<S> {
    /// Create a store owning `state`.
    #[must_use]
    pub fn new(state: S) -> Self {
        let value = serde_json::to_value(&state).expect("state must serialize to a value tree");
        Self {
            value,
            snapshot: Arc::new(state),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// The current typed snapshot. Cheap to clone; never mutated in place.
    #[must_use]
    pub fn state(&self) -> Arc<S> {
        Arc::clone(&self.snapshot)
    }

    /// The current canonical value tree.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Run `produce` against a draft of the current state.
    ///
    /// The producer receives the pre-mutation snapshot for reads and a
    /// [`Draft`] for writes. Returns the recorded patch pair; an empty
    /// pair means the producer was a no-op (no snapshot swap, but the
    /// change notification still fires).
    pub fn mutate<F>(&mut self, produce: F) -> MutationOutcome
    where
        F: FnOnce(&S, &mut Draft<'_>),
    {
        let snapshot = Arc::clone(&self.snapshot);
        let mut draft = Draft::new(&mut self.value);
        produce(&snapshot, &mut draft);
        let (forward, inverse) = draft.finish();

        if !forward.is_empty() {
            self.refresh_snapshot();
        }
        tracing::debug!(patches = forward.len(), "store mutation");
        self.notify();
        MutationOutcome { forward, inverse }
    }

    /// Apply a patch list produced by an earlier mutation (undo/redo).
    pub fn apply(&mut self, patches: &[Patch]) -> Result<(), PatchError> {
        apply_patches(&mut self.value, patches)?;
        self.refresh_snapshot();
        tracing::debug!(patches = patches.len(), "store apply");
        self.notify();
        Ok(())
    }

    /// Register a change callback; fired synchronously, no payload.
    pub fn subscribe(&mut self, callback: impl Fn() + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Drop the subscription with the given id, if still registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sub, _)| *sub != id);
    }

    fn refresh_snapshot(&mut self) {
        match serde_json::from_value(self.value.clone()) {
            Ok(state) => self.snapshot = Arc::new(state),
            Err(err) => panic!("state tree no longer deserializes after mutation: {err}"),
        }
    }

    fn notify(&self) {
        for (_, callback) in &self.subscribers {
            callback();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Path;
    use serde::Deserialize;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        title: String,
        tags: Vec<String>,
    }

    fn doc() -> Doc {
        Doc {
            title: "term 1".into(),
            tags: vec!["maths".into()],
        }
    }

    #[test]
    fn mutate_swaps_snapshot_and_reports_patches() {
        let mut store = Store::new(doc());
        let before = store.state();

        let outcome = store.mutate(|_, draft| {
            draft.set(Path::root().key("title"), json!("term 2"));
        });

        assert_eq!(outcome.forward.len(), 1);
        assert_eq!(store.state().title, "term 2");
        // The old snapshot is untouched.
        assert_eq!(before.title, "term 1");
    }

    #[test]
    fn forward_and_inverse_replay_bit_for_bit() {
        let mut store = Store::new(doc());
        let old_value = store.value().clone();

        let outcome = store.mutate(|_, draft| {
            draft.set(Path::root().key("title"), json!("term 2"));
            draft.push(Path::root().key("tags"), json!("physique"));
        });
        let new_value = store.value().clone();

        let mut replay = old_value.clone();
        apply_patches(&mut replay, &outcome.forward).unwrap();
        assert_eq!(replay, new_value);
        apply_patches(&mut replay, &outcome.inverse).unwrap();
        assert_eq!(replay, old_value);
    }

    #[test]
    fn noop_mutation_reports_empty_patches() {
        let mut store = Store::new(doc());
        let outcome = store.mutate(|_, draft| {
            draft.set(Path::root().key("title"), json!("term 1"));
        });
        assert!(outcome.is_noop());
        assert!(outcome.inverse.is_empty());
    }

    #[test]
    fn apply_rolls_state_back() {
        let mut store = Store::new(doc());
        let outcome = store.mutate(|_, draft| {
            draft.set(Path::root().key("title"), json!("term 2"));
        });
        store.apply(&outcome.inverse).unwrap();
        assert_eq!(store.state().title, "term 1");
    }

    #[test]
    fn notification_fires_on_mutate_and_apply() {
        let mut store = Store::new(doc());
        let hits = Rc::new(Cell::new(0));
        let seen = Rc::clone(&hits);
        store.subscribe(move || seen.set(seen.get() + 1));

        let outcome = store.mutate(|_, draft| {
            draft.set(Path::root().key("title"), json!("term 2"));
        });
        assert_eq!(hits.get(), 1);
        store.apply(&outcome.inverse).unwrap();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let mut store = Store::new(doc());
        let hits = Rc::new(Cell::new(0));
        let seen = Rc::clone(&hits);
        let id = store.subscribe(move || seen.set(seen.get() + 1));
        store.unsubscribe(id);

        store.mutate(|_, draft| {
            draft.set(Path::root().key("title"), json!("x"));
        });
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn producer_reads_pre_mutation_snapshot() {
        let mut store = Store::new(doc());
        store.mutate(|state, draft| {
            assert_eq!(state.title, "term 1");
            draft.set(Path::root().key("title"), json!("term 2"));
            // The snapshot view is the pre-mutation one throughout.
            assert_eq!(state.title, "term 1");
        });
        assert_eq!(store.state().title, "term 2");
    }
}
