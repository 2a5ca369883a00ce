//! Snapshot, optimistic apply, then commit or roll back.
//!
//! The view lives in a `watch` channel, so the snapshot and the optimistic
//! mutation happen under one lock and observers never see a half-applied state.

use tokio::sync::watch;

/// Values captured before an optimistic change. Restored verbatim on rollback,
/// never recomputed from the current view.
#[derive(Debug)]
#[must_use = "an optimistic change must be committed or rolled back"]
pub struct Optimistic<S> {
    snapshot: S,
}

impl<S> Optimistic<S> {
    /// Runs `apply` against the current view. `apply` returns the snapshot when
    /// its preconditions hold and it mutated the view, `None` to leave it alone.
    pub fn begin<T>(
        state: &watch::Sender<T>,
        apply: impl FnOnce(&mut T) -> Option<S>,
    ) -> Option<Self> {
        let mut snapshot = None;
        state.send_if_modified(|view| match apply(view) {
            Some(captured) => {
                snapshot = Some(captured);
                true
            }
            None => false,
        });
        snapshot.map(|snapshot| Self { snapshot })
    }

    pub fn snapshot(&self) -> &S {
        &self.snapshot
    }

    /// The optimistic state stands; `settle` only clears bookkeeping.
    pub fn commit<T>(self, state: &watch::Sender<T>, settle: impl FnOnce(&mut T)) {
        state.send_modify(settle);
    }

    pub fn rollback<T>(self, state: &watch::Sender<T>, restore: impl FnOnce(&mut T, S)) {
        let snapshot = self.snapshot;
        state.send_modify(move |view| restore(view, snapshot));
    }
}
