use std::sync::Arc;

use tracing::debug;

use crate::collection::{Record, StoreState};
use crate::notifier::{Published, Subscription};

use super::{Action, Reducer};

/// In-memory store that owns the canonical state and dispatches actions
/// through a [`Reducer`].
///
/// Observers receive `Arc<StoreState>` snapshots; the store never hands out
/// a mutable handle. A dispatch that leaves the state structurally unchanged
/// publishes nothing. When several threads dispatch at once, observers may
/// skip intermediate states but always end on the current one.
pub struct ReducerStore<R: Record> {
    reducer: Reducer,
    state: Published<Arc<StoreState<R>>>,
}

impl<R: Record> Default for ReducerStore<R> {
    fn default() -> Self {
        Self::new(Reducer::default())
    }
}

impl<R: Record> ReducerStore<R> {
    pub fn new(reducer: Reducer) -> Self {
        Self::with_state(reducer, StoreState::empty())
    }

    /// Start from a server-seeded or restored state.
    pub fn with_state(reducer: Reducer, state: StoreState<R>) -> Self {
        ReducerStore {
            reducer,
            state: Published::new(Arc::new(state)),
        }
    }

    pub fn reducer(&self) -> &Reducer {
        &self.reducer
    }

    /// Current state snapshot.
    pub fn state(&self) -> Arc<StoreState<R>> {
        self.state.get()
    }

    /// Apply `action` and publish the result. Returns the state it produced.
    pub fn dispatch(&self, action: &Action<R>) -> Arc<StoreState<R>> {
        let (_, next) = self.transition(action);
        self.flush();
        next
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Arc<StoreState<R>>) + Send + Sync + 'static,
    {
        self.state.subscribe(callback)
    }

    /// Compute and install the next state without notifying observers.
    ///
    /// Returns `(previous, next)`. When the action is a no-op both are the
    /// same `Arc` and nothing is installed.
    fn transition(
        &self,
        action: &Action<R>,
    ) -> (Arc<StoreState<R>>, Arc<StoreState<R>>) {
        self.state.update(|previous| {
            let next = self.reducer.reduce(previous, action);
            if next == **previous {
                debug!(action = action.kind(), "action left state unchanged");
                return (None, (Arc::clone(previous), Arc::clone(previous)));
            }
            let next = Arc::new(next);
            (Some(Arc::clone(&next)), (Arc::clone(previous), next))
        })
    }

    /// Install `state` wholesale without notifying observers.
    pub(crate) fn replace(&self, state: Arc<StoreState<R>>) {
        self.state.set(state);
    }

    /// Deliver the current state to observers if they have not seen it.
    pub(crate) fn flush(&self) {
        self.state.flush();
    }
}
