//! Forwarding of store changes to an `event_emitter_rs::EventEmitter`.
//!
//! Requires the `emitter` feature. Store subscribers run synchronously on the
//! publishing thread; emitter listeners run on their own threads, which suits
//! consumers that must not block a mutation (audit logs, UI bridges).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use event_emitter_rs::EventEmitter;
use serde_json::json;
use tracing::warn;

use crate::collection::Record;
use crate::notifier::Subscription;
use crate::sync::SyncStore;
use crate::transport::Transport;

/// Event carrying the newly published state as JSON.
pub const STATE_CHANGED: &str = "state.changed";
/// Event carrying `{"phase", "pending", "error"}` as JSON.
pub const SYNC_CHANGED: &str = "sync.changed";

/// Subscribes to a [`SyncStore`] and re-emits every change on an
/// [`EventEmitter`].
///
/// # Example
///
/// ```ignore
/// let bridge = EmitterBridge::attach(&store);
///
/// bridge.on(SYNC_CHANGED, |data| {
///     println!("sync: {}", data);
/// });
/// ```
pub struct EmitterBridge {
    emitter: Arc<Mutex<EventEmitter>>,
    subscriptions: Vec<Subscription>,
}

impl EmitterBridge {
    /// Attach a fresh emitter to `store`.
    pub fn attach<R: Record, T: Transport>(store: &SyncStore<R, T>) -> Self {
        Self::with_emitter(store, EventEmitter::new())
    }

    /// Attach an existing emitter to `store`.
    pub fn with_emitter<R: Record, T: Transport>(
        store: &SyncStore<R, T>,
        emitter: EventEmitter,
    ) -> Self {
        let emitter = Arc::new(Mutex::new(emitter));

        let state_emitter = Arc::clone(&emitter);
        let state_subscription = store.subscribe(move |state| {
            match serde_json::to_string(state.as_ref()) {
                Ok(data) => {
                    lock(&state_emitter).emit(STATE_CHANGED, data);
                }
                Err(err) => warn!(error = %err, "state not forwarded to emitter"),
            }
        });

        let sync_emitter = Arc::clone(&emitter);
        let sync_subscription = store.subscribe_sync(move |sync| {
            let data = json!({
                "phase": sync.phase,
                "pending": sync.pending,
                "error": sync.last_error.as_ref().map(|err| err.message()),
            });
            lock(&sync_emitter).emit(SYNC_CHANGED, data.to_string());
        });

        EmitterBridge {
            emitter,
            subscriptions: vec![state_subscription, sync_subscription],
        }
    }

    /// Register a listener for [`STATE_CHANGED`] or [`SYNC_CHANGED`].
    pub fn on<F>(&self, event: &str, listener: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        lock(&self.emitter).on(event, listener);
    }

    /// Stop forwarding. Listeners already registered stay on the emitter.
    pub fn detach(self) {
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
    }
}

fn lock(emitter: &Mutex<EventEmitter>) -> MutexGuard<'_, EventEmitter> {
    emitter.lock().unwrap_or_else(PoisonError::into_inner)
}
