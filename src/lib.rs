//! Optimistic local stores kept consistent with a remote collection.
//!
//! - [`Reducer`] / [`ReducerStore`]: pure transitions over a [`Collection`].
//! - [`RequestExecutor`]: one endpoint's loading/data/error state.
//! - [`SyncStore`]: applies actions immediately, persists them, and rolls
//!   back when persistence fails.
//! - [`Notifier`]: synchronous change subscriptions for view layers.

mod collection;
#[cfg(feature = "emitter")]
mod emitter;
mod error;
mod executor;
mod notifier;
mod reducer;
mod reveal;
mod sync;
mod transport;

pub use collection::{Collection, Entry, Record, StoreState};
#[cfg(feature = "emitter")]
pub use emitter::{EmitterBridge, STATE_CHANGED, SYNC_CHANGED};
pub use error::{SyncError, TransportError};
pub use executor::{Outcome, RequestExecutor, RequestStatus, DEFAULT_FALLBACK_MESSAGE};
pub use notifier::{Notifier, Subscription};
pub use reducer::{reduce, Action, DuplicatePolicy, InsertPosition, Reducer, ReducerStore};
pub use reveal::{AnswerCycle, AnswerPhase, RevealTimings};
pub use sync::{MutationOutcome, PayloadMode, StoreConfig, SyncPhase, SyncState, SyncStore};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{
    Endpoint, InMemoryRemote, Method, Reply, ReplyOutcome, Request, Response, Transport,
};

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
