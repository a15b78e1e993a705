use std::sync::Arc;

use serde::Serialize;

use crate::collection::StoreState;
use crate::error::SyncError;

/// Where the store is in its optimistic update cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Nothing sent yet, or an error was cleared.
    #[default]
    Idle,
    /// An optimistic state is published and its persistence is in flight.
    Syncing,
    /// The last persistence request succeeded.
    Synced,
    /// The last persistence request failed and the state was reverted.
    RolledBack,
}

/// Observable synchronisation status of a [`SyncStore`](crate::SyncStore).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    pub phase: SyncPhase,
    pub pending: bool,
    pub last_error: Option<SyncError>,
}

/// How a single `mutate` call ended, from the caller's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// The action did not change the state; nothing was sent.
    Unchanged,
    /// Persistence succeeded and no newer mutation is pending.
    Synced,
    /// This request failed, or an earlier one failed before this one was sent.
    /// The state was reverted to the last confirmed state.
    RolledBack(SyncError),
    /// This request succeeded while newer mutations were still pending; the
    /// newest one decides the final phase.
    Superseded,
}

/// Internal bookkeeping guarded by the store's sync lock.
pub(crate) struct SyncSlot<R> {
    pub(crate) phase: SyncPhase,
    pub(crate) last_error: Option<SyncError>,
    /// Last state the remote confirmed. Held only while requests are queued
    /// or in flight; advanced by every confirmed request.
    pub(crate) confirmed: Option<Arc<StoreState<R>>>,
    /// Incremented by every mutation that queues a request.
    pub(crate) generation: u64,
    /// Generation of the last request that left the queue.
    pub(crate) finished: u64,
    /// Incremented by every rollback. Queued requests from an earlier epoch
    /// are never sent.
    pub(crate) epoch: u64,
    /// Error that ended the previous epoch.
    pub(crate) rollback_error: Option<SyncError>,
    /// `(generation, epoch)` of dropped mutations still waiting for their turn.
    pub(crate) abandoned: Vec<(u64, u64)>,
}

impl<R> Default for SyncSlot<R> {
    fn default() -> Self {
        SyncSlot {
            phase: SyncPhase::Idle,
            last_error: None,
            confirmed: None,
            generation: 0,
            finished: 0,
            epoch: 0,
            rollback_error: None,
            abandoned: Vec::new(),
        }
    }
}

impl<R> SyncSlot<R> {
    pub(crate) fn view(&self) -> SyncState {
        SyncState {
            phase: self.phase,
            pending: self.confirmed.is_some(),
            last_error: self.last_error.clone(),
        }
    }
}
