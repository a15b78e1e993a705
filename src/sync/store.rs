use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{json, Map, Value};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::collection::{Collection, Record, StoreState};
use crate::error::SyncError;
use crate::executor::{RequestExecutor, RequestStatus};
use crate::notifier::{Published, Subscription};
use crate::reducer::{Action, DuplicatePolicy, ReducerStore};
use crate::transport::Transport;

use super::config::{PayloadMode, StoreConfig};
use super::state::{MutationOutcome, SyncPhase, SyncSlot, SyncState};

/// Local collection that applies mutations optimistically and keeps them
/// consistent with a remote endpoint.
///
/// `mutate` publishes the reduced state before the persistence request is
/// sent. Requests go out one at a time, in the order the mutations were
/// made, and each confirmed request advances the last confirmed state. If a
/// request fails, that state is restored, every request still queued behind
/// it is dropped unsent, and the error is kept in [`SyncState::last_error`].
/// The published collection is therefore always either what the remote has
/// confirmed or an optimistic state built on top of it, in full and delta
/// payload mode alike.
///
/// Dropping a `mutate` future before it settles counts as a failure of its
/// request.
///
/// # Example
///
/// ```ignore
/// let store = SyncStore::new(
///     StoreConfig::new("http://localhost:3000/user-places").collection_key("places").prepend(),
///     HttpTransport::new(),
/// );
/// store.load().await?;
///
/// match store.mutate(Action::add(place)).await {
///     MutationOutcome::RolledBack(err) => show_error(err.message()),
///     _ => {}
/// }
/// ```
pub struct SyncStore<R: Record, T: Transport> {
    config: StoreConfig,
    local: ReducerStore<R>,
    persist: RequestExecutor<T, Value>,
    fetch: RequestExecutor<T, Value>,
    slot: Mutex<SyncSlot<R>>,
    sync: Published<SyncState>,
    turn: Notify,
}

/// A queued persistence request.
struct Ticket<R> {
    generation: u64,
    epoch: u64,
    action: Action<R>,
    next: Arc<StoreState<R>>,
}

/// Settles its ticket as cancelled if the owning `mutate` future is dropped.
struct InFlight<'a, R: Record, T: Transport> {
    store: &'a SyncStore<R, T>,
    ticket: Option<Ticket<R>>,
}

impl<R: Record, T: Transport> Drop for InFlight<'_, R, T> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.store.abandon(ticket);
        }
    }
}

impl<R: Record, T: Transport> SyncStore<R, T> {
    pub fn new(config: StoreConfig, transport: T) -> Self {
        Self::with_transport(config, Arc::new(transport))
    }

    /// Build a store on a transport shared with other stores or executors.
    pub fn with_transport(config: StoreConfig, transport: Arc<T>) -> Self {
        let persist = RequestExecutor::new(Arc::clone(&transport), config.persist_endpoint())
            .with_fallback_message(config.persist_fallback_message.clone());
        let fetch = RequestExecutor::new(transport, config.fetch_endpoint())
            .with_fallback_message(config.fetch_fallback_message.clone());

        SyncStore {
            local: ReducerStore::new(config.reducer()),
            config,
            persist,
            fetch,
            slot: Mutex::new(SyncSlot::default()),
            sync: Published::new(SyncState::default()),
            turn: Notify::new(),
        }
    }

    /// Start from a known collection instead of an empty one.
    pub fn seeded(self, collection: Collection<R>) -> Self {
        self.local.replace(Arc::new(StoreState::new(collection)));
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Currently published state: confirmed, or optimistic while syncing.
    pub fn state(&self) -> Arc<StoreState<R>> {
        self.local.state()
    }

    pub fn sync_state(&self) -> SyncState {
        self.slot().view()
    }

    /// Status of the latest persistence request.
    pub fn persist_status(&self) -> RequestStatus<Value> {
        self.persist.status()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Arc<StoreState<R>>) + Send + Sync + 'static,
    {
        self.local.subscribe(callback)
    }

    pub fn subscribe_sync<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SyncState) + Send + Sync + 'static,
    {
        self.sync.subscribe(callback)
    }

    /// Apply `action` locally, publish it, and persist it.
    ///
    /// Never returns an error: failures are reported through the outcome and
    /// through [`sync_state`](Self::sync_state).
    pub async fn mutate(&self, action: Action<R>) -> MutationOutcome {
        let (ticket, payload) = match self.begin(action) {
            Ok(begun) => begun,
            Err(outcome) => return outcome,
        };
        let generation = ticket.generation;
        let mut in_flight = InFlight {
            store: self,
            ticket: Some(ticket),
        };

        self.wait_turn(generation).await;
        if let Some(outcome) = in_flight.ticket.as_ref().and_then(|t| self.skip_stale(t)) {
            in_flight.ticket = None;
            return outcome;
        }

        let outcome = self.persist.send(Some(payload)).await;
        match in_flight.ticket.take() {
            Some(ticket) => self.settle(ticket, outcome.result),
            None => MutationOutcome::Superseded,
        }
    }

    /// Convenience for `mutate(Action::add(record))`.
    pub async fn add(&self, record: R) -> MutationOutcome {
        self.mutate(Action::add(record)).await
    }

    /// Convenience for `mutate(Action::remove(id))`.
    pub async fn remove(&self, id: impl Into<String>) -> MutationOutcome {
        self.mutate(Action::remove(id)).await
    }

    /// Convenience for `mutate(Action::Clear)`.
    pub async fn clear(&self) -> MutationOutcome {
        self.mutate(Action::Clear).await
    }

    /// Replace the local state with the remote collection.
    ///
    /// On failure the local state is left untouched and the error returned.
    /// A collection that arrives while a mutation is pending is discarded,
    /// since it predates the optimistic state.
    pub async fn load(&self) -> Result<Arc<StoreState<R>>, SyncError> {
        let generation = self.slot().generation;
        let outcome = self.fetch.send(None).await;
        if outcome.superseded {
            debug!("discarding superseded load");
            return Ok(self.state());
        }

        let body = outcome.result.map_err(|err| {
            warn!(url = %self.config.endpoint, error = %err, "failed to load collection");
            err
        })?;
        let collection = self.decode(body)?;

        let state = {
            let slot = self.slot();
            if slot.confirmed.is_some() || slot.generation != generation {
                debug!("discarding loaded collection, a mutation started meanwhile");
                return Ok(self.state());
            }
            let state = Arc::new(StoreState::new(collection));
            self.local.replace(Arc::clone(&state));
            state
        };

        info!(
            url = %self.config.endpoint,
            records = state.collection.len(),
            "collection loaded"
        );
        self.local.flush();
        Ok(state)
    }

    /// Dismiss the last error. A rolled-back store returns to `Idle`.
    pub fn clear_error(&self) {
        {
            let mut slot = self.slot();
            if slot.last_error.is_none() {
                return;
            }
            slot.last_error = None;
            if slot.phase == SyncPhase::RolledBack {
                slot.phase = SyncPhase::Idle;
            }
            self.sync.set(slot.view());
        }
        self.sync.flush();
    }

    /// Reduce, install and publish the optimistic state, then queue its request.
    fn begin(&self, action: Action<R>) -> Result<(Ticket<R>, Value), MutationOutcome> {
        let (ticket, payload) = {
            let mut slot = self.slot();
            // Every write to `local` happens under the slot lock.
            let previous = self.local.state();
            let next = self.local.reducer().reduce(&previous, &action);
            if next == *previous {
                debug!(action = action.kind(), "mutation left state unchanged");
                return Err(MutationOutcome::Unchanged);
            }

            let payload = match self.payload(&next, &action) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(action = action.kind(), error = %err, "mutation dropped");
                    slot.last_error = Some(err.clone());
                    self.sync.set(slot.view());
                    drop(slot);
                    self.sync.flush();
                    return Err(MutationOutcome::RolledBack(err));
                }
            };

            let next = Arc::new(next);
            self.local.replace(Arc::clone(&next));
            if slot.confirmed.is_none() {
                slot.confirmed = Some(previous);
            }
            slot.generation += 1;
            slot.phase = SyncPhase::Syncing;
            slot.last_error = None;
            self.sync.set(slot.view());

            let ticket = Ticket {
                generation: slot.generation,
                epoch: slot.epoch,
                action,
                next,
            };
            (ticket, payload)
        };

        debug!(
            action = ticket.action.kind(),
            generation = ticket.generation,
            records = ticket.next.collection.len(),
            "optimistic state published"
        );
        self.local.flush();
        self.sync.flush();
        Ok((ticket, payload))
    }

    /// Wait until every earlier request has left the queue.
    async fn wait_turn(&self, generation: u64) {
        loop {
            let notified = self.turn.notified();
            let finished = self.slot().finished;
            if finished + 1 >= generation {
                return;
            }
            notified.await;
        }
    }

    /// Drop a request whose epoch was ended by an earlier failure.
    fn skip_stale(&self, ticket: &Ticket<R>) -> Option<MutationOutcome> {
        let err = {
            let mut slot = self.slot();
            if slot.epoch == ticket.epoch {
                return None;
            }
            debug!(
                generation = ticket.generation,
                "request dropped unsent, an earlier one failed"
            );
            let err = slot.rollback_error.clone().unwrap_or(SyncError::Cancelled);
            self.finish(&mut slot, ticket.generation);
            self.sync.set(slot.view());
            err
        };

        self.local.flush();
        self.sync.flush();
        self.turn.notify_waiters();
        Some(MutationOutcome::RolledBack(err))
    }

    /// The `mutate` future owning `ticket` was dropped.
    fn abandon(&self, ticket: Ticket<R>) {
        let mut slot = self.slot();
        if slot.finished + 1 == ticket.generation {
            drop(slot);
            self.settle(ticket, Err(SyncError::Cancelled));
        } else {
            slot.abandoned.push((ticket.generation, ticket.epoch));
        }
    }

    fn settle(&self, ticket: Ticket<R>, result: Result<Value, SyncError>) -> MutationOutcome {
        let outcome = {
            let mut slot = self.slot();
            let outcome = if slot.epoch != ticket.epoch {
                MutationOutcome::RolledBack(
                    slot.rollback_error.clone().unwrap_or(SyncError::Cancelled),
                )
            } else {
                match result {
                    Ok(_) => self.confirm(&mut slot, &ticket),
                    Err(err) => {
                        self.roll_back(&mut slot, ticket.generation, err.clone());
                        MutationOutcome::RolledBack(err)
                    }
                }
            };
            self.finish(&mut slot, ticket.generation);
            self.sync.set(slot.view());
            outcome
        };

        self.local.flush();
        self.sync.flush();
        self.turn.notify_waiters();
        outcome
    }

    fn confirm(&self, slot: &mut SyncSlot<R>, ticket: &Ticket<R>) -> MutationOutcome {
        if ticket.generation == slot.generation {
            slot.confirmed = None;
            slot.phase = SyncPhase::Synced;
            slot.last_error = None;
            info!(generation = ticket.generation, "persistence confirmed");
            return MutationOutcome::Synced;
        }

        // The remote now holds exactly what this request carried.
        let confirmed = match (self.config.payload, &slot.confirmed) {
            (PayloadMode::Delta, Some(confirmed)) => {
                Arc::new(self.local.reducer().reduce(confirmed, &ticket.action))
            }
            _ => Arc::clone(&ticket.next),
        };
        slot.confirmed = Some(confirmed);
        debug!(
            generation = ticket.generation,
            latest = slot.generation,
            "persistence confirmed, newer requests pending"
        );
        MutationOutcome::Superseded
    }

    /// Restore the last confirmed state and end the current epoch.
    fn roll_back(&self, slot: &mut SyncSlot<R>, generation: u64, err: SyncError) {
        if let Some(confirmed) = slot.confirmed.take() {
            warn!(
                generation,
                error = %err,
                records = confirmed.collection.len(),
                "persistence failed, state rolled back"
            );
            self.local.replace(confirmed);
        }
        slot.epoch += 1;
        slot.phase = SyncPhase::RolledBack;
        slot.last_error = Some(err.clone());
        slot.rollback_error = Some(err);
    }

    /// Mark `generation` as out of the queue, then settle any dropped
    /// mutations whose turn that brings up.
    fn finish(&self, slot: &mut SyncSlot<R>, generation: u64) {
        slot.finished = generation;
        loop {
            let up_next = slot.finished + 1;
            let Some(index) = slot.abandoned.iter().position(|(g, _)| *g == up_next) else {
                break;
            };
            let (generation, epoch) = slot.abandoned.swap_remove(index);
            if epoch == slot.epoch {
                self.roll_back(slot, generation, SyncError::Cancelled);
            }
            slot.finished = generation;
        }
    }

    fn payload(&self, state: &StoreState<R>, action: &Action<R>) -> Result<Value, SyncError> {
        let encode = |err: serde_json::Error| SyncError::Encode(err.to_string());
        match self.config.payload {
            PayloadMode::Full => {
                // Without accumulation every quantity is 1, so send the bare records.
                let items = match self.config.duplicates {
                    DuplicatePolicy::Accumulate => serde_json::to_value(&state.collection),
                    DuplicatePolicy::Ignore => {
                        serde_json::to_value(state.collection.records().collect::<Vec<_>>())
                    }
                }
                .map_err(encode)?;
                let mut body = Map::new();
                body.insert(self.config.collection_key.clone(), items);
                Ok(Value::Object(body))
            }
            PayloadMode::Delta => Ok(json!({
                "action": serde_json::to_value(action).map_err(encode)?
            })),
        }
    }

    fn decode(&self, mut body: Value) -> Result<Collection<R>, SyncError> {
        // A missing or null collection means the remote has nothing yet.
        let items = body
            .get_mut(&self.config.collection_key)
            .map(Value::take)
            .unwrap_or(Value::Null);
        if items.is_null() {
            return Ok(Collection::new());
        }
        serde_json::from_value(items).map_err(|err| SyncError::Decode(err.to_string()))
    }

    fn slot(&self) -> MutexGuard<'_, SyncSlot<R>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
