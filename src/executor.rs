use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::SyncError;
use crate::transport::{Endpoint, Request, Transport};

/// Message used when a rejected request carries no message of its own.
pub const DEFAULT_FALLBACK_MESSAGE: &str = "Something went wrong, failed to send request.";

/// Lifecycle of the most recently issued request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestStatus<D> {
    Idle,
    Loading,
    Success(D),
    Failure(SyncError),
}

impl<D> RequestStatus<D> {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestStatus::Loading)
    }

    pub fn data(&self) -> Option<&D> {
        match self {
            RequestStatus::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            RequestStatus::Failure(err) => Some(err),
            _ => None,
        }
    }
}

/// Result of one [`RequestExecutor::send`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<D> {
    pub result: Result<D, SyncError>,
    /// `true` when a newer `send` (or a `reset`) happened while this one was in
    /// flight; its status was then not recorded on the executor.
    pub superseded: bool,
}

struct ExecutorState<D> {
    status: RequestStatus<D>,
    latest_ticket: u64,
}

/// Wraps calls to one endpoint and exposes their loading/data/error state.
///
/// Only the most recently issued call settles the executor's status; earlier
/// calls that complete afterwards are reported to their own caller as
/// superseded and otherwise discarded.
pub struct RequestExecutor<T, D = Value> {
    transport: Arc<T>,
    endpoint: Endpoint,
    fallback_message: String,
    state: Mutex<ExecutorState<D>>,
    _data: PhantomData<fn() -> D>,
}

impl<T: Transport, D: DeserializeOwned + Clone> RequestExecutor<T, D> {
    pub fn new(transport: Arc<T>, endpoint: Endpoint) -> Self {
        RequestExecutor {
            transport,
            endpoint,
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
            state: Mutex::new(ExecutorState {
                status: RequestStatus::Idle,
                latest_ticket: 0,
            }),
            _data: PhantomData,
        }
    }

    /// Message reported for non-OK responses without a `"message"` field.
    pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_message = message.into();
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn status(&self) -> RequestStatus<D> {
        self.lock().status.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().status.is_loading()
    }

    pub fn data(&self) -> Option<D> {
        self.lock().status.data().cloned()
    }

    pub fn error(&self) -> Option<SyncError> {
        self.lock().status.error().cloned()
    }

    /// Send `payload` (if any) to the endpoint and wait for the outcome.
    pub async fn send(&self, payload: Option<Value>) -> Outcome<D> {
        let ticket = {
            let mut state = self.lock();
            state.latest_ticket += 1;
            state.status = RequestStatus::Loading;
            state.latest_ticket
        };

        let request = Request::new(&self.endpoint, payload);
        let result = match self.transport.send(request).await {
            Err(err) => {
                let message = err.to_string();
                if message.is_empty() {
                    Err(SyncError::Network(self.fallback_message.clone()))
                } else {
                    Err(SyncError::Network(message))
                }
            }
            Ok(response) if !response.ok() => {
                let message = response
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| self.fallback_message.clone());
                Err(SyncError::ServerRejected {
                    status: response.status,
                    message,
                })
            }
            Ok(response) => serde_json::from_value::<D>(response.body)
                .map_err(|err| SyncError::Decode(err.to_string())),
        };

        let mut state = self.lock();
        let superseded = state.latest_ticket != ticket;
        if superseded {
            debug!(
                method = %self.endpoint.method,
                url = %self.endpoint.url,
                ticket,
                latest = state.latest_ticket,
                "discarding superseded response"
            );
        } else {
            state.status = match &result {
                Ok(data) => RequestStatus::Success(data.clone()),
                Err(err) => RequestStatus::Failure(err.clone()),
            };
        }
        Outcome { result, superseded }
    }

    /// Return to `Idle`, dropping data and error. Calls still in flight become
    /// superseded.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.latest_ticket += 1;
        state.status = RequestStatus::Idle;
    }

    fn lock(&self) -> MutexGuard<'_, ExecutorState<D>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
