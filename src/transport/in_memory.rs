use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde_json::{json, Value};

use crate::error::TransportError;

use super::{Method, Request, Response, Transport};

/// What the in-memory remote does with one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Process the request normally.
    Accept,
    /// Fail before any response, as if the host were unreachable.
    NetworkError(String),
    /// Answer with a non-OK status and a `"message"` body.
    Reject { status: u16, message: String },
}

/// A scripted reply: the outcome plus how long the response takes to arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub delay: Duration,
    pub outcome: ReplyOutcome,
}

impl Reply {
    pub fn accept() -> Self {
        Reply {
            delay: Duration::ZERO,
            outcome: ReplyOutcome::Accept,
        }
    }

    pub fn network_error(message: impl Into<String>) -> Self {
        Reply {
            delay: Duration::ZERO,
            outcome: ReplyOutcome::NetworkError(message.into()),
        }
    }

    pub fn reject(status: u16, message: impl Into<String>) -> Self {
        Reply {
            delay: Duration::ZERO,
            outcome: ReplyOutcome::Reject {
                status,
                message: message.into(),
            },
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
struct RemoteState {
    documents: HashMap<String, Value>,
    posted: HashMap<String, Vec<Value>>,
    script: VecDeque<Reply>,
    requests: Vec<Request>,
}

/// In-memory stand-in for the remote collection endpoint.
///
/// `GET` returns the document stored at the URL, `PUT` replaces it, `POST`
/// appends the body to the URL's received list. Side effects happen when the
/// request arrives; the scripted delay only holds back the response, so the
/// remote sees requests in the order they were sent.
///
/// Requests consume scripted [`Reply`]s in order; once the script is empty
/// every request is accepted immediately.
///
/// Clone-friendly (cloning shares the same underlying storage).
#[derive(Clone, Default)]
pub struct InMemoryRemote {
    state: Arc<RwLock<RemoteState>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `document` at `url`, as if a previous session had saved it.
    pub fn seed(&self, url: impl Into<String>, document: Value) {
        self.write().documents.insert(url.into(), document);
    }

    /// Queue the reply for the next unscripted request.
    pub fn script(&self, reply: Reply) {
        self.write().script.push_back(reply);
    }

    pub fn document(&self, url: &str) -> Option<Value> {
        self.read().documents.get(url).cloned()
    }

    pub fn posted(&self, url: &str) -> Vec<Value> {
        self.read().posted.get(url).cloned().unwrap_or_default()
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<Request> {
        self.read().requests.clone()
    }

    fn receive(&self, request: Request) -> (Duration, Result<Response, TransportError>) {
        let mut state = self.write();
        let reply = state.script.pop_front().unwrap_or_else(Reply::accept);
        state.requests.push(request.clone());

        let result = match reply.outcome {
            ReplyOutcome::NetworkError(message) => Err(TransportError::Connect(message)),
            ReplyOutcome::Reject { status, message } => {
                Ok(Response::new(status, json!({ "message": message })))
            }
            ReplyOutcome::Accept => Ok(state.apply(request)),
        };
        (reply.delay, result)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RemoteState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RemoteState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RemoteState {
    fn apply(&mut self, request: Request) -> Response {
        match request.method {
            Method::Get => match self.documents.get(&request.url) {
                Some(document) => Response::new(200, document.clone()),
                None => Response::new(404, json!({ "message": "Not found." })),
            },
            Method::Put => {
                let body = request.body.unwrap_or(Value::Null);
                self.documents.insert(request.url, body);
                Response::new(200, json!({ "message": "Updated." }))
            }
            Method::Post => {
                let body = request.body.unwrap_or(Value::Null);
                self.posted.entry(request.url).or_default().push(body);
                Response::new(201, json!({ "message": "Created." }))
            }
            Method::Delete => {
                let existed = self.documents.remove(&request.url).is_some();
                if existed {
                    Response::new(200, json!({ "message": "Deleted." }))
                } else {
                    Response::new(404, json!({ "message": "Not found." }))
                }
            }
        }
    }
}

impl Transport for InMemoryRemote {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let (delay, result) = self.receive(request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}
