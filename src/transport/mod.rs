//! Transport - the boundary to whatever actually carries requests.
//!
//! The stores never talk to the network directly. They build a [`Request`]
//! and hand it to a [`Transport`], which either produces a [`Response`]
//! (any status) or a [`TransportError`] when no response arrived at all.
//!
//! ```text
//! SyncStore ──▶ RequestExecutor ──▶ Transport::send(Request)
//!                                        │
//!                      ┌─────────────────┴──────────────────┐
//!                      ▼                                    ▼
//!              InMemoryRemote                        HttpTransport
//!              (included, tests)                     (feature "http")
//! ```

#[cfg(feature = "http")]
mod http;
mod in_memory;

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;

#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use in_memory::{InMemoryRemote, Reply, ReplyOutcome};

/// HTTP-style verb understood by every transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(verb)
    }
}

/// Where an executor sends its requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: Method,
    pub url: String,
}

impl Endpoint {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Endpoint {
            method,
            url: url.into(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(endpoint: &Endpoint, body: Option<Value>) -> Self {
        Request {
            method: endpoint.method,
            url: endpoint.url.clone(),
            body,
        }
    }
}

/// A response of any status. The body is `Value::Null` when the remote sent
/// nothing, or something that is not JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub fn new(status: u16, body: Value) -> Self {
        Response { status, body }
    }

    /// `true` for 2xx statuses.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The server-supplied `"message"` field, if any.
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }
}

/// Carries a request to the remote and brings back its response.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;
}
