//! `reqwest`-backed transport. Requires the `http` feature.

use std::time::Duration;

use serde_json::Value;

use crate::error::TransportError;

use super::{Method, Request, Response, Transport};

/// Sends requests over HTTP with a shared `reqwest::Client`.
///
/// Timeouts are enforced here, not by the stores; an elapsed timeout comes
/// back as [`TransportError::Timeout`] and is treated like any other network
/// failure.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        HttpTransport {
            client,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout.unwrap_or_default())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|err| self.map_error(err))?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|err| self.map_error(err))?;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Ok(Response::new(status, body))
    }
}
