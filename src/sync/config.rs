use serde::{Deserialize, Serialize};

use crate::reducer::{DuplicatePolicy, InsertPosition, Reducer};
use crate::transport::{Endpoint, Method};

/// What a persistence request carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadMode {
    /// The whole updated collection: `{"<collection_key>": [..]}`.
    #[default]
    Full,
    /// Only the action that was applied: `{"action": {..}}`.
    Delta,
}

/// Configuration of one [`SyncStore`](crate::SyncStore).
///
/// Every field except `endpoint` has a default, so a minimal JSON config is
/// `{"endpoint": "http://localhost:3000/user-places"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub endpoint: String,
    #[serde(default = "default_collection_key")]
    pub collection_key: String,
    #[serde(default = "default_persist_method")]
    pub persist_method: Method,
    #[serde(default)]
    pub payload: PayloadMode,
    #[serde(default)]
    pub insert: InsertPosition,
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
    #[serde(default = "default_persist_fallback")]
    pub persist_fallback_message: String,
    #[serde(default = "default_fetch_fallback")]
    pub fetch_fallback_message: String,
}

fn default_collection_key() -> String {
    "items".to_string()
}

fn default_persist_method() -> Method {
    Method::Put
}

fn default_persist_fallback() -> String {
    "Failed to update data.".to_string()
}

fn default_fetch_fallback() -> String {
    "Failed to fetch data.".to_string()
}

impl StoreConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        StoreConfig {
            endpoint: endpoint.into(),
            collection_key: default_collection_key(),
            persist_method: default_persist_method(),
            payload: PayloadMode::default(),
            insert: InsertPosition::default(),
            duplicates: DuplicatePolicy::default(),
            persist_fallback_message: default_persist_fallback(),
            fetch_fallback_message: default_fetch_fallback(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn collection_key(mut self, key: impl Into<String>) -> Self {
        self.collection_key = key.into();
        self
    }

    pub fn persist_with(mut self, method: Method) -> Self {
        self.persist_method = method;
        self
    }

    pub fn delta(mut self) -> Self {
        self.payload = PayloadMode::Delta;
        self
    }

    /// Most-recent-first ordering for new records.
    pub fn prepend(mut self) -> Self {
        self.insert = InsertPosition::Prepend;
        self
    }

    /// Adding an already present record leaves the collection unchanged.
    pub fn ignore_duplicates(mut self) -> Self {
        self.duplicates = DuplicatePolicy::Ignore;
        self
    }

    pub fn persist_fallback(mut self, message: impl Into<String>) -> Self {
        self.persist_fallback_message = message.into();
        self
    }

    pub fn fetch_fallback(mut self, message: impl Into<String>) -> Self {
        self.fetch_fallback_message = message.into();
        self
    }

    pub fn reducer(&self) -> Reducer {
        Reducer::new()
            .with_insert(self.insert)
            .with_duplicates(self.duplicates)
    }

    pub(crate) fn persist_endpoint(&self) -> Endpoint {
        Endpoint::new(self.persist_method, self.endpoint.clone())
    }

    pub(crate) fn fetch_endpoint(&self) -> Endpoint {
        Endpoint::get(self.endpoint.clone())
    }
}
