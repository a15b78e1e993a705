use serde::{Deserialize, Serialize};

use crate::collection::Record;

/// A mutation intent. Pure data; applying it is the reducer's job.
///
/// The wire form is internally tagged:
/// `{"type":"ADD_ITEM","item":{..}}`, `{"type":"REMOVE_ITEM","id":".."}`,
/// `{"type":"CLEAR"}`. Tags this version does not know deserialize to
/// [`Action::Unknown`] and reduce to the unchanged state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", bound = "R: Record")]
pub enum Action<R> {
    #[serde(rename = "ADD_ITEM")]
    Add { item: R },
    #[serde(rename = "REMOVE_ITEM")]
    Remove { id: String },
    #[serde(rename = "CLEAR")]
    Clear,
    #[serde(other)]
    Unknown,
}

impl<R: Record> Action<R> {
    pub fn add(item: R) -> Self {
        Action::Add { item }
    }

    pub fn remove(id: impl Into<String>) -> Self {
        Action::Remove { id: id.into() }
    }

    pub fn clear() -> Self {
        Action::Clear
    }

    /// Short name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Add { .. } => "add",
            Action::Remove { .. } => "remove",
            Action::Clear => "clear",
            Action::Unknown => "unknown",
        }
    }
}
