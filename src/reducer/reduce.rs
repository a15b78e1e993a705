use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collection::{Entry, Record, StoreState};

use super::Action;

/// Where `Add` places a record that is not yet in the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    /// New entries go to the end (shopping cart).
    #[default]
    Append,
    /// New entries go to the front, most recent first (place picker).
    Prepend,
}

/// What `Add` does with a record whose id is already present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Increment the existing entry's quantity.
    #[default]
    Accumulate,
    /// Leave the state untouched.
    Ignore,
}

/// Pure state-transition function with a fixed per-instance policy.
///
/// `reduce` never fails and never mutates its input: every call returns a new
/// [`StoreState`], structurally equal to the input when the action is a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reducer {
    insert: InsertPosition,
    duplicates: DuplicatePolicy,
}

impl Reducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_insert(mut self, insert: InsertPosition) -> Self {
        self.insert = insert;
        self
    }

    pub fn with_duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub fn insert_position(&self) -> InsertPosition {
        self.insert
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicates
    }

    pub fn reduce<R: Record>(&self, state: &StoreState<R>, action: &Action<R>) -> StoreState<R> {
        let collection = &state.collection;
        match action {
            Action::Add { item } => match collection.position(item.id()) {
                Some(index) => match self.duplicates {
                    DuplicatePolicy::Accumulate => {
                        let entry = collection.entries()[index].incremented();
                        StoreState::new(collection.with_replaced(index, entry))
                    }
                    DuplicatePolicy::Ignore => state.clone(),
                },
                None => {
                    let entry = Entry::new(item.clone());
                    let collection = match self.insert {
                        InsertPosition::Append => collection.with_appended(entry),
                        InsertPosition::Prepend => collection.with_prepended(entry),
                    };
                    StoreState::new(collection)
                }
            },
            Action::Remove { id } => {
                let Some(index) = collection.position(id) else {
                    debug!(id = %id, "remove of absent record ignored");
                    return state.clone();
                };
                match collection.entries()[index].decremented() {
                    Some(entry) => StoreState::new(collection.with_replaced(index, entry)),
                    None => StoreState::new(collection.with_removed(index)),
                }
            }
            Action::Clear => StoreState::empty(),
            Action::Unknown => {
                debug!("unknown action ignored");
                state.clone()
            }
        }
    }
}

/// Reduce with the default policy (append, accumulate).
pub fn reduce<R: Record>(state: &StoreState<R>, action: &Action<R>) -> StoreState<R> {
    Reducer::default().reduce(state, action)
}
