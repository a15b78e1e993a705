//! Reducers - pure transitions over a [`StoreState`](crate::StoreState).
//!
//! [`Reducer::reduce`] is the only place collection contents change.
//! [`ReducerStore`] owns the current state for purely local collections (a
//! shopping cart that is only sent at checkout) and is the local half of
//! every [`SyncStore`](crate::SyncStore).

mod action;
mod reduce;
mod store;

pub use action::Action;
pub use reduce::{reduce, DuplicatePolicy, InsertPosition, Reducer};
pub use store::ReducerStore;
