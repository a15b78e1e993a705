//! Collections - ordered, id-unique sequences of records.
//!
//! A [`Collection`] is the value every store revolves around. It is never
//! edited in place: transitions build a new collection and callers compare old
//! and new values structurally.
//!
//! ## Example
//!
//! ```ignore
//! use optimistic_sync::{Collection, Record};
//!
//! #[derive(Serialize, Deserialize, Clone, PartialEq)]
//! struct Meal {
//!     pub id: String,
//!     pub name: String,
//!     pub price: f64,
//! }
//!
//! impl Record for Meal {
//!     fn id(&self) -> &str { &self.id }
//! }
//!
//! let cart: Collection<Meal> = serde_json::from_str(r#"[{"id":"m1","name":"Pizza","price":12.99,"quantity":2}]"#)?;
//! assert_eq!(cart.get("m1").unwrap().quantity(), 2);
//! ```

mod entry;
mod state;

use serde::{de::DeserializeOwned, Serialize};

/// Trait for values that can live in a [`Collection`].
///
/// Only the id matters to the stores; every other field is carried along
/// untouched and round-trips through the remote endpoint.
pub trait Record: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static {
    /// Stable unique identifier of this record.
    fn id(&self) -> &str;
}

pub use entry::Entry;
pub use state::{Collection, StoreState};
