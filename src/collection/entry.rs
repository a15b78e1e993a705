use serde::{Deserialize, Serialize};

use super::Record;

/// A record together with its quantity accumulator.
///
/// The quantity is flattened next to the record's own fields on the wire, so
/// a cart entry serializes as `{"id":"m1","name":"Pizza","quantity":2}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "R: Record"))]
pub struct Entry<R> {
    #[serde(flatten)]
    record: R,
    #[serde(default = "default_quantity")]
    quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl<R: Record> Entry<R> {
    /// A fresh entry with quantity 1.
    pub fn new(record: R) -> Self {
        Entry {
            record,
            quantity: 1,
        }
    }

    pub fn with_quantity(record: R, quantity: u32) -> Self {
        Entry { record, quantity }
    }

    pub fn id(&self) -> &str {
        self.record.id()
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn into_record(self) -> R {
        self.record
    }

    pub(crate) fn incremented(&self) -> Self {
        Entry {
            record: self.record.clone(),
            quantity: self.quantity.saturating_add(1),
        }
    }

    /// `None` when the entry would drop to zero.
    pub(crate) fn decremented(&self) -> Option<Self> {
        if self.quantity <= 1 {
            return None;
        }
        Some(Entry {
            record: self.record.clone(),
            quantity: self.quantity - 1,
        })
    }

    pub(crate) fn absorb(&mut self, other: Entry<R>) {
        self.quantity = self.quantity.saturating_add(other.quantity);
    }
}
