use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Entry, Record};

/// Ordered sequence of entries with at most one entry per id.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<R> {
    entries: Vec<Entry<R>>,
}

impl<R> Default for Collection<R> {
    fn default() -> Self {
        Collection {
            entries: Vec::new(),
        }
    }
}

impl<R: Record> Collection<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from possibly untrusted entries.
    ///
    /// Later duplicates are folded into the first occurrence and zero-quantity
    /// entries are dropped, so the id-uniqueness invariant holds for whatever
    /// the remote sent.
    pub fn from_entries(entries: impl IntoIterator<Item = Entry<R>>) -> Self {
        let mut collection = Collection::new();
        for entry in entries {
            if entry.quantity() == 0 {
                continue;
            }
            match collection.position(entry.id()) {
                Some(index) => collection.entries[index].absorb(entry),
                None => collection.entries.push(entry),
            }
        }
        collection
    }

    /// Build a collection holding each record once.
    pub fn from_records(records: impl IntoIterator<Item = R>) -> Self {
        Self::from_entries(records.into_iter().map(Entry::new))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry<R>> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[Entry<R>] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&Entry<R>> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id() == id)
    }

    /// Sum of all quantities.
    pub fn total_quantity(&self) -> u64 {
        self.entries.iter().map(|entry| u64::from(entry.quantity())).sum()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.id())
    }

    /// The records without their quantities, in order.
    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.entries.iter().map(Entry::record)
    }

    pub(crate) fn with_replaced(&self, index: usize, entry: Entry<R>) -> Self {
        let mut entries = self.entries.clone();
        entries[index] = entry;
        Collection { entries }
    }

    pub(crate) fn with_removed(&self, index: usize) -> Self {
        let mut entries = self.entries.clone();
        entries.remove(index);
        Collection { entries }
    }

    pub(crate) fn with_appended(&self, entry: Entry<R>) -> Self {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.extend(self.entries.iter().cloned());
        entries.push(entry);
        Collection { entries }
    }

    pub(crate) fn with_prepended(&self, entry: Entry<R>) -> Self {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.push(entry);
        entries.extend(self.entries.iter().cloned());
        Collection { entries }
    }
}

impl<'a, R> IntoIterator for &'a Collection<R> {
    type Item = &'a Entry<R>;
    type IntoIter = std::slice::Iter<'a, Entry<R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<R: Record> Serialize for Collection<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de, R: Record> Deserialize<'de> for Collection<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<Entry<R>>::deserialize(deserializer)?;
        Ok(Collection::from_entries(entries))
    }
}

/// The canonical local truth held by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "R: Record")]
pub struct StoreState<R> {
    pub collection: Collection<R>,
}

impl<R> Default for StoreState<R> {
    fn default() -> Self {
        StoreState {
            collection: Collection::default(),
        }
    }
}

impl<R: Record> StoreState<R> {
    pub fn new(collection: Collection<R>) -> Self {
        StoreState { collection }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}
