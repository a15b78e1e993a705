use std::sync::{Arc, Mutex};

use optimistic_sync::{
    Collection, InMemoryRemote, Method, Record, StoreConfig, StoreState, Subscription, SyncStore,
};
use serde::{Deserialize, Serialize};

pub const CART_URL: &str = "http://localhost:3000/cart";
pub const PLACES_URL: &str = "http://localhost:3000/user-places";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: String,
    pub name: String,
    pub price: f64,
}

impl Record for Meal {
    fn id(&self) -> &str {
        &self.id
    }
}

pub fn meal(id: &str) -> Meal {
    Meal {
        id: id.into(),
        name: format!("Meal {id}"),
        price: 12.99,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub title: String,
}

impl Record for Place {
    fn id(&self) -> &str {
        &self.id
    }
}

pub fn place(id: &str) -> Place {
    Place {
        id: id.into(),
        title: format!("Place {id}"),
    }
}

pub type CartStore = SyncStore<Meal, InMemoryRemote>;
pub type PlacesStore = SyncStore<Place, InMemoryRemote>;

pub fn cart_store(remote: &InMemoryRemote) -> CartStore {
    SyncStore::new(StoreConfig::new(CART_URL), remote.clone())
}

pub fn seeded_cart(remote: &InMemoryRemote, ids: &[&str]) -> CartStore {
    cart_store(remote).seeded(Collection::from_records(ids.iter().map(|id| meal(id))))
}

pub fn places_store(remote: &InMemoryRemote) -> PlacesStore {
    let config = StoreConfig::new(PLACES_URL)
        .collection_key("places")
        .prepend()
        .ignore_duplicates()
        .persist_fallback("Failed to update places.")
        .fetch_fallback("Failed to fetch user places.");
    SyncStore::new(config, remote.clone())
}

pub type Seen<R> = Arc<Mutex<Vec<Arc<StoreState<R>>>>>;

/// Record every state the store publishes.
pub fn record_states<R: Record, T: optimistic_sync::Transport>(
    store: &SyncStore<R, T>,
) -> (Seen<R>, Subscription) {
    let seen: Seen<R> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = store.subscribe(move |state| sink.lock().unwrap().push(Arc::clone(state)));
    (seen, subscription)
}

pub fn quantities<R: Record>(state: &StoreState<R>) -> Vec<(String, u32)> {
    state
        .collection
        .iter()
        .map(|entry| (entry.id().to_string(), entry.quantity()))
        .collect()
}

pub fn delta_cart(remote: &InMemoryRemote) -> CartStore {
    let config = StoreConfig::new(CART_URL).delta().persist_with(Method::Post);
    SyncStore::new(config, remote.clone())
}
