use std::time::Duration;

use optimistic_sync::{InMemoryRemote, MutationOutcome, Record, Reply, StoreConfig, SyncStore};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Meal {
    id: String,
    name: String,
    price: f64,
}

impl Record for Meal {
    fn id(&self) -> &str {
        &self.id
    }
}

fn meal(id: &str, name: &str, price: f64) -> Meal {
    Meal {
        id: id.to_string(),
        name: name.to_string(),
        price,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("optimistic_sync=debug")),
        )
        .init();

    let remote = InMemoryRemote::new();
    let cart: SyncStore<Meal, _> =
        SyncStore::new(StoreConfig::new("http://localhost:3000/cart"), remote.clone());

    let _view = cart.subscribe(|state| {
        let lines: Vec<String> = state
            .collection
            .iter()
            .map(|entry| format!("{} x{}", entry.record().name, entry.quantity()))
            .collect();
        println!("cart: [{}]", lines.join(", "));
    });
    let _status = cart.subscribe_sync(|sync| {
        println!("sync: {:?} pending={}", sync.phase, sync.pending);
    });

    cart.add(meal("m1", "Mac & Cheese", 8.99)).await;
    cart.add(meal("m2", "Margherita Pizza", 12.99)).await;

    // The next save takes a while and then fails.
    remote.script(Reply::network_error("network down").after(Duration::from_millis(300)));
    match cart.add(meal("m1", "Mac & Cheese", 8.99)).await {
        MutationOutcome::RolledBack(err) => println!("rolled back: {}", err),
        other => println!("unexpected: {:?}", other),
    }

    cart.clear_error();
    cart.remove("m2").await;

    let total: f64 = cart
        .state()
        .collection
        .iter()
        .map(|entry| entry.record().price * f64::from(entry.quantity()))
        .sum();
    println!("total: {:.2}", total);
    let saved = remote.document("http://localhost:3000/cart").unwrap_or_default();
    println!("saved: {}", saved);
}
