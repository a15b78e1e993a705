//! HTTP transport integration tests.
//!
//! Starts an axum server holding the user's places and drives it through
//! `HttpTransport`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use optimistic_sync::{
    Endpoint, HttpTransport, MutationOutcome, Record, RequestExecutor, StoreConfig, SyncError,
    SyncPhase, SyncStore,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Place {
    id: String,
    title: String,
}

impl Record for Place {
    fn id(&self) -> &str {
        &self.id
    }
}

fn place(id: &str) -> Place {
    Place {
        id: id.into(),
        title: format!("Place {id}"),
    }
}

#[derive(Clone, Default)]
struct Backend {
    places: Arc<Mutex<Value>>,
    orders: Arc<Mutex<Vec<Value>>>,
}

async fn get_places(State(backend): State<Backend>) -> Json<Value> {
    Json(json!({ "places": backend.places.lock().unwrap().clone() }))
}

async fn put_places(
    State(backend): State<Backend>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !body["places"].is_array() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "Places must be an array." })),
        );
    }
    *backend.places.lock().unwrap() = body["places"].clone();
    (StatusCode::OK, Json(json!({ "message": "User places updated!" })))
}

async fn broken() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Failed to update user data." })),
    )
}

async fn silent_failure() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(500)).await;
    Json(json!({ "places": [] }))
}

async fn post_order(
    State(backend): State<Backend>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    backend.orders.lock().unwrap().push(body);
    (StatusCode::CREATED, Json(json!({ "message": "Order created!" })))
}

/// Bind to port 0 and return the actual address.
async fn start_server(backend: Backend) -> String {
    let app = Router::new()
        .route("/user-places", get(get_places).put(put_places))
        .route("/broken-places", get(get_places).put(broken))
        .route("/silent-places", put(silent_failure))
        .route("/slow-places", get(slow))
        .route("/orders", post(post_order))
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn places_config(url: String) -> StoreConfig {
    StoreConfig::new(url)
        .collection_key("places")
        .prepend()
        .ignore_duplicates()
        .persist_fallback("Failed to update places.")
}

#[tokio::test]
async fn load_and_persist_round_trip() {
    let backend = Backend::default();
    *backend.places.lock().unwrap() = json!([{ "id": "p1", "title": "Place p1" }]);
    let base = start_server(backend.clone()).await;
    let store: SyncStore<Place, _> =
        SyncStore::new(places_config(format!("{base}/user-places")), HttpTransport::new());

    let state = store.load().await.unwrap();
    assert_eq!(state.collection.len(), 1);

    let outcome = store.add(place("p2")).await;

    assert_eq!(outcome, MutationOutcome::Synced);
    assert_eq!(store.sync_state().phase, SyncPhase::Synced);
    let saved = backend.places.lock().unwrap().clone();
    assert_eq!(saved[0]["id"], "p2");
    assert_eq!(saved[1]["id"], "p1");
}

#[tokio::test]
async fn server_error_rolls_back_with_its_message() {
    let base = start_server(Backend::default()).await;
    let store: SyncStore<Place, _> =
        SyncStore::new(places_config(format!("{base}/broken-places")), HttpTransport::new());
    let before = store.state();

    let outcome = store.add(place("p1")).await;

    assert_eq!(
        outcome,
        MutationOutcome::RolledBack(SyncError::ServerRejected {
            status: 500,
            message: "Failed to update user data.".into(),
        })
    );
    assert!(Arc::ptr_eq(&before, &store.state()));
}

#[tokio::test]
async fn rejection_without_message_uses_the_fallback() {
    let base = start_server(Backend::default()).await;
    let store: SyncStore<Place, _> =
        SyncStore::new(places_config(format!("{base}/silent-places")), HttpTransport::new());

    store.add(place("p1")).await;

    let err = store.sync_state().last_error.unwrap();
    assert_eq!(err.status(), Some(503));
    assert_eq!(err.message(), "Failed to update places.");
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store: SyncStore<Place, _> = SyncStore::new(
        places_config(format!("http://{addr}/user-places")),
        HttpTransport::new(),
    );

    let outcome = store.add(place("p1")).await;

    assert!(matches!(
        outcome,
        MutationOutcome::RolledBack(SyncError::Network(_))
    ));
    assert!(store.state().collection.is_empty());
}

#[tokio::test]
async fn timeout_is_reported_as_a_network_error() {
    let base = start_server(Backend::default()).await;
    let store: SyncStore<Place, _> = SyncStore::new(
        places_config(format!("{base}/slow-places")),
        HttpTransport::new().with_timeout(Duration::from_millis(50)),
    );

    let err = store.load().await.unwrap_err();

    assert_eq!(
        err,
        SyncError::Network("request timed out after 50ms".into())
    );
}

#[tokio::test]
async fn checkout_posts_the_order() {
    let backend = Backend::default();
    let base = start_server(backend.clone()).await;
    let checkout: RequestExecutor<HttpTransport> = RequestExecutor::new(
        Arc::new(HttpTransport::new()),
        Endpoint::post(format!("{base}/orders")),
    );

    let outcome = checkout
        .send(Some(json!({ "order": { "items": [{ "id": "m1", "quantity": 2 }] } })))
        .await;

    assert_eq!(outcome.result, Ok(json!({ "message": "Order created!" })));
    assert_eq!(checkout.data(), Some(json!({ "message": "Order created!" })));
    assert_eq!(backend.orders.lock().unwrap().len(), 1);

    checkout.reset();
    assert_eq!(checkout.data(), None);
}
