use std::sync::Arc;
use std::time::Duration;

use optimistic_sync::{InMemoryRemote, MutationOutcome, Reply, SyncError, SyncPhase};
use serde_json::json;

use crate::support::{
    cart_store, delta_cart, meal, quantities, record_states, seeded_cart, CART_URL,
};

fn network_down() -> SyncError {
    SyncError::Network("network down".into())
}

#[tokio::test(start_paused = true)]
async fn quick_double_add_settles_on_the_latest_request() {
    let remote = InMemoryRemote::new();
    remote.script(Reply::accept().after(Duration::from_millis(50)));
    remote.script(Reply::accept().after(Duration::from_millis(10)));
    let store = cart_store(&remote);

    let (first, second) = tokio::join!(store.add(meal("2")), store.add(meal("2")));

    assert_eq!(first, MutationOutcome::Superseded);
    assert_eq!(second, MutationOutcome::Synced);
    assert_eq!(quantities(&store.state()), vec![("2".into(), 2)]);
    assert_eq!(store.sync_state().phase, SyncPhase::Synced);
    assert!(!store.sync_state().pending);
    assert_eq!(
        remote.document(CART_URL),
        Some(json!({
            "items": [{ "id": "2", "name": "Meal 2", "price": 12.99, "quantity": 2 }]
        }))
    );
}

#[tokio::test(start_paused = true)]
async fn reply_delays_do_not_change_the_result() {
    let remote = InMemoryRemote::new();
    remote.script(Reply::accept().after(Duration::from_millis(10)));
    remote.script(Reply::accept().after(Duration::from_millis(50)));
    let store = cart_store(&remote);

    let (first, second) = tokio::join!(store.add(meal("2")), store.add(meal("2")));

    assert_eq!(first, MutationOutcome::Superseded);
    assert_eq!(second, MutationOutcome::Synced);
    assert_eq!(quantities(&store.state()), vec![("2".into(), 2)]);
    assert_eq!(store.sync_state().phase, SyncPhase::Synced);
}

#[tokio::test(start_paused = true)]
async fn requests_are_sent_one_at_a_time_in_issue_order() {
    let remote = InMemoryRemote::new();
    remote.script(Reply::accept().after(Duration::from_millis(50)));
    let store = cart_store(&remote);

    let mutations = async { tokio::join!(store.add(meal("1")), store.add(meal("2"))) };
    let observer = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        remote.requests().len()
    };
    let (_, sent_while_first_in_flight) = tokio::join!(mutations, observer);

    assert_eq!(sent_while_first_in_flight, 1);
    let bodies: Vec<_> = remote
        .requests()
        .into_iter()
        .map(|request| request.body.unwrap()["items"].as_array().unwrap().len())
        .collect();
    assert_eq!(bodies, vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn stays_pending_until_the_latest_request_settles() {
    let remote = InMemoryRemote::new();
    remote.script(Reply::accept().after(Duration::from_millis(10)));
    remote.script(Reply::accept().after(Duration::from_millis(50)));
    let store = cart_store(&remote);

    let mutations = async { tokio::join!(store.add(meal("1")), store.add(meal("2"))) };
    let observer = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.sync_state()
    };
    let (_, during) = tokio::join!(mutations, observer);

    assert_eq!(during.phase, SyncPhase::Syncing);
    assert!(during.pending);
    assert!(!store.sync_state().pending);
}

#[tokio::test(start_paused = true)]
async fn failure_rolls_back_to_the_last_confirmed_request() {
    let remote = InMemoryRemote::new();
    remote.script(Reply::accept().after(Duration::from_millis(50)));
    remote.script(Reply::network_error("network down").after(Duration::from_millis(10)));
    let store = seeded_cart(&remote, &["a"]);
    let (seen, _subscription) = record_states(&store);

    let (first, second) = tokio::join!(store.add(meal("b")), store.remove("a"));

    assert_eq!(first, MutationOutcome::Superseded);
    assert_eq!(second, MutationOutcome::RolledBack(network_down()));

    let published: Vec<_> = seen.lock().unwrap().iter().map(|s| quantities(s)).collect();
    assert_eq!(
        published,
        vec![
            vec![("a".into(), 1), ("b".into(), 1)],
            vec![("b".into(), 1)],
            vec![("a".into(), 1), ("b".into(), 1)],
        ]
    );
    assert_eq!(
        remote.document(CART_URL),
        Some(json!({ "items": store.state().collection }))
    );
    assert_eq!(store.sync_state().phase, SyncPhase::RolledBack);
}

#[tokio::test(start_paused = true)]
async fn earlier_failure_drops_queued_mutations_unsent() {
    let remote = InMemoryRemote::new();
    remote.script(Reply::network_error("network down").after(Duration::from_millis(10)));
    let store = cart_store(&remote);
    let before = store.state();

    let (first, second) = tokio::join!(store.add(meal("1")), store.add(meal("2")));

    assert_eq!(first, MutationOutcome::RolledBack(network_down()));
    assert_eq!(second, MutationOutcome::RolledBack(network_down()));
    assert!(Arc::ptr_eq(&before, &store.state()));
    assert_eq!(remote.requests().len(), 1);
    assert_eq!(store.sync_state().last_error, Some(network_down()));
}

#[tokio::test(start_paused = true)]
async fn delta_burst_with_failed_first_request_keeps_remote_and_local_equal() {
    let remote = InMemoryRemote::new();
    remote.script(Reply::network_error("network down").after(Duration::from_millis(10)));
    remote.script(Reply::accept().after(Duration::from_millis(50)));
    let store = delta_cart(&remote);

    let (first, second) = tokio::join!(store.add(meal("2")), store.add(meal("2")));

    assert_eq!(first, MutationOutcome::RolledBack(network_down()));
    assert_eq!(second, MutationOutcome::RolledBack(network_down()));
    assert!(store.state().collection.is_empty());
    assert!(remote.posted(CART_URL).is_empty());

    let sync = store.sync_state();
    assert_eq!(sync.phase, SyncPhase::RolledBack);
    assert_eq!(sync.last_error, Some(network_down()));
}

#[tokio::test(start_paused = true)]
async fn delta_burst_with_failed_second_request_keeps_the_first() {
    let remote = InMemoryRemote::new();
    remote.script(Reply::accept().after(Duration::from_millis(10)));
    remote.script(Reply::network_error("network down").after(Duration::from_millis(50)));
    let store = delta_cart(&remote);

    let (first, second) = tokio::join!(store.add(meal("2")), store.add(meal("2")));

    assert_eq!(first, MutationOutcome::Superseded);
    assert_eq!(second, MutationOutcome::RolledBack(network_down()));
    assert_eq!(quantities(&store.state()), vec![("2".into(), 1)]);
    assert_eq!(remote.posted(CART_URL).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn delta_burst_confirms_every_action() {
    let remote = InMemoryRemote::new();
    remote.script(Reply::accept().after(Duration::from_millis(50)));
    remote.script(Reply::accept().after(Duration::from_millis(10)));
    let store = delta_cart(&remote);

    let (first, second) = tokio::join!(store.add(meal("2")), store.add(meal("2")));

    assert_eq!(first, MutationOutcome::Superseded);
    assert_eq!(second, MutationOutcome::Synced);
    assert_eq!(quantities(&store.state()), vec![("2".into(), 2)]);
    assert_eq!(remote.posted(CART_URL).len(), 2);
    assert_eq!(store.sync_state().phase, SyncPhase::Synced);
}

#[tokio::test(start_paused = true)]
async fn delta_rollback_restores_the_prior_state() {
    let remote = InMemoryRemote::new();
    let store = delta_cart(&remote);
    store.add(meal("1")).await;
    let before = store.state();
    remote.script(Reply::reject(500, "Failed to update user data."));

    let outcome = store.remove("1").await;

    assert!(matches!(outcome, MutationOutcome::RolledBack(_)));
    assert!(Arc::ptr_eq(&before, &store.state()));
    assert_eq!(remote.posted(CART_URL).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn mutation_after_a_rollback_is_sent() {
    let remote = InMemoryRemote::new();
    remote.script(Reply::network_error("network down").after(Duration::from_millis(10)));
    let store = cart_store(&remote);

    let later = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.add(meal("3")).await
    };
    let (first, second, third) =
        tokio::join!(store.add(meal("1")), store.add(meal("2")), later);

    assert_eq!(first, MutationOutcome::RolledBack(network_down()));
    assert_eq!(second, MutationOutcome::RolledBack(network_down()));
    assert_eq!(third, MutationOutcome::Synced);
    assert_eq!(quantities(&store.state()), vec![("3".into(), 1)]);
    assert_eq!(store.sync_state().last_error, None);
}

#[tokio::test(start_paused = true)]
async fn dropped_mutation_counts_as_failed() {
    let remote = InMemoryRemote::new();
    remote.script(Reply::accept().after(Duration::from_millis(50)));
    let store = cart_store(&remote);

    let timed_out =
        tokio::time::timeout(Duration::from_millis(5), store.add(meal("1"))).await;

    assert!(timed_out.is_err());
    assert!(store.state().collection.is_empty());
    assert_eq!(store.sync_state().last_error, Some(SyncError::Cancelled));
    assert_eq!(store.add(meal("2")).await, MutationOutcome::Synced);
    assert_eq!(quantities(&store.state()), vec![("2".into(), 1)]);
}

#[tokio::test(start_paused = true)]
async fn dropped_queued_mutation_is_undone_when_its_turn_comes() {
    let remote = InMemoryRemote::new();
    remote.script(Reply::accept().after(Duration::from_millis(50)));
    let store = cart_store(&remote);

    let dropped = tokio::time::timeout(Duration::from_millis(5), store.add(meal("2")));
    let (first, second) = tokio::join!(store.add(meal("1")), dropped);

    assert_eq!(first, MutationOutcome::Superseded);
    assert!(second.is_err());
    assert_eq!(quantities(&store.state()), vec![("1".into(), 1)]);
    assert_eq!(store.sync_state().phase, SyncPhase::RolledBack);
    assert_eq!(remote.requests().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mutations_leave_observers_on_the_current_state() {
    let remote = InMemoryRemote::new();
    let store = Arc::new(cart_store(&remote));
    let (seen, _subscription) = record_states(&*store);

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.add(meal(&(i % 4).to_string())).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let state = store.state();
    let last = seen.lock().unwrap().last().cloned().unwrap();
    assert!(Arc::ptr_eq(&last, &state));
    let total: u32 = quantities(&state).iter().map(|(_, quantity)| quantity).sum();
    assert_eq!(total, 16);
    assert_eq!(remote.document(CART_URL), Some(json!({ "items": state.collection })));
    assert_eq!(remote.requests().len(), 16);
    assert_eq!(store.sync_state().phase, SyncPhase::Synced);
}
