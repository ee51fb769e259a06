//! Tests for the completion listener.

use std::sync::Arc;
use std::time::Duration;

use drainq::event::Event;
use drainq::listener::Listener;
use drainq::model::{Namespace, WorkerId};
use drainq::store::{Connector, MemoryStore, Store, Subscription};
use drainq::worker::Worker;

fn setup() -> (Arc<MemoryStore>, Connector, Namespace) {
    let mem = Arc::new(MemoryStore::new());
    let connector = Connector::memory(Arc::clone(&mem));
    (mem, connector, Namespace::default())
}

async fn connect(connector: &Connector) -> Store {
    connector.connect().await.unwrap()
}

/// Subscriptions for a listener, established up front the way the
/// orchestrator does it.
async fn subscriptions(store: &Store, ns: &Namespace) -> (Subscription, Subscription) {
    let finished = store.subscribe(&ns.finished_channel).await.unwrap();
    let completed = store.subscribe(&ns.completed_channel).await.unwrap();
    (finished, completed)
}

#[tokio::test]
async fn four_workers_empty_queue_completes_the_batch() {
    let (_mem, connector, ns) = setup();
    let store = connect(&connector).await;

    let (finished, completed) = subscriptions(&store, &ns).await;
    let listener = tokio::spawn(Listener::new(4).run(finished, completed));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            tokio::spawn(
                Worker::new(WorkerId::indexed(i), connector.clone(), ns.clone()).run(),
            )
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    listener.await.unwrap().unwrap();
}

#[tokio::test]
async fn expecting_zero_workers_returns_immediately() {
    let (_mem, connector, ns) = setup();
    let store = connect(&connector).await;

    let (finished, completed) = subscriptions(&store, &ns).await;
    Listener::new(0).run(finished, completed).await.unwrap();
}

#[tokio::test]
async fn duplicate_finished_events_do_not_complete_early() {
    let (_mem, connector, ns) = setup();
    let store = connect(&connector).await;

    let (finished, completed) = subscriptions(&store, &ns).await;
    let listener = tokio::spawn(Listener::new(2).run(finished, completed));

    let dup = Event::worker_finished(&WorkerId::indexed(0)).encode().unwrap();
    store.publish(&ns.finished_channel, &dup).await.unwrap();
    store.publish(&ns.finished_channel, &dup).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(
        !listener.is_finished(),
        "listener returned on a duplicate finished event"
    );

    let second = Event::worker_finished(&WorkerId::indexed(1)).encode().unwrap();
    store.publish(&ns.finished_channel, &second).await.unwrap();

    listener.await.unwrap().unwrap();
}

#[tokio::test]
async fn junk_and_misrouted_payloads_are_ignored() {
    let (_mem, connector, ns) = setup();
    let store = connect(&connector).await;

    let (finished, completed) = subscriptions(&store, &ns).await;
    let listener = tokio::spawn(Listener::new(1).run(finished, completed));

    // Garbage, then a completion event misrouted onto the finished
    // channel: neither may advance the count.
    store.publish(&ns.finished_channel, "not json").await.unwrap();
    let misrouted = Event::item_completed("work-item-0", &WorkerId::indexed(0))
        .encode()
        .unwrap();
    store.publish(&ns.finished_channel, &misrouted).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(
        !listener.is_finished(),
        "listener advanced on junk payloads"
    );

    let real = Event::worker_finished(&WorkerId::indexed(0)).encode().unwrap();
    store.publish(&ns.finished_channel, &real).await.unwrap();

    listener.await.unwrap().unwrap();
}

#[tokio::test]
async fn completion_events_are_progress_only() {
    let (_mem, connector, ns) = setup();
    let store = connect(&connector).await;

    let (finished, completed) = subscriptions(&store, &ns).await;
    let listener = tokio::spawn(Listener::new(1).run(finished, completed));

    // A flood of completions must not satisfy the listener.
    for i in 0..10 {
        let event = Event::item_completed(ns.item_key(i), &WorkerId::indexed(0))
            .encode()
            .unwrap();
        store.publish(&ns.completed_channel, &event).await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(
        !listener.is_finished(),
        "listener returned on completion events alone"
    );

    let real = Event::worker_finished(&WorkerId::indexed(0)).encode().unwrap();
    store.publish(&ns.finished_channel, &real).await.unwrap();

    listener.await.unwrap().unwrap();
}
