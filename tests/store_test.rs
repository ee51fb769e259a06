//! Tests for the coordination store client.

use std::sync::Arc;

use drainq::store::{Connector, MemoryStore, Store};

async fn memory_store() -> (Arc<MemoryStore>, Store) {
    let mem = Arc::new(MemoryStore::new());
    let store = Connector::memory(Arc::clone(&mem))
        .connect()
        .await
        .expect("memory connect cannot fail");
    (mem, store)
}

fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(f, v)| (f.to_string(), v.to_string()))
        .collect()
}

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_push_pop_is_fifo() {
    let (_mem, store) = memory_store().await;

    store.push_back("q", "a").await.unwrap();
    store.push_back("q", "b").await.unwrap();
    assert_eq!(store.queue_len("q").await.unwrap(), 2);

    assert_eq!(store.pop_front("q").await.unwrap(), Some("a".to_string()));
    assert_eq!(store.pop_front("q").await.unwrap(), Some("b".to_string()));
    assert_eq!(store.pop_front("q").await.unwrap(), None);
    assert_eq!(store.queue_len("q").await.unwrap(), 0);
}

#[tokio::test]
async fn empty_pop_is_a_tagged_outcome_not_an_error() {
    let (_mem, store) = memory_store().await;
    assert!(matches!(store.pop_front("missing").await, Ok(None)));
}

#[tokio::test]
async fn delete_clears_list_and_hash() {
    let (_mem, store) = memory_store().await;

    store.push_back("q", "a").await.unwrap();
    store.hash_write("q", &fields(&[("f", "v")])).await.unwrap();

    store.delete("q").await.unwrap();
    assert_eq!(store.queue_len("q").await.unwrap(), 0);
    assert!(store.hash_read_all("q").await.unwrap().is_empty());

    // Deleting a missing key is fine.
    store.delete("q").await.unwrap();
}

// ---------------------------------------------------------------------------
// Hashes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hash_write_then_read_all() {
    let (_mem, store) = memory_store().await;

    store
        .hash_write("item", &fields(&[("function", "sleep"), ("duration", "10")]))
        .await
        .unwrap();

    let read = store.hash_read_all("item").await.unwrap();
    assert_eq!(read.get("function").map(String::as_str), Some("sleep"));
    assert_eq!(read.get("duration").map(String::as_str), Some("10"));
}

#[tokio::test]
async fn missing_hash_reads_as_empty() {
    let (_mem, store) = memory_store().await;
    assert!(store.hash_read_all("nothing").await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Pub/sub
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publish_reaches_current_subscribers_only() {
    let (_mem, store) = memory_store().await;

    // Nobody subscribed yet: the event is simply gone.
    store.publish("events", "lost").await.unwrap();

    let mut sub = store.subscribe("events").await.unwrap();
    store.publish("events", "seen").await.unwrap();
    assert_eq!(sub.recv().await.unwrap(), Some("seen".to_string()));
}

#[tokio::test]
async fn every_subscriber_gets_every_message() {
    let (_mem, store) = memory_store().await;

    let mut first = store.subscribe("events").await.unwrap();
    let mut second = store.subscribe("events").await.unwrap();
    store.publish("events", "hello").await.unwrap();

    assert_eq!(first.recv().await.unwrap(), Some("hello".to_string()));
    assert_eq!(second.recv().await.unwrap(), Some("hello".to_string()));
}

// ---------------------------------------------------------------------------
// Fault injection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn injected_hash_write_failure_surfaces_as_store_error() {
    let (mem, store) = memory_store().await;

    mem.fail_hash_writes("blocked");
    assert!(
        store
            .hash_write("blocked", &fields(&[("f", "v")]))
            .await
            .is_err()
    );
    // Other keys are untouched.
    store.hash_write("open", &fields(&[("f", "v")])).await.unwrap();

    mem.clear_faults();
    store
        .hash_write("blocked", &fields(&[("f", "v")]))
        .await
        .unwrap();
}

#[tokio::test]
async fn injected_pop_failure_surfaces_as_store_error() {
    let (mem, store) = memory_store().await;

    store.push_back("q", "a").await.unwrap();
    mem.fail_pops("q");
    assert!(store.pop_front("q").await.is_err());

    mem.clear_faults();
    assert_eq!(store.pop_front("q").await.unwrap(), Some("a".to_string()));
}

// ---------------------------------------------------------------------------
// Live Redis (mirrors the in-memory coverage against a real server)
// ---------------------------------------------------------------------------

async fn live_store() -> Store {
    let url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    Connector::redis(url).connect().await.unwrap()
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn live_list_and_hash_roundtrip() {
    let store = live_store().await;
    store.ping().await.unwrap();

    store.delete("drainq-test-q").await.unwrap();
    store.delete("drainq-test-item").await.unwrap();

    store.push_back("drainq-test-q", "a").await.unwrap();
    store.push_back("drainq-test-q", "b").await.unwrap();
    assert_eq!(store.queue_len("drainq-test-q").await.unwrap(), 2);
    assert_eq!(
        store.pop_front("drainq-test-q").await.unwrap(),
        Some("a".to_string())
    );

    store
        .hash_write(
            "drainq-test-item",
            &fields(&[("function", "sleep"), ("duration", "10")]),
        )
        .await
        .unwrap();
    let read = store.hash_read_all("drainq-test-item").await.unwrap();
    assert_eq!(read.get("function").map(String::as_str), Some("sleep"));

    store.delete("drainq-test-q").await.unwrap();
    store.delete("drainq-test-item").await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn live_pubsub_roundtrip() {
    let store = live_store().await;

    let mut sub = store.subscribe("drainq-test-events").await.unwrap();
    store.publish("drainq-test-events", "hello").await.unwrap();
    assert_eq!(sub.recv().await.unwrap(), Some("hello".to_string()));
    sub.close().await.unwrap();
}
