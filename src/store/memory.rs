//! In-memory store backend.
//!
//! Mirrors the shared-store semantics closely enough for tests: lists and
//! hashes behind one lock, channels as tokio broadcast senders with
//! at-most-once delivery to current subscribers. Targeted fault injection
//! lets tests exercise the partial-failure paths a live store would only
//! produce under real outages.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::error::{Error, Result};

/// Broadcast buffer per channel. Slow consumers lag past this.
const CHANNEL_CAPACITY: usize = 256;

/// Shared in-memory coordination store.
///
/// Wrap in an `Arc` and hand `Connector::Memory` clones to every
/// component; each `connect()` then models a private connection to the
/// same store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

#[derive(Default)]
struct State {
    lists: HashMap<String, VecDeque<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
    failing_hash_writes: HashSet<String>,
    failing_pops: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("store mutex poisoned")
    }

    // -- fault injection ----------------------------------------------------

    /// Make every hash write to `key` fail until faults are cleared.
    pub fn fail_hash_writes(&self, key: &str) {
        self.state().failing_hash_writes.insert(key.to_string());
    }

    /// Make every pop from `key` fail until faults are cleared.
    pub fn fail_pops(&self, key: &str) {
        self.state().failing_pops.insert(key.to_string());
    }

    /// Clear all injected faults.
    pub fn clear_faults(&self) {
        let mut state = self.state();
        state.failing_hash_writes.clear();
        state.failing_pops.clear();
    }

    // -- store operations ---------------------------------------------------

    pub(crate) fn ping(&self) -> Result<()> {
        Ok(())
    }

    pub(crate) fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.state();
        state.lists.remove(key);
        state.hashes.remove(key);
        Ok(())
    }

    pub(crate) fn hash_write(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        let mut state = self.state();
        if state.failing_hash_writes.contains(key) {
            return Err(injected("hash write refused"));
        }
        let hash = state.hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            hash.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    pub(crate) fn hash_read_all(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self.state().hashes.get(key).cloned().unwrap_or_default())
    }

    pub(crate) fn push_back(&self, key: &str, value: &str) -> Result<()> {
        self.state()
            .lists
            .entry(key.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    pub(crate) fn pop_front(&self, key: &str) -> Result<Option<String>> {
        let mut state = self.state();
        if state.failing_pops.contains(key) {
            return Err(injected("pop refused"));
        }
        Ok(state.lists.get_mut(key).and_then(VecDeque::pop_front))
    }

    pub(crate) fn queue_len(&self, key: &str) -> Result<u64> {
        Ok(self.state().lists.get(key).map_or(0, |l| l.len() as u64))
    }

    pub(crate) fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        let channels = self.channels.lock().expect("store mutex poisoned");
        if let Some(tx) = channels.get(channel) {
            // No receivers is fine: delivery is at-most-once to whoever
            // is subscribed right now.
            let _ = tx.send(payload.to_string());
        }
        Ok(())
    }

    pub(crate) fn subscribe(&self, channel: &str) -> broadcast::Receiver<String> {
        self.channels
            .lock()
            .expect("store mutex poisoned")
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}

/// Injected faults surface as store errors, same as the Redis backend.
fn injected(what: &str) -> Error {
    Error::Store(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "injected fault",
        what.to_string(),
    )))
}
