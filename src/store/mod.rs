//! Coordination store client.
//!
//! Thin async interface over the shared store every process talks to:
//! atomic list pop/push, hash read/write, fire-and-forget pub/sub, and a
//! ping-with-retry connectivity check at connect time. Two backends sit
//! behind the same type: Redis for real runs and an in-memory store for
//! tests and single-process demos. Queue-pop atomicity comes from the
//! backend itself; clients never lock.

pub mod memory;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use redis::AsyncCommands as _;
use redis::aio::ConnectionManager;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::error::Result;

pub use memory::MemoryStore;

/// Pause between failed connectivity checks at startup.
const RETRY_PAUSE: Duration = Duration::from_millis(500);

/// How a process reaches the coordination store.
///
/// Cheap to clone; every worker connects through its own copy, so store
/// connections are never shared across workers.
#[derive(Clone)]
pub enum Connector {
    /// A Redis server by URL.
    Redis { url: String },
    /// A shared in-memory store.
    Memory(Arc<MemoryStore>),
}

impl Connector {
    pub fn redis(url: impl Into<String>) -> Self {
        Self::Redis { url: url.into() }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self::Memory(store)
    }

    /// Open a private connection, blocking on the connectivity check until
    /// the store answers.
    ///
    /// Only a malformed URL errors here; an unreachable store is retried
    /// forever.
    pub async fn connect(&self) -> Result<Store> {
        match self {
            Self::Redis { url } => Store::connect_redis(url).await,
            Self::Memory(store) => Ok(Store {
                backend: Backend::Memory(Arc::clone(store)),
            }),
        }
    }
}

/// A private handle to the coordination store.
pub struct Store {
    backend: Backend,
}

enum Backend {
    Redis {
        client: redis::Client,
        conn: ConnectionManager,
    },
    Memory(Arc<MemoryStore>),
}

impl Store {
    async fn connect_redis(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;

        let mut attempts = 0u64;
        let mut conn = loop {
            match ConnectionManager::new(client.clone()).await {
                Ok(conn) => break conn,
                Err(e) => {
                    attempts += 1;
                    warn!(attempts, error = %e, "store connection failed, retrying");
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
            }
        };

        loop {
            match redis::cmd("PING").query_async::<String>(&mut conn).await {
                Ok(pong) => {
                    info!(pong, "store answered ping");
                    break;
                }
                Err(e) => {
                    attempts += 1;
                    warn!(attempts, error = %e, "store ping failed, retrying");
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
            }
        }

        Ok(Self {
            backend: Backend::Redis { client, conn },
        })
    }

    /// Connectivity check.
    pub async fn ping(&self) -> Result<()> {
        match &self.backend {
            Backend::Redis { conn, .. } => {
                let mut conn = conn.clone();
                redis::cmd("PING").query_async::<String>(&mut conn).await?;
                Ok(())
            }
            Backend::Memory(store) => store.ping(),
        }
    }

    /// Delete a key. Missing keys are fine.
    pub async fn delete(&self, key: &str) -> Result<()> {
        match &self.backend {
            Backend::Redis { conn, .. } => {
                let mut conn = conn.clone();
                let _: () = conn.del(key).await?;
                Ok(())
            }
            Backend::Memory(store) => store.delete(key),
        }
    }

    /// Write hash fields under `key`.
    pub async fn hash_write(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        match &self.backend {
            Backend::Redis { conn, .. } => {
                let mut conn = conn.clone();
                let _: () = conn.hset_multiple(key, fields).await?;
                Ok(())
            }
            Backend::Memory(store) => store.hash_write(key, fields),
        }
    }

    /// Read all hash fields under `key`. A missing key reads as empty.
    pub async fn hash_read_all(&self, key: &str) -> Result<HashMap<String, String>> {
        match &self.backend {
            Backend::Redis { conn, .. } => {
                let mut conn = conn.clone();
                Ok(conn.hgetall(key).await?)
            }
            Backend::Memory(store) => store.hash_read_all(key),
        }
    }

    /// Append to the tail of the list at `key`.
    pub async fn push_back(&self, key: &str, value: &str) -> Result<()> {
        match &self.backend {
            Backend::Redis { conn, .. } => {
                let mut conn = conn.clone();
                let _: () = conn.rpush(key, value).await?;
                Ok(())
            }
            Backend::Memory(store) => store.push_back(key, value),
        }
    }

    /// Atomically pop the head of the list at `key`.
    ///
    /// `Ok(None)` is the empty-queue outcome, distinct from a store error.
    /// Callers branch on a closed set, never on error message text.
    pub async fn pop_front(&self, key: &str) -> Result<Option<String>> {
        match &self.backend {
            Backend::Redis { conn, .. } => {
                let mut conn = conn.clone();
                Ok(conn.lpop(key, None).await?)
            }
            Backend::Memory(store) => store.pop_front(key),
        }
    }

    /// Current length of the list at `key`.
    pub async fn queue_len(&self, key: &str) -> Result<u64> {
        match &self.backend {
            Backend::Redis { conn, .. } => {
                let mut conn = conn.clone();
                Ok(conn.llen(key).await?)
            }
            Backend::Memory(store) => store.queue_len(key),
        }
    }

    /// Publish to `channel`. Delivery is at-most-once, to whoever is
    /// subscribed right now.
    pub async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        match &self.backend {
            Backend::Redis { conn, .. } => {
                let mut conn = conn.clone();
                let _: () = conn.publish(channel, payload).await?;
                Ok(())
            }
            Backend::Memory(store) => store.publish(channel, payload),
        }
    }

    /// Subscribe to `channel`.
    ///
    /// Resolves only once the subscription is established, so a caller
    /// that awaits this before spawning publishers cannot miss their
    /// events.
    pub async fn subscribe(&self, channel: &str) -> Result<Subscription> {
        match &self.backend {
            Backend::Redis { client, .. } => {
                let mut pubsub = client.get_async_pubsub().await?;
                pubsub.subscribe(channel).await?;
                Ok(Subscription {
                    channel: channel.to_string(),
                    inner: SubInner::Redis(pubsub),
                })
            }
            Backend::Memory(store) => Ok(Subscription {
                channel: channel.to_string(),
                inner: SubInner::Memory(store.subscribe(channel)),
            }),
        }
    }
}

/// An established subscription to one channel.
pub struct Subscription {
    channel: String,
    inner: SubInner,
}

enum SubInner {
    Redis(redis::aio::PubSub),
    Memory(broadcast::Receiver<String>),
}

impl Subscription {
    /// The channel this subscription listens on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Wait for the next message. `Ok(None)` means the channel is gone.
    pub async fn recv(&mut self) -> Result<Option<String>> {
        match &mut self.inner {
            SubInner::Redis(pubsub) => match pubsub.on_message().next().await {
                Some(msg) => Ok(Some(msg.get_payload()?)),
                None => Ok(None),
            },
            SubInner::Memory(rx) => loop {
                match rx.recv().await {
                    Ok(payload) => return Ok(Some(payload)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(channel = %self.channel, skipped, "subscription lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return Ok(None),
                }
            },
        }
    }

    /// Unsubscribe and release the connection.
    pub async fn close(mut self) -> Result<()> {
        match &mut self.inner {
            SubInner::Redis(pubsub) => {
                pubsub.unsubscribe(&self.channel).await?;
                Ok(())
            }
            SubInner::Memory(_) => Ok(()),
        }
    }
}
