//! Queue-draining worker.
//!
//! Pops one identifier at a time, resolves its descriptor, runs the work
//! function, and broadcasts a completion event. Exits when the queue is
//! empirically exhausted, and always announces its own exit with exactly
//! one worker-finished event, even off an error path. Every worker opens
//! its own private store connection; pop atomicity is the store's job,
//! never the client's.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::event::Event;
use crate::model::{Descriptor, FN_SLEEP, Namespace, WorkerId};
use crate::store::{Connector, Store};

pub struct Worker {
    id: WorkerId,
    connector: Connector,
    namespace: Namespace,
}

impl Worker {
    pub fn new(id: WorkerId, connector: Connector, namespace: Namespace) -> Self {
        Self {
            id,
            connector,
            namespace,
        }
    }

    /// Run until no more work is observable, then announce the exit.
    ///
    /// Every failure below is absorbed locally: nothing a single worker
    /// hits may abort its siblings or the batch.
    pub async fn run(self) {
        let store = match self.connector.connect().await {
            Ok(store) => store,
            Err(e) => {
                // connect() retries reachability forever; only a malformed
                // URL lands here, and then there is no store to announce
                // the exit to.
                error!(worker = %self.id, error = %e, "could not reach the store, exiting");
                return;
            }
        };

        self.drain(&store).await;

        // Guaranteed exit announcement, whatever path ended the loop.
        match Event::worker_finished(&self.id).encode() {
            Ok(payload) => {
                if let Err(e) = store
                    .publish(&self.namespace.finished_channel, &payload)
                    .await
                {
                    warn!(worker = %self.id, error = %e, "could not publish worker-finished event");
                }
            }
            Err(e) => {
                warn!(worker = %self.id, error = %e, "could not encode worker-finished event");
            }
        }
    }

    async fn drain(&self, store: &Store) {
        loop {
            match store.pop_front(&self.namespace.queue_key).await {
                Ok(Some(item)) => self.execute(store, &item).await,
                Ok(None) => {
                    info!(worker = %self.id, "no more work in the queue");
                    break;
                }
                Err(e) => {
                    error!(worker = %self.id, error = %e, "could not pop from the work queue");
                    break;
                }
            }
        }
    }

    /// Resolve and run one popped item.
    ///
    /// A popped identifier that resolves to nothing is dropped: it is
    /// already off the queue, and there is no dead-letter path to put it
    /// back on. That loses the item, an accepted gap in the
    /// at-least-once story.
    async fn execute(&self, store: &Store, item: &str) {
        let fields = match store.hash_read_all(item).await {
            Ok(fields) => fields,
            Err(e) => {
                error!(worker = %self.id, item, error = %e, "could not load descriptor");
                return;
            }
        };

        let descriptor = match Descriptor::from_fields(item, &fields) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(worker = %self.id, item, error = %e, "dropping unresolvable item");
                return;
            }
        };

        match descriptor.function.as_str() {
            FN_SLEEP => {
                info!(
                    worker = %self.id,
                    item,
                    duration_ms = descriptor.duration_ms,
                    "performing sleep"
                );
                tokio::time::sleep(Duration::from_millis(descriptor.duration_ms)).await;
            }
            other => {
                warn!(
                    worker = %self.id,
                    item,
                    function = other,
                    "unknown work function, item consumed without effect"
                );
                return;
            }
        }

        // Best effort: completion events are not persisted anywhere.
        match Event::item_completed(item, &self.id).encode() {
            Ok(payload) => {
                if let Err(e) = store
                    .publish(&self.namespace.completed_channel, &payload)
                    .await
                {
                    warn!(worker = %self.id, item, error = %e, "could not publish completion event");
                }
            }
            Err(e) => {
                warn!(worker = %self.id, item, error = %e, "could not encode completion event");
            }
        }
    }
}
