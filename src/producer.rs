//! Work catalog producer.
//!
//! Populates the store with descriptors and a single FIFO queue of their
//! identifiers. Partial-failure tolerant: a failed write is logged and the
//! item skipped. The reported count is the store-observed queue length,
//! not a local success tally; under transient store errors the two can
//! diverge, and the store is ground truth.

use tracing::{info, warn};

use crate::error::Result;
use crate::model::{Descriptor, Namespace};
use crate::store::Store;

pub struct Producer {
    store: Store,
    namespace: Namespace,
    item_duration_ms: u64,
}

impl Producer {
    pub fn new(store: Store, namespace: Namespace) -> Self {
        Self {
            store,
            namespace,
            item_duration_ms: 10,
        }
    }

    /// Sleep duration written into every descriptor.
    pub fn item_duration_ms(mut self, duration_ms: u64) -> Self {
        self.item_duration_ms = duration_ms;
        self
    }

    /// Create `count` work items and queue their identifiers.
    ///
    /// Clears any pre-existing queue first so repeated runs never
    /// accumulate stale items. A failed descriptor write or queue append
    /// skips that item: no retry, no abort. The only surfaced error is a
    /// failed final length read.
    pub async fn create_work(&self, count: u64) -> Result<u64> {
        if let Err(e) = self.store.delete(&self.namespace.queue_key).await {
            warn!(error = %e, "failed to clear existing work queue");
        }

        let descriptor = Descriptor::sleep(self.item_duration_ms);
        for i in 0..count {
            let key = self.namespace.item_key(i);

            if let Err(e) = self.store.hash_write(&key, &descriptor.fields()).await {
                warn!(item = %key, error = %e, "could not write descriptor, skipping item");
                continue;
            }

            if let Err(e) = self.store.push_back(&self.namespace.queue_key, &key).await {
                warn!(item = %key, error = %e, "could not queue item, skipping");
                continue;
            }
        }

        let created = self.store.queue_len(&self.namespace.queue_key).await?;
        info!(created, requested = count, "work items queued");
        Ok(created)
    }
}
