//! Pool orchestrator.
//!
//! Decides the worker count, establishes the listener's subscriptions
//! before any worker can publish, spawns the workers and the listener as
//! tasks, and blocks until every one of them has joined. There is no
//! cancellation: the only exit condition is every task returning on its
//! own.

use tracing::{error, info};

use crate::error::Result;
use crate::listener::Listener;
use crate::model::{Namespace, WorkerId};
use crate::producer::Producer;
use crate::store::Connector;
use crate::worker::Worker;

pub struct Pool {
    connector: Connector,
    namespace: Namespace,
    workers: Option<usize>,
}

impl Pool {
    pub fn new(connector: Connector, namespace: Namespace) -> Self {
        Self {
            connector,
            namespace,
            workers: None,
        }
    }

    /// Override the computed worker count. Clamped to at least one.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    /// Spawn the workers and the listener, then block until all joined.
    ///
    /// A panicked task is logged and does not abort the join of its
    /// siblings; batch content problems never surface here. The only
    /// errors are startup ones, before anything is spawned.
    pub async fn run(&self) -> Result<()> {
        let num_workers = self.workers.unwrap_or_else(default_worker_count);

        // Subscribe before the first worker exists. A finished event fired
        // before the subscription is confirmed would be lost, and the
        // batch would never be declared done.
        let store = self.connector.connect().await?;
        let finished = store.subscribe(&self.namespace.finished_channel).await?;
        let completed = store.subscribe(&self.namespace.completed_channel).await?;

        info!(workers = num_workers, "spawning workers");

        let listener =
            tokio::spawn(Listener::new(num_workers).run(finished, completed));

        let mut handles = Vec::with_capacity(num_workers);
        for i in 0..num_workers {
            let worker = Worker::new(
                WorkerId::indexed(i),
                self.connector.clone(),
                self.namespace.clone(),
            );
            handles.push(tokio::spawn(worker.run()));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                error!(worker = i, error = %e, "worker task did not join cleanly");
            }
        }

        match listener.await {
            Ok(Ok(())) => info!("all workers finished"),
            Ok(Err(e)) => error!(error = %e, "listener gave up"),
            Err(e) => error!(error = %e, "listener task did not join cleanly"),
        }

        Ok(())
    }
}

/// One worker per unit of available parallelism, minus one reserved for
/// the listener, never less than one: a single-core host still drains
/// the queue.
pub fn default_worker_count() -> usize {
    let parallelism = std::thread::available_parallelism().map_or(2, usize::from);
    parallelism.saturating_sub(1).max(1)
}

/// Run a whole batch: produce `items` work items, then drain them.
pub async fn run_batch(
    connector: Connector,
    namespace: Namespace,
    items: u64,
    item_duration_ms: u64,
    workers: Option<usize>,
) -> Result<u64> {
    let store = connector.connect().await?;
    let created = Producer::new(store, namespace.clone())
        .item_duration_ms(item_duration_ms)
        .create_work(items)
        .await?;

    let mut pool = Pool::new(connector, namespace);
    if let Some(workers) = workers {
        pool = pool.workers(workers);
    }
    pool.run().await?;

    Ok(created)
}
