//! Completion listener.
//!
//! Consumes the batch's event channels and decides when the whole batch
//! is finished: once every expected worker has announced its exit. The
//! subscriptions are established by the orchestrator before any worker is
//! spawned, so an early announcement cannot be missed.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::event::Event;
use crate::store::Subscription;

pub struct Listener {
    /// Number of workers whose exit announcements complete the batch.
    expected_workers: usize,
}

impl Listener {
    pub fn new(expected_workers: usize) -> Self {
        Self { expected_workers }
    }

    /// Count distinct finished workers until all expected have reported,
    /// then close both subscriptions and return.
    ///
    /// Completion events are surfaced as progress lines only. Duplicate
    /// or undecodable payloads never advance the count. There is no
    /// timeout: a worker that never reports blocks the batch forever.
    pub async fn run(self, mut finished: Subscription, mut completed: Subscription) -> Result<()> {
        let mut finished_workers: HashSet<String> = HashSet::new();
        let mut completed_open = true;

        while finished_workers.len() < self.expected_workers {
            tokio::select! {
                payload = finished.recv() => match payload {
                    Ok(Some(payload)) => self.on_finished(&payload, &mut finished_workers),
                    Ok(None) => {
                        return Err(Error::Other(
                            "worker-finished channel closed before all workers reported".to_string(),
                        ));
                    }
                    Err(e) => warn!(error = %e, "error receiving worker-finished event"),
                },
                payload = completed.recv(), if completed_open => match payload {
                    Ok(Some(payload)) => on_completed(&payload),
                    Ok(None) => {
                        warn!("completion channel closed, progress reporting stops");
                        completed_open = false;
                    }
                    Err(e) => warn!(error = %e, "error receiving completion event"),
                },
            }
        }

        if let Err(e) = finished.close().await {
            warn!(error = %e, "could not close worker-finished subscription");
        }
        if let Err(e) = completed.close().await {
            warn!(error = %e, "could not close completion subscription");
        }

        Ok(())
    }

    fn on_finished(&self, payload: &str, seen: &mut HashSet<String>) {
        match Event::decode(payload) {
            Ok(Event::WorkerFinished { worker, .. }) => {
                if seen.insert(worker.clone()) {
                    info!(
                        worker = %worker,
                        finished = seen.len(),
                        expected = self.expected_workers,
                        "worker finished"
                    );
                } else {
                    warn!(worker = %worker, "duplicate finished event ignored");
                }
            }
            Ok(other) => warn!(?other, "unexpected event on worker-finished channel"),
            Err(e) => warn!(error = %e, "undecodable event payload ignored"),
        }
    }
}

fn on_completed(payload: &str) {
    match Event::decode(payload) {
        Ok(Event::ItemCompleted { item, worker, .. }) => {
            info!(item = %item, worker = %worker, "work item completed");
        }
        Ok(other) => warn!(?other, "unexpected event on completion channel"),
        Err(e) => warn!(error = %e, "undecodable event payload ignored"),
    }
}
