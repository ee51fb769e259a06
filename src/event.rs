//! Transient events broadcast over the store's pub/sub channels.
//!
//! Delivery is fire-and-forget: only listeners subscribed at publish time
//! see an event, and nothing is persisted. Events carry no relative
//! ordering across workers; consumers must tolerate arbitrary
//! interleaving.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::WorkerId;

/// A message published on a batch's event channels, JSON-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// One work item finished executing.
    ItemCompleted {
        item: String,
        worker: String,
        at: DateTime<Utc>,
    },
    /// One worker drained the queue (or gave up) and is exiting.
    WorkerFinished { worker: String, at: DateTime<Utc> },
}

impl Event {
    pub fn item_completed(item: impl Into<String>, worker: &WorkerId) -> Self {
        Self::ItemCompleted {
            item: item.into(),
            worker: worker.0.clone(),
            at: Utc::now(),
        }
    }

    pub fn worker_finished(worker: &WorkerId) -> Self {
        Self::WorkerFinished {
            worker: worker.0.clone(),
            at: Utc::now(),
        }
    }

    /// Encode for publishing.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a received payload.
    pub fn decode(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}
