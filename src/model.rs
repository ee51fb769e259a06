//! Core data model.
//!
//! A work item is a small field map in the store: a work function tag plus
//! its parameters. Items are addressed by deterministic keys derived from a
//! monotonically increasing index, and a single shared list carries the
//! identifiers awaiting a worker. No process owns an item; processing
//! rights transfer atomically at pop time.

use std::collections::HashMap;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Namespace
// ---------------------------------------------------------------------------

/// Store keys and channel names a batch runs under.
///
/// Passed explicitly into every component so isolated batches (and tests)
/// never share process-wide state.
#[derive(Debug, Clone)]
pub struct Namespace {
    /// List key holding the identifiers of queued work items.
    pub queue_key: String,
    /// Prefix for per-item descriptor keys (`<prefix>-<i>`).
    pub item_prefix: String,
    /// Channel carrying item-completion events.
    pub completed_channel: String,
    /// Channel carrying worker-finished events.
    pub finished_channel: String,
}

impl Default for Namespace {
    fn default() -> Self {
        Self {
            queue_key: "work-item-list".to_string(),
            item_prefix: "work-item".to_string(),
            completed_channel: "work-item-completed".to_string(),
            finished_channel: "worker-finished".to_string(),
        }
    }
}

impl Namespace {
    /// Descriptor key for the item at `index`.
    pub fn item_key(&self, index: u64) -> String {
        format!("{}-{}", self.item_prefix, index)
    }
}

// ---------------------------------------------------------------------------
// Worker identity
// ---------------------------------------------------------------------------

/// Newtype for worker identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerId(pub String);

impl WorkerId {
    /// Identifier for the worker at `index` within a pool.
    pub fn indexed(index: usize) -> Self {
        Self(format!("worker-{index}"))
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Field names of a work item descriptor hash.
pub const FIELD_FUNCTION: &str = "function";
pub const FIELD_DURATION: &str = "duration";

/// The one work function tag this demo understands.
pub const FN_SLEEP: &str = "sleep";

/// A work item descriptor: which function to run and its parameters.
///
/// Stored as a flat string-field hash so any store client can read it.
/// Workers dispatch on the `function` tag; unknown tags consume the item
/// without effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Work function tag.
    pub function: String,
    /// Sleep duration in milliseconds.
    pub duration_ms: u64,
}

impl Descriptor {
    /// A sleep descriptor for `duration_ms` milliseconds.
    pub fn sleep(duration_ms: u64) -> Self {
        Self {
            function: FN_SLEEP.to_string(),
            duration_ms,
        }
    }

    /// Flatten to store hash fields.
    pub fn fields(&self) -> Vec<(String, String)> {
        vec![
            (FIELD_FUNCTION.to_string(), self.function.clone()),
            (FIELD_DURATION.to_string(), self.duration_ms.to_string()),
        ]
    }

    /// Parse the hash fields read back for `key`.
    ///
    /// An empty map means the identifier resolved to nothing: the popped
    /// item has no descriptor behind it.
    pub fn from_fields(key: &str, fields: &HashMap<String, String>) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::DescriptorMissing(key.to_string()));
        }

        let function = fields
            .get(FIELD_FUNCTION)
            .ok_or_else(|| Error::DescriptorInvalid {
                key: key.to_string(),
                reason: "missing function field".to_string(),
            })?
            .clone();

        let duration_ms = match fields.get(FIELD_DURATION) {
            Some(raw) => raw.parse().map_err(|_| Error::DescriptorInvalid {
                key: key.to_string(),
                reason: format!("bad duration {raw:?}"),
            })?,
            None => 0,
        };

        Ok(Self {
            function,
            duration_ms,
        })
    }
}
