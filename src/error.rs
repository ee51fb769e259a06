//! Error types for drainq.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("no descriptor found for work item {0}")]
    DescriptorMissing(String),

    #[error("malformed descriptor for work item {key}: {reason}")]
    DescriptorInvalid { key: String, reason: String },

    #[error("event payload error: {0}")]
    Event(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
