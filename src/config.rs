//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if a required var is missing or
//! unparseable. The store URL is wrapped in secrecy::SecretString since
//! it may embed a password.

use secrecy::SecretString;

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct Config {
    pub redis_url: SecretString,
    /// Batch size when none is given on the command line.
    pub work_items: u64,
    /// Worker count override; computed from available parallelism if unset.
    pub workers: Option<usize>,
    /// Sleep duration written into every descriptor.
    pub item_duration_ms: u64,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            redis_url: SecretString::from(required_var("REDIS_URL")?),
            work_items: parsed_var("WORK_ITEMS", 100)?,
            workers: optional_var("WORKERS")?,
            item_duration_ms: parsed_var("ITEM_DURATION_MS", 10)?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("could not parse {name}={raw}"))),
        Err(_) => Ok(default),
    }
}

fn optional_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("could not parse {name}={raw}"))),
        Err(_) => Ok(None),
    }
}
