//! Config schema types (database, scheduler, provider API, logging).

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketryConfig {
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub twitter: TwitterApiConfig,
    pub log: LogConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL. Defaults to a file next to the data dir.
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://ticketry.db?mode=rwc".into(),
        }
    }
}

/// Background delivery scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Max dispatch jobs executed concurrently by one drain cycle.
    pub workers: usize,
    /// Attempts before a failing job is parked. Defaults to 4.
    pub max_attempts: u32,
    /// Base backoff between retries in milliseconds, doubled per attempt.
    pub backoff_base_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_attempts: 4,
            backoff_base_ms: 30_000,
        }
    }
}

/// Twitter API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitterApiConfig {
    /// API base URL. Overridable for testing against a local stub.
    pub api_base: String,
    /// Request timeout in seconds. Sends fail rather than hang.
    pub timeout_secs: u64,
}

impl Default for TwitterApiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitter.com/1.1".into(),
            timeout_secs: 30,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default log level when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}
