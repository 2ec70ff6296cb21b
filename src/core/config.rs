//! Connection configuration
//!
//! Settings applied when a backend opens its connection. Can be built in code
//! or read from JSON.

use super::error::Result;
use serde::Deserialize;
use std::time::Duration;

/// SQLite path that opens a private in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// Configuration for opening a database connection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Database file path, or `:memory:`
    pub path: String,
    /// Enforce foreign key constraints
    pub foreign_keys: bool,
    /// How long a statement waits on a locked database, in milliseconds
    pub busy_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            path: IN_MEMORY.to_string(),
            foreign_keys: true,
            busy_timeout_ms: 5_000,
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration for the given database path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a configuration for a private in-memory database
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON; missing keys take their defaults
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Enable or disable foreign key enforcement
    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Set the busy timeout
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Busy timeout as a duration
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY
    }
}
