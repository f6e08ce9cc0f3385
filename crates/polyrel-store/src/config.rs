//! Configuration for the SQLite edge store

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// SQLite journal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    /// Rollback journal, deleted after each transaction
    #[default]
    Delete,
    /// Write-ahead log
    Wal,
    /// Journal kept in memory
    Memory,
}

impl JournalMode {
    /// Pragma value
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalMode::Delete => "delete",
            JournalMode::Wal => "wal",
            JournalMode::Memory => "memory",
        }
    }
}

/// SQLite synchronous setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Synchronous {
    /// No fsync
    Off,
    /// Fsync at critical moments
    Normal,
    /// Fsync after every write
    #[default]
    Full,
}

impl Synchronous {
    /// Pragma value
    pub fn as_str(&self) -> &'static str {
        match self {
            Synchronous::Off => "off",
            Synchronous::Normal => "normal",
            Synchronous::Full => "full",
        }
    }
}

/// Configuration for [`SqliteEdgeStore`](crate::SqliteEdgeStore)
///
/// # Examples
///
/// ```
/// use polyrel_store::{JournalMode, StoreConfig};
///
/// let config = StoreConfig::from_toml(r#"
///     path = "edges.db"
///     journal_mode = "wal"
/// "#).unwrap();
///
/// assert_eq!(config.journal_mode, JournalMode::Wal);
/// assert_eq!(config.busy_timeout_ms, 5_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database path, or `:memory:`
    pub path: String,

    /// Journal mode applied on open
    #[serde(default)]
    pub journal_mode: JournalMode,

    /// Synchronous level applied on open
    #[serde(default)]
    pub synchronous: Synchronous,

    /// How long to wait on a locked database (milliseconds)
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "polyrel.db".to_string(),
            journal_mode: JournalMode::default(),
            synchronous: Synchronous::default(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// In-memory database, for tests and scratch work
    pub fn in_memory() -> Self {
        Self {
            path: ":memory:".to_string(),
            journal_mode: JournalMode::Memory,
            synchronous: Synchronous::Off,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    /// File database tuned for concurrent readers
    pub fn wal(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            journal_mode: JournalMode::Wal,
            synchronous: Synchronous::Normal,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    /// Busy timeout as a Duration
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.path.is_empty() {
            return Err("path must not be empty".to_string());
        }
        if self.path == ":memory:" && self.journal_mode == JournalMode::Wal {
            return Err("in-memory databases cannot use the WAL journal".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
