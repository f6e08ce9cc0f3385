//! Polyrel Storage Layer
//!
//! Implements the `EdgeStore` and `EntityFetcher` traits.
//!
//! # Architecture
//!
//! - [`SqliteEdgeStore`]: one SQLite table per edge schema, predicates
//!   compiled to parameterised SQL
//! - [`MemoryEdgeStore`]: rows kept in memory, predicates evaluated directly
//! - [`MemoryEntityTable`]: an in-memory entity table that counts bulk fetches
//!
//! # Examples
//!
//! ```no_run
//! use polyrel_store::SqliteEdgeStore;
//!
//! let store = SqliteEdgeStore::new(":memory:").unwrap();
//! // Store is now ready for edge operations
//! ```

#![warn(missing_docs)]

mod config;
mod memory;
mod sqlite;

pub use config::{JournalMode, StoreConfig, Synchronous};
pub use memory::{MemoryEdgeStore, MemoryEntityTable};
pub use sqlite::SqliteEdgeStore;

use polyrel_domain::{EdgeId, SchemaViolation, TypeDiscriminator};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Attribute column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record or schema rejected by the edge schema
    #[error("Schema violation: {0}")]
    SchemaViolation(#[from] SchemaViolation),

    /// Edge not found
    #[error("Edge not found: {0}")]
    NotFound(EdgeId),

    /// Save attempted to repoint an endpoint of a persisted edge
    #[error("Endpoints of edge {0} are immutable")]
    ImmutableEndpoint(EdgeId),

    /// Entity stored in a table of another type
    #[error("Wrong entity type: expected {expected}, found {found}")]
    WrongEntityType {
        /// Type of the table
        expected: TypeDiscriminator,
        /// Type of the entity
        found: TypeDiscriminator,
    },

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Current timestamp in milliseconds since Unix epoch
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
