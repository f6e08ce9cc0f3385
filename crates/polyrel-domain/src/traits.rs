//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the relation engine and the
//! backing store / entity tables. Implementations live in other crates.

use crate::{EdgeQuery, EdgeRecord, EdgeSchema, Entity, EntityId, TypeDiscriminator};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Trait for storing and querying edge records
///
/// Implemented by the infrastructure layer (polyrel-store)
pub trait EdgeStore {
    /// Error type for store operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Rows matching the query, in the query's ordering, honouring its limit
    fn fetch(&self, query: &EdgeQuery) -> Result<Vec<EdgeRecord>, Self::Error>;

    /// Number of rows `fetch` would return
    fn count(&self, query: &EdgeQuery) -> Result<usize, Self::Error> {
        Ok(self.fetch(query)?.len())
    }

    /// Whether `fetch` would return at least one row
    fn exists(&self, query: &EdgeQuery) -> Result<bool, Self::Error> {
        Ok(self.count(&query.limit(1))? > 0)
    }

    /// Persist a new record, assigning its id and creation time
    fn insert(&mut self, schema: &EdgeSchema, record: EdgeRecord) -> Result<EdgeRecord, Self::Error>;

    /// Insert an unsaved record, or update the metadata of a persisted one
    ///
    /// Stores must reject an update that changes an endpoint.
    fn save(&mut self, schema: &EdgeSchema, record: EdgeRecord) -> Result<EdgeRecord, Self::Error>;

    /// Delete every row matching the query, returning how many were removed
    fn delete(&mut self, query: &EdgeQuery) -> Result<usize, Self::Error>;
}

/// Failure while bulk-fetching entities of one type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    /// Type being fetched
    pub discriminator: TypeDiscriminator,

    /// What went wrong
    pub message: String,
}

impl FetchError {
    /// Create a new fetch error
    pub fn new(discriminator: TypeDiscriminator, message: impl Into<String>) -> Self {
        Self {
            discriminator,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to fetch {} entities: {}", self.discriminator, self.message)
    }
}

impl std::error::Error for FetchError {}

/// Bulk loader for the entities of one registered type
///
/// Implemented by whatever owns the entity tables. Ids missing from the
/// returned map are treated as dangling references by the caller.
pub trait EntityFetcher: Send + Sync {
    /// Load every entity whose id is in `ids`
    fn bulk_fetch(&self, ids: &[EntityId]) -> Result<HashMap<EntityId, Arc<dyn Entity>>, FetchError>;
}
