//! Error types for relation operations

use polyrel_domain::{EntityRef, FetchError, SchemaViolation, TypeDiscriminator};
use std::fmt;
use thiserror::Error;

/// Errors that can occur while defining, accessing or resolving relations
#[derive(Error, Debug)]
pub enum RelationError {
    /// Invalid setup: unknown field, accessor collision, unregistered type
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Record or entity of the wrong type for this relation
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Edge is not a member of the manager's scope
    #[error("{edge} is not related to {owner}")]
    NotRelated {
        /// The offending edge
        edge: String,
        /// Owner of the manager
        owner: String,
    },

    /// Operation not available on this manager
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Resolved id has no matching entity
    #[error("Dangling reference at row {row}: {reference}")]
    DanglingReference {
        /// Position of the edge in the resolved batch
        row: usize,
        /// The reference that could not be loaded
        reference: EntityRef,
    },

    /// Entity type was never registered
    #[error("Unknown entity type: {0}")]
    UnknownType(TypeDiscriminator),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),

    /// Entity fetcher error
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Record rejected by its edge schema
    #[error("Schema violation: {0}")]
    Schema(#[from] SchemaViolation),
}

impl RelationError {
    /// Wrap a backing-store error
    pub fn store(err: impl fmt::Display) -> Self {
        RelationError::Store(err.to_string())
    }
}
