//! Polyrel Domain Layer
//!
//! This crate contains the vocabulary of the polymorphic relation engine.
//! It has ZERO external dependencies and defines the value types, the lazy
//! query handle, and the trait interfaces that the store and relation
//! crates depend upon.
//!
//! ## Key Concepts
//!
//! - **Entity Reference**: a `(type discriminator, id)` pair naming any entity
//! - **Edge Record**: a persisted directed relation between two endpoints
//! - **Edge Schema**: the definition of one edge storage and its fields
//! - **Polymorphic field**: an endpoint whose type varies per row
//! - **Typed field**: an endpoint whose type is fixed by the schema
//! - **Edge Query**: an immutable, composable description of a fetch
//!
//! ## Architecture
//!
//! - No external crate dependencies
//! - Store implementations live in `polyrel-store`
//! - Descriptors, managers and batch resolution live in `polyrel-relations`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod edge;
pub mod entity;
pub mod query;
pub mod schema;
pub mod traits;

// Re-exports for convenience
pub use edge::{AttrValue, EdgeFields, EdgeId, EdgeRecord};
pub use entity::{Entity, EntityId, EntityRef, TypeDiscriminator};
pub use query::{EdgeQuery, Predicate};
pub use schema::{AttributeDef, EdgeOrdering, EdgeSchema, FieldDef, FieldKind, SchemaViolation, RELATED_OBJECTS};
pub use traits::{EdgeStore, EntityFetcher, FetchError};
