//! Polyrel Relations
//!
//! Generic many-to-many relations between entities of any registered type,
//! recorded in shared edge storages instead of one join table per type pair.
//!
//! # Overview
//!
//! - **Entity registry**: maps type discriminators to bulk fetchers
//! - **Relation descriptors**: bind an edge storage to `from`/`to` field roles
//!   and attach it to an owning type under an accessor name
//! - **Relation managers**: owner-scoped `all`/`filter`/`connect`/`add`/
//!   `remove`/`clear`/`related_to`/`symmetrical`
//! - **Batch resolution**: edges to entities with one bulk fetch per type
//!
//! # Usage
//!
//! ```
//! use std::any::Any;
//! use std::sync::Arc;
//! use polyrel_domain::{EdgeFields, Entity, EntityId, TypeDiscriminator};
//! use polyrel_relations::{EntityRegistry, EntityType, Owner, QueryResolver, RelationRegistry};
//! use polyrel_store::{MemoryEdgeStore, MemoryEntityTable};
//!
//! #[derive(Debug)]
//! struct Food { id: EntityId }
//!
//! impl Entity for Food {
//!     fn discriminator(&self) -> TypeDiscriminator { TypeDiscriminator::from_static("food") }
//!     fn id(&self) -> EntityId { self.id }
//!     fn as_any(&self) -> &dyn Any { self }
//! }
//!
//! # fn main() -> anyhow::Result<()> {
//! let food = TypeDiscriminator::from_static("food");
//! let foods = Arc::new(MemoryEntityTable::new(food.clone()));
//! let pizza = foods.insert(Food { id: 1 })?;
//! let cereal = foods.insert(Food { id: 2 })?;
//!
//! let mut entities = EntityRegistry::new();
//! entities.register_type(EntityType::new(food.clone(), foods.clone()))?;
//! let mut relations = RelationRegistry::new();
//! relations.attach(&entities, &food, "related")?;
//!
//! let mut store = MemoryEdgeStore::new();
//! let related = relations.access(Owner::from(&pizza), "related")?;
//! related.connect(&mut store, &cereal, EdgeFields::new().alias("breakfast"))?;
//!
//! let objects = related.all().generic_objects(&store, &entities)?;
//! assert_eq!(objects[0].entity_ref(), cereal);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod descriptor;
mod error;
mod manager;
mod registry;
mod resolve;

pub use config::ResolveConfig;
pub use descriptor::{Owner, RelationDescriptor, RelationRegistry};
pub use error::RelationError;
pub use manager::RelationManager;
pub use registry::{EntityRegistry, EntityType};
pub use resolve::{resolve_edges, DanglingPolicy, DanglingReference, QueryResolver, Resolution, ResolveOptions};
