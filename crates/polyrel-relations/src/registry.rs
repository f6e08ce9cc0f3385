//! Entity type registry
//!
//! Maps type discriminators to the fetchers that load their entities and to
//! the attribute names the type already declares. Built once at startup.

use crate::RelationError;
use polyrel_domain::{Entity, EntityFetcher, EntityId, TypeDiscriminator};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One registered entity type
#[derive(Clone)]
pub struct EntityType {
    /// Discriminator stored in polymorphic endpoints
    pub discriminator: TypeDiscriminator,

    /// Attribute names the type already declares
    pub attributes: Vec<String>,

    /// Bulk loader for the type's entities
    pub fetcher: Arc<dyn EntityFetcher>,
}

impl EntityType {
    /// Register a type with no declared attributes
    pub fn new(discriminator: TypeDiscriminator, fetcher: Arc<dyn EntityFetcher>) -> Self {
        Self {
            discriminator,
            attributes: Vec::new(),
            fetcher,
        }
    }

    /// Declare attribute names that relation accessors may not reuse
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.extend(attributes.into_iter().map(Into::into));
        self
    }

    /// Whether the type declares an attribute with this name
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a == name)
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("discriminator", &self.discriminator)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

/// Registry of every entity type that may appear as an edge endpoint
#[derive(Debug, Default)]
pub struct EntityRegistry {
    types: HashMap<TypeDiscriminator, EntityType>,
}

impl EntityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type; a discriminator may only be registered once
    pub fn register_type(&mut self, entity_type: EntityType) -> Result<(), RelationError> {
        if self.types.contains_key(&entity_type.discriminator) {
            return Err(RelationError::Configuration(format!(
                "entity type {} is already registered",
                entity_type.discriminator
            )));
        }

        tracing::info!("Registered entity type {}", entity_type.discriminator);
        self.types
            .insert(entity_type.discriminator.clone(), entity_type);
        Ok(())
    }

    /// Discriminator of a registered entity
    pub fn discriminator_for(&self, entity: &dyn Entity) -> Result<TypeDiscriminator, RelationError> {
        let discriminator = entity.discriminator();
        if self.contains(&discriminator) {
            Ok(discriminator)
        } else {
            Err(RelationError::UnknownType(discriminator))
        }
    }

    /// Registered type for a discriminator
    pub fn type_for(&self, discriminator: &TypeDiscriminator) -> Option<&EntityType> {
        self.types.get(discriminator)
    }

    /// Whether the discriminator is registered
    pub fn contains(&self, discriminator: &TypeDiscriminator) -> bool {
        self.types.contains_key(discriminator)
    }

    /// Registered discriminators, sorted
    pub fn discriminators(&self) -> Vec<&TypeDiscriminator> {
        let mut all: Vec<_> = self.types.keys().collect();
        all.sort();
        all
    }

    /// Load entities of one type through its fetcher
    pub fn bulk_fetch(
        &self,
        discriminator: &TypeDiscriminator,
        ids: &[EntityId],
    ) -> Result<HashMap<EntityId, Arc<dyn Entity>>, RelationError> {
        let entity_type = self
            .type_for(discriminator)
            .ok_or_else(|| RelationError::UnknownType(discriminator.clone()))?;
        Ok(entity_type.fetcher.bulk_fetch(ids)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyrel_domain::FetchError;
    use polyrel_store::MemoryEntityTable;
    use std::any::Any;

    const FOOD: TypeDiscriminator = TypeDiscriminator::from_static("food");
    const PERSON: TypeDiscriminator = TypeDiscriminator::from_static("person");

    #[derive(Debug)]
    struct Food(EntityId);

    impl Entity for Food {
        fn discriminator(&self) -> TypeDiscriminator {
            FOOD
        }

        fn id(&self) -> EntityId {
            self.0
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Broken;

    impl EntityFetcher for Broken {
        fn bulk_fetch(&self, _ids: &[EntityId]) -> Result<HashMap<EntityId, Arc<dyn Entity>>, FetchError> {
            Err(FetchError::new(PERSON, "table offline"))
        }
    }

    fn registry() -> (EntityRegistry, Arc<MemoryEntityTable<Food>>) {
        let foods = Arc::new(MemoryEntityTable::new(FOOD));
        foods.insert(Food(1)).unwrap();
        let mut registry = EntityRegistry::new();
        registry
            .register_type(EntityType::new(FOOD, foods.clone()).with_attributes(["name"]))
            .unwrap();
        (registry, foods)
    }

    #[test]
    fn test_register_and_lookup() {
        let (registry, _) = registry();
        assert!(registry.contains(&FOOD));
        assert!(!registry.contains(&PERSON));
        assert!(registry.type_for(&FOOD).unwrap().has_attribute("name"));
        assert_eq!(registry.discriminator_for(&Food(1)).unwrap(), FOOD);
        assert_eq!(registry.discriminators(), vec![&FOOD]);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let (mut registry, foods) = registry();
        let result = registry.register_type(EntityType::new(FOOD, foods));
        assert!(matches!(result, Err(RelationError::Configuration(_))));
    }

    #[test]
    fn test_bulk_fetch() {
        let (registry, foods) = registry();
        let loaded = registry.bulk_fetch(&FOOD, &[1, 2]).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[&1].id(), 1);
        assert_eq!(foods.fetch_count(), 1);

        assert!(matches!(
            registry.bulk_fetch(&PERSON, &[1]),
            Err(RelationError::UnknownType(_))
        ));
    }

    #[test]
    fn test_fetch_errors_propagate() {
        let mut registry = EntityRegistry::new();
        registry
            .register_type(EntityType::new(PERSON, Arc::new(Broken)))
            .unwrap();
        assert!(matches!(
            registry.bulk_fetch(&PERSON, &[1]),
            Err(RelationError::Fetch(_))
        ));
    }
}
