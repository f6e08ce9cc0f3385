//! Relation descriptors and the accessor registry
//!
//! A [`RelationDescriptor`] binds an edge storage to a pair of field roles.
//! The [`RelationRegistry`] attaches descriptors to owning types under an
//! accessor name, so that `registry.access(owner, "related")` yields a
//! [`RelationManager`] scoped to that owner.

use crate::{EntityRegistry, RelationError, RelationManager};
use polyrel_domain::{
    EdgeQuery, EdgeRecord, EdgeSchema, EdgeStore, Entity, EntityRef, FieldDef, FieldKind, Predicate,
    TypeDiscriminator,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Who a relation manager is bound to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    /// One entity; scopes by instance identity
    Instance(EntityRef),

    /// Every entity of a type; scopes by discriminator only
    Type(TypeDiscriminator),
}

impl Owner {
    /// Instance owner for an entity
    pub fn of(entity: &dyn Entity) -> Self {
        Owner::Instance(entity.entity_ref())
    }

    /// Discriminator of the owning type
    pub fn discriminator(&self) -> &TypeDiscriminator {
        match self {
            Owner::Instance(entity) => &entity.discriminator,
            Owner::Type(discriminator) => discriminator,
        }
    }

    /// The owning instance, if bound to one
    pub fn instance(&self) -> Option<&EntityRef> {
        match self {
            Owner::Instance(entity) => Some(entity),
            Owner::Type(_) => None,
        }
    }
}

impl From<EntityRef> for Owner {
    fn from(entity: EntityRef) -> Self {
        Owner::Instance(entity)
    }
}

impl From<&EntityRef> for Owner {
    fn from(entity: &EntityRef) -> Self {
        Owner::Instance(entity.clone())
    }
}

impl From<TypeDiscriminator> for Owner {
    fn from(discriminator: TypeDiscriminator) -> Self {
        Owner::Type(discriminator)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Instance(entity) => write!(f, "{}", entity),
            Owner::Type(discriminator) => write!(f, "every {}", discriminator),
        }
    }
}

/// Binding of an edge storage to a `from` and a `to` field role
///
/// Immutable once built. Field names are resolved against the schema when
/// the descriptor is defined, so a typo fails at setup rather than on first
/// use.
///
/// # Examples
///
/// ```
/// use polyrel_domain::{EdgeOrdering, EdgeSchema, TypeDiscriminator};
/// use polyrel_relations::RelationDescriptor;
///
/// let food = TypeDiscriminator::from_static("food");
/// let beverage = TypeDiscriminator::from_static("beverage");
/// let schema = EdgeSchema::new("related_beverage")
///     .typed("food", food)
///     .typed("beverage", beverage)
///     .ordering(EdgeOrdering::IdDesc);
///
/// let descriptor = RelationDescriptor::define(schema.clone(), "food", "beverage").unwrap();
/// assert_eq!(descriptor.to_field().name(), "beverage");
///
/// assert!(RelationDescriptor::define(schema, "food", "drink").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    schema: Arc<EdgeSchema>,
    from_field: FieldDef,
    to_field: FieldDef,
}

impl RelationDescriptor {
    /// Bind `from_field` and `to_field` of `schema`
    pub fn define(
        schema: impl Into<Arc<EdgeSchema>>,
        from_field: &str,
        to_field: &str,
    ) -> Result<Self, RelationError> {
        let schema = schema.into();
        schema.validate()?;

        let lookup = |name: &str| {
            schema.field(name).cloned().ok_or_else(|| {
                RelationError::Configuration(format!("{} has no field named {}", schema.name(), name))
            })
        };
        let from = lookup(from_field)?;
        let to = lookup(to_field)?;
        if from.name() == to.name() {
            return Err(RelationError::Configuration(format!(
                "{} cannot relate field {} to itself",
                schema.name(),
                from.name()
            )));
        }

        Ok(Self {
            schema,
            from_field: from,
            to_field: to,
        })
    }

    /// Bind the conventional `parent` / `object` fields of `schema`
    pub fn new(schema: impl Into<Arc<EdgeSchema>>) -> Result<Self, RelationError> {
        Self::define(schema, "parent", "object")
    }

    /// Descriptor over the default `related_object` storage
    pub fn related_objects() -> Self {
        let schema = EdgeSchema::related_objects();
        Self {
            from_field: FieldDef::polymorphic("parent"),
            to_field: FieldDef::polymorphic("object"),
            schema: Arc::new(schema),
        }
    }

    /// Edge storage definition
    pub fn schema(&self) -> &Arc<EdgeSchema> {
        &self.schema
    }

    /// Field pinned to the owner
    pub fn from_field(&self) -> &FieldDef {
        &self.from_field
    }

    /// Field pointing at the related entity
    pub fn to_field(&self) -> &FieldDef {
        &self.to_field
    }

    /// Manager scoped to `owner`
    pub fn access(&self, owner: impl Into<Owner>) -> Result<RelationManager, RelationError> {
        RelationManager::new(self, owner.into())
    }

    /// Model-level view: every edge whose from-endpoint has this type
    pub fn all(&self, discriminator: TypeDiscriminator) -> Result<EdgeQuery, RelationError> {
        Ok(self.access(Owner::Type(discriminator))?.all())
    }

    /// Predicate pinning `field` to `entity`
    ///
    /// Fails with `TypeMismatch` when a typed field cannot hold the entity.
    pub fn query_for_field(field: &FieldDef, entity: &EntityRef) -> Result<Predicate, RelationError> {
        if !field.accepts(&entity.discriminator) {
            return Err(RelationError::TypeMismatch(format!(
                "unable to query {} with {}",
                field.name(),
                entity
            )));
        }
        Ok(Predicate::endpoint(field.name(), entity.clone()))
    }

    /// Predicate pinning `field` to any entity of a type
    ///
    /// A typed field already fixes the type, so it contributes no predicate.
    pub fn type_query_for_field(
        field: &FieldDef,
        discriminator: &TypeDiscriminator,
    ) -> Result<Predicate, RelationError> {
        match field.kind() {
            FieldKind::Polymorphic => Ok(Predicate::endpoint_type(field.name(), discriminator.clone())),
            FieldKind::Typed { target } if target == discriminator => Ok(Predicate::All(Vec::new())),
            FieldKind::Typed { target } => Err(RelationError::TypeMismatch(format!(
                "{} references {}, not {}",
                field.name(),
                target,
                discriminator
            ))),
        }
    }

    /// Predicate pinning the from-field to `owner`
    pub fn query_from(&self, owner: &Owner) -> Result<Predicate, RelationError> {
        Self::owner_query(&self.from_field, owner)
    }

    /// Predicate pinning the to-field to `owner`
    pub fn query_to(&self, owner: &Owner) -> Result<Predicate, RelationError> {
        Self::owner_query(&self.to_field, owner)
    }

    fn owner_query(field: &FieldDef, owner: &Owner) -> Result<Predicate, RelationError> {
        match owner {
            Owner::Instance(entity) => Self::query_for_field(field, entity),
            Owner::Type(discriminator) => Self::type_query_for_field(field, discriminator),
        }
    }
}

/// Accessors attached to owning types
///
/// Populated once at startup and read thereafter.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use polyrel_domain::{EntityRef, TypeDiscriminator};
/// use polyrel_relations::{EntityRegistry, EntityType, RelationRegistry};
/// # use polyrel_domain::Entity;
/// # #[derive(Debug)] struct Food;
/// # impl Entity for Food {
/// #     fn discriminator(&self) -> TypeDiscriminator { TypeDiscriminator::from_static("food") }
/// #     fn id(&self) -> i64 { 1 }
/// #     fn as_any(&self) -> &dyn std::any::Any { self }
/// # }
///
/// let food = TypeDiscriminator::from_static("food");
/// let mut entities = EntityRegistry::new();
/// # let fetcher = Arc::new(polyrel_store::MemoryEntityTable::<Food>::new(food.clone()));
/// entities.register_type(EntityType::new(food.clone(), fetcher)).unwrap();
///
/// let mut relations = RelationRegistry::new();
/// relations.attach(&entities, &food, "related").unwrap();
///
/// let manager = relations.access(EntityRef::new(food, 1), "related").unwrap();
/// assert_eq!(manager.all().predicates().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RelationRegistry {
    accessors: HashMap<TypeDiscriminator, HashMap<String, RelationDescriptor>>,
}

impl RelationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `descriptor` to `owning_type` under `accessor`
    ///
    /// Registering the same descriptor twice under the same name is a no-op.
    /// Fails when the owning type is unknown, when the accessor name is taken
    /// by a declared attribute or another descriptor, or when a typed
    /// from-field cannot hold the owning type.
    pub fn register(
        &mut self,
        entities: &EntityRegistry,
        owning_type: &TypeDiscriminator,
        accessor: &str,
        descriptor: RelationDescriptor,
    ) -> Result<(), RelationError> {
        let entity_type = entities.type_for(owning_type).ok_or_else(|| {
            RelationError::Configuration(format!("entity type {} is not registered", owning_type))
        })?;
        if accessor.is_empty() {
            return Err(RelationError::Configuration("accessor name must not be empty".to_string()));
        }
        if entity_type.has_attribute(accessor) {
            return Err(RelationError::Configuration(format!(
                "{} already declares an attribute named {}",
                owning_type, accessor
            )));
        }
        if !descriptor.from_field().accepts(owning_type) {
            return Err(RelationError::Configuration(format!(
                "field {} of {} cannot reference {}",
                descriptor.from_field().name(),
                descriptor.schema().name(),
                owning_type
            )));
        }

        let accessors = self.accessors.entry(owning_type.clone()).or_default();
        match accessors.get(accessor) {
            Some(existing) if existing == &descriptor => return Ok(()),
            Some(_) => {
                return Err(RelationError::Configuration(format!(
                    "{} already has a relation named {}",
                    owning_type, accessor
                )))
            }
            None => {}
        }

        tracing::info!(
            "Registered relation {}.{} through {}",
            owning_type,
            accessor,
            descriptor.schema().name()
        );
        accessors.insert(accessor.to_string(), descriptor);
        Ok(())
    }

    /// Attach the default descriptor over `related_object`
    pub fn attach(
        &mut self,
        entities: &EntityRegistry,
        owning_type: &TypeDiscriminator,
        accessor: &str,
    ) -> Result<(), RelationError> {
        self.register(entities, owning_type, accessor, RelationDescriptor::related_objects())
    }

    /// Descriptor registered under `accessor`
    pub fn descriptor(&self, owning_type: &TypeDiscriminator, accessor: &str) -> Option<&RelationDescriptor> {
        self.accessors.get(owning_type)?.get(accessor)
    }

    /// Accessor names registered on a type, sorted
    pub fn accessors(&self, owning_type: &TypeDiscriminator) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .accessors
            .get(owning_type)
            .map(|a| a.keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Manager for `accessor` bound to `owner`
    pub fn access(&self, owner: impl Into<Owner>, accessor: &str) -> Result<RelationManager, RelationError> {
        let owner = owner.into();
        let descriptor = self.descriptor(owner.discriminator(), accessor).ok_or_else(|| {
            RelationError::Configuration(format!(
                "{} has no relation named {}",
                owner.discriminator(),
                accessor
            ))
        })?;
        descriptor.access(owner)
    }

    /// Assign edges through an accessor; equivalent to `add` on its manager
    ///
    /// Only instance owners may be assigned to.
    pub fn assign<S, I>(
        &self,
        store: &mut S,
        owner: impl Into<Owner>,
        accessor: &str,
        edges: I,
    ) -> Result<Vec<EdgeRecord>, RelationError>
    where
        S: EdgeStore,
        I: IntoIterator<Item = EdgeRecord>,
    {
        let owner = owner.into();
        if let Owner::Type(discriminator) = &owner {
            return Err(RelationError::Unsupported(format!(
                "{}.{} must be assigned through an instance",
                discriminator, accessor
            )));
        }
        self.access(owner, accessor)?.add(store, edges)
    }
}
