//! Owner-scoped query and mutation surface
//!
//! A [`RelationManager`] is created fresh on every access. It pins the
//! from-field of an edge storage to its owner and exposes the collection
//! operations over the matching edges. Reads return lazy [`EdgeQuery`]
//! handles; writes take the backing store explicitly.

use crate::{Owner, RelationDescriptor, RelationError};
use polyrel_domain::{
    EdgeFields, EdgeId, EdgeQuery, EdgeRecord, EdgeSchema, EdgeStore, EntityRef, FieldDef, Predicate,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Query/mutation handle bound to one owner
#[derive(Debug, Clone)]
pub struct RelationManager {
    schema: Arc<EdgeSchema>,
    from_field: FieldDef,
    to_field: FieldDef,
    owner: Owner,
    core_filter: Predicate,
    uses_polymorphic_target: bool,
}

impl RelationManager {
    pub(crate) fn new(descriptor: &RelationDescriptor, owner: Owner) -> Result<Self, RelationError> {
        let core_filter = descriptor.query_from(&owner)?;
        Ok(Self {
            schema: Arc::clone(descriptor.schema()),
            from_field: descriptor.from_field().clone(),
            to_field: descriptor.to_field().clone(),
            uses_polymorphic_target: descriptor.to_field().is_polymorphic(),
            owner,
            core_filter,
        })
    }

    /// Owner this manager is bound to
    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Edge storage definition
    pub fn schema(&self) -> &EdgeSchema {
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

    /// Predicate scoping every query to the owner
    pub fn core_filter(&self) -> &Predicate {
        &self.core_filter
    }

    /// Whether the related end can hold any entity type
    pub fn uses_polymorphic_target(&self) -> bool {
        self.uses_polymorphic_target
    }

    /// Every edge owned by this manager, in storage order
    ///
    /// When the to-field is polymorphic the query resolves through it.
    pub fn all(&self) -> EdgeQuery {
        let field = self.uses_polymorphic_target.then(|| self.to_field.name());
        EdgeQuery::new(Arc::clone(&self.schema))
            .with_polymorphic_field(field)
            .filter(self.core_filter.clone())
    }

    /// `all()` narrowed by one more predicate
    pub fn filter(&self, predicate: Predicate) -> EdgeQuery {
        self.all().filter(predicate)
    }

    /// Edges from the owner to `target` carrying the given metadata
    pub fn connections_to(&self, target: &EntityRef, fields: &EdgeFields) -> Result<EdgeQuery, RelationError> {
        let to = RelationDescriptor::query_for_field(&self.to_field, target)?;
        Ok(self.all().filter(to).filter_all(fields.predicates()))
    }

    /// Get-or-create an edge from the owner to `target`
    ///
    /// Metadata takes part in the lookup, so connecting the same target under
    /// two aliases yields two edges.
    pub fn connect<S: EdgeStore>(
        &self,
        store: &mut S,
        target: &EntityRef,
        fields: EdgeFields,
    ) -> Result<EdgeRecord, RelationError> {
        let (edge, _) = self.get_or_create(store, target, fields)?;
        Ok(edge)
    }

    /// Look up an edge from the owner to `target` with the given metadata,
    /// creating it when absent
    ///
    /// Returns the edge and whether it was created.
    pub fn get_or_create<S: EdgeStore>(
        &self,
        store: &mut S,
        target: &EntityRef,
        fields: EdgeFields,
    ) -> Result<(EdgeRecord, bool), RelationError> {
        let owner = self.instance("get_or_create")?;
        let lookup = self.connections_to(target, &fields)?;

        if let Some(existing) = lookup
            .limit(1)
            .fetch(&*store)
            .map_err(RelationError::store)?
            .into_iter()
            .next()
        {
            return Ok((existing, false));
        }

        let mut record = EdgeRecord::new(self.schema.name())
            .with_endpoint(self.from_field.name(), owner.clone())
            .with_endpoint(self.to_field.name(), target.clone());
        fields.apply_to(&mut record);
        self.schema.check_record(&record)?;

        let created = store.insert(&self.schema, record).map_err(RelationError::store)?;
        tracing::debug!("Connected {} -> {} ({})", owner, target, created);
        Ok((created, true))
    }

    /// Insert an unsaved edge after stamping the owner into its from-field
    pub fn create<S: EdgeStore>(&self, store: &mut S, mut record: EdgeRecord) -> Result<EdgeRecord, RelationError> {
        let owner = self.instance("create")?;
        if record.is_persisted() {
            return Err(RelationError::Unsupported(format!(
                "create expects an unsaved edge, got {}",
                record
            )));
        }
        self.check_storage(&record)?;

        record.set_endpoint(self.from_field.name(), owner.clone());
        self.schema.check_record(&record)?;

        let created = store.insert(&self.schema, record).map_err(RelationError::store)?;
        tracing::debug!("Created {}", created);
        Ok(created)
    }

    /// Stamp the owner into each edge and save it
    ///
    /// Every edge is checked before any is written. Edges must belong to
    /// this storage. A persisted edge must already be stored under the owner
    /// with the same endpoints, since endpoints of persisted edges cannot be
    /// repointed.
    pub fn add<S, I>(&self, store: &mut S, edges: I) -> Result<Vec<EdgeRecord>, RelationError>
    where
        S: EdgeStore,
        I: IntoIterator<Item = EdgeRecord>,
    {
        let owner = self.instance("add")?;

        let mut stamped = Vec::new();
        for mut record in edges {
            self.check_storage(&record)?;
            if record.is_persisted() {
                if let Some(current) = record.endpoint(self.from_field.name()) {
                    if current != owner {
                        return Err(RelationError::Unsupported(format!(
                            "{} belongs to {}; persisted endpoints cannot be repointed",
                            record, current
                        )));
                    }
                }
            }
            record.set_endpoint(self.from_field.name(), owner.clone());
            self.schema.check_record(&record)?;
            stamped.push(record);
        }
        self.check_persisted(&*store, &stamped)?;

        let mut saved = Vec::with_capacity(stamped.len());
        for record in stamped {
            saved.push(store.save(&self.schema, record).map_err(RelationError::store)?);
        }
        tracing::debug!("Added {} edges to {}", saved.len(), owner);
        Ok(saved)
    }

    /// Delete edges that currently belong to this manager
    ///
    /// Fails with `NotRelated`, deleting nothing, if any edge is outside
    /// `all()`.
    pub fn remove<S: EdgeStore>(&self, store: &mut S, edges: &[EdgeRecord]) -> Result<usize, RelationError> {
        let mut ids = BTreeSet::new();
        for edge in edges {
            match edge.id {
                Some(id) if edge.storage == self.schema.name() => {
                    ids.insert(id);
                }
                _ => return Err(self.not_related(edge)),
            }
        }
        if ids.is_empty() {
            return Ok(0);
        }

        let members = self.all().filter(Predicate::EdgeIdIn(ids.clone()));
        let found: BTreeSet<_> = members
            .fetch(&*store)
            .map_err(RelationError::store)?
            .into_iter()
            .filter_map(|r| r.id)
            .collect();
        if let Some(edge) = edges.iter().find(|e| e.id.is_some_and(|id| !found.contains(&id))) {
            return Err(self.not_related(edge));
        }

        let removed = members.delete(store).map_err(RelationError::store)?;
        tracing::debug!("Removed {} edges from {}", removed, self.owner);
        Ok(removed)
    }

    /// Delete every edge in `all()`
    pub fn clear<S: EdgeStore>(&self, store: &mut S) -> Result<usize, RelationError> {
        let removed = self.all().delete(store).map_err(RelationError::store)?;
        tracing::debug!("Cleared {} edges from {}", removed, self.owner);
        Ok(removed)
    }

    /// Inverse view: edges of this storage whose to-endpoint is the owner
    ///
    /// Resolves through the from-field when it is polymorphic.
    pub fn related_to(&self) -> Result<EdgeQuery, RelationError> {
        let to = Self::owner_query(&self.to_field, &self.owner)?;
        let field = self.from_field.is_polymorphic().then(|| self.from_field.name());
        Ok(EdgeQuery::new(Arc::clone(&self.schema))
            .with_polymorphic_field(field)
            .filter(to))
    }

    /// Undirected view: edges with the owner at either end, each once
    ///
    /// The query resolves through the storage's first polymorphic field,
    /// so for the default storage `generic_objects` yields the `parent` of
    /// every edge, including the owner itself for its outgoing edges. Pass
    /// `ResolveOptions::field` to follow the other end.
    pub fn symmetrical(&self) -> Result<EdgeQuery, RelationError> {
        let to = Self::owner_query(&self.to_field, &self.owner)?;
        Ok(EdgeQuery::new(Arc::clone(&self.schema))
            .filter(Predicate::Any(vec![self.core_filter.clone(), to]))
            .distinct())
    }

    /// Persisted records must match their stored rows endpoint for endpoint
    fn check_persisted<S: EdgeStore>(&self, store: &S, records: &[EdgeRecord]) -> Result<(), RelationError> {
        let ids: BTreeSet<EdgeId> = records.iter().filter_map(|r| r.id).collect();
        if ids.is_empty() {
            return Ok(());
        }

        let stored: HashMap<EdgeId, EdgeRecord> = self
            .all()
            .filter(Predicate::EdgeIdIn(ids))
            .fetch(store)
            .map_err(RelationError::store)?
            .into_iter()
            .filter_map(|r| Some((r.id?, r)))
            .collect();

        for record in records {
            let Some(id) = record.id else { continue };
            let current = stored.get(&id).ok_or_else(|| self.not_related(record))?;
            if current.endpoints != record.endpoints {
                return Err(RelationError::Unsupported(format!(
                    "{} would repoint stored edge {}; persisted endpoints cannot be repointed",
                    record, current
                )));
            }
        }
        Ok(())
    }

    fn owner_query(field: &FieldDef, owner: &Owner) -> Result<Predicate, RelationError> {
        match owner {
            Owner::Instance(entity) => RelationDescriptor::query_for_field(field, entity),
            Owner::Type(discriminator) => RelationDescriptor::type_query_for_field(field, discriminator),
        }
    }

    fn instance(&self, operation: &str) -> Result<&EntityRef, RelationError> {
        self.owner.instance().ok_or_else(|| {
            RelationError::Unsupported(format!(
                "{} requires an instance, not {}",
                operation, self.owner
            ))
        })
    }

    fn check_storage(&self, record: &EdgeRecord) -> Result<(), RelationError> {
        if record.storage != self.schema.name() {
            return Err(RelationError::TypeMismatch(format!(
                "{} instance expected, got {}",
                self.schema.name(),
                record.storage
            )));
        }
        Ok(())
    }

    fn not_related(&self, edge: &EdgeRecord) -> RelationError {
        RelationError::NotRelated {
            edge: edge.to_string(),
            owner: self.owner.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyrel_domain::{TypeDiscriminator, RELATED_OBJECTS};
    use polyrel_store::{MemoryEdgeStore, StoreError};

    const FOOD: TypeDiscriminator = TypeDiscriminator::from_static("food");
    const BEVERAGE: TypeDiscriminator = TypeDiscriminator::from_static("beverage");

    fn pizza() -> EntityRef {
        EntityRef::new(FOOD, 1)
    }

    fn soda() -> EntityRef {
        EntityRef::new(BEVERAGE, 1)
    }

    fn related(owner: impl Into<Owner>) -> RelationManager {
        RelationDescriptor::related_objects().access(owner).unwrap()
    }

    #[test]
    fn test_all_resolves_through_target() {
        let manager = related(pizza());
        let all = manager.all();
        assert_eq!(all.polymorphic_field(), Some("object"));
        assert_eq!(all.predicates(), &[Predicate::endpoint("parent", pizza())]);

        let inverse = manager.related_to().unwrap();
        assert_eq!(inverse.polymorphic_field(), Some("parent"));
    }

    #[test]
    fn test_get_or_create_reports_creation() {
        let mut store = MemoryEdgeStore::new();
        let manager = related(pizza());

        let (first, created) = manager.get_or_create(&mut store, &soda(), EdgeFields::new()).unwrap();
        assert!(created);
        let (second, created) = manager.get_or_create(&mut store, &soda(), EdgeFields::new()).unwrap();
        assert!(!created);
        assert_eq!(first, second);
    }

    #[test]
    fn test_type_level_mutations_are_unsupported() {
        let mut store = MemoryEdgeStore::new();
        let manager = related(FOOD);

        assert!(matches!(
            manager.connect(&mut store, &soda(), EdgeFields::new()),
            Err(RelationError::Unsupported(_))
        ));
        assert!(matches!(
            manager.create(&mut store, EdgeRecord::new(RELATED_OBJECTS)),
            Err(RelationError::Unsupported(_))
        ));
        assert!(matches!(
            manager.add(&mut store, Vec::new()),
            Err(RelationError::Unsupported(_))
        ));
        assert_eq!(manager.clear(&mut store).unwrap(), 0);
    }

    #[test]
    fn test_add_rejects_foreign_storage() {
        let mut store = MemoryEdgeStore::new();
        let manager = related(pizza());
        let good = EdgeRecord::new(RELATED_OBJECTS).with_endpoint("object", soda());
        let bad = EdgeRecord::new("related_beverage").with_endpoint("beverage", soda());

        assert!(matches!(
            manager.add(&mut store, vec![good, bad]),
            Err(RelationError::TypeMismatch(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_rejects_repointing() {
        let mut store = MemoryEdgeStore::new();
        let cereal = EntityRef::new(FOOD, 2);
        let edge = related(cereal)
            .connect(&mut store, &soda(), EdgeFields::new())
            .unwrap();

        assert!(matches!(
            related(pizza()).add(&mut store, vec![edge]),
            Err(RelationError::Unsupported(_))
        ));
    }

    #[test]
    fn test_add_checks_stored_endpoints_before_writing() {
        let mut store = MemoryEdgeStore::new();
        let manager = related(pizza());
        let mut existing = manager.connect(&mut store, &soda(), EdgeFields::new()).unwrap();
        existing.set_endpoint("object", EntityRef::new(BEVERAGE, 9));
        let fresh = EdgeRecord::new(RELATED_OBJECTS).with_endpoint("object", EntityRef::new(BEVERAGE, 2));

        assert!(matches!(
            manager.add(&mut store, vec![fresh, existing]),
            Err(RelationError::Unsupported(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_rejects_edge_missing_from_store() {
        let mut store = MemoryEdgeStore::new();
        let manager = related(pizza());
        let mut ghost = EdgeRecord::new(RELATED_OBJECTS).with_endpoint("object", soda());
        ghost.id = Some(42);

        assert!(matches!(
            manager.add(&mut store, vec![ghost]),
            Err(RelationError::NotRelated { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_symmetrical_resolves_through_first_polymorphic_field() {
        let query = related(pizza()).symmetrical().unwrap();
        assert_eq!(query.polymorphic_field(), Some("parent"));
        assert!(query.is_distinct());
    }

    #[test]
    fn test_create_stamps_owner() {
        let mut store = MemoryEdgeStore::new();
        let manager = related(pizza());
        let record = EdgeRecord::new(RELATED_OBJECTS)
            .with_endpoint("parent", EntityRef::new(FOOD, 99))
            .with_endpoint("object", soda())
            .with_alias("pepsi");

        let created = manager.create(&mut store, record).unwrap();
        assert_eq!(created.endpoint("parent"), Some(&pizza()));
        assert!(matches!(
            manager.create(&mut store, created),
            Err(RelationError::Unsupported(_))
        ));
    }

    #[test]
    fn test_create_requires_target() {
        let mut store = MemoryEdgeStore::new();
        let result = related(pizza()).create(&mut store, EdgeRecord::new(RELATED_OBJECTS));
        assert!(matches!(result, Err(RelationError::Schema(_))));
    }

    #[test]
    fn test_remove_unsaved_edge_is_not_related() {
        let mut store = MemoryEdgeStore::new();
        let unsaved = EdgeRecord::new(RELATED_OBJECTS)
            .with_endpoint("parent", pizza())
            .with_endpoint("object", soda());

        assert!(matches!(
            related(pizza()).remove(&mut store, &[unsaved]),
            Err(RelationError::NotRelated { .. })
        ));
        assert_eq!(related(pizza()).remove(&mut store, &[]).unwrap(), 0);
    }

    #[test]
    fn test_store_errors_are_wrapped() {
        let err = RelationError::store(StoreError::NotFound(4));
        assert_eq!(err.to_string(), "Storage error: Edge not found: 4");
    }
}
