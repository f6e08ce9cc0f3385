//! In-memory edge store and entity tables

use crate::{now_millis, StoreError};
use polyrel_domain::{
    EdgeId, EdgeQuery, EdgeRecord, EdgeSchema, EdgeStore, Entity, EntityFetcher, EntityId, EntityRef,
    FetchError, TypeDiscriminator,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Edge store that keeps every storage's rows in memory
///
/// Ids are assigned from one counter shared by all storages. Creation times
/// come from the system clock; rows created within the same millisecond are
/// ordered by id.
#[derive(Debug, Default)]
pub struct MemoryEdgeStore {
    tables: HashMap<String, Vec<EdgeRecord>>,
    next_id: EdgeId,
}

impl MemoryEdgeStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rows across all storages
    pub fn len(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// Whether the store holds no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of rows in one storage
    pub fn storage_len(&self, storage: &str) -> usize {
        self.tables.get(storage).map_or(0, Vec::len)
    }

    fn find_mut(&mut self, storage: &str, id: EdgeId) -> Option<&mut EdgeRecord> {
        self.tables
            .get_mut(storage)?
            .iter_mut()
            .find(|r| r.id == Some(id))
    }
}

impl EdgeStore for MemoryEdgeStore {
    type Error = StoreError;

    fn fetch(&self, query: &EdgeQuery) -> Result<Vec<EdgeRecord>, Self::Error> {
        let Some(rows) = self.tables.get(query.storage()) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<EdgeRecord> = rows.iter().filter(|r| query.matches(r)).cloned().collect();
        let ordering = query.ordering();
        matched.sort_by(|a, b| ordering.compare(a, b));
        if query.is_distinct() {
            matched.dedup_by(|a, b| a.id == b.id);
        }
        if let Some(limit) = query.limit_value() {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    fn insert(&mut self, schema: &EdgeSchema, mut record: EdgeRecord) -> Result<EdgeRecord, Self::Error> {
        schema.check_record(&record)?;

        self.next_id += 1;
        record.id = Some(self.next_id);
        record.created_at = Some(now_millis());

        tracing::debug!("Inserted edge {}", record);
        self.tables
            .entry(schema.name().to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    fn save(&mut self, schema: &EdgeSchema, record: EdgeRecord) -> Result<EdgeRecord, Self::Error> {
        let Some(id) = record.id else {
            return self.insert(schema, record);
        };
        schema.check_record(&record)?;

        let existing = self
            .find_mut(schema.name(), id)
            .ok_or(StoreError::NotFound(id))?;
        if existing.endpoints != record.endpoints {
            return Err(StoreError::ImmutableEndpoint(id));
        }

        existing.alias = record.alias;
        existing.description = record.description;
        existing.attributes = record.attributes;
        Ok(existing.clone())
    }

    fn delete(&mut self, query: &EdgeQuery) -> Result<usize, Self::Error> {
        let Some(rows) = self.tables.get_mut(query.storage()) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !query.matches(r));
        let removed = before - rows.len();

        tracing::debug!("Deleted {} edges from {}", removed, query.storage());
        Ok(removed)
    }
}

/// In-memory table of one entity type, usable as an [`EntityFetcher`]
///
/// Counts bulk fetches so callers can observe how many round-trips a batch
/// resolution performed. Rows may be inserted or removed after the table has
/// been shared with a registry.
///
/// # Examples
///
/// ```
/// use std::any::Any;
/// use polyrel_domain::{Entity, EntityFetcher, EntityId, TypeDiscriminator};
/// use polyrel_store::MemoryEntityTable;
///
/// #[derive(Debug, Clone)]
/// struct Person { id: EntityId }
///
/// impl Entity for Person {
///     fn discriminator(&self) -> TypeDiscriminator { TypeDiscriminator::from_static("person") }
///     fn id(&self) -> EntityId { self.id }
///     fn as_any(&self) -> &dyn Any { self }
/// }
///
/// let people = MemoryEntityTable::new(TypeDiscriminator::from_static("person"));
/// people.insert(Person { id: 1 }).unwrap();
///
/// let found = people.bulk_fetch(&[1, 2]).unwrap();
/// assert_eq!(found.len(), 1);
/// assert_eq!(people.fetch_count(), 1);
/// ```
#[derive(Debug)]
pub struct MemoryEntityTable<T> {
    discriminator: TypeDiscriminator,
    rows: RwLock<BTreeMap<EntityId, Arc<T>>>,
    fetches: AtomicUsize,
}

impl<T: Entity> MemoryEntityTable<T> {
    /// Create an empty table for the given type
    pub fn new(discriminator: TypeDiscriminator) -> Self {
        Self {
            discriminator,
            rows: RwLock::new(BTreeMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Type stored in this table
    pub fn discriminator(&self) -> &TypeDiscriminator {
        &self.discriminator
    }

    /// Add or replace an entity, returning its reference
    pub fn insert(&self, entity: T) -> Result<EntityRef, StoreError> {
        let found = entity.discriminator();
        if found != self.discriminator {
            return Err(StoreError::WrongEntityType {
                expected: self.discriminator.clone(),
                found,
            });
        }

        let reference = entity.entity_ref();
        self.rows
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(entity.id(), Arc::new(entity));
        Ok(reference)
    }

    /// Remove an entity, leaving any edges that point at it dangling
    pub fn remove(&self, id: EntityId) -> Option<Arc<T>> {
        self.rows
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&id)
    }

    /// Look up one entity without counting a fetch
    pub fn get(&self, id: EntityId) -> Option<Arc<T>> {
        self.rows
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&id)
            .cloned()
    }

    /// Number of entities in the table
    pub fn len(&self) -> usize {
        self.rows
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of bulk fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Reset the bulk fetch counter
    pub fn reset_fetch_count(&self) {
        self.fetches.store(0, Ordering::SeqCst);
    }
}

impl<T: Entity> EntityFetcher for MemoryEntityTable<T> {
    fn bulk_fetch(&self, ids: &[EntityId]) -> Result<HashMap<EntityId, Arc<dyn Entity>>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let rows = self
            .rows
            .read()
            .map_err(|_| FetchError::new(self.discriminator.clone(), "entity table lock poisoned"))?;

        Ok(ids
            .iter()
            .filter_map(|id| {
                rows.get(id)
                    .map(|entity| (*id, Arc::clone(entity) as Arc<dyn Entity>))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyrel_domain::{EdgeOrdering, Predicate, RELATED_OBJECTS};
    use std::any::Any;

    const FOOD: TypeDiscriminator = TypeDiscriminator::from_static("food");
    const BEVERAGE: TypeDiscriminator = TypeDiscriminator::from_static("beverage");

    #[derive(Debug, Clone)]
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

    fn edge(parent: EntityId, object: EntityId) -> EdgeRecord {
        EdgeRecord::new(RELATED_OBJECTS)
            .with_endpoint("parent", EntityRef::new(FOOD, parent))
            .with_endpoint("object", EntityRef::new(BEVERAGE, object))
    }

    fn schema() -> Arc<EdgeSchema> {
        Arc::new(EdgeSchema::related_objects())
    }

    #[test]
    fn test_insert_assigns_id_and_timestamp() {
        let mut store = MemoryEdgeStore::new();
        let saved = store.insert(&schema(), edge(1, 1)).unwrap();

        assert_eq!(saved.id, Some(1));
        assert!(saved.created_at.is_some());
        assert_eq!(store.len(), 1);
        assert_eq!(store.storage_len(RELATED_OBJECTS), 1);
    }

    #[test]
    fn test_insert_rejects_incomplete_record() {
        let mut store = MemoryEdgeStore::new();
        let record = EdgeRecord::new(RELATED_OBJECTS).with_endpoint("parent", EntityRef::new(FOOD, 1));

        assert!(matches!(
            store.insert(&schema(), record),
            Err(StoreError::SchemaViolation(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_fetch_orders_newest_first() {
        let mut store = MemoryEdgeStore::new();
        let schema = schema();
        for object in 1..=3 {
            store.insert(&schema, edge(1, object)).unwrap();
        }

        let query = EdgeQuery::new(Arc::clone(&schema));
        let ids: Vec<_> = store.fetch(&query).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![Some(3), Some(2), Some(1)]);

        let ids: Vec<_> = store
            .fetch(&query.order_by(EdgeOrdering::IdAsc).limit(2))
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_save_updates_metadata_only() {
        let mut store = MemoryEdgeStore::new();
        let schema = schema();
        let saved = store.insert(&schema, edge(1, 1)).unwrap();
        let created_at = saved.created_at;

        let updated = store.save(&schema, saved.clone().with_alias("fizzy")).unwrap();
        assert_eq!(updated.alias, "fizzy");
        assert_eq!(updated.created_at, created_at);

        let mut repointed = saved;
        repointed.set_endpoint("object", EntityRef::new(BEVERAGE, 9));
        assert!(matches!(
            store.save(&schema, repointed),
            Err(StoreError::ImmutableEndpoint(1))
        ));
    }

    #[test]
    fn test_delete_by_query() {
        let mut store = MemoryEdgeStore::new();
        let schema = schema();
        store.insert(&schema, edge(1, 1)).unwrap();
        store.insert(&schema, edge(2, 1)).unwrap();

        let query = EdgeQuery::new(Arc::clone(&schema))
            .filter(Predicate::endpoint("parent", EntityRef::new(FOOD, 1)));
        assert_eq!(store.delete(&query).unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_entity_table_counts_fetches() {
        let table = MemoryEntityTable::new(FOOD);
        table.insert(Food(1)).unwrap();
        table.insert(Food(2)).unwrap();

        let found = table.bulk_fetch(&[1, 2, 3]).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(table.fetch_count(), 1);

        table.remove(2);
        assert_eq!(table.bulk_fetch(&[2]).unwrap().len(), 0);
        assert_eq!(table.fetch_count(), 2);

        table.reset_fetch_count();
        assert_eq!(table.fetch_count(), 0);
    }

    #[test]
    fn test_entity_table_rejects_other_types() {
        let table: MemoryEntityTable<Food> = MemoryEntityTable::new(BEVERAGE);
        assert!(matches!(
            table.insert(Food(1)),
            Err(StoreError::WrongEntityType { .. })
        ));
    }
}
