//! Edge predicates and the lazy, composable [`EdgeQuery`] handle

use crate::traits::EdgeStore;
use crate::{AttrValue, EdgeId, EdgeOrdering, EdgeRecord, EdgeSchema, EntityId, EntityRef, TypeDiscriminator};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Equality / membership predicate over edge fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Endpoint `field` references exactly `entity`
    Endpoint {
        /// Endpoint field name
        field: String,
        /// Referenced entity
        entity: EntityRef,
    },

    /// Endpoint `field` references any entity of the given type
    EndpointType {
        /// Endpoint field name
        field: String,
        /// Referenced type
        discriminator: TypeDiscriminator,
    },

    /// Endpoint `field` references an entity of one of the given types
    EndpointTypeIn {
        /// Endpoint field name
        field: String,
        /// Accepted types
        discriminators: Vec<TypeDiscriminator>,
    },

    /// Endpoint `field` references one of the given ids (of any type)
    EndpointIdIn {
        /// Endpoint field name
        field: String,
        /// Accepted ids
        ids: BTreeSet<EntityId>,
    },

    /// Alias equals
    Alias(String),

    /// Alias is one of
    AliasIn(Vec<String>),

    /// Description equals
    Description(String),

    /// Extra attribute equals
    Attribute {
        /// Attribute name
        name: String,
        /// Expected value
        value: AttrValue,
    },

    /// Edge id equals
    EdgeId(EdgeId),

    /// Edge id is one of
    EdgeIdIn(BTreeSet<EdgeId>),

    /// Every inner predicate holds (empty: always true)
    All(Vec<Predicate>),

    /// At least one inner predicate holds (empty: always false)
    Any(Vec<Predicate>),
}

impl Predicate {
    /// `field` references `entity`
    pub fn endpoint(field: impl Into<String>, entity: EntityRef) -> Self {
        Predicate::Endpoint {
            field: field.into(),
            entity,
        }
    }

    /// `field` references some entity of type `discriminator`
    pub fn endpoint_type(field: impl Into<String>, discriminator: TypeDiscriminator) -> Self {
        Predicate::EndpointType {
            field: field.into(),
            discriminator,
        }
    }

    /// Alias equals `alias`
    pub fn alias(alias: impl Into<String>) -> Self {
        Predicate::Alias(alias.into())
    }

    /// Evaluate the predicate against a record
    ///
    /// Used by in-memory stores; SQL stores compile predicates instead.
    pub fn matches(&self, record: &EdgeRecord) -> bool {
        match self {
            Predicate::Endpoint { field, entity } => record.endpoint(field) == Some(entity),
            Predicate::EndpointType { field, discriminator } => record
                .endpoint(field)
                .is_some_and(|e| &e.discriminator == discriminator),
            Predicate::EndpointTypeIn { field, discriminators } => record
                .endpoint(field)
                .is_some_and(|e| discriminators.contains(&e.discriminator)),
            Predicate::EndpointIdIn { field, ids } => {
                record.endpoint(field).is_some_and(|e| ids.contains(&e.id))
            }
            Predicate::Alias(alias) => &record.alias == alias,
            Predicate::AliasIn(aliases) => aliases.contains(&record.alias),
            Predicate::Description(description) => &record.description == description,
            Predicate::Attribute { name, value } => record.attributes.get(name) == Some(value),
            Predicate::EdgeId(id) => record.id == Some(*id),
            Predicate::EdgeIdIn(ids) => record.id.is_some_and(|id| ids.contains(&id)),
            Predicate::All(inner) => inner.iter().all(|p| p.matches(record)),
            Predicate::Any(inner) => inner.iter().any(|p| p.matches(record)),
        }
    }
}

/// Lazy query over one edge storage
///
/// A query is a value: `filter`, `order_by`, `distinct` and `limit` return a
/// new query and leave the receiver untouched. Nothing touches a store until
/// [`EdgeQuery::fetch`] (or `count`, `exists`, `delete`) is called, and every
/// call re-issues the underlying fetch.
///
/// The query also remembers which polymorphic field batch resolution should
/// follow. It is chosen once, when the query is built, and carried through
/// every derived query.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use polyrel_domain::{EdgeQuery, EdgeSchema, Predicate};
///
/// let all = EdgeQuery::new(Arc::new(EdgeSchema::related_objects()));
/// let aliased = all.filter(Predicate::alias("pepsi"));
///
/// assert!(all.predicates().is_empty());
/// assert_eq!(aliased.predicates().len(), 1);
/// assert_eq!(aliased.polymorphic_field(), Some("parent"));
/// ```
#[derive(Debug, Clone)]
pub struct EdgeQuery {
    schema: Arc<EdgeSchema>,
    predicates: Vec<Predicate>,
    ordering: EdgeOrdering,
    distinct: bool,
    limit: Option<usize>,
    polymorphic_field: Option<String>,
}

impl EdgeQuery {
    /// Query every row of a storage in its default order
    ///
    /// The resolution field defaults to the schema's first polymorphic field.
    pub fn new(schema: Arc<EdgeSchema>) -> Self {
        let polymorphic_field = schema.first_polymorphic().map(|f| f.name().to_string());
        let ordering = schema.default_ordering();
        Self {
            schema,
            predicates: Vec::new(),
            ordering,
            distinct: false,
            limit: None,
            polymorphic_field,
        }
    }

    /// Narrow the query by one more predicate
    pub fn filter(&self, predicate: Predicate) -> Self {
        let mut next = self.clone();
        next.predicates.push(predicate);
        next
    }

    /// Narrow the query by several predicates at once
    pub fn filter_all(&self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut next = self.clone();
        next.predicates.extend(predicates);
        next
    }

    /// Replace the ordering
    pub fn order_by(&self, ordering: EdgeOrdering) -> Self {
        let mut next = self.clone();
        next.ordering = ordering;
        next
    }

    /// Request de-duplicated rows
    pub fn distinct(&self) -> Self {
        let mut next = self.clone();
        next.distinct = true;
        next
    }

    /// Cap the number of rows returned
    pub fn limit(&self, limit: usize) -> Self {
        let mut next = self.clone();
        next.limit = Some(limit);
        next
    }

    /// Choose the field batch resolution follows (`None` disables it)
    pub fn with_polymorphic_field(&self, field: Option<&str>) -> Self {
        let mut next = self.clone();
        next.polymorphic_field = field.map(str::to_string);
        next
    }

    /// Schema of the queried storage
    pub fn schema(&self) -> &EdgeSchema {
        &self.schema
    }

    /// Shared handle to the schema
    pub fn schema_arc(&self) -> &Arc<EdgeSchema> {
        &self.schema
    }

    /// Name of the queried storage
    pub fn storage(&self) -> &str {
        self.schema.name()
    }

    /// Conjunction of predicates applied so far
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Effective ordering
    pub fn ordering(&self) -> EdgeOrdering {
        self.ordering
    }

    /// Whether rows are de-duplicated
    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Row cap, if any
    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    /// Field batch resolution follows
    pub fn polymorphic_field(&self) -> Option<&str> {
        self.polymorphic_field.as_deref()
    }

    /// Whether a record satisfies every predicate and lives in this storage
    pub fn matches(&self, record: &EdgeRecord) -> bool {
        record.storage == self.schema.name() && self.predicates.iter().all(|p| p.matches(record))
    }

    /// Run the query
    pub fn fetch<S: EdgeStore>(&self, store: &S) -> Result<Vec<EdgeRecord>, S::Error> {
        store.fetch(self)
    }

    /// Count matching rows
    pub fn count<S: EdgeStore>(&self, store: &S) -> Result<usize, S::Error> {
        store.count(self)
    }

    /// Whether at least one row matches
    pub fn exists<S: EdgeStore>(&self, store: &S) -> Result<bool, S::Error> {
        store.exists(self)
    }

    /// Delete every matching row (ordering and limit are ignored)
    pub fn delete<S: EdgeStore>(&self, store: &mut S) -> Result<usize, S::Error> {
        store.delete(self)
    }
}
