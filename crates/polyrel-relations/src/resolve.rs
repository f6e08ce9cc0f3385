//! Batch resolution of polymorphic endpoints
//!
//! Turns an ordered list of edges into the entities one of their polymorphic
//! fields points at, issuing exactly one bulk fetch per distinct referenced
//! type regardless of how many edges there are.

use crate::{EntityRegistry, RelationError};
use polyrel_domain::{EdgeQuery, EdgeRecord, EdgeStore, Entity, EntityId, EntityRef, TypeDiscriminator};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// What to do with a reference whose entity no longer exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DanglingPolicy {
    /// Omit the row and record it in [`Resolution::dangling`]
    #[default]
    Report,

    /// Omit the row silently
    Skip,

    /// Abort with [`RelationError::DanglingReference`]
    Fail,
}

/// Options for one resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Field to follow; overrides the query's own choice
    pub field: Option<String>,

    /// Keep only entities of this type (checked after loading)
    pub type_filter: Option<TypeDiscriminator>,

    /// Handling of missing entities
    pub dangling: DanglingPolicy,

    /// Log a warning per reported dangling reference
    pub warn_on_dangling: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            field: None,
            type_filter: None,
            dangling: DanglingPolicy::default(),
            warn_on_dangling: true,
        }
    }
}

impl ResolveOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow `field` instead of the query's polymorphic field
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Keep only entities of one type
    pub fn only(mut self, discriminator: TypeDiscriminator) -> Self {
        self.type_filter = Some(discriminator);
        self
    }

    /// Set the dangling-reference policy
    pub fn dangling(mut self, policy: DanglingPolicy) -> Self {
        self.dangling = policy;
        self
    }
}

/// A reference that could not be loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    /// Position of the edge in the input
    pub row: usize,

    /// The missing entity
    pub reference: EntityRef,
}

/// Outcome of a batch resolution
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Field that was followed
    pub field: String,

    /// Loaded entities in edge order
    pub entities: Vec<Arc<dyn Entity>>,

    /// Rows whose entity was missing (under [`DanglingPolicy::Report`])
    pub dangling: Vec<DanglingReference>,

    /// Bulk fetches issued
    pub fetches: usize,
}

impl Resolution {
    /// References of the loaded entities, in order
    pub fn refs(&self) -> Vec<EntityRef> {
        self.entities.iter().map(|e| e.entity_ref()).collect()
    }

    /// Whether every row resolved
    pub fn is_complete(&self) -> bool {
        self.dangling.is_empty()
    }
}

/// Resolve `field` of every edge into entities
///
/// Ids are grouped per discriminator in one pass, each group is loaded with
/// a single bulk fetch, and a second pass rebuilds the output in edge order.
/// Every discriminator must be registered before any fetch is issued.
pub fn resolve_edges(
    edges: &[EdgeRecord],
    field: &str,
    registry: &EntityRegistry,
    options: &ResolveOptions,
) -> Result<Resolution, RelationError> {
    let mut rows: Vec<&EntityRef> = Vec::with_capacity(edges.len());
    let mut groups: BTreeMap<&TypeDiscriminator, BTreeSet<EntityId>> = BTreeMap::new();
    for edge in edges {
        let reference = edge.endpoint(field).ok_or_else(|| {
            RelationError::Configuration(format!("{} has no {} endpoint", edge, field))
        })?;
        groups
            .entry(&reference.discriminator)
            .or_default()
            .insert(reference.id);
        rows.push(reference);
    }

    if let Some(unknown) = groups.keys().find(|d| !registry.contains(d)) {
        return Err(RelationError::UnknownType((*unknown).clone()));
    }

    tracing::debug!(
        "Resolving {} edges through {} with {} bulk fetches",
        edges.len(),
        field,
        groups.len()
    );

    let mut loaded: HashMap<&TypeDiscriminator, HashMap<EntityId, Arc<dyn Entity>>> = HashMap::new();
    for (discriminator, ids) in &groups {
        let ids: Vec<EntityId> = ids.iter().copied().collect();
        loaded.insert(*discriminator, registry.bulk_fetch(discriminator, &ids)?);
    }

    let mut entities = Vec::with_capacity(rows.len());
    let mut dangling = Vec::new();
    for (row, reference) in rows.into_iter().enumerate() {
        let entity = loaded
            .get(&reference.discriminator)
            .and_then(|by_id| by_id.get(&reference.id));

        match entity {
            Some(entity) => {
                let keep = options
                    .type_filter
                    .as_ref()
                    .is_none_or(|only| &entity.discriminator() == only);
                if keep {
                    entities.push(Arc::clone(entity));
                }
            }
            None => match options.dangling {
                DanglingPolicy::Fail => {
                    return Err(RelationError::DanglingReference {
                        row,
                        reference: reference.clone(),
                    })
                }
                DanglingPolicy::Report => {
                    if options.warn_on_dangling {
                        tracing::warn!("Dangling reference at row {}: {}", row, reference);
                    }
                    dangling.push(DanglingReference {
                        row,
                        reference: reference.clone(),
                    });
                }
                DanglingPolicy::Skip => {}
            },
        }
    }

    Ok(Resolution {
        field: field.to_string(),
        entities,
        dangling,
        fetches: groups.len(),
    })
}

/// Batch resolution over lazy edge queries
pub trait QueryResolver {
    /// Field resolution would follow under `options`
    ///
    /// The explicit option wins, then the query's own polymorphic field,
    /// then the first polymorphic field of the storage.
    fn resolution_field(&self, options: &ResolveOptions) -> Result<String, RelationError>;

    /// Fetch the edges and resolve them
    fn resolve<S: EdgeStore>(
        &self,
        store: &S,
        registry: &EntityRegistry,
        options: &ResolveOptions,
    ) -> Result<Resolution, RelationError>;

    /// Fetch the edges and return the entities they point at
    fn generic_objects<S: EdgeStore>(
        &self,
        store: &S,
        registry: &EntityRegistry,
    ) -> Result<Vec<Arc<dyn Entity>>, RelationError> {
        Ok(self.resolve(store, registry, &ResolveOptions::default())?.entities)
    }
}

impl QueryResolver for EdgeQuery {
    fn resolution_field(&self, options: &ResolveOptions) -> Result<String, RelationError> {
        options
            .field
            .as_deref()
            .or_else(|| self.polymorphic_field())
            .or_else(|| self.schema().first_polymorphic().map(|f| f.name()))
            .map(str::to_string)
            .ok_or_else(|| {
                RelationError::Configuration(format!(
                    "{} has no polymorphic field to resolve",
                    self.storage()
                ))
            })
    }

    fn resolve<S: EdgeStore>(
        &self,
        store: &S,
        registry: &EntityRegistry,
        options: &ResolveOptions,
    ) -> Result<Resolution, RelationError> {
        let field = self.resolution_field(options)?;
        if self.schema().field(&field).is_none() {
            return Err(RelationError::Configuration(format!(
                "{} has no field named {}",
                self.storage(),
                field
            )));
        }

        let edges = self.fetch(store).map_err(RelationError::store)?;
        resolve_edges(&edges, &field, registry, options)
    }
}
