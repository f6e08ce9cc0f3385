//! Edge module - persisted directed relations between two entity references

use crate::query::Predicate;
use crate::EntityRef;
use std::collections::BTreeMap;
use std::fmt;

/// Primary key of a persisted edge, assigned by the store
pub type EdgeId = i64;

/// Value of an extra column declared by a custom edge storage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrValue {
    /// Free text
    Text(String),

    /// Signed integer
    Int(i64),

    /// Boolean flag
    Bool(bool),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(s) => f.write_str(s),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// One directed relation stored in an edge storage
///
/// Endpoints are keyed by the field names declared on the storage's
/// [`EdgeSchema`](crate::EdgeSchema) (`parent`/`object` for the default
/// storage). Once persisted, endpoints are immutable: only `alias`,
/// `description` and `attributes` may change. To repoint an edge, delete it
/// and create a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRecord {
    /// Store-assigned id, `None` until persisted
    pub id: Option<EdgeId>,

    /// Name of the edge storage this record belongs to
    pub storage: String,

    /// Endpoint references keyed by field name
    pub endpoints: BTreeMap<String, EntityRef>,

    /// Short optional label
    pub alias: String,

    /// Optional free text
    pub description: String,

    /// Extra columns of custom storages
    pub attributes: BTreeMap<String, AttrValue>,

    /// Creation time in milliseconds since the Unix epoch, set by the store
    pub created_at: Option<u64>,
}

impl EdgeRecord {
    /// Create an empty, unsaved record for the given storage
    pub fn new(storage: impl Into<String>) -> Self {
        Self {
            id: None,
            storage: storage.into(),
            endpoints: BTreeMap::new(),
            alias: String::new(),
            description: String::new(),
            attributes: BTreeMap::new(),
            created_at: None,
        }
    }

    /// Set an endpoint (builder style)
    pub fn with_endpoint(mut self, field: impl Into<String>, entity: EntityRef) -> Self {
        self.endpoints.insert(field.into(), entity);
        self
    }

    /// Set the alias (builder style)
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Set the description (builder style)
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set an extra attribute (builder style)
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Get the endpoint stored under `field`
    pub fn endpoint(&self, field: &str) -> Option<&EntityRef> {
        self.endpoints.get(field)
    }

    /// Set the endpoint stored under `field`
    pub fn set_endpoint(&mut self, field: impl Into<String>, entity: EntityRef) {
        self.endpoints.insert(field.into(), entity);
    }

    /// Whether the record has been written to a store
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

impl fmt::Display for EdgeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}#{}", self.storage, id)?,
            None => write!(f, "{}#unsaved", self.storage)?,
        }
        for (field, entity) in &self.endpoints {
            write!(f, " {}={}", field, entity)?;
        }
        if !self.alias.is_empty() {
            write!(f, " (\"{}\")", self.alias)?;
        }
        Ok(())
    }
}

/// Metadata used both as a lookup key and as creation values
///
/// Every field that is `Some` (or present in `attributes`) takes part in
/// get-or-create lookups; absent fields are left unconstrained and default
/// to empty on creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeFields {
    /// Alias to match/set
    pub alias: Option<String>,

    /// Description to match/set
    pub description: Option<String>,

    /// Extra attributes to match/set
    pub attributes: BTreeMap<String, AttrValue>,
}

impl EdgeFields {
    /// No metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain/set the alias
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Constrain/set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Constrain/set an extra attribute
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Equality predicates for every present field
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(alias) = &self.alias {
            predicates.push(Predicate::Alias(alias.clone()));
        }
        if let Some(description) = &self.description {
            predicates.push(Predicate::Description(description.clone()));
        }
        for (name, value) in &self.attributes {
            predicates.push(Predicate::Attribute {
                name: name.clone(),
                value: value.clone(),
            });
        }
        predicates
    }

    /// Copy every present field onto `record`
    pub fn apply_to(&self, record: &mut EdgeRecord) {
        if let Some(alias) = &self.alias {
            record.alias = alias.clone();
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        for (name, value) in &self.attributes {
            record.attributes.insert(name.clone(), value.clone());
        }
    }
}
