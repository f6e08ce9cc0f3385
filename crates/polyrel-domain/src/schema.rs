//! Edge storage definitions
//!
//! An [`EdgeSchema`] describes one edge storage: its endpoint fields (each
//! either polymorphic or typed), any extra attribute columns, and the
//! default ordering of its rows.

use crate::entity::is_identifier;
use crate::{EdgeRecord, EntityRef, TypeDiscriminator};
use std::cmp::Ordering;
use std::fmt;

/// Name of the default dual-polymorphic storage
pub const RELATED_OBJECTS: &str = "related_object";

/// Shape of an endpoint field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Any entity type; stored as a type sub-field plus an id sub-field
    Polymorphic,

    /// One fixed entity type; stored as an id only
    Typed {
        /// The only type this field may reference
        target: TypeDiscriminator,
    },
}

/// An endpoint field declared on an edge storage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDef {
    name: String,
    kind: FieldKind,
}

impl FieldDef {
    /// Declare a polymorphic field
    pub fn polymorphic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Polymorphic,
        }
    }

    /// Declare a field that references a single entity type
    pub fn typed(name: impl Into<String>, target: TypeDiscriminator) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Typed { target },
        }
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field shape
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Whether the field accepts any entity type
    pub fn is_polymorphic(&self) -> bool {
        matches!(self.kind, FieldKind::Polymorphic)
    }

    /// Column holding the type discriminator (polymorphic fields only)
    pub fn type_column(&self) -> Option<String> {
        match self.kind {
            FieldKind::Polymorphic => Some(format!("{}_type", self.name)),
            FieldKind::Typed { .. } => None,
        }
    }

    /// Column holding the referenced id
    pub fn id_column(&self) -> String {
        format!("{}_id", self.name)
    }

    /// Whether an entity of the given type may be stored in this field
    pub fn accepts(&self, discriminator: &TypeDiscriminator) -> bool {
        match &self.kind {
            FieldKind::Polymorphic => true,
            FieldKind::Typed { target } => target == discriminator,
        }
    }
}

/// An extra column declared by a custom edge storage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeDef {
    /// Column name
    pub name: String,

    /// Whether records must carry a value for it
    pub required: bool,
}

/// Default ordering of an edge storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EdgeOrdering {
    /// Most recently created first, ties broken by id descending
    #[default]
    CreatedDesc,

    /// Oldest first, ties broken by id ascending
    CreatedAsc,

    /// Ascending store id
    IdAsc,

    /// Descending store id
    IdDesc,
}

impl EdgeOrdering {
    /// Compare two records under this ordering
    pub fn compare(&self, a: &EdgeRecord, b: &EdgeRecord) -> Ordering {
        match self {
            EdgeOrdering::CreatedDesc => b
                .created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id)),
            EdgeOrdering::CreatedAsc => a
                .created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id)),
            EdgeOrdering::IdAsc => a.id.cmp(&b.id),
            EdgeOrdering::IdDesc => b.id.cmp(&a.id),
        }
    }
}

/// Reasons a schema or a record fails validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    /// Storage or column name is not a lowercase identifier
    InvalidName(String),

    /// Two columns share a name
    DuplicateName(String),

    /// Schema declares no endpoint fields
    NoFields(String),

    /// Record belongs to a different storage
    WrongStorage {
        /// Storage the record was offered to
        expected: String,
        /// Storage named by the record
        found: String,
    },

    /// Field name not declared on the storage
    UnknownField {
        /// Storage name
        storage: String,
        /// Offending field
        field: String,
    },

    /// Endpoint field left unset
    MissingEndpoint(String),

    /// Typed field given an entity of another type
    WrongTargetType {
        /// Field name
        field: String,
        /// Type the field accepts
        expected: TypeDiscriminator,
        /// Type offered
        found: TypeDiscriminator,
    },

    /// Required attribute left unset
    MissingAttribute(String),

    /// Attribute not declared on the storage
    UnknownAttribute(String),
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaViolation::InvalidName(name) => write!(f, "invalid name: {:?}", name),
            SchemaViolation::DuplicateName(name) => write!(f, "duplicate column: {}", name),
            SchemaViolation::NoFields(storage) => {
                write!(f, "storage {} declares no endpoint fields", storage)
            }
            SchemaViolation::WrongStorage { expected, found } => {
                write!(f, "record belongs to {}, expected {}", found, expected)
            }
            SchemaViolation::UnknownField { storage, field } => {
                write!(f, "{} has no field named {}", storage, field)
            }
            SchemaViolation::MissingEndpoint(field) => write!(f, "endpoint {} is not set", field),
            SchemaViolation::WrongTargetType { field, expected, found } => write!(
                f,
                "field {} references {} but was given {}",
                field, expected, found
            ),
            SchemaViolation::MissingAttribute(name) => {
                write!(f, "required attribute {} is not set", name)
            }
            SchemaViolation::UnknownAttribute(name) => write!(f, "unknown attribute {}", name),
        }
    }
}

impl std::error::Error for SchemaViolation {}

/// Definition of one edge storage
///
/// # Examples
///
/// ```
/// use polyrel_domain::{EdgeOrdering, EdgeSchema, TypeDiscriminator};
///
/// let beverages = EdgeSchema::new("related_beverage")
///     .typed("food", TypeDiscriminator::from_static("food"))
///     .typed("beverage", TypeDiscriminator::from_static("beverage"))
///     .ordering(EdgeOrdering::IdDesc);
///
/// assert!(beverages.validate().is_ok());
/// assert!(beverages.first_polymorphic().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeSchema {
    name: String,
    fields: Vec<FieldDef>,
    attributes: Vec<AttributeDef>,
    ordering: EdgeOrdering,
}

impl EdgeSchema {
    /// Start a schema with no fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            attributes: Vec::new(),
            ordering: EdgeOrdering::default(),
        }
    }

    /// The default storage: polymorphic `parent` and `object`, newest first
    pub fn related_objects() -> Self {
        Self::new(RELATED_OBJECTS)
            .polymorphic("parent")
            .polymorphic("object")
    }

    /// Declare a polymorphic endpoint field
    pub fn polymorphic(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldDef::polymorphic(name));
        self
    }

    /// Declare a typed endpoint field
    pub fn typed(mut self, name: impl Into<String>, target: TypeDiscriminator) -> Self {
        self.fields.push(FieldDef::typed(name, target));
        self
    }

    /// Declare an extra attribute column
    pub fn attribute(mut self, name: impl Into<String>, required: bool) -> Self {
        self.attributes.push(AttributeDef {
            name: name.into(),
            required,
        });
        self
    }

    /// Override the default ordering
    pub fn ordering(mut self, ordering: EdgeOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Storage name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared endpoint fields in declaration order
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Declared attribute columns
    pub fn attributes(&self) -> &[AttributeDef] {
        &self.attributes
    }

    /// Default ordering of rows
    pub fn default_ordering(&self) -> EdgeOrdering {
        self.ordering
    }

    /// Look up an endpoint field by name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up an attribute column by name
    pub fn attribute_def(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// First polymorphic field in declaration order
    pub fn first_polymorphic(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.is_polymorphic())
    }

    /// Check that names are identifiers, unique, and that fields exist
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        if !is_identifier(&self.name) {
            return Err(SchemaViolation::InvalidName(self.name.clone()));
        }
        if self.fields.is_empty() {
            return Err(SchemaViolation::NoFields(self.name.clone()));
        }

        let mut seen: Vec<String> = Vec::new();
        let columns = self
            .fields
            .iter()
            .flat_map(|f| {
                let mut cols = vec![f.name.clone(), f.id_column()];
                cols.extend(f.type_column());
                cols
            })
            .chain(self.attributes.iter().map(|a| a.name.clone()));

        for column in columns {
            if !is_identifier(&column) {
                return Err(SchemaViolation::InvalidName(column));
            }
            if seen.contains(&column) || RESERVED_COLUMNS.contains(&column.as_str()) {
                return Err(SchemaViolation::DuplicateName(column));
            }
            seen.push(column);
        }
        Ok(())
    }

    /// Check a record before it is written to this storage
    pub fn check_record(&self, record: &EdgeRecord) -> Result<(), SchemaViolation> {
        if record.storage != self.name {
            return Err(SchemaViolation::WrongStorage {
                expected: self.name.clone(),
                found: record.storage.clone(),
            });
        }

        for (field, entity) in &record.endpoints {
            let def = self.field(field).ok_or_else(|| SchemaViolation::UnknownField {
                storage: self.name.clone(),
                field: field.clone(),
            })?;
            self.check_endpoint(def, entity)?;
        }

        for def in &self.fields {
            if !record.endpoints.contains_key(&def.name) {
                return Err(SchemaViolation::MissingEndpoint(def.name.clone()));
            }
        }

        for name in record.attributes.keys() {
            if self.attribute_def(name).is_none() {
                return Err(SchemaViolation::UnknownAttribute(name.clone()));
            }
        }

        for def in self.attributes.iter().filter(|a| a.required) {
            if !record.attributes.contains_key(&def.name) {
                return Err(SchemaViolation::MissingAttribute(def.name.clone()));
            }
        }

        Ok(())
    }

    /// Check that `entity` may be stored in the endpoint field `def`
    pub fn check_endpoint(&self, def: &FieldDef, entity: &EntityRef) -> Result<(), SchemaViolation> {
        match &def.kind {
            FieldKind::Typed { target } if target != &entity.discriminator => {
                Err(SchemaViolation::WrongTargetType {
                    field: def.name.clone(),
                    expected: target.clone(),
                    found: entity.discriminator.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Render a record as `"<first> related to <second> ("alias")"`
    ///
    /// Uses the first two declared fields as source and target.
    pub fn describe(&self, record: &EdgeRecord) -> String {
        let endpoint = |idx: usize| {
            self.fields
                .get(idx)
                .and_then(|f| record.endpoint(&f.name))
                .map(|e| e.to_string())
                .unwrap_or_else(|| "?".to_string())
        };
        format!("{} related to {} (\"{}\")", endpoint(0), endpoint(1), record.alias)
    }
}

/// Columns every storage carries besides its declared fields
pub const RESERVED_COLUMNS: &[&str] = &["id", "alias", "description", "attributes", "created_at"];

#[cfg(test)]
mod tests {
    use super::*;

    const FOOD: TypeDiscriminator = TypeDiscriminator::from_static("food");
    const BEVERAGE: TypeDiscriminator = TypeDiscriminator::from_static("beverage");

    fn beverages() -> EdgeSchema {
        EdgeSchema::new("related_beverage")
            .typed("food", FOOD)
            .typed("beverage", BEVERAGE)
            .ordering(EdgeOrdering::IdDesc)
    }

    #[test]
    fn test_related_objects_schema() {
        let schema = EdgeSchema::related_objects();
        assert!(schema.validate().is_ok());
        assert_eq!(schema.name(), RELATED_OBJECTS);
        assert_eq!(schema.first_polymorphic().map(|f| f.name()), Some("parent"));
        assert_eq!(schema.default_ordering(), EdgeOrdering::CreatedDesc);
        assert_eq!(
            schema.field("object").and_then(|f| f.type_column()),
            Some("object_type".to_string())
        );
    }

    #[test]
    fn test_validate_rejects_bad_schemas() {
        assert_eq!(
            EdgeSchema::new("empty").validate(),
            Err(SchemaViolation::NoFields("empty".to_string()))
        );
        assert!(matches!(
            EdgeSchema::new("Bad Name").polymorphic("a").validate(),
            Err(SchemaViolation::InvalidName(_))
        ));
        assert!(matches!(
            EdgeSchema::new("dup").polymorphic("a").polymorphic("a").validate(),
            Err(SchemaViolation::DuplicateName(_))
        ));
        assert!(matches!(
            EdgeSchema::new("reserved").polymorphic("a").attribute("alias", false).validate(),
            Err(SchemaViolation::DuplicateName(_))
        ));
    }

    #[test]
    fn test_check_record() {
        let schema = beverages();
        let pizza = EntityRef::new(FOOD, 1);
        let soda = EntityRef::new(BEVERAGE, 2);

        let ok = EdgeRecord::new("related_beverage")
            .with_endpoint("food", pizza.clone())
            .with_endpoint("beverage", soda.clone());
        assert!(schema.check_record(&ok).is_ok());

        let swapped = EdgeRecord::new("related_beverage")
            .with_endpoint("food", soda.clone())
            .with_endpoint("beverage", pizza.clone());
        assert!(matches!(
            schema.check_record(&swapped),
            Err(SchemaViolation::WrongTargetType { .. })
        ));

        let partial = EdgeRecord::new("related_beverage").with_endpoint("beverage", soda.clone());
        assert_eq!(
            schema.check_record(&partial),
            Err(SchemaViolation::MissingEndpoint("food".to_string()))
        );

        let elsewhere = EdgeRecord::new(RELATED_OBJECTS);
        assert!(matches!(
            schema.check_record(&elsewhere),
            Err(SchemaViolation::WrongStorage { .. })
        ));
    }

    #[test]
    fn test_required_attributes() {
        let schema = EdgeSchema::new("ranked")
            .polymorphic("parent")
            .polymorphic("object")
            .attribute("rank", true);
        let base = EdgeRecord::new("ranked")
            .with_endpoint("parent", EntityRef::new(FOOD, 1))
            .with_endpoint("object", EntityRef::new(BEVERAGE, 1));

        assert_eq!(
            schema.check_record(&base),
            Err(SchemaViolation::MissingAttribute("rank".to_string()))
        );
        assert!(schema.check_record(&base.clone().with_attribute("rank", 1)).is_ok());
        assert_eq!(
            schema.check_record(&base.with_attribute("rank", 1).with_attribute("colour", "red")),
            Err(SchemaViolation::UnknownAttribute("colour".to_string()))
        );
    }

    #[test]
    fn test_ordering_compare() {
        let mut a = EdgeRecord::new("x");
        a.id = Some(1);
        a.created_at = Some(100);
        let mut b = EdgeRecord::new("x");
        b.id = Some(2);
        b.created_at = Some(100);

        assert_eq!(EdgeOrdering::CreatedDesc.compare(&a, &b), Ordering::Greater);
        assert_eq!(EdgeOrdering::CreatedAsc.compare(&a, &b), Ordering::Less);
        assert_eq!(EdgeOrdering::IdDesc.compare(&a, &b), Ordering::Greater);
        assert_eq!(EdgeOrdering::IdAsc.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_describe() {
        let schema = EdgeSchema::related_objects();
        let record = EdgeRecord::new(RELATED_OBJECTS)
            .with_endpoint("parent", EntityRef::new(FOOD, 1))
            .with_endpoint("object", EntityRef::new(BEVERAGE, 3))
            .with_alias("pepsi");
        assert_eq!(schema.describe(&record), "food:1 related to beverage:3 (\"pepsi\")");
    }
}
