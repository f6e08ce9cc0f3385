//! SQLite-backed edge store
//!
//! Each edge schema gets its own table. Polymorphic fields become a
//! `<field>_type TEXT` / `<field>_id INTEGER` column pair, typed fields a
//! single `<field>_id INTEGER` column. Extra attributes live in one JSON
//! text column.

use crate::{now_millis, StoreConfig, StoreError};
use polyrel_domain::{
    AttrValue, EdgeId, EdgeOrdering, EdgeQuery, EdgeRecord, EdgeSchema, EdgeStore, EntityRef, FieldDef,
    FieldKind, Predicate, SchemaViolation, TypeDiscriminator,
};
use rusqlite::types::{Type, Value};
use rusqlite::{params_from_iter, Connection, Row};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

/// SQLite-based implementation of EdgeStore
///
/// Tables are created on first use of a schema, or eagerly through
/// [`SqliteEdgeStore::register_schema`].
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own
/// SqliteEdgeStore instance.
pub struct SqliteEdgeStore {
    conn: Connection,
    schemas: RefCell<HashMap<String, EdgeSchema>>,
}

impl SqliteEdgeStore {
    /// Create a new SqliteEdgeStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use polyrel_store::SqliteEdgeStore;
    ///
    /// let store = SqliteEdgeStore::new("edges.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn,
            schemas: RefCell::new(HashMap::new()),
        })
    }

    /// Open a store from configuration, applying its pragmas
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        config.validate().map_err(StoreError::Config)?;

        let store = Self::new(&config.path)?;
        let mode: String = store.conn.pragma_update_and_check(
            None,
            "journal_mode",
            config.journal_mode.as_str(),
            |row| row.get(0),
        )?;
        store
            .conn
            .pragma_update(None, "synchronous", config.synchronous.as_str())?;
        store.conn.busy_timeout(config.busy_timeout())?;

        tracing::info!("Opened edge store at {} (journal_mode={})", config.path, mode);
        Ok(store)
    }

    /// Create the table for a schema if needed
    ///
    /// Registering the same definition twice is a no-op; registering a
    /// different definition under a known name is an error.
    pub fn register_schema(&self, schema: &EdgeSchema) -> Result<(), StoreError> {
        if let Some(known) = self.schemas.borrow().get(schema.name()) {
            if known == schema {
                return Ok(());
            }
            return Err(StoreError::Config(format!(
                "storage {} is already registered with a different definition",
                schema.name()
            )));
        }

        schema.validate()?;
        self.conn.execute_batch(&create_table_sql(schema))?;
        self.schemas
            .borrow_mut()
            .insert(schema.name().to_string(), schema.clone());

        tracing::info!("Registered edge storage {}", schema.name());
        Ok(())
    }

    /// Names of the storages registered on this connection
    pub fn storages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    fn select(
        &self,
        schema: &EdgeSchema,
        clause: &str,
        mut params: Vec<Value>,
        ordering: EdgeOrdering,
        distinct: bool,
        limit: Option<usize>,
    ) -> Result<Vec<EdgeRecord>, StoreError> {
        let columns = select_columns(schema);
        let sql = format!(
            "SELECT {}{} FROM {} WHERE {} ORDER BY {} LIMIT ?",
            if distinct { "DISTINCT " } else { "" },
            columns
                .iter()
                .map(|c| quote(c))
                .collect::<Vec<_>>()
                .join(", "),
            quote(schema.name()),
            clause,
            order_sql(ordering),
        );
        params.push(limit_value(limit));

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(params.iter()), |row| row_to_record(schema, row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn load(&self, schema: &EdgeSchema, id: EdgeId) -> Result<EdgeRecord, StoreError> {
        self.select(
            schema,
            "\"id\" = ?",
            vec![Value::Integer(id)],
            EdgeOrdering::IdAsc,
            false,
            Some(1),
        )?
        .into_iter()
        .next()
        .ok_or(StoreError::NotFound(id))
    }
}

impl EdgeStore for SqliteEdgeStore {
    type Error = StoreError;

    fn fetch(&self, query: &EdgeQuery) -> Result<Vec<EdgeRecord>, Self::Error> {
        self.register_schema(query.schema())?;

        let mut params = Vec::new();
        let clause = compile_all(query.schema(), query.predicates(), &mut params)?;
        self.select(
            query.schema(),
            &clause,
            params,
            query.ordering(),
            query.is_distinct(),
            query.limit_value(),
        )
    }

    fn count(&self, query: &EdgeQuery) -> Result<usize, Self::Error> {
        self.register_schema(query.schema())?;

        let mut params = Vec::new();
        let clause = compile_all(query.schema(), query.predicates(), &mut params)?;
        params.push(limit_value(query.limit_value()));
        let sql = format!(
            "SELECT COUNT(*) FROM (SELECT {}\"id\" FROM {} WHERE {} LIMIT ?)",
            if query.is_distinct() { "DISTINCT " } else { "" },
            quote(query.storage()),
            clause,
        );

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(count as usize)
    }

    fn insert(&mut self, schema: &EdgeSchema, mut record: EdgeRecord) -> Result<EdgeRecord, Self::Error> {
        self.register_schema(schema)?;
        schema.check_record(&record)?;

        let created_at = now_millis();
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for field in schema.fields() {
            let entity = record
                .endpoint(field.name())
                .ok_or_else(|| SchemaViolation::MissingEndpoint(field.name().to_string()))?;
            if let Some(type_column) = field.type_column() {
                columns.push(type_column);
                values.push(Value::Text(entity.discriminator.as_str().to_string()));
            }
            columns.push(field.id_column());
            values.push(Value::Integer(entity.id));
        }
        columns.extend(["alias", "description", "attributes", "created_at"].map(String::from));
        values.push(Value::Text(record.alias.clone()));
        values.push(Value::Text(record.description.clone()));
        values.push(Value::Text(encode_attributes(&record.attributes)?));
        values.push(Value::Integer(created_at as i64));

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(schema.name()),
            columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", "),
            vec!["?"; columns.len()].join(", "),
        );
        self.conn.execute(&sql, params_from_iter(values.iter()))?;

        record.id = Some(self.conn.last_insert_rowid());
        record.created_at = Some(created_at);
        tracing::debug!("Inserted edge {}", record);
        Ok(record)
    }

    fn save(&mut self, schema: &EdgeSchema, record: EdgeRecord) -> Result<EdgeRecord, Self::Error> {
        let Some(id) = record.id else {
            return self.insert(schema, record);
        };
        self.register_schema(schema)?;
        schema.check_record(&record)?;

        let existing = self.load(schema, id)?;
        if existing.endpoints != record.endpoints {
            return Err(StoreError::ImmutableEndpoint(id));
        }

        let sql = format!(
            "UPDATE {} SET \"alias\" = ?1, \"description\" = ?2, \"attributes\" = ?3 WHERE \"id\" = ?4",
            quote(schema.name())
        );
        self.conn.execute(
            &sql,
            rusqlite::params![
                &record.alias,
                &record.description,
                encode_attributes(&record.attributes)?,
                id
            ],
        )?;

        Ok(EdgeRecord {
            created_at: existing.created_at,
            ..record
        })
    }

    fn delete(&mut self, query: &EdgeQuery) -> Result<usize, Self::Error> {
        self.register_schema(query.schema())?;

        let mut params = Vec::new();
        let clause = compile_all(query.schema(), query.predicates(), &mut params)?;
        let sql = format!("DELETE FROM {} WHERE {}", quote(query.storage()), clause);
        let removed = self.conn.execute(&sql, params_from_iter(params.iter()))?;

        tracing::debug!("Deleted {} edges from {}", removed, query.storage());
        Ok(removed)
    }
}

/// Quote an identifier (names are validated identifiers already)
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

/// SQLite treats a negative LIMIT as "no limit"
fn limit_value(limit: Option<usize>) -> Value {
    Value::Integer(limit.map_or(-1, |l| l as i64))
}

fn create_table_sql(schema: &EdgeSchema) -> String {
    let mut columns = vec!["\"id\" INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
    for field in schema.fields() {
        if let Some(type_column) = field.type_column() {
            columns.push(format!("{} TEXT NOT NULL", quote(&type_column)));
        }
        columns.push(format!("{} INTEGER NOT NULL", quote(&field.id_column())));
    }
    columns.push("\"alias\" TEXT NOT NULL DEFAULT ''".to_string());
    columns.push("\"description\" TEXT NOT NULL DEFAULT ''".to_string());
    columns.push("\"attributes\" TEXT NOT NULL DEFAULT '{}'".to_string());
    columns.push("\"created_at\" INTEGER NOT NULL".to_string());

    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);\n",
        quote(schema.name()),
        columns.join(",\n    ")
    );
    for field in schema.fields() {
        let indexed = match field.type_column() {
            Some(type_column) => format!("{}, {}", quote(&type_column), quote(&field.id_column())),
            None => quote(&field.id_column()),
        };
        sql.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({});\n",
            quote(&format!("idx_{}_{}", schema.name(), field.name())),
            quote(schema.name()),
            indexed
        ));
    }
    sql
}

fn select_columns(schema: &EdgeSchema) -> Vec<String> {
    let mut columns = vec!["id".to_string()];
    for field in schema.fields() {
        columns.extend(field.type_column());
        columns.push(field.id_column());
    }
    columns.extend(["alias", "description", "attributes", "created_at"].map(String::from));
    columns
}

fn order_sql(ordering: EdgeOrdering) -> &'static str {
    match ordering {
        EdgeOrdering::CreatedDesc => "\"created_at\" DESC, \"id\" DESC",
        EdgeOrdering::CreatedAsc => "\"created_at\" ASC, \"id\" ASC",
        EdgeOrdering::IdAsc => "\"id\" ASC",
        EdgeOrdering::IdDesc => "\"id\" DESC",
    }
}

fn field<'a>(schema: &'a EdgeSchema, name: &str) -> Result<&'a FieldDef, StoreError> {
    schema.field(name).ok_or_else(|| {
        StoreError::SchemaViolation(SchemaViolation::UnknownField {
            storage: schema.name().to_string(),
            field: name.to_string(),
        })
    })
}

fn placeholders(params: &mut Vec<Value>, values: impl IntoIterator<Item = Value>) -> Option<String> {
    let start = params.len();
    params.extend(values);
    let n = params.len() - start;
    (n > 0).then(|| vec!["?"; n].join(", "))
}

fn compile_all(schema: &EdgeSchema, predicates: &[Predicate], params: &mut Vec<Value>) -> Result<String, StoreError> {
    if predicates.is_empty() {
        return Ok("1".to_string());
    }
    let parts = predicates
        .iter()
        .map(|p| compile(schema, p, params))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("({})", parts.join(" AND ")))
}

/// Compile one predicate into a WHERE fragment, pushing its parameters
fn compile(schema: &EdgeSchema, predicate: &Predicate, params: &mut Vec<Value>) -> Result<String, StoreError> {
    let sql = match predicate {
        Predicate::Endpoint { field: name, entity } => {
            let def = field(schema, name)?;
            match def.kind() {
                FieldKind::Polymorphic => {
                    params.push(Value::Text(entity.discriminator.as_str().to_string()));
                    params.push(Value::Integer(entity.id));
                    format!(
                        "({} = ? AND {} = ?)",
                        quote(&format!("{}_type", def.name())),
                        quote(&def.id_column())
                    )
                }
                FieldKind::Typed { target } if target == &entity.discriminator => {
                    params.push(Value::Integer(entity.id));
                    format!("{} = ?", quote(&def.id_column()))
                }
                FieldKind::Typed { .. } => "0".to_string(),
            }
        }
        Predicate::EndpointType { field: name, discriminator } => {
            let def = field(schema, name)?;
            match def.kind() {
                FieldKind::Polymorphic => {
                    params.push(Value::Text(discriminator.as_str().to_string()));
                    format!("{} = ?", quote(&format!("{}_type", def.name())))
                }
                FieldKind::Typed { target } => bool_sql(target == discriminator),
            }
        }
        Predicate::EndpointTypeIn { field: name, discriminators } => {
            let def = field(schema, name)?;
            match def.kind() {
                FieldKind::Polymorphic => {
                    let values = discriminators.iter().map(|d| Value::Text(d.as_str().to_string()));
                    match placeholders(params, values) {
                        Some(marks) => format!("{} IN ({})", quote(&format!("{}_type", def.name())), marks),
                        None => "0".to_string(),
                    }
                }
                FieldKind::Typed { target } => bool_sql(discriminators.contains(target)),
            }
        }
        Predicate::EndpointIdIn { field: name, ids } => {
            let def = field(schema, name)?;
            id_set_sql(&quote(&def.id_column()), ids, params)?
        }
        Predicate::Alias(alias) => {
            params.push(Value::Text(alias.clone()));
            "\"alias\" = ?".to_string()
        }
        Predicate::AliasIn(aliases) => {
            match placeholders(params, aliases.iter().map(|a| Value::Text(a.clone()))) {
                Some(marks) => format!("\"alias\" IN ({})", marks),
                None => "0".to_string(),
            }
        }
        Predicate::Description(description) => {
            params.push(Value::Text(description.clone()));
            "\"description\" = ?".to_string()
        }
        Predicate::Attribute { name, value } => {
            params.push(Value::Text(format!("$.{}", name)));
            params.push(match value {
                AttrValue::Text(s) => Value::Text(s.clone()),
                AttrValue::Int(i) => Value::Integer(*i),
                AttrValue::Bool(b) => Value::Integer(i64::from(*b)),
            });
            let type_check = match value {
                AttrValue::Text(_) => "'text'",
                AttrValue::Int(_) => "'integer'",
                AttrValue::Bool(_) => "'true', 'false'",
            };
            params.push(Value::Text(format!("$.{}", name)));
            format!(
                "(json_extract(\"attributes\", ?) = ? AND json_type(\"attributes\", ?) IN ({}))",
                type_check
            )
        }
        Predicate::EdgeId(id) => {
            params.push(Value::Integer(*id));
            "\"id\" = ?".to_string()
        }
        Predicate::EdgeIdIn(ids) => id_set_sql("\"id\"", ids, params)?,
        Predicate::All(inner) => compile_all(schema, inner, params)?,
        Predicate::Any(inner) => {
            if inner.is_empty() {
                "0".to_string()
            } else {
                let parts = inner
                    .iter()
                    .map(|p| compile(schema, p, params))
                    .collect::<Result<Vec<_>, _>>()?;
                format!("({})", parts.join(" OR "))
            }
        }
    };
    Ok(sql)
}

/// Membership in an id set of any size, bound as a single JSON array
fn id_set_sql(column: &str, ids: &BTreeSet<i64>, params: &mut Vec<Value>) -> Result<String, StoreError> {
    if ids.is_empty() {
        return Ok("0".to_string());
    }
    params.push(Value::Text(serde_json::to_string(ids)?));
    Ok(format!("{} IN (SELECT value FROM json_each(?))", column))
}

fn bool_sql(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

fn encode_attributes(attributes: &BTreeMap<String, AttrValue>) -> Result<String, StoreError> {
    let map: serde_json::Map<String, serde_json::Value> = attributes
        .iter()
        .map(|(name, value)| {
            let json = match value {
                AttrValue::Text(s) => serde_json::Value::from(s.clone()),
                AttrValue::Int(i) => serde_json::Value::from(*i),
                AttrValue::Bool(b) => serde_json::Value::from(*b),
            };
            (name.clone(), json)
        })
        .collect();
    Ok(serde_json::to_string(&map)?)
}

fn decode_attributes(text: &str) -> Result<BTreeMap<String, AttrValue>, StoreError> {
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(text)?;
    map.into_iter()
        .map(|(name, json)| {
            let value = match json {
                serde_json::Value::String(s) => AttrValue::Text(s),
                serde_json::Value::Bool(b) => AttrValue::Bool(b),
                serde_json::Value::Number(n) => AttrValue::Int(
                    n.as_i64()
                        .ok_or_else(|| StoreError::InvalidData(format!("attribute {} is not an integer", name)))?,
                ),
                other => {
                    return Err(StoreError::InvalidData(format!(
                        "attribute {} has unsupported value {}",
                        name, other
                    )))
                }
            };
            Ok((name, value))
        })
        .collect()
}

fn conversion_error(idx: usize, ty: Type, err: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn row_to_record(schema: &EdgeSchema, row: &Row<'_>) -> rusqlite::Result<EdgeRecord> {
    let mut record = EdgeRecord::new(schema.name());
    record.id = Some(row.get("id")?);

    for def in schema.fields() {
        let discriminator = match def.kind() {
            FieldKind::Polymorphic => {
                let column = format!("{}_type", def.name());
                let label: String = row.get(column.as_str())?;
                let idx = row.as_ref().column_index(column.as_str())?;
                TypeDiscriminator::parse(&label).map_err(|e| {
                    conversion_error(idx, Type::Text, StoreError::InvalidData(format!("{}: {}", column, e)))
                })?
            }
            FieldKind::Typed { target } => target.clone(),
        };
        let id: i64 = row.get(def.id_column().as_str())?;
        record.set_endpoint(def.name(), EntityRef::new(discriminator, id));
    }

    record.alias = row.get("alias")?;
    record.description = row.get("description")?;
    let attributes: String = row.get("attributes")?;
    let idx = row.as_ref().column_index("attributes")?;
    record.attributes = decode_attributes(&attributes).map_err(|e| conversion_error(idx, Type::Text, e))?;
    record.created_at = Some(row.get::<_, i64>("created_at")? as u64);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const FOOD: TypeDiscriminator = TypeDiscriminator::from_static("food");
    const BEVERAGE: TypeDiscriminator = TypeDiscriminator::from_static("beverage");

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql(&EdgeSchema::related_objects());
        assert!(sql.contains("\"parent_type\" TEXT NOT NULL"));
        assert!(sql.contains("\"object_id\" INTEGER NOT NULL"));
        assert!(sql.contains("CREATE INDEX IF NOT EXISTS \"idx_related_object_parent\""));
    }

    #[test]
    fn test_compile_typed_field_with_foreign_type() {
        let schema = EdgeSchema::new("related_beverage")
            .typed("food", FOOD)
            .typed("beverage", BEVERAGE);
        let mut params = Vec::new();

        let sql = compile(
            &schema,
            &Predicate::endpoint("food", EntityRef::new(BEVERAGE, 1)),
            &mut params,
        )
        .unwrap();
        assert_eq!(sql, "0");
        assert!(params.is_empty());

        let sql = compile(&schema, &Predicate::endpoint_type("food", FOOD), &mut params).unwrap();
        assert_eq!(sql, "1");
    }

    #[test]
    fn test_compile_unknown_field() {
        let mut params = Vec::new();
        let result = compile(
            &EdgeSchema::related_objects(),
            &Predicate::endpoint("nope", EntityRef::new(FOOD, 1)),
            &mut params,
        );
        assert!(matches!(result, Err(StoreError::SchemaViolation(_))));
    }

    #[test]
    fn test_attributes_round_trip() {
        let mut attributes = BTreeMap::new();
        attributes.insert("rank".to_string(), AttrValue::Int(3));
        attributes.insert("note".to_string(), AttrValue::Text("x".into()));
        attributes.insert("pinned".to_string(), AttrValue::Bool(true));

        let decoded = decode_attributes(&encode_attributes(&attributes).unwrap()).unwrap();
        assert_eq!(decoded, attributes);
        assert!(decode_attributes("{\"x\": 1.5}").is_err());
    }

    #[test]
    fn test_register_schema_conflict() {
        let store = SqliteEdgeStore::new(":memory:").unwrap();
        store.register_schema(&EdgeSchema::related_objects()).unwrap();
        store.register_schema(&EdgeSchema::related_objects()).unwrap();

        let conflicting = EdgeSchema::new(polyrel_domain::RELATED_OBJECTS).polymorphic("parent");
        assert!(matches!(
            store.register_schema(&conflicting),
            Err(StoreError::Config(_))
        ));
        assert_eq!(store.storages(), vec!["related_object".to_string()]);
    }

    #[test]
    fn test_insert_and_fetch() {
        let mut store = SqliteEdgeStore::new(":memory:").unwrap();
        let schema = Arc::new(EdgeSchema::related_objects());
        let record = EdgeRecord::new(schema.name())
            .with_endpoint("parent", EntityRef::new(FOOD, 1))
            .with_endpoint("object", EntityRef::new(BEVERAGE, 2))
            .with_alias("pepsi");

        let saved = store.insert(&schema, record).unwrap();
        let fetched = store.fetch(&EdgeQuery::new(schema)).unwrap();
        assert_eq!(fetched, vec![saved]);
    }
    #[test]
    fn test_id_set_binds_one_parameter() {
        let ids: BTreeSet<i64> = (1..=50_000).collect();
        let mut params = Vec::new();
        let sql = compile(&EdgeSchema::related_objects(), &Predicate::EdgeIdIn(ids), &mut params).unwrap();
        assert_eq!(sql, "\"id\" IN (SELECT value FROM json_each(?))");
        assert_eq!(params.len(), 1);

        let mut params = Vec::new();
        let sql = compile(&EdgeSchema::related_objects(), &Predicate::EdgeIdIn(BTreeSet::new()), &mut params).unwrap();
        assert_eq!(sql, "0");
        assert!(params.is_empty());
    }

    #[test]
    fn test_fetch_with_id_set_beyond_variable_limit() {
        let mut store = SqliteEdgeStore::new(":memory:").unwrap();
        let schema = Arc::new(EdgeSchema::related_objects());
        let mut saved = Vec::new();
        for id in 1..=3 {
            let record = EdgeRecord::new(schema.name())
                .with_endpoint("parent", EntityRef::new(FOOD, 1))
                .with_endpoint("object", EntityRef::new(BEVERAGE, id));
            saved.push(store.insert(&schema, record).unwrap().id.unwrap());
        }

        let mut ids: BTreeSet<i64> = (1_000..41_000).collect();
        ids.insert(saved[0]);
        ids.insert(saved[2]);
        let query = EdgeQuery::new(Arc::clone(&schema)).filter(Predicate::EdgeIdIn(ids.clone()));
        assert_eq!(store.count(&query).unwrap(), 2);

        let by_object = EdgeQuery::new(Arc::clone(&schema)).filter(Predicate::EndpointIdIn {
            field: "object".into(),
            ids: (2..40_000).collect(),
        });
        assert_eq!(store.fetch(&by_object).unwrap().len(), 2);

        assert_eq!(store.delete(&query).unwrap(), 2);
        assert_eq!(store.count(&EdgeQuery::new(schema)).unwrap(), 1);
    }

    #[test]
    fn test_conversion_error_names_column() {
        let mut store = SqliteEdgeStore::new(":memory:").unwrap();
        let schema = Arc::new(EdgeSchema::related_objects());
        let record = EdgeRecord::new(schema.name())
            .with_endpoint("parent", EntityRef::new(FOOD, 1))
            .with_endpoint("object", EntityRef::new(BEVERAGE, 2));
        store.insert(&schema, record).unwrap();
        let query = EdgeQuery::new(schema);

        store
            .conn
            .execute("UPDATE \"related_object\" SET \"attributes\" = '{\"x\": 1.5}'", [])
            .unwrap();
        match store.fetch(&query) {
            Err(StoreError::Database(rusqlite::Error::FromSqlConversionFailure(idx, _, _))) => assert_eq!(idx, 7),
            other => panic!("unexpected result: {:?}", other),
        }

        store
            .conn
            .execute("UPDATE \"related_object\" SET \"parent_type\" = 'Not A Type'", [])
            .unwrap();
        match store.fetch(&query) {
            Err(StoreError::Database(rusqlite::Error::FromSqlConversionFailure(idx, _, _))) => assert_eq!(idx, 1),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
