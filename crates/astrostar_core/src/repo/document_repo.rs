//! Document repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/replace/get/list/delete over catalog collections.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths validate against the catalog before any SQL mutation.
//! - Read paths re-decode columns by declared type and reject corrupt data
//!   instead of masking it.
//! - Only catalog-declared identifiers are interpolated into SQL; values are
//!   always bound.
//! - Undeclared fields are written with their record in one transaction and
//!   replaced or deleted together with it.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{quote_identifier, DbError, UNDECLARED_FIELDS_TABLE};
use crate::model::document::field_value_to_json;
use crate::model::{decode_untyped_json, Document, FieldValue, RecordId, Timestamp};
use crate::schema::{
    find_collection, Collection, CollectionSchema, FieldDef, FieldType, ValidationError,
    WritePolicy,
};
use log::debug;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, Row};
use serde_json::{Map, Value as JsonValue};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const METADATA_COLUMNS: &str = "id, created_at, updated_at";
const FIRST_FIELD_COLUMN: usize = 3;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for document persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound {
        collection: &'static str,
        id: RecordId,
    },
    /// Connection schema is not at the version this binary provisions.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { collection, id } => {
                write!(f, "{collection} record not found: {id}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "document repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::UninitializedConnection { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One persisted record with storage metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub collection: &'static str,
    pub document: Document,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl StoredRecord {
    /// Decodes the document into the collection's typed record.
    pub fn decode<T: Collection>(&self) -> Result<T, ValidationError> {
        T::from_document(&self.document)
    }

    /// Document JSON plus `_id`, `_created_at` and `_updated_at`.
    pub fn to_json(&self) -> JsonValue {
        let mut json = self.document.to_json();
        if let JsonValue::Object(object) = &mut json {
            object.insert("_id".to_string(), JsonValue::String(self.id.to_string()));
            object.insert(
                "_created_at".to_string(),
                JsonValue::from(self.created_at.as_millis()),
            );
            object.insert(
                "_updated_at".to_string(),
                JsonValue::from(self.updated_at.as_millis()),
            );
        }
        json
    }
}

/// Query options for listing records.
///
/// Filters are equality matches on declared fields, combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<(String, FieldValue)>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}

/// Repository interface for catalog documents.
pub trait DocumentRepository {
    fn insert(&self, collection: &str, document: &Document) -> RepoResult<RecordId>;
    fn replace(&self, collection: &str, id: RecordId, document: &Document) -> RepoResult<()>;
    fn get(&self, collection: &str, id: RecordId) -> RepoResult<Option<StoredRecord>>;
    fn list(&self, collection: &str, query: &ListQuery) -> RepoResult<Vec<StoredRecord>>;
    fn delete(&self, collection: &str, id: RecordId) -> RepoResult<()>;
}

/// SQLite-backed document repository.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
    policy: WritePolicy,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    /// Creates a permissive repository over a provisioned connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the connection schema version is not
    ///   the latest one this binary provisions.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let actual_version = current_user_version(conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self {
            conn,
            policy: WritePolicy::permissive(),
        })
    }

    pub fn with_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn check_write(&self, schema: &CollectionSchema, document: &Document) -> RepoResult<()> {
        schema.validate(document, &self.policy)?;
        if !self.policy.enforce_references {
            return Ok(());
        }

        for (field, target) in schema.references() {
            let Some(FieldValue::Reference(id)) = document.get(field.name) else {
                continue;
            };
            if !self.record_exists(target, *id)? {
                return Err(ValidationError::DanglingReference {
                    collection: schema.name,
                    field: field.name,
                    target,
                    id: *id,
                }
                .into());
            }
        }
        Ok(())
    }

    fn record_exists(&self, collection: &str, id: RecordId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);",
                quote_identifier(collection)
            ),
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn write_undeclared_fields(
        &self,
        schema: &CollectionSchema,
        id: RecordId,
        document: &Document,
    ) -> RepoResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE collection = ?1 AND record_id = ?2;",
            quote_identifier(UNDECLARED_FIELDS_TABLE)
        );
        self.conn.execute(&sql, params![schema.name, id.to_string()])?;

        let undeclared = document
            .iter()
            .filter(|(name, _)| schema.field(name).is_none())
            .map(|(name, value)| (name.to_string(), field_value_to_json(value)))
            .collect::<Map<_, _>>();
        if undeclared.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "INSERT INTO {} (collection, record_id, fields) VALUES (?1, ?2, ?3);",
            quote_identifier(UNDECLARED_FIELDS_TABLE)
        );
        self.conn.execute(
            &sql,
            params![
                schema.name,
                id.to_string(),
                JsonValue::Object(undeclared).to_string()
            ],
        )?;
        Ok(())
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn insert(&self, collection: &str, document: &Document) -> RepoResult<RecordId> {
        let schema = resolve_collection(collection)?;
        self.check_write(schema, document)?;

        let id = Uuid::new_v4();
        let now = Timestamp::now().as_millis();
        let mut columns = vec![
            "id".to_string(),
            "created_at".to_string(),
            "updated_at".to_string(),
        ];
        let mut values = vec![
            Value::Text(id.to_string()),
            Value::Integer(now),
            Value::Integer(now),
        ];
        for (name, value) in document.iter() {
            if let Some(field) = schema.field(name) {
                columns.push(quote_identifier(field.name));
                values.push(to_sql_value(value));
            }
        }

        let placeholders = (1..=values.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let tx = self.conn.unchecked_transaction()?;
        self.conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({placeholders});",
                quote_identifier(schema.name),
                columns.join(", ")
            ),
            params_from_iter(values),
        )?;
        self.write_undeclared_fields(schema, id, document)?;
        tx.commit()?;

        debug!(
            "event=record_write module=repo status=ok op=insert collection={} record_id={}",
            schema.name, id
        );
        Ok(id)
    }

    fn replace(&self, collection: &str, id: RecordId, document: &Document) -> RepoResult<()> {
        let schema = resolve_collection(collection)?;
        self.check_write(schema, document)?;

        let mut assignments = Vec::with_capacity(schema.fields.len() + 1);
        let mut values = Vec::with_capacity(schema.fields.len() + 2);
        for field in schema.fields {
            values.push(document.get(field.name).map_or(Value::Null, to_sql_value));
            assignments.push(format!("{} = ?{}", quote_identifier(field.name), values.len()));
        }
        values.push(Value::Integer(Timestamp::now().as_millis()));
        assignments.push(format!("updated_at = ?{}", values.len()));
        values.push(Value::Text(id.to_string()));
        let id_index = values.len();

        let tx = self.conn.unchecked_transaction()?;
        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {} WHERE id = ?{id_index};",
                quote_identifier(schema.name),
                assignments.join(", ")
            ),
            params_from_iter(values),
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                collection: schema.name,
                id,
            });
        }
        self.write_undeclared_fields(schema, id, document)?;
        tx.commit()?;

        debug!(
            "event=record_write module=repo status=ok op=replace collection={} record_id={}",
            schema.name, id
        );
        Ok(())
    }

    fn get(&self, collection: &str, id: RecordId) -> RepoResult<Option<StoredRecord>> {
        let schema = resolve_collection(collection)?;
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE id = ?1;",
            select_sql(schema)
        ))?;

        let mut rows = stmt.query(params![id.to_string()])?;
        if let Some(row) = rows.next()? {
            let mut record = parse_record_row(schema, row)?;
            load_undeclared_fields(self.conn, &mut record)?;
            return Ok(Some(record));
        }

        Ok(None)
    }

    fn list(&self, collection: &str, query: &ListQuery) -> RepoResult<Vec<StoredRecord>> {
        let schema = resolve_collection(collection)?;
        let mut sql = format!("{} WHERE 1 = 1", select_sql(schema));
        let mut bind_values: Vec<Value> = Vec::new();

        for (name, value) in &query.filters {
            let field = checked_filter_field(schema, name, value)?;
            sql.push_str(&format!(" AND {} = ?", quote_identifier(field.name)));
            bind_values.push(to_sql_value(value));
        }

        sql.push_str(" ORDER BY rowid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            let mut record = parse_record_row(schema, row)?;
            load_undeclared_fields(self.conn, &mut record)?;
            records.push(record);
        }

        Ok(records)
    }

    fn delete(&self, collection: &str, id: RecordId) -> RepoResult<()> {
        let schema = resolve_collection(collection)?;
        let tx = self.conn.unchecked_transaction()?;
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", quote_identifier(schema.name)),
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                collection: schema.name,
                id,
            });
        }
        self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE collection = ?1 AND record_id = ?2;",
                quote_identifier(UNDECLARED_FIELDS_TABLE)
            ),
            params![schema.name, id.to_string()],
        )?;
        tx.commit()?;

        debug!(
            "event=record_write module=repo status=ok op=delete collection={} record_id={}",
            schema.name, id
        );
        Ok(())
    }
}

fn resolve_collection(name: &str) -> RepoResult<&'static CollectionSchema> {
    find_collection(name)
        .ok_or_else(|| ValidationError::UnknownCollection(name.to_string()).into())
}

fn checked_filter_field(
    schema: &CollectionSchema,
    name: &str,
    value: &FieldValue,
) -> RepoResult<&'static FieldDef> {
    let field = schema
        .field(name)
        .ok_or_else(|| ValidationError::UnknownField {
            collection: schema.name,
            field: name.to_string(),
        })?;
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteNumber {
            collection: schema.name,
            field: field.name.to_string(),
        }
        .into());
    }
    if !value.matches(field.ty) {
        return Err(ValidationError::TypeMismatch {
            collection: schema.name,
            field: field.name,
            expected: field.ty,
            found: value.type_name(),
        }
        .into());
    }
    Ok(field)
}

fn select_sql(schema: &CollectionSchema) -> String {
    let mut columns = METADATA_COLUMNS.to_string();
    for field in schema.fields {
        columns.push_str(", ");
        columns.push_str(&quote_identifier(field.name));
    }
    format!("SELECT {columns} FROM {}", quote_identifier(schema.name))
}

fn parse_record_row(schema: &'static CollectionSchema, row: &Row<'_>) -> RepoResult<StoredRecord> {
    let id_text: String = row.get(0)?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid record id `{id_text}` in {}.id", schema.name))
    })?;

    let mut document = Document::new();
    for (offset, field) in schema.fields.iter().enumerate() {
        let raw = row.get_ref(FIRST_FIELD_COLUMN + offset)?;
        if let Some(value) = from_sql_value(schema, field, raw)? {
            document.insert(field.name, value);
        }
    }

    Ok(StoredRecord {
        id,
        collection: schema.name,
        document,
        created_at: Timestamp::from_millis(row.get(1)?),
        updated_at: Timestamp::from_millis(row.get(2)?),
    })
}

/// Merges the record's undeclared fields, if any, into its document.
fn load_undeclared_fields(conn: &Connection, record: &mut StoredRecord) -> RepoResult<()> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT fields FROM {} WHERE collection = ?1 AND record_id = ?2;",
        quote_identifier(UNDECLARED_FIELDS_TABLE)
    ))?;
    let mut rows = stmt.query(params![record.collection, record.id.to_string()])?;
    let Some(row) = rows.next()? else {
        return Ok(());
    };

    let text: String = row.get(0)?;
    let invalid = || {
        RepoError::InvalidData(format!(
            "undeclared fields of {} record {} are not a JSON object",
            record.collection, record.id
        ))
    };
    let parsed: JsonValue = serde_json::from_str(&text).map_err(|_| invalid())?;
    let JsonValue::Object(fields) = parsed else {
        return Err(invalid());
    };
    for (name, raw) in &fields {
        record.document.insert(name.clone(), decode_untyped_json(raw));
    }
    Ok(())
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::String(text) => Value::Text(text.clone()),
        FieldValue::Int(number) => Value::Integer(i64::from(*number)),
        FieldValue::Double(number) => Value::Real(*number),
        FieldValue::Bool(flag) => Value::Integer(i64::from(*flag)),
        FieldValue::Date(instant) => Value::Integer(instant.as_millis()),
        FieldValue::Reference(id) => Value::Text(id.to_string()),
        FieldValue::Json(raw) => Value::Text(raw.to_string()),
    }
}

fn from_sql_value(
    schema: &CollectionSchema,
    field: &FieldDef,
    raw: ValueRef<'_>,
) -> RepoResult<Option<FieldValue>> {
    let decoded = match (field.ty, raw) {
        (_, ValueRef::Null) => return Ok(None),
        (FieldType::String, ValueRef::Text(bytes)) => std::str::from_utf8(bytes)
            .ok()
            .map(|text| FieldValue::String(text.to_string())),
        (FieldType::Int, ValueRef::Integer(number)) => {
            i32::try_from(number).ok().map(FieldValue::Int)
        }
        (FieldType::Double, ValueRef::Real(number)) => Some(FieldValue::Double(number)),
        (FieldType::Bool, ValueRef::Integer(0)) => Some(FieldValue::Bool(false)),
        (FieldType::Bool, ValueRef::Integer(1)) => Some(FieldValue::Bool(true)),
        (FieldType::Date, ValueRef::Integer(millis)) => {
            Some(FieldValue::Date(Timestamp::from_millis(millis)))
        }
        (FieldType::Reference(_), ValueRef::Text(bytes)) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|text| Uuid::parse_str(text).ok())
            .map(FieldValue::Reference),
        _ => None,
    };

    decoded.map(Some).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "{}.{} does not hold a valid {} value",
            schema.name, field.name, field.ty
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::{from_sql_value, to_sql_value, ListQuery};
    use crate::model::{FieldValue, Timestamp};
    use crate::schema::catalog::Purchase;
    use crate::schema::Collection;
    use rusqlite::types::{Value, ValueRef};

    #[test]
    fn bools_and_dates_are_stored_as_integers() {
        assert_eq!(to_sql_value(&FieldValue::Bool(true)), Value::Integer(1));
        assert_eq!(
            to_sql_value(&FieldValue::Date(Timestamp::from_millis(99))),
            Value::Integer(99)
        );
    }

    #[test]
    fn decoding_rejects_wrong_storage_class() {
        let schema = &Purchase::SCHEMA;
        let total = schema.field("total").unwrap();
        assert!(from_sql_value(schema, total, ValueRef::Text(b"12")).is_err());
        assert_eq!(
            from_sql_value(schema, total, ValueRef::Real(12.5)).unwrap(),
            Some(FieldValue::Double(12.5))
        );
        let status = schema.field("status").unwrap();
        assert!(from_sql_value(schema, status, ValueRef::Integer(2)).is_err());
        assert_eq!(from_sql_value(schema, status, ValueRef::Null).unwrap(), None);
    }

    #[test]
    fn list_query_builder_collects_filters() {
        let query = ListQuery::new().filter("status", true).limit(5).offset(2);
        assert_eq!(query.filters, vec![("status".to_string(), FieldValue::Bool(true))]);
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.offset, 2);
    }
}
