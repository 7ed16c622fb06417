//! Idempotent collection provisioning.
//!
//! # Responsibility
//! - Bring a connection up to the latest migration.
//! - Create missing collection tables, including ones dropped after an
//!   earlier provisioning run.
//! - Report which collections were created and which already existed.
//! - Check that every catalog collection has a table with all its columns,
//!   each with the declared type affinity.
//!
//! # Invariants
//! - Re-provisioning an intact, up-to-date database changes nothing.
//! - An existing collection table is skipped, never dropped or rewritten.
//! - Layout checks run before indexes reference any field column.

use super::migrations::{apply_migrations, current_user_version};
use super::{quote_identifier, DbError, DbResult};
use crate::schema::catalog;
use log::{debug, info};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Outcome of one provisioning run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub from_version: u32,
    pub to_version: u32,
    /// Migration versions applied by this run.
    pub applied_migrations: Vec<u32>,
    /// Collections whose table did not exist before this run, in catalog
    /// order.
    pub created: Vec<&'static str>,
    /// Collections whose table already existed and were left untouched.
    pub skipped: Vec<&'static str>,
}

impl ProvisionReport {
    /// Returns whether this run changed nothing.
    pub fn is_noop(&self) -> bool {
        self.applied_migrations.is_empty() && self.created.is_empty()
    }
}

/// Applies migrations and verifies the catalog layout.
///
/// Every run re-executes the idempotent catalog DDL, so a collection whose
/// table went missing is created again and reported in `created`.
///
/// # Side effects
/// - Emits one `collection_create` event per collection and a closing
///   `provision` event with duration.
pub fn provision(conn: &mut Connection) -> DbResult<ProvisionReport> {
    let started_at = Instant::now();
    let existing = existing_tables(conn)?;
    let from_version = current_user_version(conn)?;

    let applied_migrations = apply_migrations(conn, verify_catalog)?;

    let mut report = ProvisionReport {
        from_version,
        to_version: current_user_version(conn)?,
        applied_migrations,
        ..ProvisionReport::default()
    };

    for schema in catalog() {
        if existing.contains(schema.name) {
            debug!(
                "event=collection_create module=db status=skipped collection={}",
                schema.name
            );
            report.skipped.push(schema.name);
        } else {
            info!(
                "event=collection_create module=db status=ok collection={}",
                schema.name
            );
            report.created.push(schema.name);
        }
    }

    info!(
        "event=provision module=db status=ok from_version={} to_version={} created={} skipped={} duration_ms={}",
        report.from_version,
        report.to_version,
        report.created.len(),
        report.skipped.len(),
        started_at.elapsed().as_millis()
    );
    Ok(report)
}

/// Checks that every catalog collection has a table holding an `id` column,
/// one column per declared field and the timestamp columns.
///
/// Field columns must have the type affinity of their declared type;
/// otherwise SQLite converts stored values (a `REAL` written to an
/// `INTEGER` column comes back as an integer).
pub fn verify_catalog(conn: &Connection) -> DbResult<()> {
    for schema in catalog() {
        let columns = table_columns(conn, schema.name)?;
        if columns.is_empty() {
            return Err(DbError::MissingCollection(schema.name));
        }
        let missing = |field: &'static str| DbError::MissingField {
            collection: schema.name,
            field,
        };
        if !columns.contains_key("id") {
            return Err(missing("id"));
        }
        for field in schema.fields {
            let declared = columns.get(field.name).ok_or_else(|| missing(field.name))?;
            let expected = field.ty.sql_type();
            if column_affinity(declared) != expected {
                return Err(DbError::ColumnType {
                    collection: schema.name,
                    field: field.name,
                    expected,
                    found: declared.clone(),
                });
            }
        }
        for metadata in ["created_at", "updated_at"] {
            if !columns.contains_key(metadata) {
                return Err(missing(metadata));
            }
        }
    }
    Ok(())
}

/// SQLite's type affinity rules for a declared column type.
fn column_affinity(declared: &str) -> &'static str {
    let declared = declared.to_ascii_uppercase();
    if declared.contains("INT") {
        "INTEGER"
    } else if ["CHAR", "CLOB", "TEXT"]
        .iter()
        .any(|pattern| declared.contains(pattern))
    {
        "TEXT"
    } else if declared.is_empty() || declared.contains("BLOB") {
        "BLOB"
    } else if ["REAL", "FLOA", "DOUB"]
        .iter()
        .any(|pattern| declared.contains(pattern))
    {
        "REAL"
    } else {
        "NUMERIC"
    }
}

fn existing_tables(conn: &Connection) -> DbResult<BTreeSet<String>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table';")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<BTreeSet<_>, _>>()?;
    Ok(names)
}

/// Column name to declared type.
fn table_columns(conn: &Connection, table: &str) -> DbResult<BTreeMap<String, String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", quote_identifier(table)))?;
    let columns = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>("name")?, row.get::<_, String>("type")?))
        })?
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::column_affinity;

    #[test]
    fn affinity_follows_sqlite_rules() {
        assert_eq!(column_affinity("INTEGER"), "INTEGER");
        assert_eq!(column_affinity("bigint"), "INTEGER");
        assert_eq!(column_affinity("VARCHAR(80)"), "TEXT");
        assert_eq!(column_affinity("DOUBLE PRECISION"), "REAL");
        assert_eq!(column_affinity(""), "BLOB");
        assert_eq!(column_affinity("DECIMAL(10,2)"), "NUMERIC");
    }
}
