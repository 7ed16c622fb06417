//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Derive each migration's DDL from the collection catalog.
//! - Apply migrations atomically.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Every statement is re-runnable (`IF NOT EXISTS`). Applied migrations
//!   run again on every provisioning pass, so a dropped collection table or
//!   index is restored and a table created outside the registry is kept.

use crate::db::{quote_identifier, DbError, DbResult, UNDECLARED_FIELDS_TABLE};
use crate::schema::{catalog, CollectionSchema};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    statements: fn() -> Vec<String>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "catalog",
        statements: catalog_tables,
    },
    Migration {
        version: 2,
        name: "reference_indexes",
        statements: reference_indexes,
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Runs every migration in version order inside one transaction.
///
/// `check` runs after each migration, before the next one touches the
/// tables. Returns the versions that were pending before this call; an
/// up-to-date database yields an empty list.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the database is newer than this binary.
/// - Whatever `check` reports; the transaction is rolled back.
pub fn apply_migrations(
    conn: &mut Connection,
    check: impl Fn(&Connection) -> DbResult<()>,
) -> DbResult<Vec<u32>> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    let mut applied = Vec::new();
    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        for statement in (migration.statements)() {
            tx.execute_batch(&statement)?;
        }
        check(&tx)?;

        if migration.version <= current_version {
            continue;
        }
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        applied.push(migration.version);
        info!(
            "event=migration_apply module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    Ok(applied)
}

/// Reads the schema version stored in `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// One table per collection plus the side table for undeclared fields.
///
/// Field columns are nullable because the catalog constrains type, not
/// presence. Booleans are stored as 0/1 and dates as epoch milliseconds.
fn catalog_tables() -> Vec<String> {
    let mut statements = catalog()
        .iter()
        .map(collection_table)
        .collect::<Vec<_>>();
    statements.push(format!(
        "CREATE TABLE IF NOT EXISTS {} (
    collection TEXT NOT NULL,
    record_id TEXT NOT NULL,
    fields TEXT NOT NULL,
    PRIMARY KEY (collection, record_id)
);",
        quote_identifier(UNDECLARED_FIELDS_TABLE)
    ));
    statements
}

fn collection_table(schema: &CollectionSchema) -> String {
    let mut columns = vec!["    id TEXT PRIMARY KEY NOT NULL".to_string()];
    for field in schema.fields {
        columns.push(format!(
            "    {} {}",
            quote_identifier(field.name),
            field.ty.sql_type()
        ));
    }
    columns.push(
        "    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000)".to_string(),
    );
    columns.push(
        "    updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000)".to_string(),
    );

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
        quote_identifier(schema.name),
        columns.join(",\n")
    )
}

/// Plain lookup indexes on reference columns. No foreign keys, so dangling
/// references stay storable.
fn reference_indexes() -> Vec<String> {
    catalog()
        .iter()
        .flat_map(|schema| {
            schema.references().map(move |(field, _)| {
                format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({});",
                    quote_identifier(&format!("idx_{}_{}", schema.name, field.name)),
                    quote_identifier(schema.name),
                    quote_identifier(field.name)
                )
            })
        })
        .collect()
}
