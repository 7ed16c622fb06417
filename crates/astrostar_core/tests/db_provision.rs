use astrostar_core::db::migrations::latest_version;
use astrostar_core::db::{open_db, open_db_in_memory, open_db_with_report, provision, DbError};
use astrostar_core::{catalog, RepoError, SqliteDocumentRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_creates_every_collection() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for schema in catalog() {
        assert_table_exists(&conn, schema.name);
    }
}

#[test]
fn first_provision_reports_every_collection_created() {
    let dir = tempfile::tempdir().unwrap();
    let (_conn, report) = open_db_with_report(dir.path().join("astrostar.db")).unwrap();

    assert_eq!(report.from_version, 0);
    assert_eq!(report.to_version, latest_version());
    assert_eq!(report.applied_migrations, vec![1, 2]);
    assert_eq!(report.created.len(), catalog().len());
    assert!(report.skipped.is_empty());
    assert_eq!(report.created.first(), Some(&"permissions"));
    assert_eq!(report.created.last(), Some(&"team_registrations"));
}

#[test]
fn reopening_same_database_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("astrostar.db");

    let (conn_first, first) = open_db_with_report(&path).unwrap();
    assert!(!first.is_noop());
    drop(conn_first);

    let (conn_second, second) = open_db_with_report(&path).unwrap();
    assert!(second.is_noop());
    assert!(second.created.is_empty());
    assert_eq!(second.skipped.len(), catalog().len());
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_eq!(count_tables(&conn_second, "sports_material"), 1);
}

#[test]
fn provisioning_twice_on_one_connection_succeeds() {
    let mut conn = open_db_in_memory().unwrap();
    let report = provision(&mut conn).unwrap();
    assert!(report.is_noop());
    assert_eq!(report.from_version, report.to_version);
}

#[test]
fn pre_existing_collection_is_skipped_and_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE roles (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT,
            description TEXT,
            status INTEGER,
            created_at INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL DEFAULT 0
        );
        INSERT INTO roles (id, name, status)
        VALUES ('6f1f8c5e-1d2a-4b7c-9a0e-3c4d5e6f7a8b', 'coach', 1);",
    )
    .unwrap();
    drop(conn);

    let (conn, report) = open_db_with_report(&path).unwrap();
    assert_eq!(report.skipped, vec!["roles"]);
    assert_eq!(report.created.len(), catalog().len() - 1);

    let kept: i64 = conn
        .query_row("SELECT COUNT(*) FROM roles;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(kept, 1);
}

#[test]
fn pre_existing_table_missing_a_field_column_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drifted.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE programs (id TEXT PRIMARY KEY NOT NULL, program_name TEXT);")
        .unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::MissingField { collection, field } => {
            assert_eq!(collection, "programs");
            assert_eq!(field, "description");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn dropped_collection_is_recreated_on_next_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("astrostar.db");

    let conn = open_db(&path).unwrap();
    conn.execute_batch("DROP TABLE teams;").unwrap();
    drop(conn);

    let (conn, report) = open_db_with_report(&path).unwrap();
    assert_eq!(report.created, vec!["teams"]);
    assert!(report.applied_migrations.is_empty());
    assert!(!report.is_noop());
    assert_table_exists(&conn, "teams");
    assert_index_exists(&conn, "idx_teams_id_sports_category");
}

#[test]
fn pre_existing_table_missing_a_reference_column_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy_persons.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE persons (
            id TEXT PRIMARY KEY NOT NULL,
            first_name TEXT,
            last_name TEXT,
            identification TEXT,
            phone_number TEXT,
            email TEXT,
            is_sportsman INTEGER,
            id_document_type TEXT,
            created_at INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL DEFAULT 0
        );",
    )
    .unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::MissingField { collection, field } => {
            assert_eq!(collection, "persons");
            assert_eq!(field, "id_guardian");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn pre_existing_column_with_wrong_affinity_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy_purchases.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE purchases (
            id TEXT PRIMARY KEY NOT NULL,
            invoice_number VARCHAR(32),
            purchase_date INTEGER,
            total INTEGER,
            id_supplier TEXT,
            status INTEGER,
            created_at INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL DEFAULT 0
        );",
    )
    .unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::ColumnType {
            collection,
            field,
            expected,
            found,
        } => {
            assert_eq!(collection, "purchases");
            assert_eq!(field, "total");
            assert_eq!(expected, "REAL");
            assert_eq!(found, "INTEGER");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn repository_rejects_unprovisioned_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteDocumentRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn reference_columns_are_indexed() {
    let conn = open_db_in_memory().unwrap();
    assert_index_exists(&conn, "idx_team_members_id_team");
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn count_tables(conn: &Connection, table_name: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1;",
        [table_name],
        |row| row.get(0),
    )
    .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert_eq!(count_tables(conn, table_name), 1, "table {table_name} does not exist");
}

fn assert_index_exists(conn: &Connection, index_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master
                WHERE type = 'index' AND name = ?1
            );",
            [index_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "index {index_name} does not exist");
}
