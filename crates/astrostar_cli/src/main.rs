//! Operator CLI for the Astrostar record store.
//!
//! # Responsibility
//! - Provision database files and inspect the collection catalog.
//! - Validate, store and read JSON documents from the shell.
//! - Keep stdout machine-readable: every command prints one JSON value.

mod cli;

use anyhow::{anyhow, bail, Context, Result};
use astrostar_core::model::decode_json_value;
use astrostar_core::{
    catalog, core_version, default_log_level, find_collection, init_logging, open_db_with_report,
    CollectionSchema, Document, DocumentRepository, ListQuery, SqliteDocumentRepository,
    WritePolicy,
};
use clap::Parser;
use cli::{Cli, Command};
use log::info;
use rusqlite::Connection;
use serde_json::{json, Value};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_cli_logging(&cli)?;
    let output = run(&cli)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_cli_logging(cli: &Cli) -> Result<()> {
    let Some(log_dir) = &cli.log_dir else {
        return Ok(());
    };
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().as_str().to_string());
    init_logging(&level, log_dir).map_err(|err| anyhow!(err))
}

fn run(cli: &Cli) -> Result<Value> {
    let policy = if cli.strict {
        WritePolicy::strict()
    } else {
        WritePolicy::permissive()
    };

    match &cli.command {
        Command::Provision => {
            let (_conn, report) = open_store(&cli.db)?;
            Ok(json!({
                "core_version": core_version(),
                "database": cli.db.display().to_string(),
                "report": report,
            }))
        }
        Command::Collections => Ok(Value::Array(
            catalog()
                .iter()
                .map(|schema| {
                    json!({
                        "name": schema.name,
                        "tier": schema.tier,
                        "fields": schema.fields.len(),
                        "references": schema
                            .references()
                            .map(|(field, target)| format!("{} -> {target}", field.name))
                            .collect::<Vec<_>>(),
                    })
                })
                .collect(),
        )),
        Command::Describe { collection } => Ok(serde_json::to_value(schema_for(collection)?)?),
        Command::Validate {
            collection,
            document,
        } => {
            let schema = schema_for(collection)?;
            let document = read_document(schema, document)?;
            schema.validate(&document, &policy)?;
            Ok(json!({ "collection": schema.name, "valid": true }))
        }
        Command::Insert {
            collection,
            document,
        } => {
            let schema = schema_for(collection)?;
            let document = read_document(schema, document)?;
            let (conn, _) = open_store(&cli.db)?;
            let id = repository(&conn, policy)?.insert(schema.name, &document)?;
            info!(
                "event=cli_insert module=cli status=ok collection={} record_id={}",
                schema.name, id
            );
            Ok(json!({ "collection": schema.name, "_id": id.to_string() }))
        }
        Command::Replace {
            collection,
            id,
            document,
        } => {
            let schema = schema_for(collection)?;
            let document = read_document(schema, document)?;
            let (conn, _) = open_store(&cli.db)?;
            repository(&conn, policy)?.replace(schema.name, *id, &document)?;
            Ok(json!({ "collection": schema.name, "_id": id.to_string(), "replaced": true }))
        }
        Command::Get { collection, id } => {
            let schema = schema_for(collection)?;
            let (conn, _) = open_store(&cli.db)?;
            let record = repository(&conn, policy)?
                .get(schema.name, *id)?
                .ok_or_else(|| anyhow!("{} record not found: {id}", schema.name))?;
            Ok(record.to_json())
        }
        Command::List {
            collection,
            limit,
            offset,
            filters,
        } => {
            let schema = schema_for(collection)?;
            let mut query = ListQuery::new().offset(*offset);
            if let Some(limit) = limit {
                query = query.limit(*limit);
            }
            for (name, raw) in filters {
                let field = schema.field(name).ok_or_else(|| {
                    anyhow!("field `{name}` is not declared by `{}`", schema.name)
                })?;
                let value = decode_json_value(field.ty, raw).ok_or_else(|| {
                    anyhow!("filter {}.{} expects {}, got {raw}", schema.name, field.name, field.ty)
                })?;
                query = query.filter(field.name, value);
            }

            let (conn, _) = open_store(&cli.db)?;
            let records = repository(&conn, policy)?.list(schema.name, &query)?;
            Ok(Value::Array(
                records.iter().map(|record| record.to_json()).collect(),
            ))
        }
        Command::Delete { collection, id } => {
            let schema = schema_for(collection)?;
            let (conn, _) = open_store(&cli.db)?;
            repository(&conn, policy)?.delete(schema.name, *id)?;
            Ok(json!({ "collection": schema.name, "_id": id.to_string(), "deleted": true }))
        }
    }
}

fn open_store(path: &Path) -> Result<(Connection, astrostar_core::ProvisionReport)> {
    open_db_with_report(path).with_context(|| format!("failed to open {}", path.display()))
}

fn repository(conn: &Connection, policy: WritePolicy) -> Result<SqliteDocumentRepository<'_>> {
    Ok(SqliteDocumentRepository::try_new(conn)?.with_policy(policy))
}

fn schema_for(name: &str) -> Result<&'static CollectionSchema> {
    match find_collection(name) {
        Some(schema) => Ok(schema),
        None => bail!("unknown collection `{name}`; run `astrostar collections` for the list"),
    }
}

/// Reads a JSON document argument, either inline or from `@path`.
fn read_document(schema: &CollectionSchema, raw: &str) -> Result<Document> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read document file {path}"))?,
        None => raw.to_string(),
    };
    let value: Value = serde_json::from_str(&text).context("document is not valid JSON")?;
    Ok(Document::from_json(schema, &value)?)
}

#[cfg(test)]
mod tests {
    use super::{read_document, run, schema_for};
    use crate::cli::Cli;
    use clap::Parser;
    use serde_json::json;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("astrostar").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn read_document_decodes_inline_json() {
        let schema = schema_for("sports_material").unwrap();
        let document = read_document(schema, r#"{"name": "Cone", "quantity": 4}"#).unwrap();
        assert_eq!(document.len(), 2);

        let err = read_document(schema, r#"{"quantity": "ten"}"#).unwrap_err();
        assert!(err.to_string().contains("expects int"));
    }

    #[test]
    fn unknown_collection_names_the_list_command() {
        let err = schema_for("players").unwrap_err();
        assert!(err.to_string().contains("astrostar collections"));
    }

    #[test]
    fn insert_then_list_round_trip_against_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("cli.db");
        let db = db.to_str().unwrap();

        let inserted = run(&cli(&[
            "--db",
            db,
            "insert",
            "sports_material",
            r#"{"name": "Soccer ball", "quantity": 10, "status": true, "type": "Comprado"}"#,
        ]))
        .unwrap();
        let id = inserted["_id"].as_str().unwrap().to_string();

        let listed = run(&cli(&["--db", db, "list", "sports_material", "--where", "status=true"]))
            .unwrap();
        assert_eq!(listed[0]["_id"], id.as_str());
        assert_eq!(listed[0]["type"], "Comprado");

        let provisioned = run(&cli(&["--db", db, "provision"])).unwrap();
        assert_eq!(provisioned["report"]["created"], serde_json::json!([]));
    }

    #[test]
    fn collections_and_describe_read_the_catalog() {
        let collections = run(&cli(&["collections"])).unwrap();
        let listed = collections.as_array().unwrap();
        assert_eq!(listed.len(), 29);
        assert_eq!(listed[0]["name"], "permissions");
        let members = listed
            .iter()
            .find(|entry| entry["name"] == "team_members")
            .unwrap();
        assert_eq!(members["tier"], "bridge");
        assert_eq!(members["references"][0], "id_team -> teams");

        let described = run(&cli(&["describe", "purchases"])).unwrap();
        assert_eq!(described["name"], "purchases");
        assert_eq!(described["fields"][2], json!({"name": "total", "type": "double"}));

        assert!(run(&cli(&["describe", "players"])).is_err());
    }

    #[test]
    fn validate_reads_documents_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        std::fs::write(&good, r#"{"name": "Cone", "quantity": 4, "color": "orange"}"#).unwrap();
        let argument = format!("@{}", good.display());

        let valid = run(&cli(&["validate", "sports_material", argument.as_str()])).unwrap();
        assert_eq!(valid, json!({"collection": "sports_material", "valid": true}));

        let err = run(&cli(&[
            "--strict",
            "validate",
            "sports_material",
            argument.as_str(),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("`color` is not declared"));

        let missing = format!("@{}", dir.path().join("missing.json").display());
        let err = run(&cli(&["validate", "sports_material", missing.as_str()])).unwrap_err();
        assert!(err.to_string().contains("failed to read document file"));
    }

    #[test]
    fn get_replace_and_delete_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("crud.db");
        let db = db.to_str().unwrap();

        let inserted = run(&cli(&["--db", db, "insert", "teams", r#"{"team_name": "Halcones"}"#]))
            .unwrap();
        let id = inserted["_id"].as_str().unwrap().to_string();

        let replaced = run(&cli(&[
            "--db",
            db,
            "replace",
            "teams",
            id.as_str(),
            r#"{"team_name": "Condores"}"#,
        ]))
        .unwrap();
        assert_eq!(replaced["replaced"], true);

        let fetched = run(&cli(&["--db", db, "get", "teams", id.as_str()])).unwrap();
        assert_eq!(fetched["team_name"], "Condores");
        assert_eq!(fetched["_id"], id.as_str());

        let deleted = run(&cli(&["--db", db, "delete", "teams", id.as_str()])).unwrap();
        assert_eq!(deleted["deleted"], true);

        let err = run(&cli(&["--db", db, "get", "teams", id.as_str()])).unwrap_err();
        assert!(err.to_string().contains("teams record not found"));
        assert!(run(&cli(&["--db", db, "delete", "teams", id.as_str()])).is_err());
    }

    #[test]
    fn strict_insert_rejects_dangling_reference() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("strict.db");
        let db = db.to_str().unwrap();

        let err = run(&cli(&[
            "--db",
            db,
            "--strict",
            "insert",
            "users",
            r#"{"id_role": "6f1f8c5e-1d2a-4b7c-9a0e-3c4d5e6f7a8b"}"#,
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("references missing roles record"));
    }
}
