//! Command-line configuration.
//!
//! Every global option can also come from the environment, so scripted
//! provisioning only needs `ASTROSTAR_DB`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(
    name = "astrostar",
    version,
    about = "Provision and inspect the Astrostar record store"
)]
pub struct Cli {
    /// SQLite database file; created and provisioned on first use.
    #[arg(long, env = "ASTROSTAR_DB", default_value = "astrostar.sqlite3", global = true)]
    pub db: PathBuf,

    /// trace|debug|info|warn|error. Defaults by build mode.
    #[arg(long, env = "ASTROSTAR_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files. Logging is off without it.
    #[arg(long, env = "ASTROSTAR_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Reject undeclared fields and dangling or doubly-set references.
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create missing collections and report what was created or skipped.
    Provision,
    /// List every collection with its tier and references.
    Collections,
    /// Print the declared fields of one collection.
    Describe { collection: String },
    /// Check a JSON document against a collection without storing it.
    ///
    /// Reference existence is not checked; use `insert --strict` for that.
    Validate {
        collection: String,
        /// JSON object, or `@path` to read it from a file.
        document: String,
    },
    /// Validate and store a JSON document; prints the new record id.
    Insert {
        collection: String,
        /// JSON object, or `@path` to read it from a file.
        document: String,
    },
    /// Replace every field of an existing record.
    Replace {
        collection: String,
        id: Uuid,
        /// JSON object, or `@path` to read it from a file.
        document: String,
    },
    Get {
        collection: String,
        id: Uuid,
    },
    /// List records in insertion order.
    List {
        collection: String,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        /// Equality filter `field=<json>`; repeatable. Bare words are strings.
        #[arg(long = "where", value_parser = parse_filter)]
        filters: Vec<(String, serde_json::Value)>,
    },
    Delete {
        collection: String,
        id: Uuid,
    },
}

fn parse_filter(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got `{raw}`"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in `{raw}`"));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((field.to_string(), value))
}
