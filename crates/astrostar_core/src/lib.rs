//! Core storage layer for the Astrostar sports and community-services
//! application: the collection catalog, write-time validation and the
//! SQLite-backed record store.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schema;
pub mod service;

pub use db::{open_db, open_db_in_memory, open_db_with_report, DbError, ProvisionReport};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::{
    Document, FieldValue, MaterialOrigin, RecordId, Registrant, RegistrationStatus,
    ScheduleStatus, Timestamp,
};
pub use repo::document_repo::{
    DocumentRepository, ListQuery, RepoError, RepoResult, SqliteDocumentRepository, StoredRecord,
};
pub use schema::{
    catalog, find_collection, Collection, CollectionSchema, FieldDef, FieldType, Tier,
    ValidationError, WritePolicy,
};
pub use service::record_service::RecordService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
