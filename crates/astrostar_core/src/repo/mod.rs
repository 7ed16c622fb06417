//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the storage-engine surface over catalog collections.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes must pass `CollectionSchema::validate` before
//!   persistence.
//! - Repository APIs return semantic errors (`NotFound`, validation) in
//!   addition to DB transport errors.

pub mod document_repo;
