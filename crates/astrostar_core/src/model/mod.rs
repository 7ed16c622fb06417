//! Record model shared by the catalog, repository and services.
//!
//! # Responsibility
//! - Define the typed values a document field can hold.
//! - Define the dynamic `Document` that gets validated and stored.
//!
//! # Invariants
//! - Every stored record is identified by a stable `RecordId`.
//! - Documents carry only set fields; an absent key means "not set".

pub mod document;
pub mod value;
pub mod vocab;

pub use document::{decode_json_value, decode_untyped_json, Document};
pub use value::{FieldValue, FromFieldValue, RecordId, Timestamp};
pub use vocab::{MaterialOrigin, Registrant, RegistrationStatus, ScheduleStatus};
