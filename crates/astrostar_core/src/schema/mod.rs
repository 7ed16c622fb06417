//! Declarative collection catalog.
//!
//! # Responsibility
//! - Declare every collection, its tier and its typed fields.
//! - Validate candidate documents against a collection's declared shape.
//!
//! # Invariants
//! - Collection names are unique across the catalog.
//! - Every reference field names exactly one target collection that exists
//!   in the catalog.
//! - Fields constrain type, never presence.

#[macro_use]
mod macros;

pub mod catalog;
pub mod validate;

use crate::model::Document;
use serde::Serialize;
use std::fmt::{Display, Formatter};

pub use catalog::{catalog, find_collection};
pub use validate::{ValidationError, WritePolicy};

/// Primitive type a declared field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    /// 32-bit signed integer.
    Int,
    Double,
    Bool,
    /// UTC timestamp in epoch milliseconds.
    Date,
    /// Opaque record id pointing into the named collection.
    Reference(&'static str),
}

impl FieldType {
    /// BSON-style type name used in diagnostics and JSON output.
    pub fn bson_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::Date => "date",
            Self::Reference(_) => "objectId",
        }
    }

    /// SQLite column type used for the field's storage column.
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::String | Self::Reference(_) => "TEXT",
            Self::Int | Self::Bool | Self::Date => "INTEGER",
            Self::Double => "REAL",
        }
    }

    pub fn reference_target(self) -> Option<&'static str> {
        match self {
            Self::Reference(target) => Some(target),
            _ => None,
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reference(target) => write!(f, "objectId({target})"),
            other => f.write_str(other.bson_type()),
        }
    }
}

/// Dependency tier of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Lookup data without references.
    Atomic,
    /// Holds references to atomic or other dependent collections.
    Dependent,
    /// Pairs identifiers to resolve many-to-many relationships.
    Bridge,
}

/// One named, typed field of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: FieldType,
}

/// Declared shape of one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectionSchema {
    pub name: &'static str,
    pub tier: Tier,
    /// Fields in declaration order.
    pub fields: &'static [FieldDef],
    /// Groups of reference fields where a record points at one referent kind
    /// or the other (e.g. a person or a temporary person).
    pub exclusive_references: &'static [&'static [&'static str]],
}

impl CollectionSchema {
    /// Looks up a declared field by wire name.
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        let fields: &'static [FieldDef] = self.fields;
        fields.iter().find(|field| field.name == name)
    }

    /// Returns `(field, target collection)` for every reference field.
    pub fn references(&self) -> impl Iterator<Item = (&'static FieldDef, &'static str)> {
        let fields: &'static [FieldDef] = self.fields;
        fields
            .iter()
            .filter_map(|field| field.ty.reference_target().map(|target| (field, target)))
    }
}

/// Typed record bound to one catalog collection.
///
/// Implemented by the generated record structs in [`catalog`].
pub trait Collection: Sized {
    const SCHEMA: CollectionSchema;

    /// Converts set fields into a document; unset fields are omitted.
    fn to_document(&self) -> Document;

    /// Builds a typed record from a document that matches [`Self::SCHEMA`].
    fn from_document(document: &Document) -> Result<Self, ValidationError>;
}

#[cfg(test)]
mod tests {
    use super::{FieldType, Tier};

    #[test]
    fn field_types_map_to_bson_and_sql_names() {
        assert_eq!(FieldType::Int.bson_type(), "int");
        assert_eq!(FieldType::Reference("roles").bson_type(), "objectId");
        assert_eq!(FieldType::Double.sql_type(), "REAL");
        assert_eq!(FieldType::Bool.sql_type(), "INTEGER");
        assert_eq!(FieldType::Reference("roles").sql_type(), "TEXT");
    }

    #[test]
    fn reference_display_names_target() {
        assert_eq!(FieldType::Reference("persons").to_string(), "objectId(persons)");
        assert_eq!(FieldType::Date.to_string(), "date");
        assert_eq!(FieldType::Date.reference_target(), None);
    }

    #[test]
    fn tier_serializes_snake_case() {
        assert_eq!(serde_json::to_value(Tier::Bridge).unwrap(), "bridge");
    }
}
