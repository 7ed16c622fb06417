//! Field values and identity types.
//!
//! # Invariants
//! - A `FieldValue` variant corresponds to exactly one `FieldType` family;
//!   `Int` never satisfies a `Double` field and vice versa.
//! - Record ids are opaque; holding one says nothing about whether the
//!   referenced record exists.
//! - `Json` only holds values of undeclared fields and satisfies no
//!   declared type.

use crate::schema::FieldType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier of a stored record; also the value of reference fields.
pub type RecordId = Uuid;

/// UTC instant in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Current wall-clock time. Clocks before the epoch read as `0`.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
            });
        Self(millis)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// One typed value held by a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Int(i32),
    Double(f64),
    Bool(bool),
    Date(Timestamp),
    Reference(RecordId),
    /// Free-form value of a field the collection does not declare.
    Json(Value),
}

impl FieldValue {
    /// BSON-style name of this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Bool(_) => "bool",
            Self::Date(_) => "date",
            Self::Reference(_) => "objectId",
            Self::Json(_) => "json",
        }
    }

    /// Returns false only for NaN and infinite doubles.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Double(number) => number.is_finite(),
            _ => true,
        }
    }

    /// Returns whether this value is accepted by a field of type `ty`.
    ///
    /// Any record id satisfies any reference field; the target collection is
    /// not inspected.
    pub fn matches(&self, ty: FieldType) -> bool {
        matches!(
            (self, ty),
            (Self::String(_), FieldType::String)
                | (Self::Int(_), FieldType::Int)
                | (Self::Double(_), FieldType::Double)
                | (Self::Bool(_), FieldType::Bool)
                | (Self::Date(_), FieldType::Date)
                | (Self::Reference(_), FieldType::Reference(_))
        )
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(value: Timestamp) -> Self {
        Self::Date(value)
    }
}

impl From<RecordId> for FieldValue {
    fn from(value: RecordId) -> Self {
        Self::Reference(value)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Typed extraction from a [`FieldValue`]; `None` on a variant mismatch.
pub trait FromFieldValue: Sized {
    fn from_field_value(value: &FieldValue) -> Option<Self>;
}

impl FromFieldValue for String {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::String(text) => Some(text.clone()),
            _ => None,
        }
    }
}

impl FromFieldValue for i32 {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Int(number) => Some(*number),
            _ => None,
        }
    }
}

impl FromFieldValue for f64 {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Double(number) => Some(*number),
            _ => None,
        }
    }
}

impl FromFieldValue for bool {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }
}

impl FromFieldValue for Timestamp {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Date(instant) => Some(*instant),
            _ => None,
        }
    }
}

impl FromFieldValue for RecordId {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Reference(id) => Some(*id),
            _ => None,
        }
    }
}

impl FromFieldValue for Value {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Json(raw) => Some(raw.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldValue, Timestamp};
    use crate::schema::FieldType;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn values_match_only_their_own_type() {
        assert!(FieldValue::Int(3).matches(FieldType::Int));
        assert!(!FieldValue::Int(3).matches(FieldType::Double));
        assert!(!FieldValue::Double(3.0).matches(FieldType::Int));
        assert!(!FieldValue::from("2024-01-01").matches(FieldType::Date));
        assert!(FieldValue::from(Uuid::new_v4()).matches(FieldType::Reference("teams")));
        assert!(!FieldValue::from(json!(["a"])).matches(FieldType::String));
    }

    #[test]
    fn only_nan_and_infinities_are_not_finite() {
        assert!(FieldValue::Double(1.5).is_finite());
        assert!(!FieldValue::Double(f64::NAN).is_finite());
        assert!(!FieldValue::Double(f64::NEG_INFINITY).is_finite());
        assert!(FieldValue::Int(i32::MAX).is_finite());
    }

    #[test]
    fn timestamp_now_is_after_epoch() {
        assert!(Timestamp::now() > Timestamp::from_millis(0));
    }
}
