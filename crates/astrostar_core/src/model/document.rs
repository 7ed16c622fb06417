//! Dynamic documents and their JSON form.
//!
//! JSON uses extended notation for types plain JSON cannot express:
//! dates are `{"$date": <epoch ms>}` and references are `{"$oid": "<uuid>"}`.
//! Decoding is schema-guided, so `10` is an `int` in an `int` field and a
//! `double` in a `double` field. Keys the collection does not declare are
//! kept and typed by their JSON shape alone.

use crate::model::value::{FieldValue, FromFieldValue, Timestamp};
use crate::schema::{CollectionSchema, FieldType, ValidationError};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Field-name to value map validated and stored as one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a field, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Typed read; `None` when the field is unset or holds another type.
    pub fn get_as<T: FromFieldValue>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(T::from_field_value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Decodes a JSON object under `schema`'s declared field types.
    ///
    /// Undeclared keys are decoded with [`decode_untyped_json`]; whether
    /// they may be stored is a write-policy decision.
    ///
    /// # Errors
    /// - `NotAnObject` when `value` is not a JSON object.
    /// - `TypeMismatch` when a declared field's value cannot be read as the
    ///   declared type, including `null`.
    pub fn from_json(schema: &CollectionSchema, value: &Value) -> Result<Self, ValidationError> {
        let object = value.as_object().ok_or(ValidationError::NotAnObject {
            collection: schema.name,
        })?;

        let mut document = Self::new();
        for (key, raw) in object {
            let Some(field) = schema.field(key) else {
                document.insert(key.clone(), decode_untyped_json(raw));
                continue;
            };
            let decoded =
                decode_json_value(field.ty, raw).ok_or(ValidationError::TypeMismatch {
                    collection: schema.name,
                    field: field.name,
                    expected: field.ty,
                    found: json_type_name(raw),
                })?;
            document.insert(field.name, decoded);
        }
        Ok(document)
    }

    /// Renders the document as a JSON object in extended notation.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        for (name, value) in self.iter() {
            object.insert(name.to_string(), field_value_to_json(value));
        }
        Value::Object(object)
    }
}

/// Decodes one JSON value as `ty`. Also used for CLI filter values.
pub fn decode_json_value(ty: FieldType, raw: &Value) -> Option<FieldValue> {
    match ty {
        FieldType::String => raw.as_str().map(|text| FieldValue::String(text.to_string())),
        FieldType::Int => raw
            .as_i64()
            .and_then(|number| i32::try_from(number).ok())
            .map(FieldValue::Int),
        FieldType::Double => raw.as_f64().map(FieldValue::Double),
        FieldType::Bool => raw.as_bool().map(FieldValue::Bool),
        FieldType::Date => raw
            .as_i64()
            .or_else(|| extended_member(raw, "$date").and_then(Value::as_i64))
            .map(|millis| FieldValue::Date(Timestamp::from_millis(millis))),
        FieldType::Reference(_) => raw
            .as_str()
            .or_else(|| extended_member(raw, "$oid").and_then(Value::as_str))
            .and_then(|text| Uuid::parse_str(text).ok())
            .map(FieldValue::Reference),
    }
}

/// Decodes a value without a declared type.
///
/// Extended wrappers and plain scalars map to their typed variants, so
/// [`Document::to_json`] output decodes back to the same values. Integers
/// outside the `int` range and every other shape stay raw JSON.
pub fn decode_untyped_json(raw: &Value) -> FieldValue {
    if let Some(millis) = extended_member(raw, "$date").and_then(Value::as_i64) {
        return FieldValue::Date(Timestamp::from_millis(millis));
    }
    if let Some(id) = extended_member(raw, "$oid")
        .and_then(Value::as_str)
        .and_then(|text| Uuid::parse_str(text).ok())
    {
        return FieldValue::Reference(id);
    }

    match raw {
        Value::String(text) => FieldValue::String(text.clone()),
        Value::Bool(flag) => FieldValue::Bool(*flag),
        Value::Number(number) if number.is_f64() => {
            number.as_f64().map_or_else(|| FieldValue::Json(raw.clone()), FieldValue::Double)
        }
        Value::Number(number) => number
            .as_i64()
            .and_then(|wide| i32::try_from(wide).ok())
            .map_or_else(|| FieldValue::Json(raw.clone()), FieldValue::Int),
        _ => FieldValue::Json(raw.clone()),
    }
}

pub(crate) fn field_value_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::String(text) => Value::String(text.clone()),
        FieldValue::Int(number) => Value::from(*number),
        FieldValue::Double(number) => Value::from(*number),
        FieldValue::Bool(flag) => Value::Bool(*flag),
        FieldValue::Date(instant) => json!({ "$date": instant.as_millis() }),
        FieldValue::Reference(id) => json!({ "$oid": id.to_string() }),
        FieldValue::Json(raw) => raw.clone(),
    }
}

/// Reads `{"<key>": value}` wrappers; extra members disqualify the object.
fn extended_member<'a>(raw: &'a Value, key: &str) -> Option<&'a Value> {
    raw.as_object()
        .filter(|object| object.len() == 1)
        .and_then(|object| object.get(key))
}

fn json_type_name(raw: &Value) -> &'static str {
    match raw {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(number) if number.is_f64() => "double",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_json_value, decode_untyped_json, Document};
    use crate::model::{FieldValue, Timestamp};
    use crate::schema::catalog::{Purchase, SportsMaterial};
    use crate::schema::{Collection, FieldType, ValidationError};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn from_json_decodes_by_declared_type() {
        let supplier = Uuid::new_v4();
        let document = Document::from_json(
            &Purchase::SCHEMA,
            &json!({
                "invoice_number": "F-001",
                "purchase_date": {"$date": 1_700_000_000_000_i64},
                "total": 10,
                "id_supplier": supplier.to_string(),
                "status": true
            }),
        )
        .unwrap();

        assert_eq!(document.get("total"), Some(&FieldValue::Double(10.0)));
        assert_eq!(
            document.get_as::<Timestamp>("purchase_date"),
            Some(Timestamp::from_millis(1_700_000_000_000))
        );
        assert_eq!(document.get_as::<Uuid>("id_supplier"), Some(supplier));
    }

    #[test]
    fn from_json_rejects_fractional_int() {
        let err = Document::from_json(&SportsMaterial::SCHEMA, &json!({"quantity": 2.5}))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::TypeMismatch {
                collection: "sports_material",
                field: "quantity",
                expected: FieldType::Int,
                found: "double",
            }
        );
    }

    #[test]
    fn from_json_rejects_null_and_non_objects() {
        let err =
            Document::from_json(&SportsMaterial::SCHEMA, &json!({"name": null})).unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { found: "null", .. }));

        let err = Document::from_json(&SportsMaterial::SCHEMA, &json!(["name"])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotAnObject {
                collection: "sports_material"
            }
        );
    }

    #[test]
    fn from_json_keeps_undeclared_keys() {
        let document = Document::from_json(
            &SportsMaterial::SCHEMA,
            &json!({"name": "Cone", "color": "orange", "sizes": [1, 2]}),
        )
        .unwrap();

        assert_eq!(document.get_as::<String>("color").as_deref(), Some("orange"));
        assert_eq!(document.get("sizes"), Some(&FieldValue::Json(json!([1, 2]))));
    }

    #[test]
    fn untyped_values_follow_their_json_shape() {
        let id = Uuid::new_v4();
        assert_eq!(decode_untyped_json(&json!(7)), FieldValue::Int(7));
        assert_eq!(decode_untyped_json(&json!(7.5)), FieldValue::Double(7.5));
        assert_eq!(
            decode_untyped_json(&json!({"$date": 9})),
            FieldValue::Date(Timestamp::from_millis(9))
        );
        assert_eq!(
            decode_untyped_json(&json!({"$oid": id.to_string()})),
            FieldValue::Reference(id)
        );
        assert_eq!(
            decode_untyped_json(&json!(3_000_000_000_i64)),
            FieldValue::Json(json!(3_000_000_000_i64))
        );
        assert_eq!(decode_untyped_json(&json!(null)), FieldValue::Json(json!(null)));
    }

    #[test]
    fn int_outside_i32_range_is_rejected() {
        assert_eq!(decode_json_value(FieldType::Int, &json!(3_000_000_000_i64)), None);
        assert_eq!(
            decode_json_value(FieldType::Int, &json!(-7)),
            Some(FieldValue::Int(-7))
        );
    }

    #[test]
    fn extended_wrappers_must_be_exact() {
        let raw = json!({"$date": 5, "tz": "UTC"});
        assert_eq!(decode_json_value(FieldType::Date, &raw), None);
        let raw = json!({"$oid": "not-a-uuid"});
        assert_eq!(decode_json_value(FieldType::Reference("teams"), &raw), None);
    }

    #[test]
    fn to_json_uses_extended_notation() {
        let id = Uuid::new_v4();
        let document = Document::new()
            .with("registration_date", Timestamp::from_millis(42))
            .with("id_service", id)
            .with("registration_status", "pending");

        assert_eq!(
            document.to_json(),
            json!({
                "registration_date": {"$date": 42},
                "id_service": {"$oid": id.to_string()},
                "registration_status": "pending"
            })
        );
    }
}
