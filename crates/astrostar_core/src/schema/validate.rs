//! Write-time document validation against a collection schema.
//!
//! # Invariants
//! - Every present declared field must match its declared type.
//! - Doubles must be finite; SQLite cannot keep NaN.
//! - Undeclared fields, either-or reference groups and reference existence
//!   are only checked when the active [`WritePolicy`] asks for it.

use crate::model::{Document, RecordId};
use crate::schema::{CollectionSchema, FieldType};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Optional write constraints layered over plain type validation.
///
/// `permissive()` accepts exactly what the declared field types accept,
/// plus any undeclared field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritePolicy {
    /// Reject fields the collection does not declare.
    pub reject_undeclared_fields: bool,
    /// Reject documents that set more than one field of an either-or group.
    pub exclusive_references: bool,
    /// Reject reference values whose target record does not exist.
    pub enforce_references: bool,
}

impl WritePolicy {
    pub const fn permissive() -> Self {
        Self {
            reject_undeclared_fields: false,
            exclusive_references: false,
            enforce_references: false,
        }
    }

    pub const fn strict() -> Self {
        Self {
            reject_undeclared_fields: true,
            exclusive_references: true,
            enforce_references: true,
        }
    }
}

/// Reasons a document is rejected by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    UnknownCollection(String),
    NotAnObject {
        collection: &'static str,
    },
    UnknownField {
        collection: &'static str,
        field: String,
    },
    TypeMismatch {
        collection: &'static str,
        field: &'static str,
        expected: FieldType,
        found: &'static str,
    },
    NonFiniteNumber {
        collection: &'static str,
        field: String,
    },
    ExclusiveReferences {
        collection: &'static str,
        fields: Vec<&'static str>,
    },
    DanglingReference {
        collection: &'static str,
        field: &'static str,
        target: &'static str,
        id: RecordId,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCollection(name) => write!(f, "unknown collection `{name}`"),
            Self::NotAnObject { collection } => {
                write!(f, "document for `{collection}` must be a JSON object")
            }
            Self::UnknownField { collection, field } => {
                write!(f, "field `{field}` is not declared by `{collection}`")
            }
            Self::TypeMismatch {
                collection,
                field,
                expected,
                found,
            } => write!(
                f,
                "{collection}.{field} expects {expected}, got {found}"
            ),
            Self::NonFiniteNumber { collection, field } => {
                write!(f, "{collection}.{field} must be a finite number")
            }
            Self::ExclusiveReferences { collection, fields } => write!(
                f,
                "{collection} accepts only one of [{}]",
                fields.join(", ")
            ),
            Self::DanglingReference {
                collection,
                field,
                target,
                id,
            } => write!(
                f,
                "{collection}.{field} references missing {target} record {id}"
            ),
        }
    }
}

impl Error for ValidationError {}

impl CollectionSchema {
    /// Checks `document` against this collection's declared shape.
    ///
    /// Reference existence is not checked here; it needs storage access and
    /// is handled by the repository when the policy enforces it.
    pub fn validate(
        &self,
        document: &Document,
        policy: &WritePolicy,
    ) -> Result<(), ValidationError> {
        for (name, value) in document.iter() {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteNumber {
                    collection: self.name,
                    field: name.to_string(),
                });
            }
            let Some(field) = self.field(name) else {
                if policy.reject_undeclared_fields {
                    return Err(ValidationError::UnknownField {
                        collection: self.name,
                        field: name.to_string(),
                    });
                }
                continue;
            };
            if !value.matches(field.ty) {
                return Err(ValidationError::TypeMismatch {
                    collection: self.name,
                    field: field.name,
                    expected: field.ty,
                    found: value.type_name(),
                });
            }
        }

        if policy.exclusive_references {
            for group in self.exclusive_references {
                let present = group
                    .iter()
                    .copied()
                    .filter(|name| document.contains(name))
                    .collect::<Vec<_>>();
                if present.len() > 1 {
                    return Err(ValidationError::ExclusiveReferences {
                        collection: self.name,
                        fields: present,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ValidationError, WritePolicy};
    use crate::model::{Document, FieldValue, Timestamp};
    use crate::schema::catalog::{Purchase, ServiceRegistration, SportsMaterial};
    use crate::schema::{Collection, FieldType};
    use uuid::Uuid;

    fn soccer_ball() -> Document {
        Document::new()
            .with("name", "Soccer ball")
            .with("quantity", 10)
            .with("description", "Size 5")
            .with("status", true)
            .with("type", "Comprado")
    }

    #[test]
    fn accepts_declared_types() {
        SportsMaterial::SCHEMA
            .validate(&soccer_ball(), &WritePolicy::permissive())
            .unwrap();
    }

    #[test]
    fn rejects_string_in_int_field() {
        let document = soccer_ball().with("quantity", "ten");
        let err = SportsMaterial::SCHEMA
            .validate(&document, &WritePolicy::permissive())
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::TypeMismatch {
                collection: "sports_material",
                field: "quantity",
                expected: FieldType::Int,
                found: "string",
            }
        );
    }

    #[test]
    fn int_is_not_a_double() {
        let document = Document::new().with("total", 10);
        let err = Purchase::SCHEMA
            .validate(&document, &WritePolicy::permissive())
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::TypeMismatch { field: "total", found: "int", .. }
        ));
    }

    #[test]
    fn undeclared_field_is_rejected_only_on_request() {
        let document = soccer_ball().with("color", "white");
        SportsMaterial::SCHEMA
            .validate(&document, &WritePolicy::permissive())
            .unwrap();

        let policy = WritePolicy {
            reject_undeclared_fields: true,
            ..WritePolicy::permissive()
        };
        let err = SportsMaterial::SCHEMA
            .validate(&document, &policy)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "field `color` is not declared by `sports_material`"
        );
    }

    #[test]
    fn non_finite_doubles_are_rejected() {
        for total in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let document = Document::new().with("total", total);
            let err = Purchase::SCHEMA
                .validate(&document, &WritePolicy::permissive())
                .unwrap_err();
            assert_eq!(
                err,
                ValidationError::NonFiniteNumber {
                    collection: "purchases",
                    field: "total".to_string(),
                }
            );
        }

        let document = Document::new().with("discount", f64::NAN);
        let err = Purchase::SCHEMA
            .validate(&document, &WritePolicy::permissive())
            .unwrap_err();
        assert_eq!(err.to_string(), "purchases.discount must be a finite number");
    }

    #[test]
    fn empty_document_is_valid() {
        Purchase::SCHEMA
            .validate(&Document::new(), &WritePolicy::strict())
            .unwrap();
    }

    #[test]
    fn both_registrants_allowed_unless_policy_is_exclusive() {
        let document = Document::new()
            .with("id_person", Uuid::new_v4())
            .with("id_temp_person", Uuid::new_v4())
            .with("registration_date", Timestamp::from_millis(1_700_000_000_000));

        ServiceRegistration::SCHEMA
            .validate(&document, &WritePolicy::permissive())
            .unwrap();

        let err = ServiceRegistration::SCHEMA
            .validate(&document, &WritePolicy::strict())
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::ExclusiveReferences {
                collection: "service_registrations",
                fields: vec!["id_person", "id_temp_person"],
            }
        );
    }

    #[test]
    fn reference_field_rejects_plain_string() {
        let document = Document::new().with("id_service", FieldValue::from("svc-1"));
        let err = ServiceRegistration::SCHEMA
            .validate(&document, &WritePolicy::permissive())
            .unwrap_err();
        assert!(err.to_string().contains("expects objectId(services), got string"));
    }
}
