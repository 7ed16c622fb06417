//! Declaration macros for catalog collections.
//!
//! `define_collection!` expands one declaration into a typed record struct
//! plus its `Collection` impl carrying the static schema.

macro_rules! field_type {
    (String) => {
        $crate::schema::FieldType::String
    };
    (Int) => {
        $crate::schema::FieldType::Int
    };
    (Double) => {
        $crate::schema::FieldType::Double
    };
    (Bool) => {
        $crate::schema::FieldType::Bool
    };
    (Date) => {
        $crate::schema::FieldType::Date
    };
    (Ref, $target:literal) => {
        $crate::schema::FieldType::Reference($target)
    };
}

macro_rules! field_rust_type {
    (String) => {
        ::std::string::String
    };
    (Int) => {
        i32
    };
    (Double) => {
        f64
    };
    (Bool) => {
        bool
    };
    (Date) => {
        $crate::model::Timestamp
    };
    (Ref) => {
        $crate::model::RecordId
    };
}

macro_rules! wire_name {
    ($field:ident) => {
        stringify!($field)
    };
    ($field:ident, $wire:literal) => {
        $wire
    };
}

macro_rules! define_collection {
    (
        $(#[$meta:meta])*
        $record:ident => $name:literal ($tier:ident) {
            $(
                $(#[$field_meta:meta])*
                $field:ident $(as $wire:literal)? : $kind:ident $(($target:literal))?
            ),+ $(,)?
        }
        $(exclusive [$($group:literal),+ $(,)?])*
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(default)]
        pub struct $record {
            $(
                $(#[$field_meta])*
                $(#[serde(rename = $wire)])?
                #[serde(skip_serializing_if = "Option::is_none")]
                pub $field: Option<field_rust_type!($kind)>,
            )+
        }

        impl $crate::schema::Collection for $record {
            const SCHEMA: $crate::schema::CollectionSchema = $crate::schema::CollectionSchema {
                name: $name,
                tier: $crate::schema::Tier::$tier,
                fields: &[
                    $(
                        $crate::schema::FieldDef {
                            name: wire_name!($field $(, $wire)?),
                            ty: field_type!($kind $(, $target)?),
                        },
                    )+
                ],
                exclusive_references: &[$(&[$($group),+]),*],
            };

            fn to_document(&self) -> $crate::model::Document {
                let mut document = $crate::model::Document::new();
                $(
                    if let Some(value) = &self.$field {
                        document.insert(wire_name!($field $(, $wire)?), value.clone());
                    }
                )+
                document
            }

            fn from_document(
                document: &$crate::model::Document,
            ) -> Result<Self, $crate::schema::ValidationError> {
                <Self as $crate::schema::Collection>::SCHEMA
                    .validate(document, &$crate::schema::WritePolicy::permissive())?;
                Ok(Self {
                    $($field: document.get_as(wire_name!($field $(, $wire)?)),)+
                })
            }
        }
    };
}
