//! Typed vocabularies for free-form string fields.
//!
//! The catalog stores these as plain strings; the enums give typed callers a
//! closed set of values without narrowing what the schema accepts.

use crate::model::RecordId;
use serde::{Deserialize, Serialize};

/// Registration lifecycle for `service_registrations` and
/// `team_registrations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// State of an `employee_schedules` or `appointments` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl ScheduleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "scheduled" => Some(Self::Scheduled),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// How a `sports_material` item entered stock. Stored values are Spanish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialOrigin {
    #[serde(rename = "Comprado")]
    Purchased,
    #[serde(rename = "Donado")]
    Donated,
}

impl MaterialOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Purchased => "Comprado",
            Self::Donated => "Donado",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Comprado" => Some(Self::Purchased),
            "Donado" => Some(Self::Donated),
            _ => None,
        }
    }
}

/// Participant of a registration or team membership.
///
/// Bridges that accept either a person or a temporary person take one of
/// these, so exactly one side of the pair is ever set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registrant {
    Person(RecordId),
    TempPerson(RecordId),
}

impl Registrant {
    /// Splits into `(id_person, id_temp_person)`.
    pub fn into_reference_pair(self) -> (Option<RecordId>, Option<RecordId>) {
        match self {
            Self::Person(id) => (Some(id), None),
            Self::TempPerson(id) => (None, Some(id)),
        }
    }

    /// Rebuilds a registrant from stored fields; `None` unless exactly one
    /// side is set.
    pub fn from_reference_pair(
        person: Option<RecordId>,
        temp_person: Option<RecordId>,
    ) -> Option<Self> {
        match (person, temp_person) {
            (Some(id), None) => Some(Self::Person(id)),
            (None, Some(id)) => Some(Self::TempPerson(id)),
            _ => None,
        }
    }
}
