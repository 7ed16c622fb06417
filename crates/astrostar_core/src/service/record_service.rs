//! Typed record service.
//!
//! # Responsibility
//! - Provide typed CRUD entry points over any catalog collection.
//! - Provide registration helpers for the bridge collections.
//! - Provide shift helpers for employee schedules.
//!
//! # Invariants
//! - Service APIs never bypass repository validation.
//! - Helpers that take a `Registrant` set exactly one of
//!   `id_person`/`id_temp_person`.

use crate::model::{RecordId, Registrant, RegistrationStatus, ScheduleStatus, Timestamp};
use crate::repo::document_repo::{DocumentRepository, ListQuery, RepoError, RepoResult};
use crate::schema::catalog::{EmployeeSchedule, ServiceRegistration, TeamMember, TeamRegistration};
use crate::schema::Collection;

/// Use-case service wrapper over a document repository.
pub struct RecordService<R: DocumentRepository> {
    repo: R,
}

impl<R: DocumentRepository> RecordService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Stores a typed record and returns its new id.
    pub fn create<T: Collection>(&self, record: &T) -> RepoResult<RecordId> {
        self.repo.insert(T::SCHEMA.name, &record.to_document())
    }

    pub fn get<T: Collection>(&self, id: RecordId) -> RepoResult<Option<T>> {
        let Some(stored) = self.repo.get(T::SCHEMA.name, id)? else {
            return Ok(None);
        };
        Ok(Some(stored.decode::<T>()?))
    }

    /// Lists typed records with their ids, in insertion order.
    pub fn list<T: Collection>(&self, query: &ListQuery) -> RepoResult<Vec<(RecordId, T)>> {
        self.repo
            .list(T::SCHEMA.name, query)?
            .into_iter()
            .map(|stored| -> RepoResult<(RecordId, T)> {
                Ok((stored.id, stored.decode::<T>()?))
            })
            .collect()
    }

    /// Replaces every field of an existing record.
    pub fn replace<T: Collection>(&self, id: RecordId, record: &T) -> RepoResult<()> {
        self.repo.replace(T::SCHEMA.name, id, &record.to_document())
    }

    pub fn delete<T: Collection>(&self, id: RecordId) -> RepoResult<()> {
        self.repo.delete(T::SCHEMA.name, id)
    }

    /// Registers a person or temporary person for a service as `pending`.
    pub fn register_for_service(
        &self,
        service: RecordId,
        registrant: Registrant,
        date: Timestamp,
    ) -> RepoResult<RecordId> {
        let (id_person, id_temp_person) = registrant.into_reference_pair();
        self.create(&ServiceRegistration {
            id_person,
            id_temp_person,
            id_service: Some(service),
            registration_date: Some(date),
            registration_status: Some(RegistrationStatus::Pending.as_str().to_string()),
        })
    }

    /// Moves a service registration to `status`.
    ///
    /// # Errors
    /// - `NotFound` when no registration has this id.
    pub fn set_registration_status(
        &self,
        registration: RecordId,
        status: RegistrationStatus,
    ) -> RepoResult<()> {
        let mut record = self
            .get::<ServiceRegistration>(registration)?
            .ok_or(RepoError::NotFound {
                collection: ServiceRegistration::SCHEMA.name,
                id: registration,
            })?;
        record.registration_status = Some(status.as_str().to_string());
        self.replace(registration, &record)
    }

    pub fn registrations_for_service(
        &self,
        service: RecordId,
    ) -> RepoResult<Vec<(RecordId, ServiceRegistration)>> {
        self.list(&ListQuery::new().filter("id_service", service))
    }

    /// Adds a person or temporary person to a team.
    pub fn add_team_member(
        &self,
        team: RecordId,
        registrant: Registrant,
        role_in_team: impl Into<String>,
    ) -> RepoResult<RecordId> {
        let (id_person, id_temp_person) = registrant.into_reference_pair();
        self.create(&TeamMember {
            id_team: Some(team),
            id_person,
            id_temp_person,
            role_in_team: Some(role_in_team.into()),
        })
    }

    pub fn team_roster(&self, team: RecordId) -> RepoResult<Vec<(RecordId, TeamMember)>> {
        self.list(&ListQuery::new().filter("id_team", team))
    }

    /// Registers a team for a service as `pending`.
    pub fn register_team(
        &self,
        team: RecordId,
        service: RecordId,
        date: Timestamp,
    ) -> RepoResult<RecordId> {
        self.create(&TeamRegistration {
            id_team: Some(team),
            id_service: Some(service),
            registration_date: Some(date),
            registration_status: Some(RegistrationStatus::Pending.as_str().to_string()),
        })
    }

    /// Books an employee shift as `scheduled`.
    pub fn schedule_shift(
        &self,
        employee: RecordId,
        date: Timestamp,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> RepoResult<RecordId> {
        self.create(&EmployeeSchedule {
            id_employee: Some(employee),
            schedule_date: Some(date),
            start_time: Some(start_time.into()),
            end_time: Some(end_time.into()),
            status: Some(ScheduleStatus::Scheduled.as_str().to_string()),
            ..EmployeeSchedule::default()
        })
    }

    /// Moves a shift to `status`. `reason` is kept only for cancellations.
    ///
    /// # Errors
    /// - `NotFound` when no shift has this id.
    pub fn set_shift_status(
        &self,
        shift: RecordId,
        status: ScheduleStatus,
        reason: Option<&str>,
    ) -> RepoResult<()> {
        let mut record = self
            .get::<EmployeeSchedule>(shift)?
            .ok_or(RepoError::NotFound {
                collection: EmployeeSchedule::SCHEMA.name,
                id: shift,
            })?;
        record.status = Some(status.as_str().to_string());
        record.cancellation_reason = match status {
            ScheduleStatus::Cancelled => reason.map(str::to_string),
            ScheduleStatus::Scheduled | ScheduleStatus::Completed => None,
        };
        self.replace(shift, &record)
    }
}
