// lib/src/storage_engine/repository.rs
// Per-entity persistence contracts. Every storage engine implements all four
// against one backing store so multi-entity writes can share a transaction.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use models::{
    Appointment, AppointmentFilter, ClinicalNote, EntityId, Patient, PatientFilter, Staff,
};

use crate::errors::StorageResult;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait StaffRepository: Send + Sync + 'static {
    /// Inserts a new record, assigning its id. Email and employee id are unique.
    async fn create(&self, staff: Staff) -> StorageResult<Staff>;
    async fn find_by_id(&self, id: EntityId) -> StorageResult<Option<Staff>>;
    async fn find_all(&self) -> StorageResult<Vec<Staff>>;
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<Staff>>;
    async fn find_by_employee_id(&self, employee_id: &str) -> StorageResult<Option<Staff>>;
    /// Whole-record save.
    async fn update(&self, staff: Staff) -> StorageResult<Staff>;
    async fn delete(&self, id: EntityId) -> StorageResult<()>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PatientRepository: Send + Sync + 'static {
    /// Inserts a new record, assigning its id. Registration numbers are unique.
    async fn create(&self, patient: Patient) -> StorageResult<Patient>;
    async fn find_by_id(&self, id: EntityId) -> StorageResult<Option<Patient>>;
    async fn find_all(&self, filter: &PatientFilter) -> StorageResult<Vec<Patient>>;
    async fn find_by_registration_number(&self, registration_number: &str) -> StorageResult<Option<Patient>>;
    async fn update(&self, patient: Patient) -> StorageResult<Patient>;
    async fn delete(&self, id: EntityId) -> StorageResult<()>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait AppointmentRepository: Send + Sync + 'static {
    /// Inserts a new record with revision 1.
    async fn create(&self, appointment: Appointment) -> StorageResult<Appointment>;
    async fn find_by_id(&self, id: EntityId) -> StorageResult<Option<Appointment>>;
    async fn find_all(&self, filter: &AppointmentFilter) -> StorageResult<Vec<Appointment>>;
    /// Saves the record if the stored revision still equals `appointment.revision`,
    /// returning it with the revision bumped.
    async fn update(&self, appointment: Appointment) -> StorageResult<Appointment>;
    /// Removes the record if the stored revision still equals `expected_revision`.
    async fn delete(&self, id: EntityId, expected_revision: u64) -> StorageResult<()>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClinicalNoteRepository: Send + Sync + 'static {
    /// Inserts `note` and saves `appointment` in one atomic write.
    ///
    /// Fails without writing anything if a note already exists for the
    /// appointment or if the appointment's stored revision differs from
    /// `appointment.revision`.
    async fn create_with_completion(
        &self,
        note: ClinicalNote,
        appointment: Appointment,
    ) -> StorageResult<(ClinicalNote, Appointment)>;
    async fn find_by_id(&self, id: EntityId) -> StorageResult<Option<ClinicalNote>>;
    async fn find_by_appointment_id(&self, appointment_id: EntityId) -> StorageResult<Option<ClinicalNote>>;
    async fn find_by_patient_id(&self, patient_id: EntityId) -> StorageResult<Vec<ClinicalNote>>;
    /// Revision-checked save, as for appointments.
    async fn update(&self, note: ClinicalNote) -> StorageResult<ClinicalNote>;
    async fn delete(&self, id: EntityId, expected_revision: u64) -> StorageResult<()>;
}

/// The four repositories, usually backed by the same engine.
#[derive(Clone)]
pub struct Repositories {
    pub staff: Arc<dyn StaffRepository>,
    pub patients: Arc<dyn PatientRepository>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub clinical_notes: Arc<dyn ClinicalNoteRepository>,
}

impl Repositories {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: StaffRepository + PatientRepository + AppointmentRepository + ClinicalNoteRepository,
    {
        Repositories {
            staff: store.clone(),
            patients: store.clone(),
            appointments: store.clone(),
            clinical_notes: store,
        }
    }
}
