// lib/src/storage_engine/inmemory_storage.rs
// All tables sit behind one lock so a clinical note and its appointment can be
// written under the same guard.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use models::{
    Appointment, AppointmentFilter, ClinicalNote, EntityId, Patient, PatientFilter, Staff,
};
use tokio::sync::RwLock;

use super::repository::{
    AppointmentRepository, ClinicalNoteRepository, PatientRepository, StaffRepository,
};
use crate::errors::{StorageError, StorageResult};

#[derive(Debug, Default)]
struct Tables {
    staff: BTreeMap<EntityId, Staff>,
    patients: BTreeMap<EntityId, Patient>,
    appointments: BTreeMap<EntityId, Appointment>,
    clinical_notes: BTreeMap<EntityId, ClinicalNote>,
    next_id: EntityId,
}

impl Tables {
    fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }

    fn check_staff_unique(&self, staff: &Staff) -> StorageResult<()> {
        for existing in self.staff.values().filter(|s| s.id != staff.id) {
            if existing.email == staff.email {
                return Err(StorageError::UniqueViolation(format!(
                    "staff with email {} already exists",
                    staff.email
                )));
            }
            if existing.employee_id == staff.employee_id {
                return Err(StorageError::UniqueViolation(format!(
                    "staff with employee id {} already exists",
                    staff.employee_id
                )));
            }
        }
        Ok(())
    }

    fn check_appointment_revision(&self, appointment: &Appointment) -> StorageResult<()> {
        let stored = self
            .appointments
            .get(&appointment.id)
            .ok_or(StorageError::Missing { entity: "appointment", id: appointment.id })?;
        check_revision("appointment", appointment.id, appointment.revision, stored.revision)
    }
}

fn check_revision(entity: &'static str, id: EntityId, expected: u64, actual: u64) -> StorageResult<()> {
    if expected != actual {
        return Err(StorageError::RevisionMismatch { entity, id, expected, actual });
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage::default()
    }
}

#[async_trait]
impl StaffRepository for InMemoryStorage {
    async fn create(&self, mut staff: Staff) -> StorageResult<Staff> {
        let mut tables = self.tables.write().await;
        tables.check_staff_unique(&staff)?;
        staff.id = tables.allocate_id();
        tables.staff.insert(staff.id, staff.clone());
        debug!("Stored staff {} in memory", staff.id);
        Ok(staff)
    }

    async fn find_by_id(&self, id: EntityId) -> StorageResult<Option<Staff>> {
        Ok(self.tables.read().await.staff.get(&id).cloned())
    }

    async fn find_all(&self) -> StorageResult<Vec<Staff>> {
        Ok(self.tables.read().await.staff.values().cloned().collect())
    }

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<Staff>> {
        let tables = self.tables.read().await;
        Ok(tables.staff.values().find(|s| s.email == email).cloned())
    }

    async fn find_by_employee_id(&self, employee_id: &str) -> StorageResult<Option<Staff>> {
        let tables = self.tables.read().await;
        Ok(tables.staff.values().find(|s| s.employee_id == employee_id).cloned())
    }

    async fn update(&self, staff: Staff) -> StorageResult<Staff> {
        let mut tables = self.tables.write().await;
        if !tables.staff.contains_key(&staff.id) {
            return Err(StorageError::Missing { entity: "staff", id: staff.id });
        }
        tables.check_staff_unique(&staff)?;
        tables.staff.insert(staff.id, staff.clone());
        Ok(staff)
    }

    async fn delete(&self, id: EntityId) -> StorageResult<()> {
        self.tables
            .write()
            .await
            .staff
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::Missing { entity: "staff", id })
    }
}

#[async_trait]
impl PatientRepository for InMemoryStorage {
    async fn create(&self, mut patient: Patient) -> StorageResult<Patient> {
        let mut tables = self.tables.write().await;
        if tables
            .patients
            .values()
            .any(|p| p.registration_number == patient.registration_number)
        {
            return Err(StorageError::UniqueViolation(format!(
                "registration number {} already exists",
                patient.registration_number
            )));
        }
        patient.id = tables.allocate_id();
        tables.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn find_by_id(&self, id: EntityId) -> StorageResult<Option<Patient>> {
        Ok(self.tables.read().await.patients.get(&id).cloned())
    }

    async fn find_all(&self, filter: &PatientFilter) -> StorageResult<Vec<Patient>> {
        let tables = self.tables.read().await;
        Ok(tables.patients.values().filter(|p| filter.matches(p)).cloned().collect())
    }

    async fn find_by_registration_number(&self, registration_number: &str) -> StorageResult<Option<Patient>> {
        let tables = self.tables.read().await;
        Ok(tables
            .patients
            .values()
            .find(|p| p.registration_number == registration_number)
            .cloned())
    }

    async fn update(&self, patient: Patient) -> StorageResult<Patient> {
        let mut tables = self.tables.write().await;
        match tables.patients.get_mut(&patient.id) {
            Some(slot) => {
                *slot = patient.clone();
                Ok(patient)
            }
            None => Err(StorageError::Missing { entity: "patient", id: patient.id }),
        }
    }

    async fn delete(&self, id: EntityId) -> StorageResult<()> {
        self.tables
            .write()
            .await
            .patients
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::Missing { entity: "patient", id })
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryStorage {
    async fn create(&self, mut appointment: Appointment) -> StorageResult<Appointment> {
        let mut tables = self.tables.write().await;
        appointment.id = tables.allocate_id();
        appointment.revision = 1;
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn find_by_id(&self, id: EntityId) -> StorageResult<Option<Appointment>> {
        Ok(self.tables.read().await.appointments.get(&id).cloned())
    }

    async fn find_all(&self, filter: &AppointmentFilter) -> StorageResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        Ok(tables.appointments.values().filter(|a| filter.matches(a)).cloned().collect())
    }

    async fn update(&self, mut appointment: Appointment) -> StorageResult<Appointment> {
        let mut tables = self.tables.write().await;
        tables.check_appointment_revision(&appointment)?;
        appointment.revision += 1;
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn delete(&self, id: EntityId, expected_revision: u64) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .appointments
            .get(&id)
            .ok_or(StorageError::Missing { entity: "appointment", id })?;
        check_revision("appointment", id, expected_revision, stored.revision)?;
        tables.appointments.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ClinicalNoteRepository for InMemoryStorage {
    async fn create_with_completion(
        &self,
        mut note: ClinicalNote,
        mut appointment: Appointment,
    ) -> StorageResult<(ClinicalNote, Appointment)> {
        let mut tables = self.tables.write().await;
        tables.check_appointment_revision(&appointment)?;
        if tables
            .clinical_notes
            .values()
            .any(|n| n.appointment_id == note.appointment_id)
        {
            return Err(StorageError::UniqueViolation(format!(
                "a clinical note already exists for appointment {}",
                note.appointment_id
            )));
        }

        note.id = tables.allocate_id();
        note.revision = 1;
        appointment.revision += 1;
        tables.clinical_notes.insert(note.id, note.clone());
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok((note, appointment))
    }

    async fn find_by_id(&self, id: EntityId) -> StorageResult<Option<ClinicalNote>> {
        Ok(self.tables.read().await.clinical_notes.get(&id).cloned())
    }

    async fn find_by_appointment_id(&self, appointment_id: EntityId) -> StorageResult<Option<ClinicalNote>> {
        let tables = self.tables.read().await;
        Ok(tables
            .clinical_notes
            .values()
            .find(|n| n.appointment_id == appointment_id)
            .cloned())
    }

    async fn find_by_patient_id(&self, patient_id: EntityId) -> StorageResult<Vec<ClinicalNote>> {
        let tables = self.tables.read().await;
        Ok(tables
            .clinical_notes
            .values()
            .filter(|n| n.patient_id == patient_id)
            .cloned()
            .collect())
    }

    async fn update(&self, mut note: ClinicalNote) -> StorageResult<ClinicalNote> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .clinical_notes
            .get(&note.id)
            .ok_or(StorageError::Missing { entity: "clinical note", id: note.id })?;
        check_revision("clinical note", note.id, note.revision, stored.revision)?;
        note.revision += 1;
        tables.clinical_notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn delete(&self, id: EntityId, expected_revision: u64) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .clinical_notes
            .get(&id)
            .ok_or(StorageError::Missing { entity: "clinical note", id })?;
        check_revision("clinical note", id, expected_revision, stored.revision)?;
        tables.clinical_notes.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use models::{AppointmentStatus, Department, NewAppointment, NewClinicalNote};

    async fn booked(store: &InMemoryStorage) -> Appointment {
        let input = NewAppointment {
            patient_id: 1,
            department: Department::General,
            scheduled_at: None,
            duration: None,
            reason: None,
        };
        let appointment = Appointment::schedule(input, 2, Utc::now()).unwrap();
        AppointmentRepository::create(store, appointment).await.unwrap()
    }

    fn note_for(appointment: &Appointment) -> ClinicalNote {
        let input = NewClinicalNote {
            appointment_id: appointment.id,
            presenting_complaints: "Cough".into(),
            treatment_plan: "Fluids".into(),
            recommendation: "Review in a week".into(),
            ..Default::default()
        };
        ClinicalNote::document(input, appointment, 5, Utc::now())
    }

    #[tokio::test]
    async fn should_assign_ids_and_initial_revision() {
        let store = InMemoryStorage::new();
        let first = booked(&store).await;
        let second = booked(&store).await;
        assert_eq!(first.revision, 1);
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn should_reject_stale_appointment_revision() {
        let store = InMemoryStorage::new();
        let appointment = booked(&store).await;

        let mut fresh = appointment.clone();
        fresh.reason = "updated".into();
        let saved = AppointmentRepository::update(&store, fresh).await.unwrap();
        assert_eq!(saved.revision, 2);

        let err = AppointmentRepository::update(&store, appointment).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::RevisionMismatch { expected: 1, actual: 2, .. }
        ));
    }

    #[tokio::test]
    async fn should_write_note_and_appointment_together() {
        let store = InMemoryStorage::new();
        let appointment = booked(&store).await;
        let mut completed = appointment.clone();
        completed.status = AppointmentStatus::Completed;

        let (note, saved) = store
            .create_with_completion(note_for(&appointment), completed.clone())
            .await
            .unwrap();
        assert_eq!(note.revision, 1);
        assert_eq!(saved.revision, 2);

        // A second note is rejected and leaves the first one intact.
        let err = store
            .create_with_completion(note_for(&appointment), saved.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UniqueViolation(_)));
        let stored = store.find_by_appointment_id(appointment.id).await.unwrap().unwrap();
        assert_eq!(stored, note);
        let stored_appointment = AppointmentRepository::find_by_id(&store, appointment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored_appointment.revision, 2);
    }

    #[tokio::test]
    async fn should_not_write_note_when_appointment_changed() {
        let store = InMemoryStorage::new();
        let appointment = booked(&store).await;
        let mut concurrent = appointment.clone();
        concurrent.status = AppointmentStatus::Cancelled;
        AppointmentRepository::update(&store, concurrent).await.unwrap();

        let mut completed = appointment.clone();
        completed.status = AppointmentStatus::Completed;
        let err = store
            .create_with_completion(note_for(&appointment), completed)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::RevisionMismatch { .. }));
        assert!(store.find_by_appointment_id(appointment.id).await.unwrap().is_none());
    }
}
