// lib/src/services/clinical_note_service.rs
// A clinical note documents one appointment. Recording it is what completes
// the appointment, and both writes land in the same storage transaction.

use chrono::Utc;
use log::{debug, info};
use models::{
    Actor, AppointmentStatus, ClinicalNote, ClinicalNoteUpdate, EntityId, NewClinicalNote,
    ServiceError, ServiceResult,
};

use super::authorization::{authorize, require_note_author, Operation};
use crate::storage_engine::Repositories;

#[derive(Clone)]
pub struct ClinicalNoteService {
    repos: Repositories,
}

impl ClinicalNoteService {
    pub fn new(repos: Repositories) -> Self {
        ClinicalNoteService { repos }
    }

    pub async fn create(&self, actor: &Actor, input: NewClinicalNote) -> ServiceResult<ClinicalNote> {
        authorize(actor, Operation::CreateClinicalNote)?;
        let appointment = self
            .repos
            .appointments
            .find_by_id(input.appointment_id)
            .await?
            .ok_or_else(|| {
                ServiceError::ReferenceNotFound("associated appointment record not found".to_string())
            })?;
        if !appointment.status.accepts_clinical_note() {
            return Err(ServiceError::InvalidState(format!(
                "can't document a {} appointment",
                appointment.status
            )));
        }

        let now = Utc::now();
        let note = ClinicalNote::document(input, &appointment, actor.staff_id, now);
        let mut completed = appointment;
        completed.status = AppointmentStatus::Completed;
        completed.updated_by = actor.staff_id;
        completed.updated_at = now;

        let (note, completed) = self
            .repos
            .clinical_notes
            .create_with_completion(note, completed)
            .await?;
        info!(
            "Clinical note {} recorded by doctor {}; appointment {} completed",
            note.id, actor.staff_id, completed.id
        );
        Ok(note)
    }

    pub async fn get_by_id(&self, actor: &Actor, id: EntityId) -> ServiceResult<ClinicalNote> {
        authorize(actor, Operation::ReadClinicalNotes)?;
        self.find(id).await
    }

    pub async fn get_by_appointment_id(&self, actor: &Actor, appointment_id: EntityId) -> ServiceResult<ClinicalNote> {
        authorize(actor, Operation::ReadClinicalNotes)?;
        self.repos
            .clinical_notes
            .find_by_appointment_id(appointment_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("clinical note not found".to_string()))
    }

    pub async fn get_by_patient_id(&self, actor: &Actor, patient_id: EntityId) -> ServiceResult<Vec<ClinicalNote>> {
        authorize(actor, Operation::ReadClinicalNotes)?;
        if self.repos.patients.find_by_id(patient_id).await?.is_none() {
            return Err(ServiceError::ReferenceNotFound("patient record not found".to_string()));
        }
        Ok(self.repos.clinical_notes.find_by_patient_id(patient_id).await?)
    }

    /// Only the authoring doctor may edit, and only the five text fields.
    /// Only the authoring doctor may edit, and only the five text fields.
    pub async fn update(&self, actor: &Actor, id: EntityId, update: ClinicalNoteUpdate) -> ServiceResult<ClinicalNote> {
        authorize(actor, Operation::UpdateClinicalNote)?;
        let mut note = self.find(id).await?;
        require_note_author(
            actor,
            &note,
            "only the doctor who created the clinical note can make changes",
        )?;
        if note.revision != update.revision {
            return Err(ServiceError::Conflict {
                entity: "clinical note",
                id,
                expected: update.revision,
                actual: note.revision,
            });
        }

        update.apply_to(&mut note, Utc::now());
        let saved = self.repos.clinical_notes.update(note).await?;
        debug!("Clinical note {} updated (revision {})", id, saved.revision);
        Ok(saved)
    }

    /// The parent appointment stays completed.
    pub async fn delete(&self, actor: &Actor, id: EntityId, expected_revision: u64) -> ServiceResult<()> {
        authorize(actor, Operation::DeleteClinicalNote)?;
        let note = self.find(id).await?;
        require_note_author(actor, &note, "only the doctor who created the clinical note can delete it")?;
        if note.revision != expected_revision {
            return Err(ServiceError::Conflict {
                entity: "clinical note",
                id,
                expected: expected_revision,
                actual: note.revision,
            });
        }
        self.repos.clinical_notes.delete(id, expected_revision).await?;
        info!("Clinical note {} deleted by doctor {}", id, actor.staff_id);
        Ok(())
    }

    async fn find(&self, id: EntityId) -> ServiceResult<ClinicalNote> {
        self.repos
            .clinical_notes
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("clinical note not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StorageError;
    use crate::services::test_support::{fixture, Fixture};
    use crate::storage_engine::repository::{
        MockAppointmentRepository, MockClinicalNoteRepository, MockPatientRepository,
        MockStaffRepository,
    };
    use crate::storage_engine::Repositories;
    use models::{Appointment, AppointmentUpdate, Department, NewAppointment, Role};
    use std::sync::Arc;

    async fn book(fx: &Fixture) -> Appointment {
        let input = NewAppointment {
            patient_id: fx.patient.id,
            department: Department::General,
            scheduled_at: None,
            duration: None,
            reason: Some("headache".to_string()),
        };
        fx.services
            .appointments
            .create(&fx.receptionist, input)
            .await
            .unwrap()
    }

    fn note_input(appointment_id: EntityId) -> NewClinicalNote {
        NewClinicalNote {
            appointment_id,
            presenting_complaints: "Recurring headache".to_string(),
            past_medical_history: "None".to_string(),
            clinical_diagnosis: "Tension headache".to_string(),
            treatment_plan: "Analgesics".to_string(),
            recommendation: "Reduce screen time".to_string(),
        }
    }

    #[tokio::test]
    async fn should_document_and_complete_appointment() {
        let fx = fixture().await;
        let appointment = book(&fx).await;
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);

        let note = fx
            .services
            .clinical_notes
            .create(&fx.doctor, note_input(appointment.id))
            .await
            .unwrap();
        assert_eq!(note.doctor_id, fx.doctor.staff_id);
        assert_eq!(note.patient_id, fx.patient.id);
        assert_eq!(note.revision, 1);

        let completed = fx
            .services
            .appointments
            .get_by_id(&fx.receptionist, appointment.id)
            .await
            .unwrap();
        assert_eq!(completed.status, AppointmentStatus::Completed);
        assert_eq!(completed.updated_by, fx.doctor.staff_id);

        let update = ClinicalNoteUpdate {
            revision: note.revision,
            treatment_plan: Some("Something else".to_string()),
            ..Default::default()
        };
        let err = fx
            .services
            .clinical_notes
            .update(&fx.other_doctor, note.id, update)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::Forbidden(
                "only the doctor who created the clinical note can make changes".to_string()
            )
        );
    }

    #[tokio::test]
    async fn should_reject_note_for_missing_appointment() {
        let fx = fixture().await;
        let err = fx
            .services
            .clinical_notes
            .create(&fx.doctor, note_input(31_337))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::ReferenceNotFound("associated appointment record not found".to_string())
        );
    }

    #[tokio::test]
    async fn should_keep_first_note_on_duplicate() {
        let fx = fixture().await;
        let appointment = book(&fx).await;
        let first = fx
            .services
            .clinical_notes
            .create(&fx.doctor, note_input(appointment.id))
            .await
            .unwrap();

        let mut second = note_input(appointment.id);
        second.clinical_diagnosis = "Migraine".to_string();
        let err = fx
            .services
            .clinical_notes
            .create(&fx.other_doctor, second)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Duplicate(_)));

        let stored = fx
            .services
            .clinical_notes
            .get_by_appointment_id(&fx.doctor, appointment.id)
            .await
            .unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn should_refuse_notes_for_cancelled_appointments() {
        let fx = fixture().await;
        let appointment = book(&fx).await;
        let cancel = AppointmentUpdate {
            revision: appointment.revision,
            status: Some(AppointmentStatus::Cancelled),
            ..Default::default()
        };
        fx.services
            .appointments
            .update(&fx.receptionist, appointment.id, cancel)
            .await
            .unwrap();

        let err = fx
            .services
            .clinical_notes
            .create(&fx.doctor, note_input(appointment.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert!(fx
            .repos
            .clinical_notes
            .find_by_appointment_id(appointment.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn should_only_let_doctors_write_notes() {
        let fx = fixture().await;
        let appointment = book(&fx).await;
        let err = fx
            .services
            .clinical_notes
            .create(&fx.receptionist, note_input(appointment.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn should_update_text_fields_for_author() {
        let fx = fixture().await;
        let appointment = book(&fx).await;
        let note = fx
            .services
            .clinical_notes
            .create(&fx.doctor, note_input(appointment.id))
            .await
            .unwrap();

        let update = ClinicalNoteUpdate {
            revision: note.revision,
            recommendation: Some("Return in a month".to_string()),
            ..Default::default()
        };
        let updated = fx
            .services
            .clinical_notes
            .update(&fx.doctor, note.id, update.clone())
            .await
            .unwrap();
        assert_eq!(updated.recommendation, "Return in a month");
        assert_eq!(updated.clinical_diagnosis, note.clinical_diagnosis);
        assert_eq!(updated.revision, 2);

        let err = fx
            .services
            .clinical_notes
            .update(&fx.doctor, note.id, update)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { expected: 1, actual: 2, .. }));
    }

    #[tokio::test]
    async fn should_keep_appointment_completed_after_note_deletion() {
        let fx = fixture().await;
        let appointment = book(&fx).await;
        let note = fx
            .services
            .clinical_notes
            .create(&fx.doctor, note_input(appointment.id))
            .await
            .unwrap();

        let err = fx
            .services
            .clinical_notes
            .delete(&fx.other_doctor, note.id, note.revision)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::Forbidden("only the doctor who created the clinical note can delete it".to_string())
        );

        fx.services
            .clinical_notes
            .delete(&fx.doctor, note.id, note.revision)
            .await
            .unwrap();
        let err = fx
            .services
            .clinical_notes
            .get_by_id(&fx.doctor, note.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let still_completed = fx
            .services
            .appointments
            .get_by_id(&fx.doctor, appointment.id)
            .await
            .unwrap();
        assert_eq!(still_completed.status, AppointmentStatus::Completed);

        // A completed appointment whose note was removed can be documented again.
        fx.services
            .clinical_notes
            .create(&fx.doctor, note_input(appointment.id))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn should_report_missing_notes() {
        let fx = fixture().await;
        let not_found = ServiceError::NotFound("clinical note not found".to_string());

        let update = ClinicalNoteUpdate {
            revision: 1,
            recommendation: Some("Rest".to_string()),
            ..Default::default()
        };
        let err = fx
            .services
            .clinical_notes
            .update(&fx.doctor, 9_999, update)
            .await
            .unwrap_err();
        assert_eq!(err, not_found);

        let err = fx
            .services
            .clinical_notes
            .delete(&fx.doctor, 9_999, 1)
            .await
            .unwrap_err();
        assert_eq!(err, not_found);

        let undocumented = book(&fx).await;
        let err = fx
            .services
            .clinical_notes
            .get_by_appointment_id(&fx.receptionist, undocumented.id)
            .await
            .unwrap_err();
        assert_eq!(err, not_found);
    }

    #[tokio::test]
    async fn should_refuse_note_changes_from_anyone_but_the_author() {
        let fx = fixture().await;
        let appointment = book(&fx).await;
        let note = fx
            .services
            .clinical_notes
            .create(&fx.doctor, note_input(appointment.id))
            .await
            .unwrap();

        for actor in [fx.admin, fx.receptionist, fx.other_doctor] {
            let update = ClinicalNoteUpdate {
                revision: note.revision,
                clinical_diagnosis: Some("Migraine".to_string()),
                ..Default::default()
            };
            let err = fx
                .services
                .clinical_notes
                .update(&actor, note.id, update)
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden(_)), "{} updated a note", actor.role);

            let err = fx
                .services
                .clinical_notes
                .delete(&actor, note.id, note.revision)
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden(_)), "{} deleted a note", actor.role);
        }

        let stored = fx.repos.clinical_notes.find_by_id(note.id).await.unwrap().unwrap();
        assert_eq!(stored, note);
    }

    #[tokio::test]
    async fn should_list_notes_for_known_patients_only() {
        let fx = fixture().await;
        let appointment = book(&fx).await;
        let note = fx
            .services
            .clinical_notes
            .create(&fx.doctor, note_input(appointment.id))
            .await
            .unwrap();

        let notes = fx
            .services
            .clinical_notes
            .get_by_patient_id(&fx.receptionist, fx.patient.id)
            .await
            .unwrap();
        assert_eq!(notes, vec![note]);

        let err = fx
            .services
            .clinical_notes
            .get_by_patient_id(&fx.doctor, 8_888)
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::ReferenceNotFound("patient record not found".to_string()));
    }

    #[tokio::test]
    async fn should_not_complete_appointment_when_note_write_fails() {
        let appointment = Appointment::schedule(
            NewAppointment {
                patient_id: 1,
                department: Department::General,
                scheduled_at: None,
                duration: None,
                reason: None,
            },
            2,
            Utc::now(),
        )
        .unwrap();
        let mut stored = appointment.clone();
        stored.id = 10;
        stored.revision = 1;

        let mut appointments = MockAppointmentRepository::new();
        let found = stored.clone();
        appointments
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        appointments.expect_update().never();

        let mut notes = MockClinicalNoteRepository::new();
        notes
            .expect_create_with_completion()
            .withf(|note, appointment| {
                note.patient_id == 1 && appointment.status == AppointmentStatus::Completed
            })
            .returning(|_, _| Err(StorageError::DatabaseError("io error".to_string())));

        let repos = Repositories {
            staff: Arc::new(MockStaffRepository::new()),
            patients: Arc::new(MockPatientRepository::new()),
            appointments: Arc::new(appointments),
            clinical_notes: Arc::new(notes),
        };
        let service = ClinicalNoteService::new(repos);
        let err = service
            .create(&Actor::new(5, Role::Doctor), note_input(10))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "persistence_failure");
    }
}
