// lib/src/services/patient_service.rs

use chrono::{Datelike, Utc};
use log::{info, warn};
use models::{
    format_registration_number, Actor, EntityId, NewPatient, Patient, PatientFilter,
    PatientUpdate, ServiceError, ServiceResult,
};
use rand::Rng;

use super::authorization::{authorize, Operation};
use crate::errors::StorageError;
use crate::storage_engine::Repositories;

const REGISTRATION_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct PatientService {
    repos: Repositories,
}

impl PatientService {
    pub fn new(repos: Repositories) -> Self {
        PatientService { repos }
    }

    /// Registers a patient under a fresh `PAT-<year>-<nnnn>` number, retrying on collision.
    pub async fn create(&self, actor: &Actor, input: NewPatient) -> ServiceResult<Patient> {
        authorize(actor, Operation::CreatePatient)?;
        let now = Utc::now();
        let mut patient = Patient::register(input, String::new(), actor.staff_id, now)?;

        for attempt in 1..=REGISTRATION_ATTEMPTS {
            let sequence = rand::thread_rng().gen_range(0..10_000);
            patient.registration_number = format_registration_number(now.year(), sequence);
            match self.repos.patients.create(patient.clone()).await {
                Ok(saved) => {
                    info!(
                        "Patient {} registered as {} by staff {}",
                        saved.id, saved.registration_number, actor.staff_id
                    );
                    return Ok(saved);
                }
                Err(StorageError::UniqueViolation(_)) => {
                    warn!(
                        "Registration number {} taken (attempt {}/{})",
                        patient.registration_number, attempt, REGISTRATION_ATTEMPTS
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::Duplicate(
            "could not allocate a unique registration number".to_string(),
        ))
    }

    pub async fn get_all(&self, actor: &Actor, filter: &PatientFilter) -> ServiceResult<Vec<Patient>> {
        authorize(actor, Operation::ReadPatients)?;
        Ok(self.repos.patients.find_all(filter).await?)
    }

    pub async fn get_by_id(&self, actor: &Actor, id: EntityId) -> ServiceResult<Patient> {
        authorize(actor, Operation::ReadPatients)?;
        self.find(id).await
    }

    pub async fn get_by_registration_number(&self, actor: &Actor, registration_number: &str) -> ServiceResult<Patient> {
        authorize(actor, Operation::ReadPatients)?;
        self.repos
            .patients
            .find_by_registration_number(registration_number)
            .await?
            .ok_or_else(|| ServiceError::NotFound("patient not found".to_string()))
    }

    pub async fn update(&self, actor: &Actor, id: EntityId, update: PatientUpdate) -> ServiceResult<Patient> {
        authorize(actor, Operation::UpdatePatient)?;
        let mut patient = self.find(id).await?;
        update.apply_to(&mut patient, actor.staff_id, Utc::now())?;
        Ok(self.repos.patients.update(patient).await?)
    }

    pub async fn delete(&self, actor: &Actor, id: EntityId) -> ServiceResult<()> {
        authorize(actor, Operation::DeletePatient)?;
        self.find(id).await?;
        self.repos.patients.delete(id).await?;
        info!("Patient {} deleted by staff {}", id, actor.staff_id);
        Ok(())
    }

    async fn find(&self, id: EntityId) -> ServiceResult<Patient> {
        self.repos
            .patients
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("patient not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{fixture, new_patient};
    use crate::storage_engine::repository::{
        MockAppointmentRepository, MockClinicalNoteRepository, MockPatientRepository,
        MockStaffRepository,
    };
    use models::{BloodGroup, Gender, Role};
    use std::sync::Arc;

    #[tokio::test]
    async fn should_generate_registration_number() {
        let fx = fixture().await;
        let prefix = format!("PAT-{}-", Utc::now().year());
        assert!(fx.patient.registration_number.starts_with(&prefix));
        assert_eq!(fx.patient.registration_number.len(), prefix.len() + 4);
        assert_eq!(fx.patient.created_by, fx.receptionist.staff_id);

        let found = fx
            .services
            .patients
            .get_by_registration_number(&fx.doctor, &fx.patient.registration_number)
            .await
            .unwrap();
        assert_eq!(found, fx.patient);
    }

    #[tokio::test]
    async fn should_restrict_patient_writes_to_receptionists() {
        let fx = fixture().await;
        let err = fx
            .services
            .patients
            .create(&fx.doctor, new_patient())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = fx
            .services
            .patients
            .delete(&fx.admin, fx.patient.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn should_update_and_filter_patients() {
        let fx = fixture().await;
        let update = PatientUpdate {
            blood_group: Some(BloodGroup::OPositive),
            ..Default::default()
        };
        let updated = fx
            .services
            .patients
            .update(&fx.receptionist, fx.patient.id, update)
            .await
            .unwrap();
        assert_eq!(updated.blood_group, BloodGroup::OPositive);
        assert_eq!(updated.first_name, fx.patient.first_name);

        let males = PatientFilter { gender: Some(Gender::Male), ..Default::default() };
        assert!(fx
            .services
            .patients
            .get_all(&fx.doctor, &males)
            .await
            .unwrap()
            .is_empty());

        fx.services
            .patients
            .delete(&fx.receptionist, fx.patient.id)
            .await
            .unwrap();
        let err = fx
            .services
            .patients
            .get_by_id(&fx.doctor, fx.patient.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn should_give_up_after_repeated_collisions() {
        let mut patients = MockPatientRepository::new();
        patients
            .expect_create()
            .times(REGISTRATION_ATTEMPTS)
            .returning(|p| Err(StorageError::UniqueViolation(p.registration_number)));
        let repos = Repositories {
            staff: Arc::new(MockStaffRepository::new()),
            patients: Arc::new(patients),
            appointments: Arc::new(MockAppointmentRepository::new()),
            clinical_notes: Arc::new(MockClinicalNoteRepository::new()),
        };

        let err = PatientService::new(repos)
            .create(&Actor::new(2, Role::Receptionist), new_patient())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Duplicate(_)));
    }
}
