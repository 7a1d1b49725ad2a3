// lib/src/services/appointment_service.rs

use chrono::Utc;
use log::{debug, info};
use models::{
    Actor, Appointment, AppointmentFilter, AppointmentStatus, AppointmentUpdate, EntityId,
    NewAppointment, Role, ServiceError, ServiceResult,
};

use super::authorization::{authorize, authorize_appointment_fields, Operation};
use crate::storage_engine::Repositories;

#[derive(Clone)]
pub struct AppointmentService {
    repos: Repositories,
}

impl AppointmentService {
    pub fn new(repos: Repositories) -> Self {
        AppointmentService { repos }
    }

    /// Books an appointment for an existing patient. The acting receptionist is
    /// recorded as the booker and the status always starts as scheduled.
    pub async fn create(&self, actor: &Actor, input: NewAppointment) -> ServiceResult<Appointment> {
        authorize(actor, Operation::CreateAppointment)?;
        if self.repos.patients.find_by_id(input.patient_id).await?.is_none() {
            return Err(ServiceError::ReferenceNotFound("patient record not found".to_string()));
        }

        let appointment = Appointment::schedule(input, actor.staff_id, Utc::now())?;
        let saved = self.repos.appointments.create(appointment).await?;
        info!(
            "Appointment {} booked for patient {} by staff {}",
            saved.id, saved.patient_id, actor.staff_id
        );
        Ok(saved)
    }

    pub async fn get_all(&self, actor: &Actor, filter: &AppointmentFilter) -> ServiceResult<Vec<Appointment>> {
        authorize(actor, Operation::ReadAppointments)?;
        Ok(self.repos.appointments.find_all(filter).await?)
    }

    pub async fn get_by_id(&self, actor: &Actor, id: EntityId) -> ServiceResult<Appointment> {
        authorize(actor, Operation::ReadAppointments)?;
        self.find(id).await
    }

    /// Applies a sparse update guarded by the caller's expected revision.
    pub async fn update(&self, actor: &Actor, id: EntityId, update: AppointmentUpdate) -> ServiceResult<Appointment> {
        authorize(actor, Operation::UpdateAppointment)?;
        authorize_appointment_fields(actor, &update)?;

        let mut appointment = self.find(id).await?;
        if appointment.revision != update.revision {
            return Err(ServiceError::Conflict {
                entity: "appointment",
                id,
                expected: update.revision,
                actual: appointment.revision,
            });
        }
        if let Some(next) = update.status {
            check_transition(appointment.status, next)?;
        }
        if let Some(doctor_id) = update.doctor_id {
            self.require_doctor(doctor_id).await?;
        }

        update.apply_to(&mut appointment, actor.staff_id, Utc::now());
        let saved = self.repos.appointments.update(appointment).await?;
        debug!("Appointment {} updated by staff {} (revision {})", id, actor.staff_id, saved.revision);
        Ok(saved)
    }

    /// Deletes a non-completed appointment.
    pub async fn delete(&self, actor: &Actor, id: EntityId, expected_revision: u64) -> ServiceResult<()> {
        authorize(actor, Operation::DeleteAppointment)?;
        let appointment = self.find(id).await?;
        if appointment.status == AppointmentStatus::Completed {
            return Err(ServiceError::InvalidState(
                "can't delete a completed appointment having clinical note(s)".to_string(),
            ));
        }
        if appointment.revision != expected_revision {
            return Err(ServiceError::Conflict {
                entity: "appointment",
                id,
                expected: expected_revision,
                actual: appointment.revision,
            });
        }
        self.repos.appointments.delete(id, expected_revision).await?;
        info!("Appointment {} deleted by staff {}", id, actor.staff_id);
        Ok(())
    }

    async fn find(&self, id: EntityId) -> ServiceResult<Appointment> {
        self.repos
            .appointments
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("appointment not found".to_string()))
    }

    async fn require_doctor(&self, doctor_id: EntityId) -> ServiceResult<()> {
        match self.repos.staff.find_by_id(doctor_id).await? {
            Some(staff) if staff.role == Role::Doctor => Ok(()),
            Some(_) => Err(ServiceError::ReferenceNotFound(format!(
                "staff {} is not a doctor",
                doctor_id
            ))),
            None => Err(ServiceError::ReferenceNotFound("doctor record not found".to_string())),
        }
    }
}

fn check_transition(current: AppointmentStatus, next: AppointmentStatus) -> ServiceResult<()> {
    if next == AppointmentStatus::Completed && current != AppointmentStatus::Completed {
        return Err(ServiceError::InvalidState(
            "appointments are completed by recording a clinical note".to_string(),
        ));
    }
    if !current.can_transition_to(next) {
        return Err(ServiceError::InvalidState(format!(
            "appointment status can't change from {} to {}",
            current, next
        )));
    }
    Ok(())
}
