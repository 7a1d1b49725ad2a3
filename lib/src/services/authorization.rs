// lib/src/services/authorization.rs
// Role policy for every workflow operation. Ownership rules that depend on the
// record (note authorship, reading one's own staff record) live next to it.

use std::fmt;

use log::warn;
use models::{Actor, AppointmentUpdate, ClinicalNote, Role, ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAppointment,
    ReadAppointments,
    UpdateAppointment,
    DeleteAppointment,
    CreateClinicalNote,
    ReadClinicalNotes,
    UpdateClinicalNote,
    DeleteClinicalNote,
    ManageStaff,
    CreatePatient,
    ReadPatients,
    UpdatePatient,
    DeletePatient,
}

impl Operation {
    pub fn permitted_roles(&self) -> &'static [Role] {
        match self {
            Operation::CreateAppointment
            | Operation::DeleteAppointment
            | Operation::CreatePatient
            | Operation::UpdatePatient
            | Operation::DeletePatient => &[Role::Receptionist],
            Operation::ReadAppointments
            | Operation::UpdateAppointment
            | Operation::ReadClinicalNotes
            | Operation::ReadPatients => &[Role::Receptionist, Role::Doctor],
            Operation::CreateClinicalNote
            | Operation::UpdateClinicalNote
            | Operation::DeleteClinicalNote => &[Role::Doctor],
            Operation::ManageStaff => &[Role::Admin],
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Operation::CreateAppointment => "create appointments",
            Operation::ReadAppointments => "view appointments",
            Operation::UpdateAppointment => "update appointments",
            Operation::DeleteAppointment => "delete appointments",
            Operation::CreateClinicalNote => "create clinical notes",
            Operation::ReadClinicalNotes => "view clinical notes",
            Operation::UpdateClinicalNote => "update clinical notes",
            Operation::DeleteClinicalNote => "delete clinical notes",
            Operation::ManageStaff => "manage staff",
            Operation::CreatePatient => "register patients",
            Operation::ReadPatients => "view patients",
            Operation::UpdatePatient => "update patients",
            Operation::DeletePatient => "delete patients",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

pub fn has_permission(role: Role, operation: Operation) -> bool {
    operation.permitted_roles().contains(&role)
}

pub fn authorize(actor: &Actor, operation: Operation) -> ServiceResult<()> {
    if has_permission(actor.role, operation) {
        return Ok(());
    }
    warn!("Staff {} ({}) denied: {}", actor.staff_id, actor.role, operation);
    Err(ServiceError::Forbidden(format!(
        "{} role is not allowed to {}",
        actor.role, operation
    )))
}

/// Appointment fields each role may change.
pub fn appointment_fields_for(role: Role) -> &'static [&'static str] {
    match role {
        Role::Receptionist => &["department", "reason", "status"],
        Role::Doctor => &["doctorId", "reason", "status"],
        Role::Admin => &[],
    }
}

pub fn authorize_appointment_fields(actor: &Actor, update: &AppointmentUpdate) -> ServiceResult<()> {
    let allowed = appointment_fields_for(actor.role);
    let denied: Vec<&str> = update
        .touched_fields()
        .into_iter()
        .filter(|field| !allowed.contains(field))
        .collect();
    if denied.is_empty() {
        return Ok(());
    }
    Err(ServiceError::Forbidden(format!(
        "{} role may not change: {}",
        actor.role,
        denied.join(", ")
    )))
}

pub fn require_note_author(actor: &Actor, note: &ClinicalNote, message: &str) -> ServiceResult<()> {
    if note.is_authored_by(actor.staff_id) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(message.to_string()))
    }
}

/// Admins may read any staff record; everyone else only their own.
pub fn authorize_staff_read(actor: &Actor, staff_id: models::EntityId) -> ServiceResult<()> {
    if actor.is(Role::Admin) || actor.staff_id == staff_id {
        return Ok(());
    }
    authorize(actor, Operation::ManageStaff)
}
