// models/src/medical/appointment.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EntityId;
use crate::errors::{ValidationError, ValidationResult};

pub const DEFAULT_DURATION_MINUTES: u32 = 30;
pub const MIN_DURATION_MINUTES: u32 = 15;
pub const MAX_DURATION_MINUTES: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    General,
    Cardiology,
    Pediatrics,
    Orthopedics,
    Neurology,
    Dermatology,
    Psychiatry,
    Oncology,
    Gynecology,
    Endocrinology,
}

impl Department {
    pub const ALL: [Department; 10] = [
        Department::General,
        Department::Cardiology,
        Department::Pediatrics,
        Department::Orthopedics,
        Department::Neurology,
        Department::Dermatology,
        Department::Psychiatry,
        Department::Oncology,
        Department::Gynecology,
        Department::Endocrinology,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::General => "general",
            Department::Cardiology => "cardiology",
            Department::Pediatrics => "pediatrics",
            Department::Orthopedics => "orthopedics",
            Department::Neurology => "neurology",
            Department::Dermatology => "dermatology",
            Department::Psychiatry => "psychiatry",
            Department::Oncology => "oncology",
            Department::Gynecology => "gynecology",
            Department::Endocrinology => "endocrinology",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Department {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        Department::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == wanted)
            .ok_or_else(|| ValidationError::UnknownVariant { field: "department", value: s.to_string() })
    }
}

/// Lifecycle status of an appointment.
///
/// `Scheduled` is the only non-terminal state. `Completed` is reached solely by
/// documenting the encounter with a clinical note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Scheduled)
    }

    /// Whether a direct status update may move an appointment from `self` to `next`.
    /// Re-applying the current status is always accepted as a no-op.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (AppointmentStatus::Scheduled, AppointmentStatus::Cancelled)
                | (AppointmentStatus::Scheduled, AppointmentStatus::NoShow)
        )
    }

    /// Whether a clinical note may be written against an appointment in this state.
    pub fn accepts_clinical_note(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "no_show" => Ok(AppointmentStatus::NoShow),
            _ => Err(ValidationError::UnknownVariant { field: "status", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: EntityId,
    pub patient_id: EntityId,
    /// The receptionist who booked the appointment.
    pub receptionist_id: EntityId,
    pub doctor_id: Option<EntityId>,
    pub department: Department,
    pub scheduled_at: DateTime<Utc>,
    /// Minutes.
    pub duration: u32,
    pub status: AppointmentStatus,
    pub reason: String,
    pub updated_by: EntityId,
    /// Optimistic concurrency token, bumped by the store on every write.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booking request. There is deliberately no status field: new appointments
/// always start out scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub patient_id: EntityId,
    pub department: Department,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Appointment {
    /// Builds an unsaved appointment booked by `receptionist_id`. The store assigns
    /// `id` and `revision`.
    pub fn schedule(
        input: NewAppointment,
        receptionist_id: EntityId,
        now: DateTime<Utc>,
    ) -> ValidationResult<Self> {
        let scheduled_at = match input.scheduled_at {
            Some(at) if at <= now => return Err(ValidationError::ScheduledInPast),
            Some(at) => at,
            None => now,
        };

        let duration = input.duration.unwrap_or(DEFAULT_DURATION_MINUTES);
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration) {
            return Err(ValidationError::DurationOutOfRange {
                min: MIN_DURATION_MINUTES,
                max: MAX_DURATION_MINUTES,
                actual: duration,
            });
        }

        Ok(Appointment {
            id: 0,
            patient_id: input.patient_id,
            receptionist_id,
            doctor_id: None,
            department: input.department,
            scheduled_at,
            duration,
            status: AppointmentStatus::Scheduled,
            reason: input.reason.unwrap_or_default(),
            updated_by: receptionist_id,
            revision: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Sparse update. Only fields that are present are applied; `revision` must match
/// the stored revision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentUpdate {
    pub revision: u64,
    #[serde(default)]
    pub doctor_id: Option<EntityId>,
    #[serde(default)]
    pub department: Option<Department>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl AppointmentUpdate {
    /// Names of the fields this update touches.
    pub fn touched_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.doctor_id.is_some() {
            fields.push("doctorId");
        }
        if self.department.is_some() {
            fields.push("department");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.reason.is_some() {
            fields.push("reason");
        }
        fields
    }

    /// Writes the present fields onto `appointment` and stamps `updated_by`.
    pub fn apply_to(&self, appointment: &mut Appointment, updated_by: EntityId, now: DateTime<Utc>) {
        if let Some(doctor_id) = self.doctor_id {
            appointment.doctor_id = Some(doctor_id);
        }
        if let Some(department) = self.department {
            appointment.department = department;
        }
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(ref reason) = self.reason {
            appointment.reason = reason.clone();
        }
        appointment.updated_by = updated_by;
        appointment.updated_at = now;
    }
}

/// Equality predicates for listing appointments; absent fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentFilter {
    pub patient_id: Option<EntityId>,
    pub doctor_id: Option<EntityId>,
    pub department: Option<Department>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.doctor_id.map_or(true, |id| appointment.doctor_id == Some(id))
            && self.department.map_or(true, |d| appointment.department == d)
            && self.status.map_or(true, |s| appointment.status == s)
    }
}
