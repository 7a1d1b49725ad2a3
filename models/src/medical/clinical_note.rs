// models/src/medical/clinical_note.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EntityId;
use crate::medical::Appointment;

/// Doctor-authored documentation of an encounter. At most one per appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalNote {
    pub id: EntityId,
    pub appointment_id: EntityId,
    /// Always copied from the referenced appointment.
    pub patient_id: EntityId,
    /// The authoring doctor; the only staff member allowed to change the note.
    pub doctor_id: EntityId,
    pub presenting_complaints: String,
    pub past_medical_history: String,
    pub clinical_diagnosis: String,
    pub treatment_plan: String,
    pub recommendation: String,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClinicalNote {
    pub appointment_id: EntityId,
    pub presenting_complaints: String,
    #[serde(default)]
    pub past_medical_history: String,
    #[serde(default)]
    pub clinical_diagnosis: String,
    pub treatment_plan: String,
    pub recommendation: String,
}

impl ClinicalNote {
    /// Builds an unsaved note for `appointment`, authored by `doctor_id`.
    /// The patient comes from the appointment, never from the caller.
    pub fn document(
        input: NewClinicalNote,
        appointment: &Appointment,
        doctor_id: EntityId,
        now: DateTime<Utc>,
    ) -> Self {
        ClinicalNote {
            id: 0,
            appointment_id: appointment.id,
            patient_id: appointment.patient_id,
            doctor_id,
            presenting_complaints: input.presenting_complaints,
            past_medical_history: input.past_medical_history,
            clinical_diagnosis: input.clinical_diagnosis,
            treatment_plan: input.treatment_plan,
            recommendation: input.recommendation,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_authored_by(&self, staff_id: EntityId) -> bool {
        self.doctor_id == staff_id
    }
}

/// Sparse update over the five clinical text fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalNoteUpdate {
    pub revision: u64,
    #[serde(default)]
    pub presenting_complaints: Option<String>,
    #[serde(default)]
    pub past_medical_history: Option<String>,
    #[serde(default)]
    pub clinical_diagnosis: Option<String>,
    #[serde(default)]
    pub treatment_plan: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
}

impl ClinicalNoteUpdate {
    pub fn apply_to(&self, note: &mut ClinicalNote, now: DateTime<Utc>) {
        let fields = [
            (&self.presenting_complaints, &mut note.presenting_complaints),
            (&self.past_medical_history, &mut note.past_medical_history),
            (&self.clinical_diagnosis, &mut note.clinical_diagnosis),
            (&self.treatment_plan, &mut note.treatment_plan),
            (&self.recommendation, &mut note.recommendation),
        ];
        for (incoming, current) in fields {
            if let Some(value) = incoming {
                *current = value.clone();
            }
        }
        note.updated_at = now;
    }
}
