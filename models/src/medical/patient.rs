// models/src/medical/patient.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::EntityId;
use crate::errors::{ValidationError, ValidationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Genotype {
    AA,
    AS,
    AC,
    SS,
    SC,
    CC,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: EntityId,
    /// System generated, unique. Format `PAT-<year>-<4 digits>`.
    pub registration_number: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub phone_number: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_group: BloodGroup,
    pub genotype: Genotype,
    pub created_by: EntityId,
    pub updated_by: EntityId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD`.
    pub date_of_birth: String,
    pub gender: Gender,
    pub phone_number: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Parses a `YYYY-MM-DD` date of birth.
pub fn parse_date_of_birth(raw: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDateFormat(raw.to_string()))
}

/// Formats a registration number from a year and a four digit sequence.
pub fn format_registration_number(year: i32, sequence: u32) -> String {
    format!("PAT-{}-{:04}", year, sequence % 10_000)
}

impl Patient {
    pub fn register(
        input: NewPatient,
        registration_number: String,
        created_by: EntityId,
        now: DateTime<Utc>,
    ) -> ValidationResult<Self> {
        if input.first_name.trim().is_empty() {
            return Err(ValidationError::EmptyField("firstName"));
        }
        if input.last_name.trim().is_empty() {
            return Err(ValidationError::EmptyField("lastName"));
        }
        let date_of_birth = parse_date_of_birth(&input.date_of_birth)?;

        Ok(Patient {
            id: 0,
            registration_number,
            first_name: input.first_name,
            last_name: input.last_name,
            date_of_birth,
            gender: input.gender,
            phone_number: input.phone_number,
            email: input.email,
            address: input.address,
            blood_group: BloodGroup::Unknown,
            genotype: Genotype::Unknown,
            created_by,
            updated_by: created_by,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<Gender>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<BloodGroup>,
    pub genotype: Option<Genotype>,
}

impl PatientUpdate {
    /// Applies the present fields. Nothing is written if the date of birth is malformed.
    pub fn apply_to(
        &self,
        patient: &mut Patient,
        updated_by: EntityId,
        now: DateTime<Utc>,
    ) -> ValidationResult<()> {
        let date_of_birth = self.date_of_birth.as_deref().map(parse_date_of_birth).transpose()?;

        if let Some(ref v) = self.first_name {
            patient.first_name = v.clone();
        }
        if let Some(ref v) = self.last_name {
            patient.last_name = v.clone();
        }
        if let Some(v) = date_of_birth {
            patient.date_of_birth = v;
        }
        if let Some(v) = self.gender {
            patient.gender = v;
        }
        if let Some(ref v) = self.phone_number {
            patient.phone_number = v.clone();
        }
        if let Some(ref v) = self.email {
            patient.email = Some(v.clone());
        }
        if let Some(ref v) = self.address {
            patient.address = Some(v.clone());
        }
        if let Some(v) = self.blood_group {
            patient.blood_group = v;
        }
        if let Some(v) = self.genotype {
            patient.genotype = v;
        }
        patient.updated_by = updated_by;
        patient.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientFilter {
    pub registration_number: Option<String>,
    pub gender: Option<Gender>,
}

impl PatientFilter {
    pub fn matches(&self, patient: &Patient) -> bool {
        self.registration_number
            .as_deref()
            .map_or(true, |reg| patient.registration_number == reg)
            && self.gender.map_or(true, |g| patient.gender == g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_patient() -> NewPatient {
        NewPatient {
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            date_of_birth: "1990-04-12".into(),
            gender: Gender::Female,
            phone_number: "+2348000000000".into(),
            email: None,
            address: None,
        }
    }

    #[test]
    fn should_register_with_unknown_blood_markers() {
        let patient = Patient::register(new_patient(), "PAT-2025-0042".into(), 3, Utc::now()).unwrap();
        assert_eq!(patient.blood_group, BloodGroup::Unknown);
        assert_eq!(patient.genotype, Genotype::Unknown);
        assert_eq!(patient.created_by, 3);
        assert_eq!(patient.updated_by, 3);
        assert_eq!(patient.date_of_birth, NaiveDate::from_ymd_opt(1990, 4, 12).unwrap());
    }

    #[test]
    fn should_reject_malformed_date_of_birth() {
        let mut input = new_patient();
        input.date_of_birth = "12/04/1990".into();
        assert_eq!(
            Patient::register(input, "PAT-2025-0001".into(), 3, Utc::now()),
            Err(ValidationError::InvalidDateFormat("12/04/1990".into()))
        );
    }

    #[test]
    fn should_leave_patient_untouched_on_bad_update() {
        let mut patient = Patient::register(new_patient(), "PAT-2025-0042".into(), 3, Utc::now()).unwrap();
        let before = patient.clone();
        let update = PatientUpdate {
            first_name: Some("Changed".into()),
            date_of_birth: Some("not-a-date".into()),
            ..Default::default()
        };
        assert!(update.apply_to(&mut patient, 4, Utc::now()).is_err());
        assert_eq!(patient, before);
    }

    #[test]
    fn should_format_registration_numbers() {
        assert_eq!(format_registration_number(2025, 7), "PAT-2025-0007");
        assert_eq!(format_registration_number(2025, 12_345), "PAT-2025-2345");
    }

    #[test]
    fn should_use_clinical_notation_for_blood_group() {
        assert_eq!(serde_json::to_string(&BloodGroup::AbNegative).unwrap(), "\"AB-\"");
        let g: Genotype = serde_json::from_str("\"unknown\"").unwrap();
        assert_eq!(g, Genotype::Unknown);
    }
}
