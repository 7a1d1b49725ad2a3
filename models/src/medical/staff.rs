// models/src/medical/staff.rs
// Password hashing follows the same bcrypt scheme as the rest of the workspace:
// the stored Staff record only ever holds the hash.

use bcrypt::{BcryptError, DEFAULT_COST, hash, verify};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EntityId;
use crate::errors::{ValidationError, ValidationResult};
use crate::medical::Role;

// --- DTO for new staff accounts ---
// Holds the plaintext password only until it is hashed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStaff {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

// --- Stored staff record ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: EntityId,
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    /// Always lowercase.
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub license_number: Option<String>,
    pub specialization: Option<String>,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Staff {
    /// Hashes a plaintext password.
    pub fn hash_password(password: &str) -> Result<String, BcryptError> {
        hash(password, DEFAULT_COST)
    }

    /// Verifies a plaintext password against a stored hash.
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, BcryptError> {
        verify(password, hash)
    }

    /// Creates an unsaved `Staff` from a `NewStaff` DTO, hashing the password.
    pub fn from_new_staff(new_staff: NewStaff, now: DateTime<Utc>) -> ValidationResult<Self> {
        if new_staff.email.trim().is_empty() {
            return Err(ValidationError::EmptyField("email"));
        }
        if new_staff.employee_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("employeeId"));
        }
        let has_license = new_staff
            .license_number
            .as_deref()
            .is_some_and(|l| !l.trim().is_empty());
        if new_staff.role == Role::Doctor && !has_license {
            return Err(ValidationError::MissingLicenseNumber);
        }

        let password_hash = Self::hash_password(&new_staff.password)
            .map_err(|e| ValidationError::PasswordHashing(e.to_string()))?;

        Ok(Staff {
            id: 0,
            employee_id: new_staff.employee_id,
            first_name: new_staff.first_name,
            last_name: new_staff.last_name,
            phone_number: new_staff.phone_number,
            email: normalize_email(&new_staff.email),
            password_hash,
            role: new_staff.role,
            is_active: true,
            last_login: None,
            license_number: new_staff.license_number,
            specialization: new_staff.specialization,
            department: new_staff.department,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn profile(&self) -> StaffProfile {
        StaffProfile::from(self)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// API-facing view of a staff record. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffProfile {
    pub id: EntityId,
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Staff> for StaffProfile {
    fn from(staff: &Staff) -> Self {
        StaffProfile {
            id: staff.id,
            employee_id: staff.employee_id.clone(),
            first_name: staff.first_name.clone(),
            last_name: staff.last_name.clone(),
            phone_number: staff.phone_number.clone(),
            email: staff.email.clone(),
            role: staff.role,
            is_active: staff.is_active,
            last_login: staff.last_login,
            license_number: staff.license_number.clone(),
            specialization: staff.specialization.clone(),
            department: staff.department.clone(),
            created_at: staff.created_at,
            updated_at: staff.updated_at,
        }
    }
}

/// Sparse update. The role is intentionally absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
    pub license_number: Option<String>,
    pub specialization: Option<String>,
    pub department: Option<String>,
}

impl StaffUpdate {
    /// Applies the present fields. Nothing is written if the result would leave an
    /// empty email or a doctor without a license number.
    pub fn apply_to(&self, staff: &mut Staff, now: DateTime<Utc>) -> ValidationResult<()> {
        if self.email.as_deref().is_some_and(|e| e.trim().is_empty()) {
            return Err(ValidationError::EmptyField("email"));
        }
        let blank_license = self.license_number.as_deref().is_some_and(|l| l.trim().is_empty());
        if staff.role == Role::Doctor && blank_license {
            return Err(ValidationError::MissingLicenseNumber);
        }

        if let Some(ref v) = self.first_name {
            staff.first_name = v.clone();
        }
        if let Some(ref v) = self.last_name {
            staff.last_name = v.clone();
        }
        if let Some(ref v) = self.phone_number {
            staff.phone_number = v.clone();
        }
        if let Some(ref v) = self.email {
            staff.email = normalize_email(v);
        }
        if let Some(v) = self.is_active {
            staff.is_active = v;
        }
        if let Some(ref v) = self.license_number {
            staff.license_number = Some(v.clone());
        }
        if let Some(ref v) = self.specialization {
            staff.specialization = Some(v.clone());
        }
        if let Some(ref v) = self.department {
            staff.department = Some(v.clone());
        }
        staff.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String, // Plaintext password for login attempt
}
