// models/src/errors.rs

pub use thiserror::Error;

/// Errors surfaced by the workflow services to their callers.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    /// A required foreign record (patient, appointment, assigned doctor) does not exist.
    #[error("{0}")]
    ReferenceNotFound(String),
    /// The record being operated on does not exist.
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    /// The record exists but its current state disallows the operation.
    #[error("{0}")]
    InvalidState(String),
    /// The caller's expected revision no longer matches the stored one.
    #[error("{entity} {id} was modified concurrently (expected revision {expected}, found {actual})")]
    Conflict {
        entity: &'static str,
        id: u64,
        expected: u64,
        actual: u64,
    },
    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The repository layer failed; carried verbatim.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl ServiceError {
    /// Short machine-readable kind, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::ReferenceNotFound(_) => "reference_not_found",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::InvalidState(_) => "invalid_state",
            ServiceError::Conflict { .. } => "conflict",
            ServiceError::Duplicate(_) => "duplicate",
            ServiceError::Unauthenticated(_) => "unauthenticated",
            ServiceError::Validation(_) => "validation",
            ServiceError::Persistence(_) => "persistence_failure",
        }
    }
}

/// Input that is well-formed JSON but semantically unacceptable.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("invalid date format, use YYYY-MM-DD: {0}")]
    InvalidDateFormat(String),
    #[error("scheduled time must be in the future")]
    ScheduledInPast,
    #[error("duration must be between {min} and {max} minutes, got {actual}")]
    DurationOutOfRange { min: u32, max: u32, actual: u32 },
    #[error("a license number is required for doctors")]
    MissingLicenseNumber,
    #[error("field {0} must not be empty")]
    EmptyField(&'static str),
    #[error("unknown {field} value: {value}")]
    UnknownVariant { field: &'static str, value: String },
    #[error("password hashing failed: {0}")]
    PasswordHashing(String),
}

/// A type alias for a `Result` that returns a `ServiceError` on failure.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_report_conflict_revisions() {
        let err = ServiceError::Conflict { entity: "appointment", id: 4, expected: 2, actual: 3 };
        assert_eq!(err.kind(), "conflict");
        assert_eq!(
            err.to_string(),
            "appointment 4 was modified concurrently (expected revision 2, found 3)"
        );
    }

    #[test]
    fn should_wrap_validation_errors() {
        let err: ServiceError = ValidationError::ScheduledInPast.into();
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.to_string(), "scheduled time must be in the future");
    }
}
