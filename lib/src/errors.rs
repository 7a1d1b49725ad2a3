// lib/src/errors.rs

use bincode::error::{DecodeError, EncodeError};
use models::{EntityId, ServiceError};
use sled::transaction::TransactionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Serialization/Deserialization error: {0}")]
    SerializationError(String),

    #[error("{entity} {id} does not exist")]
    Missing { entity: &'static str, id: EntityId },

    #[error("{0}")]
    UniqueViolation(String),

    #[error("{entity} {id} revision mismatch (expected {expected}, found {actual})")]
    RevisionMismatch {
        entity: &'static str,
        id: EntityId,
        expected: u64,
        actual: u64,
    },

    #[error("Internal storage error: {0}")]
    InternalError(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::DatabaseError(err.to_string())
    }
}

impl From<EncodeError> for StorageError {
    fn from(err: EncodeError) -> Self {
        StorageError::SerializationError(format!("Bincode encode error: {}", err))
    }
}

impl From<DecodeError> for StorageError {
    fn from(err: DecodeError) -> Self {
        StorageError::SerializationError(format!("Bincode decode error: {}", err))
    }
}

impl From<TransactionError<StorageError>> for StorageError {
    fn from(err: TransactionError<StorageError>) -> Self {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => e.into(),
        }
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        StorageError::InternalError(format!("Async task join error: {}", err))
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::RevisionMismatch { entity, id, expected, actual } => {
                ServiceError::Conflict { entity, id, expected, actual }
            }
            StorageError::UniqueViolation(msg) => ServiceError::Duplicate(msg),
            StorageError::Missing { entity, id } => ServiceError::NotFound(format!("{} {} not found", entity, id)),
            other => ServiceError::Persistence(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_storage_errors_to_service_kinds() {
        let conflict: ServiceError = StorageError::RevisionMismatch {
            entity: "clinical note",
            id: 3,
            expected: 1,
            actual: 2,
        }
        .into();
        assert_eq!(conflict.kind(), "conflict");

        let duplicate: ServiceError = StorageError::UniqueViolation("email taken".into()).into();
        assert_eq!(duplicate, ServiceError::Duplicate("email taken".into()));

        let failure: ServiceError = StorageError::DatabaseError("disk full".into()).into();
        assert_eq!(
            failure,
            ServiceError::Persistence("Database operation failed: disk full".into())
        );
    }
}
