// models/src/lib.rs
// Shared types for the hospital management workspace: entities, request DTOs,
// list filters and the error taxonomy returned by the workflow services.

pub mod errors;
pub mod identity;
pub mod medical;

pub use errors::{ServiceError, ServiceResult, ValidationError};
pub use identity::Actor;
pub use medical::*;

/// Numeric primary key shared by every entity.
pub type EntityId = u64;
