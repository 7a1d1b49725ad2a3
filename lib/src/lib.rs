// lib/src/lib.rs
// Storage engines, workflow services and configuration for the hospital
// management backend. Shared entity types live in the `models` crate.

pub mod config;
pub mod errors;
pub mod services;
pub mod storage_engine;

pub use crate::config::{AppConfig, StorageConfig, StorageEngineType};
pub use crate::errors::{StorageError, StorageResult};
pub use crate::services::{
    AppointmentService, ClinicalNoteService, Operation, PatientService, Services, StaffService,
};
pub use crate::storage_engine::{create_storage, InMemoryStorage, Repositories, SledStorage};
