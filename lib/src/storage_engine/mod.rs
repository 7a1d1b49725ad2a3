// lib/src/storage_engine/mod.rs

// Module declarations
pub mod repository;
pub mod sled_storage;
pub mod inmemory_storage;
pub mod storage_utils;

// Re-export key types and traits for external use
pub use repository::{
    AppointmentRepository, ClinicalNoteRepository, PatientRepository, Repositories, StaffRepository,
};
pub use sled_storage::SledStorage;
pub use inmemory_storage::InMemoryStorage;
pub use crate::config::{StorageConfig, StorageEngineType};

use anyhow::{Context, Result};
use log::info;
use std::sync::Arc;

/// Creates the repositories for the engine selected in `config`.
///
/// Sled is the default; the in-memory engine loses everything on shutdown and is
/// meant for tests and demos.
pub fn create_storage(config: &StorageConfig) -> Result<Repositories> {
    match config.engine {
        StorageEngineType::Sled => {
            std::fs::create_dir_all(&config.data_directory).with_context(|| {
                format!("Failed to create data directory {:?}", config.data_directory)
            })?;
            let storage = SledStorage::open(&config.data_directory)
                .with_context(|| format!("Failed to open sled at {:?}", config.data_directory))?;
            Ok(Repositories::from_store(Arc::new(storage)))
        }
        StorageEngineType::InMemory => {
            info!("Using in-memory storage, data will not survive a restart");
            Ok(Repositories::from_store(Arc::new(InMemoryStorage::new())))
        }
    }
}
