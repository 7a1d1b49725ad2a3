// lib/src/services/mod.rs
// Workflow services. Each operation takes the acting staff member, checks the
// role policy, then reads and writes through the injected repositories.

pub mod appointment_service;
pub mod authorization;
pub mod bootstrap;
pub mod clinical_note_service;
pub mod patient_service;
pub mod staff_service;

pub use appointment_service::AppointmentService;
pub use authorization::{authorize, has_permission, Operation};
pub use bootstrap::ensure_admin;
pub use clinical_note_service::ClinicalNoteService;
pub use patient_service::PatientService;
pub use staff_service::StaffService;

use crate::storage_engine::Repositories;

#[derive(Clone)]
pub struct Services {
    pub staff: StaffService,
    pub patients: PatientService,
    pub appointments: AppointmentService,
    pub clinical_notes: ClinicalNoteService,
}

impl Services {
    pub fn new(repos: Repositories) -> Self {
        Services {
            staff: StaffService::new(repos.clone()),
            patients: PatientService::new(repos.clone()),
            appointments: AppointmentService::new(repos.clone()),
            clinical_notes: ClinicalNoteService::new(repos),
        }
    }
}

/// Fixtures shared by the service tests and, through the `test-suite` feature,
/// by the HTTP tests.
#[cfg(any(test, feature = "test-suite"))]
pub mod test_support {
    use std::sync::Arc;

    use chrono::Utc;
    use models::{Actor, Gender, NewPatient, Patient, Role, Staff};

    use super::Services;
    use crate::storage_engine::{InMemoryStorage, Repositories};

    pub struct Fixture {
        pub repos: Repositories,
        pub services: Services,
        pub admin: Actor,
        pub receptionist: Actor,
        pub doctor: Actor,
        pub other_doctor: Actor,
        pub patient: Patient,
    }

    /// A staff record with a placeholder hash, so fixtures skip bcrypt.
    pub fn staff_record(role: Role, employee_id: &str, email: &str) -> Staff {
        let now = Utc::now();
        Staff {
            id: 0,
            employee_id: employee_id.to_string(),
            first_name: "Test".to_string(),
            last_name: employee_id.to_string(),
            phone_number: "+2348000000000".to_string(),
            email: email.to_string(),
            password_hash: "unusable".to_string(),
            role,
            is_active: true,
            last_login: None,
            license_number: (role == Role::Doctor).then(|| format!("LIC-{}", employee_id)),
            specialization: None,
            department: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_patient() -> NewPatient {
        NewPatient {
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            date_of_birth: "1990-04-12".to_string(),
            gender: Gender::Female,
            phone_number: "+2348011111111".to_string(),
            email: None,
            address: None,
        }
    }

    pub async fn fixture() -> Fixture {
        let repos = Repositories::from_store(Arc::new(InMemoryStorage::new()));
        let mut actors = Vec::new();
        for (role, employee_id) in [
            (Role::Admin, "ADM0001"),
            (Role::Receptionist, "REC0001"),
            (Role::Doctor, "DOC0001"),
            (Role::Doctor, "DOC0002"),
        ] {
            let email = format!("{}@hospital.com", employee_id.to_lowercase());
            let saved = repos
                .staff
                .create(staff_record(role, employee_id, &email))
                .await
                .unwrap();
            actors.push(Actor::new(saved.id, saved.role));
        }
        let services = Services::new(repos.clone());
        let patient = services
            .patients
            .create(&actors[1], new_patient())
            .await
            .unwrap();

        Fixture {
            repos,
            services,
            admin: actors[0],
            receptionist: actors[1],
            doctor: actors[2],
            other_doctor: actors[3],
            patient,
        }
    }
}
