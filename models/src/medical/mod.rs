// models/src/medical/mod.rs
pub mod appointment;
pub mod clinical_note;
pub mod patient;
pub mod role;
pub mod staff;

pub use appointment::{
    Appointment, AppointmentFilter, AppointmentStatus, AppointmentUpdate, DEFAULT_DURATION_MINUTES,
    Department, MAX_DURATION_MINUTES, MIN_DURATION_MINUTES, NewAppointment,
};
pub use clinical_note::{ClinicalNote, ClinicalNoteUpdate, NewClinicalNote};
pub use patient::{
    BloodGroup, Gender, Genotype, NewPatient, Patient, PatientFilter, PatientUpdate,
    format_registration_number, parse_date_of_birth,
};
pub use role::Role;
pub use staff::{Login, NewStaff, Staff, StaffProfile, StaffUpdate, normalize_email};
