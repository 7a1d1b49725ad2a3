// lib/src/storage_engine/sled_storage.rs
// Each entity lives in its own tree keyed by big-endian id; unique lookups use
// index trees mapping the natural key to the id key. Writes that touch more
// than one tree run in a single sled transaction.

use std::path::Path;

use async_trait::async_trait;
use log::{debug, info};
use models::{
    Appointment, AppointmentFilter, ClinicalNote, EntityId, Patient, PatientFilter, Staff,
};
use serde::de::DeserializeOwned;
use sled::transaction::{abort, ConflictableTransactionError, ConflictableTransactionResult, TransactionError};
use sled::{Db, IVec, Transactional, Tree};

use super::repository::{
    AppointmentRepository, ClinicalNoteRepository, PatientRepository, StaffRepository,
};
use super::storage_utils::{deserialize_record, id_from_bytes, id_key, serialize_record};
use crate::errors::{StorageError, StorageResult};

type TxResult<T> = Result<T, TransactionError<StorageError>>;

fn abort_on<T>(result: StorageResult<T>) -> ConflictableTransactionResult<T, StorageError> {
    result.map_err(ConflictableTransactionError::Abort)
}

/// Records guarded by an optimistic revision.
trait Revisioned: DeserializeOwned {
    const ENTITY: &'static str;
    fn revision(&self) -> u64;
}

impl Revisioned for Appointment {
    const ENTITY: &'static str = "appointment";
    fn revision(&self) -> u64 {
        self.revision
    }
}

impl Revisioned for ClinicalNote {
    const ENTITY: &'static str = "clinical note";
    fn revision(&self) -> u64 {
        self.revision
    }
}

/// Decodes the stored record and checks it still carries `expected`.
fn current<T: Revisioned>(stored: Option<IVec>, id: EntityId, expected: u64) -> StorageResult<T> {
    let bytes = stored.ok_or(StorageError::Missing { entity: T::ENTITY, id })?;
    let record: T = deserialize_record(&bytes)?;
    if record.revision() != expected {
        return Err(StorageError::RevisionMismatch {
            entity: T::ENTITY,
            id,
            expected,
            actual: record.revision(),
        });
    }
    Ok(record)
}

fn decode_all<T: DeserializeOwned>(tree: &Tree) -> StorageResult<Vec<T>> {
    let mut records = Vec::new();
    for value in tree.iter().values() {
        records.push(deserialize_record(&value?)?);
    }
    Ok(records)
}

#[derive(Debug, Clone)]
pub struct SledStorage {
    db: Db,
    staff: Tree,
    staff_by_email: Tree,
    staff_by_employee_id: Tree,
    patients: Tree,
    patients_by_registration: Tree,
    appointments: Tree,
    clinical_notes: Tree,
    clinical_notes_by_appointment: Tree,
}

impl SledStorage {
    /// Opens (or creates) the database under `path`.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let db = sled::open(path)?;
        info!("Opened sled database at {:?}", path);
        Self::from_db(db)
    }

    pub fn from_db(db: Db) -> StorageResult<Self> {
        Ok(SledStorage {
            staff: db.open_tree("staff")?,
            staff_by_email: db.open_tree("staff_by_email")?,
            staff_by_employee_id: db.open_tree("staff_by_employee_id")?,
            patients: db.open_tree("patients")?,
            patients_by_registration: db.open_tree("patients_by_registration")?,
            appointments: db.open_tree("appointments")?,
            clinical_notes: db.open_tree("clinical_notes")?,
            clinical_notes_by_appointment: db.open_tree("clinical_notes_by_appointment")?,
            db,
        })
    }

    fn next_id(&self) -> StorageResult<EntityId> {
        Ok(self.db.generate_id()? + 1)
    }

    pub async fn flush(&self) -> StorageResult<()> {
        let bytes = self.db.flush_async().await?;
        debug!("Flushed {} bytes to disk", bytes);
        Ok(())
    }

    fn get_by_index<T: DeserializeOwned>(&self, index: &Tree, records: &Tree, natural_key: &[u8]) -> StorageResult<Option<T>> {
        match index.get(natural_key)? {
            Some(key) => records
                .get(key)?
                .map(|bytes| deserialize_record(&bytes))
                .transpose(),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StaffRepository for SledStorage {
    async fn create(&self, mut staff: Staff) -> StorageResult<Staff> {
        staff.id = self.next_id()?;
        let key = id_key(staff.id);
        let bytes = serialize_record(&staff)?;

        let result: TxResult<()> = (&self.staff, &self.staff_by_email, &self.staff_by_employee_id)
            .transaction(|(records, by_email, by_employee)| {
                if by_email.get(staff.email.as_bytes())?.is_some() {
                    return abort(StorageError::UniqueViolation(format!(
                        "staff with email {} already exists",
                        staff.email
                    )));
                }
                if by_employee.get(staff.employee_id.as_bytes())?.is_some() {
                    return abort(StorageError::UniqueViolation(format!(
                        "staff with employee id {} already exists",
                        staff.employee_id
                    )));
                }
                records.insert(&key[..], bytes.as_slice())?;
                by_email.insert(staff.email.as_bytes(), &key[..])?;
                by_employee.insert(staff.employee_id.as_bytes(), &key[..])?;
                Ok(())
            });
        result?;
        debug!("Stored staff {} in sled", staff.id);
        Ok(staff)
    }

    async fn find_by_id(&self, id: EntityId) -> StorageResult<Option<Staff>> {
        self.staff
            .get(id_key(id))?
            .map(|bytes| deserialize_record(&bytes))
            .transpose()
    }

    async fn find_all(&self) -> StorageResult<Vec<Staff>> {
        decode_all(&self.staff)
    }

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<Staff>> {
        self.get_by_index(&self.staff_by_email, &self.staff, email.as_bytes())
    }

    async fn find_by_employee_id(&self, employee_id: &str) -> StorageResult<Option<Staff>> {
        self.get_by_index(&self.staff_by_employee_id, &self.staff, employee_id.as_bytes())
    }

    async fn update(&self, staff: Staff) -> StorageResult<Staff> {
        let key = id_key(staff.id);
        let bytes = serialize_record(&staff)?;

        let result: TxResult<()> = (&self.staff, &self.staff_by_email, &self.staff_by_employee_id)
            .transaction(|(records, by_email, by_employee)| {
                let previous: Staff = match records.get(&key[..])? {
                    Some(old) => abort_on(deserialize_record(&old))?,
                    None => return abort(StorageError::Missing { entity: "staff", id: staff.id }),
                };
                if previous.email != staff.email {
                    if by_email.get(staff.email.as_bytes())?.is_some() {
                        return abort(StorageError::UniqueViolation(format!(
                            "staff with email {} already exists",
                            staff.email
                        )));
                    }
                    by_email.remove(previous.email.as_bytes())?;
                    by_email.insert(staff.email.as_bytes(), &key[..])?;
                }
                if previous.employee_id != staff.employee_id {
                    if by_employee.get(staff.employee_id.as_bytes())?.is_some() {
                        return abort(StorageError::UniqueViolation(format!(
                            "staff with employee id {} already exists",
                            staff.employee_id
                        )));
                    }
                    by_employee.remove(previous.employee_id.as_bytes())?;
                    by_employee.insert(staff.employee_id.as_bytes(), &key[..])?;
                }
                records.insert(&key[..], bytes.as_slice())?;
                Ok(())
            });
        result?;
        Ok(staff)
    }

    async fn delete(&self, id: EntityId) -> StorageResult<()> {
        let key = id_key(id);
        let result: TxResult<()> = (&self.staff, &self.staff_by_email, &self.staff_by_employee_id)
            .transaction(|(records, by_email, by_employee)| {
                let previous: Staff = match records.remove(&key[..])? {
                    Some(old) => abort_on(deserialize_record(&old))?,
                    None => return abort(StorageError::Missing { entity: "staff", id }),
                };
                by_email.remove(previous.email.as_bytes())?;
                by_employee.remove(previous.employee_id.as_bytes())?;
                Ok(())
            });
        Ok(result?)
    }
}

#[async_trait]
impl PatientRepository for SledStorage {
    async fn create(&self, mut patient: Patient) -> StorageResult<Patient> {
        patient.id = self.next_id()?;
        let key = id_key(patient.id);
        let bytes = serialize_record(&patient)?;

        let result: TxResult<()> = (&self.patients, &self.patients_by_registration)
            .transaction(|(records, by_registration)| {
                let reg = patient.registration_number.as_bytes();
                if by_registration.get(reg)?.is_some() {
                    return abort(StorageError::UniqueViolation(format!(
                        "registration number {} already exists",
                        patient.registration_number
                    )));
                }
                records.insert(&key[..], bytes.as_slice())?;
                by_registration.insert(reg, &key[..])?;
                Ok(())
            });
        result?;
        Ok(patient)
    }

    async fn find_by_id(&self, id: EntityId) -> StorageResult<Option<Patient>> {
        self.patients
            .get(id_key(id))?
            .map(|bytes| deserialize_record(&bytes))
            .transpose()
    }

    async fn find_all(&self, filter: &PatientFilter) -> StorageResult<Vec<Patient>> {
        let patients: Vec<Patient> = decode_all(&self.patients)?;
        Ok(patients.into_iter().filter(|p| filter.matches(p)).collect())
    }

    async fn find_by_registration_number(&self, registration_number: &str) -> StorageResult<Option<Patient>> {
        self.get_by_index(&self.patients_by_registration, &self.patients, registration_number.as_bytes())
    }

    async fn update(&self, patient: Patient) -> StorageResult<Patient> {
        let key = id_key(patient.id);
        let bytes = serialize_record(&patient)?;
        let result: TxResult<()> = self.patients.transaction(|records| {
            if records.get(&key[..])?.is_none() {
                return abort(StorageError::Missing { entity: "patient", id: patient.id });
            }
            records.insert(&key[..], bytes.as_slice())?;
            Ok(())
        });
        result?;
        Ok(patient)
    }

    async fn delete(&self, id: EntityId) -> StorageResult<()> {
        let key = id_key(id);
        let result: TxResult<()> = (&self.patients, &self.patients_by_registration)
            .transaction(|(records, by_registration)| {
                let previous: Patient = match records.remove(&key[..])? {
                    Some(old) => abort_on(deserialize_record(&old))?,
                    None => return abort(StorageError::Missing { entity: "patient", id }),
                };
                by_registration.remove(previous.registration_number.as_bytes())?;
                Ok(())
            });
        Ok(result?)
    }
}

#[async_trait]
impl AppointmentRepository for SledStorage {
    async fn create(&self, mut appointment: Appointment) -> StorageResult<Appointment> {
        appointment.id = self.next_id()?;
        appointment.revision = 1;
        self.appointments
            .insert(id_key(appointment.id), serialize_record(&appointment)?)?;
        Ok(appointment)
    }

    async fn find_by_id(&self, id: EntityId) -> StorageResult<Option<Appointment>> {
        self.appointments
            .get(id_key(id))?
            .map(|bytes| deserialize_record(&bytes))
            .transpose()
    }

    async fn find_all(&self, filter: &AppointmentFilter) -> StorageResult<Vec<Appointment>> {
        let appointments: Vec<Appointment> = decode_all(&self.appointments)?;
        Ok(appointments.into_iter().filter(|a| filter.matches(a)).collect())
    }

    async fn update(&self, mut appointment: Appointment) -> StorageResult<Appointment> {
        let key = id_key(appointment.id);
        let expected = appointment.revision;
        appointment.revision += 1;
        let bytes = serialize_record(&appointment)?;

        let result: TxResult<()> = self.appointments.transaction(|records| {
            abort_on(current::<Appointment>(records.get(&key[..])?, appointment.id, expected))?;
            records.insert(&key[..], bytes.as_slice())?;
            Ok(())
        });
        result?;
        Ok(appointment)
    }

    async fn delete(&self, id: EntityId, expected_revision: u64) -> StorageResult<()> {
        let key = id_key(id);
        let result: TxResult<()> = self.appointments.transaction(|records| {
            abort_on(current::<Appointment>(records.get(&key[..])?, id, expected_revision))?;
            records.remove(&key[..])?;
            Ok(())
        });
        Ok(result?)
    }
}

#[async_trait]
impl ClinicalNoteRepository for SledStorage {
    async fn create_with_completion(
        &self,
        mut note: ClinicalNote,
        mut appointment: Appointment,
    ) -> StorageResult<(ClinicalNote, Appointment)> {
        note.id = self.next_id()?;
        note.revision = 1;
        let expected = appointment.revision;
        appointment.revision += 1;

        let note_key = id_key(note.id);
        let appointment_key = id_key(appointment.id);
        let note_bytes = serialize_record(&note)?;
        let appointment_bytes = serialize_record(&appointment)?;

        let result: TxResult<()> = (&self.clinical_notes, &self.clinical_notes_by_appointment, &self.appointments)
            .transaction(|(notes, by_appointment, appointments)| {
                abort_on(current::<Appointment>(
                    appointments.get(&appointment_key[..])?,
                    appointment.id,
                    expected,
                ))?;
                if by_appointment.get(&appointment_key[..])?.is_some() {
                    return abort(StorageError::UniqueViolation(format!(
                        "a clinical note already exists for appointment {}",
                        appointment.id
                    )));
                }
                notes.insert(&note_key[..], note_bytes.as_slice())?;
                by_appointment.insert(&appointment_key[..], &note_key[..])?;
                appointments.insert(&appointment_key[..], appointment_bytes.as_slice())?;
                Ok(())
            });
        result?;
        debug!("Stored clinical note {} for appointment {}", note.id, appointment.id);
        Ok((note, appointment))
    }

    async fn find_by_id(&self, id: EntityId) -> StorageResult<Option<ClinicalNote>> {
        self.clinical_notes
            .get(id_key(id))?
            .map(|bytes| deserialize_record(&bytes))
            .transpose()
    }

    async fn find_by_appointment_id(&self, appointment_id: EntityId) -> StorageResult<Option<ClinicalNote>> {
        self.get_by_index(
            &self.clinical_notes_by_appointment,
            &self.clinical_notes,
            &id_key(appointment_id),
        )
    }

    async fn find_by_patient_id(&self, patient_id: EntityId) -> StorageResult<Vec<ClinicalNote>> {
        let notes: Vec<ClinicalNote> = decode_all(&self.clinical_notes)?;
        Ok(notes.into_iter().filter(|n| n.patient_id == patient_id).collect())
    }

    async fn update(&self, mut note: ClinicalNote) -> StorageResult<ClinicalNote> {
        let key = id_key(note.id);
        let expected = note.revision;
        note.revision += 1;
        let bytes = serialize_record(&note)?;

        let result: TxResult<()> = self.clinical_notes.transaction(|records| {
            abort_on(current::<ClinicalNote>(records.get(&key[..])?, note.id, expected))?;
            records.insert(&key[..], bytes.as_slice())?;
            Ok(())
        });
        result?;
        Ok(note)
    }

    async fn delete(&self, id: EntityId, expected_revision: u64) -> StorageResult<()> {
        let key = id_key(id);
        let result: TxResult<()> = (&self.clinical_notes, &self.clinical_notes_by_appointment)
            .transaction(|(notes, by_appointment)| {
                let note = abort_on(current::<ClinicalNote>(notes.get(&key[..])?, id, expected_revision))?;
                notes.remove(&key[..])?;
                let indexed = by_appointment.get(&id_key(note.appointment_id)[..])?;
                if indexed.as_deref().and_then(id_from_bytes) == Some(id) {
                    by_appointment.remove(&id_key(note.appointment_id)[..])?;
                }
                Ok(())
            });
        Ok(result?)
    }
}
