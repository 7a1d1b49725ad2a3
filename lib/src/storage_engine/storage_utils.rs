// lib/src/storage_engine/storage_utils.rs

use bincode::{
    config::{self, BigEndian, Configuration, Fixint},
    serde::{decode_from_slice, encode_to_vec},
};
use models::EntityId;
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::StorageResult;

/// Provides a standard bincode configuration.
pub fn bincode_config() -> Configuration<BigEndian, Fixint> {
    config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
}

/// Helper to serialize a record to bytes using bincode.
pub fn serialize_record<T: Serialize>(record: &T) -> StorageResult<Vec<u8>> {
    Ok(encode_to_vec(record, bincode_config())?)
}

/// Helper to deserialize bytes to a record using bincode.
pub fn deserialize_record<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    decode_from_slice(bytes, bincode_config())
        .map(|(val, _)| val) // decode_from_slice returns (value, bytes_read)
        .map_err(Into::into)
}

/// Big-endian id keys keep sled's iteration order equal to id order.
pub fn id_key(id: EntityId) -> [u8; 8] {
    id.to_be_bytes()
}

pub fn id_from_bytes(bytes: &[u8]) -> Option<EntityId> {
    let array: [u8; 8] = bytes.try_into().ok()?;
    Some(EntityId::from_be_bytes(array))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use models::{Appointment, Department, NewAppointment};

    #[test]
    fn should_serialize_and_restore_appointment() {
        let input = NewAppointment {
            patient_id: 4,
            department: Department::Neurology,
            scheduled_at: None,
            duration: Some(45),
            reason: None,
        };
        let appointment = Appointment::schedule(input, 2, Utc::now()).unwrap();
        let bytes = serialize_record(&appointment).unwrap();
        let restored: Appointment = deserialize_record(&bytes).unwrap();
        assert_eq!(restored, appointment);
    }

    #[test]
    fn should_order_keys_by_id() {
        assert!(id_key(2) < id_key(10));
        assert_eq!(id_from_bytes(&id_key(77)), Some(77));
        assert_eq!(id_from_bytes(b"short"), None);
    }
}
