// models/src/identity.rs
use serde::{Deserialize, Serialize};

use crate::EntityId;
use crate::medical::Role;

/// The staff member on whose behalf an operation runs.
///
/// Resolved from storage for every authenticated request, so the role is the
/// stored one rather than whatever an old token claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub staff_id: EntityId,
    pub role: Role,
}

impl Actor {
    pub fn new(staff_id: EntityId, role: Role) -> Self {
        Actor { staff_id, role }
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}
