//! Patient record as seen by the operations core.
//!
//! Patients are owned by the registry; this crate only resolves them to
//! confirm that an operation references someone who exists.

use serde::Serialize;

use super::ids::PatientId;

/// Registered patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    id: PatientId,
    full_name: String,
}

impl Patient {
    pub fn new(id: PatientId, full_name: impl Into<String>) -> Self {
        Self {
            id,
            full_name: full_name.into(),
        }
    }

    pub fn id(&self) -> &PatientId {
        &self.id
    }

    pub fn full_name(&self) -> &str {
        self.full_name.as_str()
    }
}
