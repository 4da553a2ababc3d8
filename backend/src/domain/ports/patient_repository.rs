//! Port for resolving patients owned by the registry.
use async_trait::async_trait;

use crate::domain::{Patient, PatientId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by patient lookup adapters.
    pub enum PatientRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "patient repository connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } => "patient repository query failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// Fetch a patient by identifier.
    async fn retrieve(&self, patient_id: &PatientId)
    -> Result<Option<Patient>, PatientRepositoryError>;
}
