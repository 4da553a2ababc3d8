//! Port for persisting the patient operation aggregate.
//!
//! An operation spans a parent record plus note and asset child records.
//! Adapters hide that fan-out behind a single-aggregate contract and apply two
//! distinct child policies:
//!
//! - **notes** are append-only history, written on first insert and by
//!   [`OperationRepository::add_note`]; a re-save never rewrites them;
//! - **assets** are replaced wholesale by a re-save and appended one at a time
//!   by [`OperationRepository::add_asset`].
//!
//! Each write path is atomic: a failure leaves the stored aggregate as it was
//! before the call.

use async_trait::async_trait;

use crate::domain::{OperationId, PatientId, PatientOperation};

use super::define_port_error;

/// Maximum number of operations returned by
/// [`OperationRepository::find_by_patient_id`].
pub const PATIENT_OPERATIONS_PAGE_SIZE: usize = 10;

define_port_error! {
    /// Errors raised by operation repository adapters.
    pub enum OperationRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "operation repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "operation repository query failed: {message}",
    }
}

/// Port for reading and writing patient operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OperationRepository: Send + Sync {
    /// Load the full aggregate, notes newest first and assets in insertion
    /// order. Absent operations yield `None`.
    async fn retrieve(
        &self,
        operation_id: &OperationId,
    ) -> Result<Option<PatientOperation>, OperationRepositoryError>;

    /// Insert the aggregate with all its children, or, when the id already
    /// exists, overwrite the parent fields and replace the asset list.
    /// Returns the aggregate as written.
    async fn save(
        &self,
        operation: &PatientOperation,
    ) -> Result<PatientOperation, OperationRepositoryError>;

    /// Newest operations for a patient, at most
    /// [`PATIENT_OPERATIONS_PAGE_SIZE`], each fully assembled.
    async fn find_by_patient_id(
        &self,
        patient_id: &PatientId,
    ) -> Result<Vec<PatientOperation>, OperationRepositoryError>;

    /// Append a note stamped with the current time, bump `last_update` to the
    /// same instant, and return the re-read aggregate.
    async fn add_note(
        &self,
        operation_id: &OperationId,
        content: &str,
    ) -> Result<Option<PatientOperation>, OperationRepositoryError>;

    /// Append an asset reference, bump `last_update`, and return the re-read
    /// aggregate.
    async fn add_asset(
        &self,
        operation_id: &OperationId,
        asset_name: &str,
    ) -> Result<Option<PatientOperation>, OperationRepositoryError>;
}
