//! Port for invoice persistence and status transitions.

use async_trait::async_trait;

use crate::domain::{Invoice, InvoiceId, InvoiceStatus, OperationId, PatientId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by invoice repository adapters.
    pub enum InvoiceRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "invoice repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "invoice repository query failed: {message}",
    }
}

/// Port for reading and writing invoices.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Find an invoice by id.
    async fn retrieve(&self, invoice_id: &InvoiceId)
    -> Result<Option<Invoice>, InvoiceRepositoryError>;

    /// Invoices billed for an operation, newest first.
    async fn find_by_operation_id(
        &self,
        operation_id: &OperationId,
    ) -> Result<Vec<Invoice>, InvoiceRepositoryError>;

    /// Invoices for every operation of a patient, newest first.
    async fn find_by_patient_id(
        &self,
        patient_id: &PatientId,
    ) -> Result<Vec<Invoice>, InvoiceRepositoryError>;

    /// Insert the invoice, or overwrite amount, status, and `last_update`
    /// when it already exists.
    async fn save(&self, invoice: &Invoice) -> Result<Invoice, InvoiceRepositoryError>;

    /// Move an invoice to `status`, stamping `last_update` with the current
    /// time. Any source state is accepted. Returns `None` for unknown ids.
    async fn update_status(
        &self,
        invoice_id: &InvoiceId,
        status: InvoiceStatus,
    ) -> Result<Option<Invoice>, InvoiceRepositoryError>;
}
