//! Invoice orchestration service.

use std::sync::Arc;

use mockable::Clock;
use tracing::{info, warn};

use crate::domain::operation_service::{map_operation_repository_error, map_validation_error};
use crate::domain::ports::{
    IdGenerator, InvoiceRepository, InvoiceRepositoryError, OperationRepository,
};
use crate::domain::validation::ValidationError;
use crate::domain::{
    CreateInvoiceRequest, Error, Invoice, InvoiceId, InvoiceStatus, OperationId, PatientId,
};

fn map_invoice_repository_error(error: InvoiceRepositoryError) -> Error {
    match error {
        InvoiceRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("invoice repository unavailable: {message}"))
        }
        InvoiceRepositoryError::Query { message } => {
            Error::internal(format!("invoice repository error: {message}"))
        }
    }
}

fn invoice_not_found(invoice_id: &InvoiceId) -> Error {
    Error::not_found(format!("invoice {invoice_id} not found"))
}

/// Domain service for issuing invoices and moving them through their
/// lifecycle.
#[derive(Clone)]
pub struct InvoiceService<I, O> {
    invoices: Arc<I>,
    operations: Arc<O>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl<I, O> InvoiceService<I, O> {
    pub fn new(
        invoices: Arc<I>,
        operations: Arc<O>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            invoices,
            operations,
            ids,
            clock,
        }
    }
}

impl<I, O> InvoiceService<I, O>
where
    I: InvoiceRepository,
    O: OperationRepository,
{
    /// Issue a `Pending` invoice against an existing operation.
    pub async fn create_invoice(&self, request: CreateInvoiceRequest) -> Result<Invoice, Error> {
        let CreateInvoiceRequest {
            operation_id,
            amount,
        } = request;

        if amount.is_negative() {
            return Err(map_validation_error(ValidationError::NegativeAmount {
                amount,
            }));
        }

        self.operations
            .retrieve(&operation_id)
            .await
            .map_err(map_operation_repository_error)?
            .ok_or_else(|| Error::not_found(format!("operation {operation_id} not found")))?;

        let invoice = Invoice::issue(
            self.ids.new_invoice_id(),
            operation_id,
            amount,
            self.clock.utc(),
        );
        let saved = self
            .invoices
            .save(&invoice)
            .await
            .map_err(map_invoice_repository_error)?;
        info!(
            invoice_id = %saved.id(),
            operation_id = %saved.operation_id(),
            amount = %saved.amount(),
            "invoice created"
        );
        Ok(saved)
    }

    /// Move an invoice to `status`.
    ///
    /// Transitions out of `Paid` or `Cancelled` are applied but logged at
    /// warn level.
    pub async fn update_invoice_status(
        &self,
        invoice_id: &InvoiceId,
        status: InvoiceStatus,
    ) -> Result<Invoice, Error> {
        let current = self.get_invoice(invoice_id).await?;
        let from = current.status();
        if from.is_terminal() && from != status {
            warn!(
                invoice_id = %invoice_id,
                from = %from,
                to = %status,
                "invoice leaving terminal status"
            );
        }

        let updated = self
            .invoices
            .update_status(invoice_id, status)
            .await
            .map_err(map_invoice_repository_error)?
            .ok_or_else(|| invoice_not_found(invoice_id))?;
        info!(invoice_id = %invoice_id, from = %from, to = %status, "invoice status updated");
        Ok(updated)
    }

    pub async fn get_invoice(&self, invoice_id: &InvoiceId) -> Result<Invoice, Error> {
        self.invoices
            .retrieve(invoice_id)
            .await
            .map_err(map_invoice_repository_error)?
            .ok_or_else(|| invoice_not_found(invoice_id))
    }

    /// Invoices raised for one operation, newest first.
    pub async fn list_operation_invoices(
        &self,
        operation_id: &OperationId,
    ) -> Result<Vec<Invoice>, Error> {
        self.invoices
            .find_by_operation_id(operation_id)
            .await
            .map_err(map_invoice_repository_error)
    }

    /// Invoices raised across all of a patient's operations, newest first.
    pub async fn list_patient_invoices(
        &self,
        patient_id: &PatientId,
    ) -> Result<Vec<Invoice>, Error> {
        self.invoices
            .find_by_patient_id(patient_id)
            .await
            .map_err(map_invoice_repository_error)
    }
}

#[cfg(test)]
#[path = "invoice_service_tests.rs"]
mod tests;
