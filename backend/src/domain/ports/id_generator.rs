//! Port for minting aggregate identifiers.

use crate::domain::{InvoiceId, OperationId};

/// Source of fresh, unique identifiers.
#[cfg_attr(test, mockall::automock)]
pub trait IdGenerator: Send + Sync {
    fn new_operation_id(&self) -> OperationId;

    fn new_invoice_id(&self) -> InvoiceId;
}
