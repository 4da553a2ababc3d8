//! Random identifier generation.

use uuid::Uuid;

use crate::domain::ports::IdGenerator;
use crate::domain::{InvoiceId, OperationId};

/// Issues hyphenated v4 UUID strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn new_operation_id(&self) -> OperationId {
        OperationId::from(Uuid::new_v4())
    }

    fn new_invoice_id(&self) -> InvoiceId {
        InvoiceId::from(Uuid::new_v4())
    }
}
