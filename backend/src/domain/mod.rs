//! Domain primitives, aggregates, and services.
//!
//! Purpose: Define the clinic's strongly typed entities and the services that
//! orchestrate them through ports. Adapters live in [`crate::outbound`].
//!
//! Public surface:
//! - Error (alias to `error::Error`) — transport-agnostic failure payload.
//! - Money / CurrencyCode — exact decimal amounts tagged with a currency.
//! - PatientOperation, Invoice — the two aggregates.
//! - OperationService, InvoiceService — orchestration over the ports.

pub mod error;
pub mod ids;
pub mod invoice;
pub mod invoice_service;
pub mod money;
pub mod operation;
pub mod operation_service;
pub mod patient;
pub mod ports;
pub mod requests;
pub mod timestamp;
pub mod validation;

pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::ids::{IdValidationError, InvoiceId, OperationId, PatientId};
pub use self::invoice::{
    Invoice, InvoiceDraft, InvoiceStatus, InvoiceValidationError, ParseInvoiceStatusError,
};
pub use self::invoice_service::InvoiceService;
pub use self::money::{CurrencyCode, Money, MoneyError, MoneyParseError};
pub use self::operation::{
    CostBreakdownError, Detail, OperationInvariantError, OperationNote, OperationRevision,
    PatientOperation, PatientOperationDraft,
};
pub use self::operation_service::OperationService;
pub use self::patient::Patient;
pub use self::requests::{
    AssetUpload, CreateInvoiceRequest, CreateOperationRequest, OperationRequest,
    UpdateOperationRequest,
};
pub use self::timestamp::stored_precision;
