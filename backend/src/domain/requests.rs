//! Request payloads accepted by the domain services.

use super::ids::{OperationId, PatientId};
use super::money::Money;
use super::operation::Detail;

/// Business content of an operation, checked by the validation pipeline on
/// both creation and full re-save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub operation_type: String,
    pub description: String,
    pub executor: String,
    pub estimated_cost: Money,
    pub details: Vec<Detail>,
}

/// Request to create a new operation for an existing patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOperationRequest {
    pub patient_id: PatientId,
    pub operation: OperationRequest,
}

/// Request to re-save an operation, replacing its asset list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOperationRequest {
    pub operation: OperationRequest,
    pub assets: Vec<String>,
}

/// File uploaded alongside an asset attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUpload {
    pub asset_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Request to bill an existing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInvoiceRequest {
    pub operation_id: OperationId,
    pub amount: Money,
}
