//! Mandatory text fields and FDI tooth numbering.

use super::{OperationValidator, ValidationError};
use crate::domain::OperationRequest;

/// Fails on blank `type`/`executor` or a detail outside FDI numbering.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequiredFieldsValidator;

/// FDI two-digit notation: permanent quadrants 1-4 hold teeth 1-8,
/// deciduous quadrants 5-8 hold teeth 1-5.
pub(crate) fn is_fdi_tooth(tooth_number: u8) -> bool {
    let quadrant = tooth_number / 10;
    let position = tooth_number % 10;
    match quadrant {
        1..=4 => (1..=8).contains(&position),
        5..=8 => (1..=5).contains(&position),
        _ => false,
    }
}

impl OperationValidator for RequiredFieldsValidator {
    fn validate(&self, request: &OperationRequest) -> Result<(), ValidationError> {
        if request.operation_type.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "type" });
        }
        if request.executor.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "executor" });
        }
        if let Some(detail) = request
            .details
            .iter()
            .find(|detail| !is_fdi_tooth(detail.tooth_number))
        {
            return Err(ValidationError::InvalidToothNumber {
                tooth_number: detail.tooth_number,
            });
        }
        Ok(())
    }
}
